/*!
Asynchronous bsdiff/bspatch for single-threaded hosts.

Calls are validated on the caller thread, computed on a worker pool and
completed on the caller thread again, one callback per call. The control
stream crosses the boundary as big-endian 32-bit integers.
*/

pub mod args;
pub mod bsdiff;
pub mod bspatch;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host;
pub mod marshal;
pub mod value;
pub mod work;

pub use bsdiff::Delta;
pub use config::Config;
pub use dispatch::{TaskId, Uncaught};
pub use engine::{BsdiffEngine, Engine};
pub use error::{Error, ErrorCode, HostError, HostErrorKind};
pub use host::Host;
pub use marshal::DiffOutput;
pub use value::{Function, Value};
