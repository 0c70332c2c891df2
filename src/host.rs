#![forbid(unsafe_code)]
use crate::args::{DiffArgs, PatchArgs};
use crate::config::Config;
use crate::dispatch::{Dispatcher, TaskId, Uncaught};
use crate::engine::Engine;
use crate::error::{Error, HostError};
use crate::marshal::{diff_arguments, patch_arguments, settle_diff, settle_patch, DiffOutput};
use crate::value::Value;
use crate::work::Work;
use bytes::Bytes;
use std::rc::Rc;
use std::sync::Arc;

/// Caller-thread handle for asynchronous diff and patch.
///
/// The handle is cheap to clone and stays on the thread that created it;
/// callbacks run on that thread from `poll` or `run`.
///
/// ```
/// use bytes::Bytes;
/// use qbsdiff_async::Host;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let host = Host::new().unwrap();
/// let reference = Bytes::from_static(b"the quick brown fox");
/// let current = Bytes::from_static(b"the quick red fox jumps");
///
/// let rebuilt = Rc::new(RefCell::new(None));
/// let slot = rebuilt.clone();
/// let patcher = host.clone();
/// let base = reference.clone();
/// let len = current.len();
/// host.diff_with(current.clone(), reference, move |result| {
///     let out = result.unwrap();
///     patcher.patch_with(len, base, out.control, out.diff, out.extra, move |result| {
///         *slot.borrow_mut() = Some(result.unwrap());
///     });
/// });
/// host.run();
/// assert_eq!(rebuilt.borrow().as_ref(), Some(&current));
/// ```
#[derive(Clone, Debug)]
pub struct Host {
    dispatcher: Rc<Dispatcher>,
}

impl Host {
    /// Start a host with the default configuration.
    pub fn new() -> Result<Self, Error> {
        Host::with_config(Config::default())
    }

    /// Start a host with the bsdiff engine described by `config`.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        let engine = Arc::new(config.engine());
        Host::with_engine(config, engine)
    }

    /// Start a host running a custom engine.
    pub fn with_engine(config: Config, engine: Arc<dyn Engine>) -> Result<Self, Error> {
        let dispatcher = Dispatcher::new(&config, engine)?;
        Ok(Host {
            dispatcher: Rc::new(dispatcher),
        })
    }

    /// `diff(current, reference, callback)`.
    ///
    /// The callback receives `(null, control, diff, extra)` or `(error)`.
    /// Malformed arguments fail here with `Error::InvalidArguments` and
    /// schedule nothing.
    pub fn diff(&self, args: &[Value]) -> Result<TaskId, Error> {
        let DiffArgs {
            current,
            reference,
            callback,
        } = DiffArgs::parse(args)?;
        let work = Work::diff(current, reference);
        let id = self.dispatcher.submit(
            work,
            Box::new(move |work: Work| callback.call(&diff_arguments(settle_diff(work)))),
        );
        Ok(id)
    }

    /// `patch(current_length, reference, control, diff, extra, callback)`.
    ///
    /// The callback receives `(null, current)` or `(error)`. `control` holds
    /// big-endian 32-bit integers.
    pub fn patch(&self, args: &[Value]) -> Result<TaskId, Error> {
        let PatchArgs {
            current_length,
            reference,
            control,
            diff,
            extra,
            callback,
        } = PatchArgs::parse(args)?;
        let work = Work::patch(current_length as usize, reference, control, diff, extra);
        let id = self.dispatcher.submit(
            work,
            Box::new(move |work: Work| callback.call(&patch_arguments(settle_patch(work)))),
        );
        Ok(id)
    }

    /// Typed `diff`.
    pub fn diff_with<F>(&self, current: Bytes, reference: Bytes, callback: F) -> TaskId
    where
        F: FnOnce(Result<DiffOutput, HostError>) + 'static,
    {
        let work = Work::diff(current, reference);
        self.dispatcher.submit(
            work,
            Box::new(move |work: Work| -> Result<(), HostError> {
                callback(settle_diff(work));
                Ok(())
            }),
        )
    }

    /// Typed `patch`.
    pub fn patch_with<F>(
        &self,
        output_length: usize,
        reference: Bytes,
        control: Bytes,
        diff: Bytes,
        extra: Bytes,
        callback: F,
    ) -> TaskId
    where
        F: FnOnce(Result<Bytes, HostError>) + 'static,
    {
        let work = Work::patch(output_length, reference, control, diff, extra);
        self.dispatcher.submit(
            work,
            Box::new(move |work: Work| -> Result<(), HostError> {
                callback(settle_patch(work));
                Ok(())
            }),
        )
    }

    /// Runs every callback whose computation has finished, without blocking.
    pub fn poll(&self) -> usize {
        self.dispatcher.poll()
    }

    /// Runs callbacks until no call is in flight.
    pub fn run(&self) -> usize {
        self.dispatcher.run()
    }

    /// Number of calls still waiting for their callback.
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Installs the handler receiving errors thrown by callbacks.
    ///
    /// Without one they are logged.
    pub fn on_uncaught<F>(&self, handler: F)
    where
        F: FnMut(&Uncaught) + 'static,
    {
        self.dispatcher.on_uncaught(Box::new(handler));
    }
}
