#![forbid(unsafe_code)]
//! Hands work descriptors to the worker pool and brings them back to the
//! caller thread.
//!
//! Workers post one completion token per descriptor on a channel that only
//! the caller thread drains, so callbacks always run on the thread that owns
//! the dispatcher, exactly once each.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, ErrorCode, HostError};
use crate::work::Work;
use flume::{Receiver, Sender};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Identifier of a submitted descriptor.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Delivers a finished descriptor on the caller thread.
///
/// Returning `Err` reports a thrown callback error.
pub type Completion = Box<dyn FnOnce(Work) -> Result<(), HostError>>;

/// A callback failure nobody handled.
#[derive(Debug, Clone)]
pub enum Uncaught {
    /// The callback threw.
    Thrown(HostError),
    /// The callback panicked.
    Panicked(String),
}

impl fmt::Display for Uncaught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uncaught::Thrown(e) => write!(f, "uncaught {}", e),
            Uncaught::Panicked(msg) => write!(f, "callback panicked: {}", msg),
        }
    }
}

type UncaughtHandler = Box<dyn FnMut(&Uncaught)>;

/// Completion token posted by a worker.
struct Finished {
    id: TaskId,
    work: Work,
}

/// Worker pool plus the caller-side completion queue.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    engine: Arc<dyn Engine>,
    tx: Sender<Finished>,
    rx: Receiver<Finished>,
    pending: RefCell<HashMap<TaskId, Completion>>,
    next_id: Cell<u64>,
    uncaught: RefCell<Option<UncaughtHandler>>,
}

impl Dispatcher {
    /// Start the worker pool described by `config`.
    pub fn new(config: &Config, engine: Arc<dyn Engine>) -> Result<Self, Error> {
        let prefix = config.thread_name_prefix().to_owned();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers())
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()?;
        let (tx, rx) = flume::unbounded();
        debug!(workers = pool.current_num_threads(), "dispatcher started");

        Ok(Dispatcher {
            pool,
            engine,
            tx,
            rx,
            pending: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            uncaught: RefCell::new(None),
        })
    }

    /// Schedules `work` on a worker; `completion` runs later on this thread.
    pub fn submit(&self, mut work: Work, completion: Completion) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        work.submitted();
        debug!(task = %id, mode = ?work.mode(), bytes = work.input_len(), "submit");
        self.pending.borrow_mut().insert(id, completion);

        let engine = self.engine.clone();
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            trace!(task = %id, "executing");
            let result = panic::catch_unwind(AssertUnwindSafe(|| work.execute(&*engine)));
            if let Err(payload) = result {
                error!(task = %id, "computation panicked: {}", panic_message(&*payload));
                work.fail(ErrorCode::Internal);
            }
            trace!(task = %id, state = ?work.state(), "executed");
            if tx.send(Finished { id, work }).is_err() {
                warn!(task = %id, "dispatcher gone, dropping result");
            }
        });
        id
    }

    /// Number of submitted descriptors not yet delivered.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Delivers every completion that is ready, without blocking.
    ///
    /// Returns the number of callbacks run.
    pub fn poll(&self) -> usize {
        let mut n = 0;
        while let Ok(finished) = self.rx.try_recv() {
            self.deliver(finished);
            n += 1;
        }
        n
    }

    /// Delivers completions until nothing is in flight, including work
    /// submitted by the callbacks themselves.
    ///
    /// Returns the number of callbacks run.
    pub fn run(&self) -> usize {
        let mut n = 0;
        while self.pending() > 0 {
            match self.rx.recv() {
                Ok(finished) => {
                    self.deliver(finished);
                    n += 1;
                }
                Err(_) => break,
            }
        }
        n
    }

    /// Installs the handler for callback failures.
    pub fn on_uncaught(&self, handler: UncaughtHandler) {
        *self.uncaught.borrow_mut() = Some(handler);
    }

    fn deliver(&self, finished: Finished) {
        let Finished { id, work } = finished;
        let completion = match self.pending.borrow_mut().remove(&id) {
            Some(completion) => completion,
            None => {
                warn!(task = %id, "completion without a pending callback");
                return;
            }
        };

        debug!(task = %id, state = ?work.state(), "deliver");
        match panic::catch_unwind(AssertUnwindSafe(move || completion(work))) {
            Ok(Ok(())) => {}
            Ok(Err(thrown)) => self.report(Uncaught::Thrown(thrown)),
            Err(payload) => self.report(Uncaught::Panicked(panic_message(&*payload))),
        }
    }

    fn report(&self, uncaught: Uncaught) {
        // Take the handler out so it may re-enter the dispatcher.
        let handler = self.uncaught.borrow_mut().take();
        match handler {
            Some(mut handler) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&uncaught)));
                {
                    let mut slot = self.uncaught.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(handler);
                    }
                }
                if let Err(payload) = outcome {
                    error!(
                        "uncaught handler panicked: {} (while reporting {})",
                        panic_message(&*payload),
                        uncaught
                    );
                }
            }
            None => error!("{}", uncaught),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.pool.current_num_threads())
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
