#![forbid(unsafe_code)]
use crate::bsdiff::SMALL_MATCH;
use crate::engine::BsdiffEngine;

/// Default name prefix of worker threads.
pub const THREAD_NAME: &str = "qbsdiff-worker";

/// Host configuration.
///
/// Start a host with two workers that never skip small matches:
/// ```
/// use qbsdiff_async::{Config, Host};
///
/// let host = Host::with_config(Config::new().workers(2).small_match(0)).unwrap();
/// assert_eq!(host.pending(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    workers: usize,
    thread_name: String,
    small: usize,
}

impl Config {
    /// Create the default configuration.
    pub fn new() -> Self {
        Config {
            workers: 0,
            thread_name: THREAD_NAME.to_owned(),
            small: SMALL_MATCH,
        }
    }

    /// Set the number of worker threads (0 means one per logical CPU, which
    /// is the default).
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Set the name prefix of worker threads.
    pub fn thread_name<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Set the bsdiff small match threshold (default is `SMALL_MATCH`).
    pub fn small_match(mut self, sm: usize) -> Self {
        self.small = sm;
        self
    }

    /// Number of worker threads to start.
    pub fn num_workers(&self) -> usize {
        if self.workers == 0 {
            Ord::max(num_cpus::get(), 1)
        } else {
            self.workers
        }
    }

    /// Name prefix of worker threads.
    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name
    }

    /// The default engine this configuration describes.
    pub fn engine(&self) -> BsdiffEngine {
        BsdiffEngine::new().small_match(self.small)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
