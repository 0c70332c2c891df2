#![forbid(unsafe_code)]
use crate::bsdiff::{compute_diff, Delta, SMALL_MATCH};
use crate::bspatch::apply_patch;
use crate::error::ErrorCode;

/// The diff/patch computation run on worker threads.
///
/// Implementations are called synchronously on a worker and must not spawn
/// further asynchronous work of their own.
pub trait Engine: Send + Sync + 'static {
    /// Computes the delta that rebuilds `current` from `reference`.
    fn compute_diff(&self, current: &[u8], reference: &[u8]) -> Result<Delta, ErrorCode>;

    /// Rebuilds `output_length` bytes of current data from `reference` and a
    /// native-order control stream.
    fn apply_patch(
        &self,
        reference: &[u8],
        control: &[i32],
        diff: &[u8],
        extra: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, ErrorCode>;
}

/// Suffix array based bsdiff engine.
#[derive(Debug, Copy, Clone)]
pub struct BsdiffEngine {
    small: usize,
}

impl BsdiffEngine {
    /// Create an engine with the default small match threshold.
    pub fn new() -> Self {
        BsdiffEngine { small: SMALL_MATCH }
    }

    /// Set the threshold to determine small match (default is `SMALL_MATCH`).
    /// If set to zero, no matches would be skipped.
    pub fn small_match(mut self, sm: usize) -> Self {
        self.small = sm;
        self
    }
}

impl Default for BsdiffEngine {
    fn default() -> Self {
        BsdiffEngine::new()
    }
}

impl Engine for BsdiffEngine {
    fn compute_diff(&self, current: &[u8], reference: &[u8]) -> Result<Delta, ErrorCode> {
        compute_diff(current, reference, self.small)
    }

    fn apply_patch(
        &self,
        reference: &[u8],
        control: &[i32],
        diff: &[u8],
        extra: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, ErrorCode> {
        apply_patch(reference, control, diff, extra, output_length)
    }
}
