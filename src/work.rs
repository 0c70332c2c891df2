#![forbid(unsafe_code)]
//! Work descriptors: the unit of state handed from the caller thread to a
//! worker and back.

use crate::bsdiff::Delta;
use crate::control;
use crate::engine::Engine;
use crate::error::ErrorCode;
use bytes::Bytes;

/// Lifecycle of a single call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    Validated,
    Submitted,
    Executing,
    CompletedOk,
    CompletedErr,
}

/// Which operation a descriptor carries.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    Diff,
    Patch,
}

/// Retained input buffers.
///
/// Each field is a reference to the caller's buffer, kept alive until the
/// descriptor is consumed.
#[derive(Debug)]
enum Input {
    Diff {
        current: Bytes,
        reference: Bytes,
    },
    Patch {
        output_length: usize,
        reference: Bytes,
        control: Bytes,
        diff: Bytes,
        extra: Bytes,
    },
}

/// Freshly allocated results, owned by the descriptor until marshaled.
#[derive(Debug)]
pub enum Output {
    Diff(Delta),
    Patch(Vec<u8>),
}

/// A diff or patch request in flight.
#[derive(Debug)]
pub struct Work {
    input: Input,
    outcome: Option<Result<Output, ErrorCode>>,
    state: State,
}

impl Work {
    /// Describe a diff of `current` against `reference`.
    pub fn diff(current: Bytes, reference: Bytes) -> Self {
        Work {
            input: Input::Diff { current, reference },
            outcome: None,
            state: State::Validated,
        }
    }

    /// Describe a patch producing `output_length` bytes.
    ///
    /// `control` is in canonical byte order.
    pub fn patch(
        output_length: usize,
        reference: Bytes,
        control: Bytes,
        diff: Bytes,
        extra: Bytes,
    ) -> Self {
        Work {
            input: Input::Patch {
                output_length,
                reference,
                control,
                diff,
                extra,
            },
            outcome: None,
            state: State::Validated,
        }
    }

    /// Operation carried by this descriptor.
    pub fn mode(&self) -> Mode {
        match self.input {
            Input::Diff { .. } => Mode::Diff,
            Input::Patch { .. } => Mode::Patch,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Total bytes of retained input.
    pub fn input_len(&self) -> usize {
        match &self.input {
            Input::Diff { current, reference } => current.len() + reference.len(),
            Input::Patch {
                reference,
                control,
                diff,
                extra,
                ..
            } => reference.len() + control.len() + diff.len() + extra.len(),
        }
    }

    pub(crate) fn submitted(&mut self) {
        debug_assert_eq!(self.state, State::Validated);
        self.state = State::Submitted;
    }

    /// Runs the computation. Called once, on a worker.
    pub(crate) fn execute(&mut self, engine: &dyn Engine) {
        debug_assert_eq!(self.state, State::Submitted);
        self.state = State::Executing;

        let result = match &self.input {
            Input::Diff { current, reference } => {
                engine.compute_diff(&current[..], &reference[..]).map(Output::Diff)
            }
            Input::Patch {
                output_length,
                reference,
                control,
                diff,
                extra,
            } => control::decode(&control[..]).and_then(|ctrl| {
                engine
                    .apply_patch(&reference[..], &ctrl[..], &diff[..], &extra[..], *output_length)
                    .map(Output::Patch)
            }),
        };
        self.settle(result);
    }

    /// Marks the computation as failed without running it to the end.
    pub(crate) fn fail(&mut self, code: ErrorCode) {
        self.settle(Err(code));
    }

    fn settle(&mut self, result: Result<Output, ErrorCode>) {
        self.state = match result {
            Ok(_) => State::CompletedOk,
            Err(_) => State::CompletedErr,
        };
        self.outcome = Some(result);
    }

    /// Consumes the descriptor, releasing the retained inputs and handing
    /// over the outputs.
    ///
    /// A descriptor that never completed reports `ErrorCode::Internal`.
    pub fn into_outcome(self) -> Result<Output, ErrorCode> {
        self.outcome.unwrap_or(Err(ErrorCode::Internal))
    }
}
