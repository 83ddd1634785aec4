// Error taxonomy and engine-status translation.
//
// Every failure a codec call can surface is one of:
//   - Engine             - the engine rejected the input (corrupt delta, wrong
//                          source, internal limit); carries code + message
//   - Sink               - writing output failed; the io::Error is kept as-is
//   - InvariantViolation - the engine broke the drain protocol (no progress,
//                          impossible byte counts); a defect, not bad input
//
// None of these are retried by the codec.

use std::io;

use thiserror::Error;

use crate::engine::EngineStatus;

/// Result type for codec operations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors returned by codecs, sessions, and the pooled API.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// The engine rejected the input or failed internally.
    #[error("engine error {code}: {message}")]
    Engine { code: i32, message: String },

    /// The output sink failed while flushing.
    #[error("output write failed: {0}")]
    Sink(#[source] io::Error),

    /// The engine violated the drain protocol.
    #[error("engine protocol violation at iteration {iteration}: {detail}")]
    InvariantViolation { iteration: u64, detail: String },
}

impl DeltaError {
    /// Build an engine error, substituting a generic message when the engine
    /// gave none.
    pub fn engine(code: i32, message: Option<String>) -> Self {
        Self::Engine {
            code,
            message: message.unwrap_or_else(|| format!("status {code}")),
        }
    }

    /// True if the input (delta, source, or target) was rejected.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }

    /// True if the output sink failed.
    pub fn is_sink_error(&self) -> bool {
        matches!(self, Self::Sink(_))
    }

    /// True if the engine misbehaved.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Engine status code, for engine errors.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// What the session loop should do after a successful engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Keep draining.
    Continue,
    /// The stream is complete.
    Finished,
}

/// Map an engine status onto the codec's error taxonomy.
pub fn translate(status: EngineStatus) -> DeltaResult<Completion> {
    match status {
        EngineStatus::Ok => Ok(Completion::Continue),
        EngineStatus::StreamEnd => Ok(Completion::Finished),
        EngineStatus::Error { code, message } => Err(DeltaError::engine(code, message)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
