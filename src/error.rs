//! Crate-wide error type.
//!
//! Most engine-local failures (a strategy returning an invalid play, a
//! draw with both deck and discard empty) are corrected in place and never
//! surface as an `Err` - see `headless_engine`'s fallback logic. `EngineError`
//! exists for the failures that legitimately propagate: model artifact I/O,
//! a detected card-multiset invariant violation, and worker-pool failures
//! reported up to the orchestrator/CLI boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid player count: {0} (must be 2-4)")]
    InvalidPlayerCount(u8),

    #[error("model I/O error: {0}")]
    ModelIoError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The deck/hands/discard/played-area card multiset didn't reduce to
    /// exactly one of each id 0-53. This is a bug in the engine itself, not
    /// a recoverable player input - callers should abort, not retry.
    #[error("card multiset invariant violated: {0}")]
    InvariantViolation(String),

    /// A worker exceeded its per-batch timeout or panicked mid-batch. The
    /// orchestrator respawns the worker from scratch; the in-flight batch's
    /// transitions are discarded, never partially merged.
    #[error("worker {worker_id} failed: {reason}")]
    WorkerError { worker_id: usize, reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_player_count_message() {
        let err = EngineError::InvalidPlayerCount(7);
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_worker_error_message() {
        let err = EngineError::WorkerError { worker_id: 3, reason: "timeout".to_string() };
        assert!(err.to_string().contains("worker 3"));
        assert!(err.to_string().contains("timeout"));
    }
}
