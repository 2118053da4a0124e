//! Centralized error types for the repeat engine.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for repeat engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepeatError {
    #[error("Jingle not found: {0}")]
    NotFound(String),

    #[error("Jingle {0} cannot repeat itself")]
    SelfRepeat(String),

    #[error("Edge {source_id} -> {target_id} would create a repeat cycle")]
    CycleConflict { source_id: String, target_id: String },

    #[error("Cannot determine direction between {source_id} and {target_id}: {reason}")]
    AmbiguousDirection {
        source_id: String,
        target_id: String,
        reason: String,
    },

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid data in graph store: {0}")]
    InvalidData(String),

    #[error("Could not lock a stable neighbourhood for {nodes:?} after {attempts} attempts")]
    LockContention { nodes: Vec<String>, attempts: u32 },

    #[error("Graph repair did not converge after {passes} passes ({remaining} nodes still violating)")]
    RepairDidNotConverge { passes: u32, remaining: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for repeat engine operations.
pub type RepeatResult<T> = Result<T, RepeatError>;

impl RepeatError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller may retry the whole operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::LockContention { .. })
    }
}

impl From<StoreError> for RepeatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::InvalidData(msg) => Self::InvalidData(msg),
        }
    }
}
