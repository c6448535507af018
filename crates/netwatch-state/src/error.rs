//! Error types for the netwatch state layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while loading or mutating device state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("identity store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    #[error("failed to persist identity for {address}: {source}")]
    Persist {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
