// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the AuraScan progression server.

use aura_progression::ProgressionError;
use thiserror::Error;

/// Server error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Progression engine error.
    #[error("progression error: {0}")]
    Progression(#[from] ProgressionError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
