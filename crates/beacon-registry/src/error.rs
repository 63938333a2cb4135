//! Error types for registry reads.

use thiserror::Error;

/// Result type alias for registry source operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors a registry source can surface.
///
/// None of these are fatal to the monitors: every poller degrades the
/// affected value to zero (or an error-labeled status) and keeps ticking.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("partial registry data: {0}")]
    Partial(String),
}
