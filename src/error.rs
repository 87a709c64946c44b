//! Error types shared across the acquisition and scope layers.

use thiserror::Error;

/// Errors surfaced by the acquisition core.
///
/// `NotFound` is a routine transient (read before enough samples exist) and
/// should not be logged as an error by callers. Allocation and configuration
/// failures at init are fatal for the instance that reported them.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },

    #[error("not enough data")]
    NotFound,

    #[error("adc: {0}")]
    Adc(String),

    #[error("sampling thread: {0}")]
    Thread(String),
}

pub type Result<T> = std::result::Result<T, ScopeError>;
