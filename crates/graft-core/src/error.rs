//! Error types shared by hosts and execution providers.
//!
//! Every fallible call that crosses the host/provider boundary resolves to a
//! [`Result`]: success, or a [`ProviderError`] carrying a status code and a
//! human-readable message that the caller owns.

use thiserror::Error;

/// Result type for boundary-crossing operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Status codes attached to every failure.
///
/// Provider-raised failures all use [`ErrorCode::Fail`]; there is no
/// finer-grained taxonomy and no recoverable class. [`ErrorCode::InvalidArgument`]
/// marks a caller handing a callee something it cannot accept, such as a
/// factory asked to build a provider for more than one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Generic provider failure.
    Fail,
    /// A caller-supplied argument was rejected.
    InvalidArgument,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "FAIL"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
        }
    }
}

/// Error produced on either side of the host/provider boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Generic failure raised by a provider entry point.
    #[error("execution provider failure: {0}")]
    Fail(String),

    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ProviderError {
    /// Generic failure with the given message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// Invalid-argument failure with the given message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Status code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Fail(_) => ErrorCode::Fail,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Message text for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Fail(message) | Self::InvalidArgument(message) => message,
        }
    }
}
