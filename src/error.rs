use crate::client::backends::{BackendError, FailureKind};
use thiserror::Error;

/// Errors raised while configuring or constructing repository clients.
///
/// Per-call failures from a backend are carried by [`BackendError`]; they are
/// only wrapped here when they bubble up through code that also deals with
/// configuration or local I/O (the CLI, for instance).
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // I/O errors (reading payload files, writing datastreams to disk)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Building the HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Error categorization for callers that run their own retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
}

impl Error {
    /// Categorize error for retry logic
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::InvalidInput { .. } | Self::Serde(_) => {
                ErrorCategory::Permanent
            }

            Self::Http(_) | Self::Io(_) => ErrorCategory::Transient,

            Self::Backend(err) => match err.kind() {
                FailureKind::Transport => ErrorCategory::Transient,
                FailureKind::Status => match err.status_code() {
                    // 4xx client errors are permanent, except rate limiting
                    Some(429) => ErrorCategory::Transient,
                    Some(400..=499) => ErrorCategory::Permanent,
                    _ => ErrorCategory::Transient,
                },
                FailureKind::Shape | FailureKind::Unsupported => ErrorCategory::Permanent,
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
