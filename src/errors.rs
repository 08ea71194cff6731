//! Typed errors for the analysis pipeline.
//!
//! Sampling errors (`NotFound`, `AccessDenied`, `Timeout`, ...) come from the
//! hosting API and are not retried at that layer. Generation errors
//! (`Generation`, `Validation`, `RateLimited`, `Upstream`) are retried by the
//! requester up to its attempt budget.

use hackscope_core::degraded::FailureCause;
use hackscope_core::retry::RetryClass;
use hackscope_core::validate::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String },

    #[error("rate limit exceeded{}", reset_suffix(.reset_hint))]
    RateLimited { reset_hint: Option<String> },

    #[error("{resource} is too large to fetch")]
    TooLarge { resource: String },

    #[error("{operation} timed out")]
    Timeout { operation: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid generation response: {0}")]
    Validation(#[from] ParseError),

    #[error("{service} returned an error: {message}")]
    Upstream { service: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("cache error: {0}")]
    Cache(#[source] anyhow::Error),
}

fn reset_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(", resets around {}; please try again later", h),
        None => ", please try again later".to_string(),
    }
}

impl AnalysisError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AnalysisError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        AnalysisError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Map to the coarse cause used for placeholder records.
    pub fn cause(&self) -> FailureCause {
        match self {
            AnalysisError::NotFound { .. } => FailureCause::NotFound,
            AnalysisError::AccessDenied { .. } => FailureCause::AccessDenied,
            AnalysisError::RateLimited { .. } => FailureCause::RateLimited,
            AnalysisError::Timeout { .. } => FailureCause::Timeout,
            other => FailureCause::Other(other.to_string()),
        }
    }
}

impl RetryClass for AnalysisError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::Generation(_)
                | AnalysisError::Validation(_)
                | AnalysisError::RateLimited { .. }
                | AnalysisError::Timeout { .. }
                | AnalysisError::Upstream { .. }
        )
    }

    fn is_rate_limit(&self) -> bool {
        matches!(self, AnalysisError::RateLimited { .. })
    }
}

/// Classify a transport-level reqwest failure.
pub(crate) fn from_transport(service: &str, operation: &str, err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        AnalysisError::timeout(format!("{} {}", service, operation))
    } else {
        AnalysisError::upstream(service, err.to_string())
    }
}
