//! Error types for the ChatWithYou domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Upstream completion failures get their own classified enum.

use thiserror::Error;

/// The top-level error type for all ChatWithYou operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Lookup errors (external store) ---
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Access denied: {0}")]
    Forbidden(String),

    // --- Input errors ---
    #[error("Validation failed: {0}")]
    Validation(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Store(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a missing record of the given kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A classified failure from a single completion provider call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Server error: {message} (status: {status_code})")]
    ServerError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// The coarse failure classes a completion attempt can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    RateLimit,
    MalformedResponse,
    Timeout,
    ServerError,
}

impl ProviderError {
    /// Map this error onto the five failure classes.
    ///
    /// Transport failures and missing configuration count as server errors.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthenticationFailed(_) => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimit,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::ServerError { .. } | Self::Network(_) | Self::NotConfigured(_) => {
                FailureKind::ServerError
            }
        }
    }

    /// Classify a non-success HTTP status from an upstream endpoint.
    pub fn from_status(status_code: u16, body: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationFailed(if body.is_empty() {
                "Invalid API key or insufficient permissions".into()
            } else {
                body
            }),
            429 => Self::RateLimited {
                retry_after_secs: 5,
            },
            408 | 504 => Self::Timeout(format!("upstream returned {status_code}")),
            _ => Self::ServerError {
                status_code,
                message: body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ServerError {
            status_code: 502,
            message: "Bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = Error::not_found("Conversation", "c-42");
        assert_eq!(err.to_string(), "Conversation not found: c-42");
    }

    #[test]
    fn status_codes_classify() {
        assert_eq!(
            ProviderError::from_status(401, String::new()).kind(),
            FailureKind::Auth
        );
        assert_eq!(
            ProviderError::from_status(403, "nope".into()).kind(),
            FailureKind::Auth
        );
        assert_eq!(
            ProviderError::from_status(429, String::new()).kind(),
            FailureKind::RateLimit
        );
        assert_eq!(
            ProviderError::from_status(504, String::new()).kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            ProviderError::from_status(500, "boom".into()).kind(),
            FailureKind::ServerError
        );
    }

    #[test]
    fn transport_failures_fold_into_server_error() {
        assert_eq!(
            ProviderError::Network("conn refused".into()).kind(),
            FailureKind::ServerError
        );
        assert_eq!(
            ProviderError::NotConfigured("empty".into()).kind(),
            FailureKind::ServerError
        );
    }
}
