//! Collector trait and common error type.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Customer, ReportWindow, Source};
use crate::records::Record;

/// Errors that can occur while pulling from a source API.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication rejected (401/403).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every PRTG instance of a customer failed.
    #[error("All {failed} PRTG instance(s) failed, last error: {last}")]
    AllInstancesFailed { failed: usize, last: Box<SourceError> },
}

impl SourceError {
    /// Classify a non-success HTTP response.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimited(message),
            code => Self::Api {
                status: code,
                message,
            },
        }
    }
}

/// A read-only data source queried once per customer.
///
/// Implementations return records in the source's native order. A customer
/// the source has nothing configured for yields an empty list, not an error.
#[async_trait]
pub trait Collector: Send + Sync {
    /// The source this collector reads from.
    fn source(&self) -> Source;

    /// Pull the customer's records for the report window.
    async fn collect(
        &self,
        customer: &Customer,
        window: &ReportWindow,
    ) -> Result<Vec<Record>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classifies_auth() {
        let err = SourceError::from_status(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(err, SourceError::Auth(_)));
        let err = SourceError::from_status(StatusCode::FORBIDDEN, "nope".to_string());
        assert!(matches!(err, SourceError::Auth(_)));
    }

    #[test]
    fn test_from_status_classifies_rate_limit_and_api() {
        let err = SourceError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow".to_string());
        assert!(matches!(err, SourceError::RateLimited(_)));

        let err = SourceError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string());
        match err {
            SourceError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
