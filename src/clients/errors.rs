//! HTTP-specific error types.
//!
//! The transport does not treat non-2xx statuses as errors: the response is
//! handed to the envelope parser so server-reported errors can surface as
//! data. What remains here are failures of the exchange itself.
//!
//! - [`MaxHttpRetriesExceededError`]: 429/500 persisted through every try
//! - [`InvalidHttpRequestError`]: a request failed validation before sending
//! - [`HttpError`]: unified error type encompassing all of the above plus
//!   network failures

use thiserror::Error;

/// Error returned when maximum retry attempts have been exhausted.
///
/// # Example
///
/// ```rust
/// use rest_model::clients::MaxHttpRetriesExceededError;
///
/// let error = MaxHttpRetriesExceededError {
///     code: 429,
///     tries: 3,
///     message: r#"{"error":"Rate limited"}"#.to_string(),
///     error_reference: None,
/// };
///
/// assert!(error.to_string().contains("3"));
/// ```
#[derive(Debug, Error)]
#[error("Exceeded maximum retry count of {tries}. Last message: {message}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of tries that were attempted.
    pub tries: u32,
    /// Body of the last response.
    pub message: String,
    /// Reference ID for error reporting (from X-Request-Id header).
    pub error_reference: Option<String>,
}

/// Error returned when an HTTP request fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST, PUT or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },
}

/// Unified error type for all HTTP-related errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Maximum retry attempts exhausted.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_retries_error_message() {
        let error = MaxHttpRetriesExceededError {
            code: 500,
            tries: 2,
            message: "boom".to_string(),
            error_reference: Some("req-1".to_string()),
        };
        let message = error.to_string();
        assert!(message.contains("retry count of 2"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_invalid_request_error_message() {
        let error = InvalidHttpRequestError::MissingBody {
            method: "patch".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot use patch without specifying data.");
    }

    #[test]
    fn test_http_error_from_invalid_request() {
        let error: HttpError = InvalidHttpRequestError::MissingBody {
            method: "post".to_string(),
        }
        .into();
        assert!(matches!(error, HttpError::InvalidRequest(_)));
    }
}
