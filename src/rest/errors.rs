//! Error types for resource operations.
//!
//! Server-reported validation problems are never turned into errors: they
//! arrive in the response envelope and are exposed as data through
//! [`Resource::errors`](crate::rest::Resource::errors). What remains here are
//! the failures a caller cannot reasonably branch on in a form-redisplay flow:
//!
//! - a path template that could not be resolved ([`ResourceError::Path`])
//! - a response body that violates the envelope contract ([`ResourceError::Parse`])
//! - references to names that were never declared
//! - transport failures ([`ResourceError::Http`])
//!
//! # Example
//!
//! ```rust
//! use rest_model::rest::{build_path, ResourceError};
//! use serde_json::Map;
//!
//! let error: ResourceError = build_path("/users/:id", &Map::new()).unwrap_err().into();
//! assert!(matches!(error, ResourceError::Path(_)));
//! assert!(error.to_string().contains(":_id"));
//! ```

use thiserror::Error;

use crate::clients::HttpError;
use crate::error::ConfigError;
use crate::rest::PathError;

/// Error type for resource operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A path placeholder had no matching parameter.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The response body is not valid JSON, or not an object or array.
    #[error("Unable to parse response body: {message}")]
    Parse {
        /// What was wrong with the body.
        message: String,
    },

    /// An association name was referenced that the model never declared.
    #[error("{model} has no association named '{name}'")]
    AssociationUnknown {
        /// The model the lookup was made on.
        model: String,
        /// The association name that was requested.
        name: String,
    },

    /// A dynamic attribute message matched no attribute, setter or predicate.
    #[error("undefined method '{message}' for {model}")]
    UnknownAttribute {
        /// The model the message was sent to.
        model: String,
        /// The message that was sent.
        message: String,
    },

    /// A model name was not registered on the connection.
    #[error("No model named '{name}' is registered on this connection")]
    UnknownModel {
        /// The name that was looked up.
        name: String,
    },

    /// A named scope was requested that the model does not define.
    #[error("{model} has no scope named '{name}'")]
    UnknownScope {
        /// The model the scope was requested on.
        model: String,
        /// The scope name.
        name: String,
    },

    /// A named custom request was invoked that the model does not define.
    #[error("{model} has no custom request named '{name}'")]
    UnknownRequest {
        /// The model the request was invoked on.
        model: String,
        /// The custom request name.
        name: String,
    },

    /// A value could not be converted to or from JSON.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The connection could not be assembled.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A lifecycle hook or setter failed.
    #[error("Hook failed: {message}")]
    Hook {
        /// The message supplied by the hook.
        message: String,
    },
}

impl ResourceError {
    /// Creates a [`ResourceError::Hook`] with the given message.
    ///
    /// Intended for use inside hook and setter closures.
    #[must_use]
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
        }
    }

    /// Creates a [`ResourceError::Parse`] with the given message.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns the request ID of the failed exchange, if available.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Http(HttpError::MaxRetries(e)) => e.error_reference.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MaxHttpRetriesExceededError;

    #[test]
    fn test_unknown_attribute_names_model_and_message() {
        let error = ResourceError::UnknownAttribute {
            model: "User".to_string(),
            message: "fullname".to_string(),
        };
        assert_eq!(error.to_string(), "undefined method 'fullname' for User");
    }

    #[test]
    fn test_path_error_converts_transparently() {
        let error: ResourceError = PathError {
            name: "user_id".to_string(),
            template: "/users/:user_id/comments".to_string(),
        }
        .into();
        assert!(error.to_string().starts_with("Missing :_user_id parameter"));
    }

    #[test]
    fn test_request_id_from_exhausted_retries() {
        let error: ResourceError = HttpError::MaxRetries(MaxHttpRetriesExceededError {
            code: 429,
            tries: 3,
            message: String::new(),
            error_reference: Some("req-9".to_string()),
        })
        .into();
        assert_eq!(error.request_id(), Some("req-9"));
        assert_eq!(ResourceError::hook("nope").request_id(), None);
    }

    #[test]
    fn test_hook_helper() {
        let error = ResourceError::hook("name is reserved");
        assert_eq!(error.to_string(), "Hook failed: name is reserved");
    }
}
