//! Configuration error types.
//!
//! Everything that can go wrong while wiring up a connection or declaring a
//! resource schema is reported as a [`ConfigError`]. These errors surface at
//! setup time, never while requests are in flight.
//!
//! # Example
//!
//! ```rust
//! use rest_model::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring a connection or a schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Access token cannot be empty.
    #[error("Access token cannot be empty. Omit the token instead of passing an empty string.")]
    EmptyAccessToken,

    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a URL with scheme and host (e.g., 'https://api.example.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Nested attributes were declared for an association the schema does not have.
    #[error("Unknown association '{association}' on {model}. Declare the association before accepting nested attributes for it.")]
    UnknownAssociation {
        /// The model the declaration was made on.
        model: String,
        /// The association name that was referenced.
        association: String,
    },

    /// An association points at a model that was never registered.
    #[error("Association '{association}' on {model} targets unregistered model '{target}'.")]
    UnknownAssociationTarget {
        /// The model owning the association.
        model: String,
        /// The association name.
        association: String,
        /// The target model name.
        target: String,
    },

    /// The same model name was registered twice on one connection.
    #[error("Model '{model}' is already registered on this connection.")]
    DuplicateModel {
        /// The duplicated model name.
        model: String,
    },
}
