//! # rest-model
//!
//! Typed, mutable resource objects over JSON REST APIs, with ActiveRecord
//! ergonomics and no database: every read is a request and every write is
//! sent back to the server.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe connection configuration via [`ApiConfig`] and [`ApiConfigBuilder`]
//! - Validated newtypes for the base URL and access token
//! - An async HTTP client with retry logic and rate limit handling
//! - Per-type [`Schema`](rest::Schema)s: paths, root-element conventions,
//!   attributes, associations, hooks, validators and scopes
//! - [`Resource`](rest::Resource)s with dirty tracking, `save` and `destroy`
//! - Lazy `belongs_to` / `has_one` / `has_many` associations that use
//!   embedded data when the server sent it
//! - Lazy, chainable [`Relation`](rest::Relation)s fetched at most once
//!
//! ## Quick Start
//!
//! ```rust
//! use rest_model::{Api, ApiConfig, BaseUrl};
//! use rest_model::rest::Schema;
//!
//! let config = ApiConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let api = Api::builder(config)
//!     .model(
//!         Schema::builder("User")
//!             .belongs_to("organization")
//!             .build()
//!             .unwrap(),
//!     )
//!     .model(Schema::builder("Organization").build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! let users = api.model("User").unwrap();
//! assert_eq!(users.schema().paths().resource(), "/users/:id");
//! ```
//!
//! ## Working With Resources
//!
//! ```rust,ignore
//! let users = api.model("User")?;
//!
//! // GET /users/1
//! let mut user = users.find(1).await?.expect("user 1 exists");
//!
//! // Read through embedded data, or GET /organizations/:organization_id
//! if let Some(organization) = user.one("organization").await? {
//!     println!("{}", organization.get("name")?);
//! }
//!
//! // PUT /users/1 with the whole bag
//! user.set("name", "Lindsay");
//! if user.save().await? {
//!     println!("{:?}", user.previous_changes());
//! }
//!
//! // GET /users?role=admin, issued on first fetch only
//! let mut admins = users.filter(serde_json::json!({"role": "admin"}))?;
//! for admin in admins.fetch().await?.iter() {
//!     println!("{admin:?}");
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: schemas are registered on an explicit connection
//! - **Server errors are data**: a rejected save returns `false` and fills
//!   [`Resource::errors`](rest::Resource::errors); only transport, parse and
//!   configuration failures are `Err`
//! - **Thread-safe**: all types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio runtime

pub mod clients;
pub mod config;
pub mod error;
pub mod rest;

// Re-export public types at crate root for convenience
pub use config::{AccessToken, ApiConfig, ApiConfigBuilder, BaseUrl};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    Api, ApiBuilder, ApiResponse, HttpClient, HttpError, HttpMethod, HttpRequest,
    HttpRequestBuilder, HttpResponse, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};

// Used by the `record!` macro
#[doc(hidden)]
pub use paste;
#[doc(hidden)]
pub use serde_json;
