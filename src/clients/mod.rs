//! Transport and connection types.
//!
//! This module provides the HTTP layer the resource layer is built on:
//!
//! - [`HttpClient`]: the async HTTP client with default headers and retries
//! - [`HttpRequest`]: a request to be sent, built with [`HttpRequest::builder`]
//! - [`HttpResponse`]: the raw status, headers and body of an exchange
//! - [`HttpMethod`]: supported HTTP methods (GET, POST, PUT, PATCH, DELETE)
//! - [`Api`]: the connection: request transforms, response parser and the
//!   registry of resource types
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_model::{ApiConfig, BaseUrl};
//! use rest_model::clients::{HttpClient, HttpMethod, HttpRequest};
//!
//! let config = ApiConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com")?)
//!     .build()?;
//! let client = HttpClient::new(&config)?;
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "/users")
//!     .query_param("page", "2")
//!     .build()?;
//!
//! let response = client.request(request).await?;
//! ```
//!
//! # Retry Behavior
//!
//! The client retries transient failures:
//!
//! - **429 (Rate Limited)**: waits for the `Retry-After` header value, or 1 second if not present
//! - **500 (Server Error)**: waits a fixed 1 second
//! - **Any other status**: returned immediately; interpreting it is left to the envelope parser
//!
//! The default `tries` is 1, meaning no automatic retries. Configure it with
//! [`ApiConfigBuilder::tries`](crate::config::ApiConfigBuilder::tries).

mod api;
mod errors;
mod http_client;
mod http_request;
mod http_response;

pub use api::{to_query_pairs, Api, ApiBuilder, ApiResponse, RequestTransform};
pub use errors::{HttpError, InvalidHttpRequestError, MaxHttpRetriesExceededError};
pub use http_client::{HttpClient, LIB_VERSION, RETRY_WAIT_TIME};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
