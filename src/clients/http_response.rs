//! HTTP response types.
//!
//! [`HttpResponse`] keeps the raw body text. Decoding it into an
//! [`Envelope`](crate::rest::Envelope) is the job of the configured
//! [`ResponseParser`](crate::rest::ResponseParser), so a non-JSON body can be
//! reported as a parse error instead of being silently replaced.

use std::collections::HashMap;

/// An HTTP response received from the API.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercased names (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The raw response body.
    pub body: String,
    /// Seconds to wait before retrying (from `Retry-After` header).
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing the `Retry-After` header.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: impl Into<String>) -> Self {
        let retry_request_after = headers
            .get("retry-after")
            .and_then(|values| values.first())
            .and_then(|value| value.parse::<f64>().ok());

        Self {
            code,
            headers,
            body: body.into(),
            retry_request_after,
        }
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns `true` for responses that carry no body by definition (204, 304).
    #[must_use]
    pub const fn is_bodiless(&self) -> bool {
        self.code == 204 || self.code == 304
    }

    /// Returns the first value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// Returns the `Deprecation` or `Sunset` notice sent by the server, if any.
    #[must_use]
    pub fn deprecation_notice(&self) -> Option<&str> {
        self.header("deprecation").or_else(|| self.header("sunset"))
    }
}
