//! The response envelope and the parsers that produce it.
//!
//! Every response is reduced to an [`Envelope`] before it reaches the model
//! layer: `data` (object or array), `errors` (object or array, never null)
//! and `metadata` (object). Compound documents also carry an `included`
//! pool of side-loaded objects.
//!
//! Which body layout the server uses is decided once per connection by the
//! configured [`ResponseParser`]:
//!
//! - [`FirstLevelParser`]: the body itself is the data; top-level `errors`
//!   and `metadata` keys are lifted out of it
//! - [`SecondLevelParser`]: the body is `{"data", "errors", "metadata"}`
//! - [`JsonApiParser`]: the body is a JSON:API document
//!   (`data`, `errors`, `meta`, `included`)
//!
//! All three treat 204/304 responses and empty bodies as the empty envelope.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use rest_model::clients::HttpResponse;
//! use rest_model::rest::{FirstLevelParser, ResponseParser};
//! use serde_json::json;
//!
//! let response = HttpResponse::new(
//!     200,
//!     HashMap::new(),
//!     r#"{"id": 1, "name": "Lindsay", "metadata": {"page": 1}}"#,
//! );
//! let envelope = FirstLevelParser.parse(&response).unwrap();
//!
//! assert_eq!(envelope.data, json!({"id": 1, "name": "Lindsay"}));
//! assert_eq!(envelope.metadata.get("page"), Some(&json!(1)));
//! assert!(!envelope.has_errors());
//! ```

use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::clients::HttpResponse;
use crate::rest::attributes::is_blank;
use crate::rest::ResourceError;

/// A parsed response, normalized to `{data, errors, metadata}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The resource payload: an object or an array.
    pub data: Value,
    /// Server-reported errors: always an object or an array.
    pub errors: Value,
    /// Response metadata (pagination and the like).
    pub metadata: Map<String, Value>,
    /// Side-loaded objects of a compound document.
    pub included: Vec<Value>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::empty()
    }
}

impl Envelope {
    /// Returns the envelope of a response without content.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: Value::Object(Map::new()),
            errors: Value::Array(Vec::new()),
            metadata: Map::new(),
            included: Vec::new(),
        }
    }

    /// Creates an envelope, normalizing missing parts.
    ///
    /// A null or scalar `errors` becomes an empty array, a non-object
    /// `metadata` an empty object and a null `data` an empty object.
    #[must_use]
    pub fn new(data: Value, errors: Value, metadata: Value) -> Self {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let errors = match errors {
            errors @ (Value::Array(_) | Value::Object(_)) => errors,
            _ => Value::Array(Vec::new()),
        };
        let metadata = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            data,
            errors,
            metadata,
            included: Vec::new(),
        }
    }

    /// Sets the side-loaded pool.
    #[must_use]
    pub fn with_included(mut self, included: Vec<Value>) -> Self {
        self.included = included;
        self
    }

    /// Returns `true` if the server reported any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !is_blank(&self.errors)
    }

    /// Returns `true` if the data part is empty.
    #[must_use]
    pub fn is_data_empty(&self) -> bool {
        is_blank(&self.data)
    }
}

/// Turns an HTTP response into an [`Envelope`].
///
/// Implementations must accept any status code; statuses carry no meaning at
/// this layer beyond 204/304 meaning "no content".
pub trait ResponseParser: Send + Sync + Debug {
    /// Parses a response.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Parse`] if the body is not a JSON object or
    /// array.
    fn parse(&self, response: &HttpResponse) -> Result<Envelope, ResourceError>;
}

/// Decodes a body into a container, or `None` when there is no content.
fn decode(response: &HttpResponse) -> Result<Option<Value>, ResourceError> {
    if response.is_bodiless() || response.body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ResourceError::parse(format!("invalid JSON ({e})")))?;

    match value {
        Value::Object(_) | Value::Array(_) => Ok(Some(value)),
        other => Err(ResourceError::parse(format!(
            "expected a JSON object or array, got `{other}`"
        ))),
    }
}

/// Parser for bodies that are the data themselves.
///
/// `errors` and `metadata` keys at the top level of an object body are moved
/// out of the data. Array bodies are data in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstLevelParser;

impl ResponseParser for FirstLevelParser {
    fn parse(&self, response: &HttpResponse) -> Result<Envelope, ResourceError> {
        let Some(body) = decode(response)? else {
            return Ok(Envelope::empty());
        };

        match body {
            Value::Object(mut map) => {
                let errors = map.remove("errors").unwrap_or(Value::Null);
                let metadata = map.remove("metadata").unwrap_or(Value::Null);
                Ok(Envelope::new(Value::Object(map), errors, metadata))
            }
            array => Ok(Envelope::new(array, Value::Null, Value::Null)),
        }
    }
}

/// Parser for `{"data": ..., "errors": ..., "metadata": ...}` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondLevelParser;

impl ResponseParser for SecondLevelParser {
    fn parse(&self, response: &HttpResponse) -> Result<Envelope, ResourceError> {
        let Some(body) = decode(response)? else {
            return Ok(Envelope::empty());
        };

        let Value::Object(mut map) = body else {
            return Err(ResourceError::parse(
                "expected an object with a `data` key, got an array",
            ));
        };

        Ok(Envelope::new(
            map.remove("data").unwrap_or(Value::Null),
            map.remove("errors").unwrap_or(Value::Null),
            map.remove("metadata").unwrap_or(Value::Null),
        ))
    }
}

/// Parser for JSON:API documents.
///
/// `meta` becomes the metadata and `included` the side-loaded pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiParser;

impl ResponseParser for JsonApiParser {
    fn parse(&self, response: &HttpResponse) -> Result<Envelope, ResourceError> {
        let Some(body) = decode(response)? else {
            return Ok(Envelope::empty());
        };

        let Value::Object(mut map) = body else {
            return Err(ResourceError::parse(
                "expected a JSON:API document object, got an array",
            ));
        };

        let included = match map.remove("included") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        Ok(Envelope::new(
            map.remove("data").unwrap_or(Value::Null),
            map.remove("errors").unwrap_or(Value::Null),
            map.remove("meta").unwrap_or(Value::Null),
        )
        .with_included(included))
    }
}

// Verify parsers are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Envelope>();
    assert_send_sync::<FirstLevelParser>();
    assert_send_sync::<SecondLevelParser>();
    assert_send_sync::<JsonApiParser>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn response(code: u16, body: &str) -> HttpResponse {
        HttpResponse::new(code, HashMap::new(), body)
    }

    #[test]
    fn test_no_content_yields_empty_envelope() {
        for parser in [
            &FirstLevelParser as &dyn ResponseParser,
            &SecondLevelParser,
            &JsonApiParser,
        ] {
            assert_eq!(parser.parse(&response(204, "")).unwrap(), Envelope::empty());
            assert_eq!(
                parser.parse(&response(304, "ignored")).unwrap(),
                Envelope::empty()
            );
            assert_eq!(parser.parse(&response(200, "  ")).unwrap(), Envelope::empty());
        }
    }

    #[test]
    fn test_empty_envelope_shape() {
        let envelope = Envelope::empty();
        assert_eq!(envelope.data, json!({}));
        assert_eq!(envelope.errors, json!([]));
        assert!(envelope.metadata.is_empty());
        assert!(!envelope.has_errors());
        assert!(envelope.is_data_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = FirstLevelParser.parse(&response(200, "<html>oops</html>"));
        assert!(matches!(result, Err(ResourceError::Parse { .. })));
    }

    #[test]
    fn test_scalar_body_is_parse_error() {
        let result = FirstLevelParser.parse(&response(200, "42"));
        assert!(matches!(result, Err(ResourceError::Parse { .. })));
    }

    #[test]
    fn test_first_level_lifts_errors_and_metadata() {
        let envelope = FirstLevelParser
            .parse(&response(
                422,
                r#"{"name": "", "errors": {"name": ["can't be blank"]}, "metadata": {"total": 0}}"#,
            ))
            .unwrap();

        assert_eq!(envelope.data, json!({"name": ""}));
        assert_eq!(envelope.errors, json!({"name": ["can't be blank"]}));
        assert_eq!(envelope.metadata.get("total"), Some(&json!(0)));
        assert!(envelope.has_errors());
    }

    #[test]
    fn test_first_level_array_body() {
        let envelope = FirstLevelParser
            .parse(&response(200, r#"[{"id": 1}, {"id": 2}]"#))
            .unwrap();
        assert_eq!(envelope.data, json!([{"id": 1}, {"id": 2}]));
        assert_eq!(envelope.errors, json!([]));
    }

    #[test]
    fn test_second_level_parser() {
        let envelope = SecondLevelParser
            .parse(&response(
                200,
                r#"{"data": [{"id": 1}], "errors": null, "metadata": {"page": 2}}"#,
            ))
            .unwrap();

        assert_eq!(envelope.data, json!([{"id": 1}]));
        assert_eq!(envelope.errors, json!([]));
        assert_eq!(envelope.metadata.get("page"), Some(&json!(2)));
    }

    #[test]
    fn test_second_level_parser_rejects_array_body() {
        let result = SecondLevelParser.parse(&response(200, "[]"));
        assert!(matches!(result, Err(ResourceError::Parse { .. })));
    }

    #[test]
    fn test_json_api_parser_keeps_included_pool() {
        let envelope = JsonApiParser
            .parse(&response(
                200,
                r#"{
                    "data": {"type": "users", "id": "1", "attributes": {"name": "Gob"}},
                    "included": [{"type": "organizations", "id": "2", "attributes": {}}],
                    "meta": {"version": 3}
                }"#,
            ))
            .unwrap();

        assert_eq!(envelope.data["type"], json!("users"));
        assert_eq!(envelope.included.len(), 1);
        assert_eq!(envelope.metadata.get("version"), Some(&json!(3)));
    }
}
