//! Path building for resource requests.
//!
//! Templates are plain strings with `:name` placeholders, e.g.
//! `/users/:user_id/comments/:id`. Each placeholder is resolved from a
//! parameter map, first under its own name and then under `_name`. The
//! underscore form lets a caller supply a route parameter that would
//! otherwise collide with an attribute of the same name.
//!
//! Parameters consumed by the template are removed from the returned
//! remainder; whatever is left over becomes query string or body data.
//!
//! # Example
//!
//! ```rust
//! use rest_model::rest::{build_path, resolve_path};
//! use serde_json::json;
//!
//! let params = json!({"user_id": 1, "id": 5, "page": 2});
//! let params = params.as_object().unwrap();
//!
//! let path = build_path("/users/:user_id/comments/:id", params).unwrap();
//! assert_eq!(path, "/users/1/comments/5");
//!
//! let (path, remaining) = resolve_path("/users/:user_id/comments", params).unwrap();
//! assert_eq!(path, "/users/1/comments");
//! assert_eq!(remaining.get("page"), Some(&json!(2)));
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use crate::clients::HttpMethod;

/// A placeholder in a path template had no matching parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Missing :_{name} parameter to build the request path. Path is `{template}`.")]
pub struct PathError {
    /// The placeholder name that could not be resolved.
    pub name: String,
    /// The template being resolved.
    pub template: String,
}

/// Operations that map onto an HTTP verb.
///
/// Each schema can override the verb per action; see
/// [`SchemaBuilder::method_for`](crate::rest::SchemaBuilder::method_for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Fetch one or more resources.
    Find,
    /// Fetch server-side defaults for a new resource.
    New,
    /// Persist a new resource.
    Create,
    /// Persist changes to an existing resource.
    Update,
    /// Delete a resource.
    Destroy,
}

impl Action {
    /// Returns the default HTTP method for this action.
    #[must_use]
    pub const fn default_http_method(&self) -> HttpMethod {
        match self {
            Self::Find | Self::New => HttpMethod::Get,
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Destroy => HttpMethod::Delete,
        }
    }

    /// Returns the action name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::New => "new",
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }
}

/// The collection and member templates of a resource type.
///
/// Setting the collection path re-derives the member path as
/// `{collection}/:id`; setting the member path afterwards overrides that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    collection: String,
    resource: String,
}

impl ResourcePaths {
    /// Creates paths for a collection template, deriving the member template.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let resource = format!("{}/:id", collection.trim_end_matches('/'));
        Self {
            collection,
            resource,
        }
    }

    /// Replaces the collection template and re-derives the member template.
    pub fn set_collection(&mut self, collection: impl Into<String>) {
        *self = Self::new(collection);
    }

    /// Replaces the member template only.
    pub fn set_resource(&mut self, resource: impl Into<String>) {
        self.resource = resource.into();
    }

    /// Returns the collection template.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the member template.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Picks the template for a parameter set.
    ///
    /// The member template is used when `params` holds a non-null, non-array
    /// value for `primary_key`; otherwise the collection template. A bare
    /// `:id` segment is rewritten to `:{primary_key}`.
    #[must_use]
    pub fn select(&self, params: &Map<String, Value>, primary_key: &str) -> String {
        let has_key = params
            .get(primary_key)
            .is_some_and(|value| !value.is_null() && !value.is_array());

        let template = if has_key {
            &self.resource
        } else {
            &self.collection
        };

        if primary_key == "id" {
            return template.clone();
        }
        template
            .split('/')
            .map(|segment| {
                if segment == ":id" {
                    format!(":{primary_key}")
                } else {
                    segment.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Returns the placeholder names in a template, in order of appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                names.push(&template[start..end]);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    names
}

/// Builds a path from a template, failing on the first unresolved placeholder.
///
/// # Errors
///
/// Returns [`PathError`] naming the placeholder that had neither `name` nor
/// `_name` in `params`.
pub fn build_path(template: &str, params: &Map<String, Value>) -> Result<String, PathError> {
    resolve_path(template, params).map(|(path, _)| path)
}

/// Builds a path and returns the parameters the template did not consume.
///
/// Values are percent-encoded. `null` counts as missing.
///
/// # Errors
///
/// Returns [`PathError`] naming the first unresolved placeholder.
pub fn resolve_path(
    template: &str,
    params: &Map<String, Value>,
) -> Result<(String, Map<String, Value>), PathError> {
    let mut remaining = params.clone();
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    for name in placeholders(template) {
        let marker = format!(":{name}");
        // Placeholders are returned in order, so the next marker is always ahead.
        let Some(at) = rest.find(&marker) else {
            continue;
        };
        path.push_str(&rest[..at]);
        rest = &rest[at + marker.len()..];

        let escaped = format!("_{name}");
        let value = take_param(&mut remaining, name).or_else(|| take_param(&mut remaining, &escaped));
        match value {
            Some(value) => path.push_str(&urlencoding::encode(&value)),
            None => {
                return Err(PathError {
                    name: name.to_string(),
                    template: template.to_string(),
                })
            }
        }
    }
    path.push_str(rest);

    Ok((path, remaining))
}

fn take_param(params: &mut Map<String, Value>, key: &str) -> Option<String> {
    match params.remove(key)? {
        Value::Null => None,
        value => Some(param_to_string(&value)),
    }
}

/// Renders a JSON scalar the way it appears in a URL.
pub(crate) fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Action>();
    assert_send_sync::<ResourcePaths>();
    assert_send_sync::<PathError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_path_template_interpolation_single_param() {
        let result = build_path("/users/:id", &params(json!({"id": 123})));
        assert_eq!(result.unwrap(), "/users/123");
    }

    #[test]
    fn test_path_template_interpolation_multiple_params() {
        let result = build_path("/:a/x/:b", &params(json!({"a": "1", "b": "2"})));
        assert_eq!(result.unwrap(), "/1/x/2");
    }

    #[test]
    fn test_missing_param_names_placeholder() {
        let error = build_path("/:a/x/:b", &params(json!({"a": "1"}))).unwrap_err();
        assert_eq!(error.name, "b");
        assert_eq!(error.template, "/:a/x/:b");
        assert!(error.to_string().contains(":_b"));
    }

    #[test]
    fn test_underscore_param_satisfies_placeholder() {
        let result = build_path("/:a/x/:b", &params(json!({"a": "1", "_b": "2"})));
        assert_eq!(result.unwrap(), "/1/x/2");
    }

    #[test]
    fn test_plain_name_wins_over_underscore_name() {
        let result = build_path("/users/:id", &params(json!({"id": 1, "_id": 2})));
        assert_eq!(result.unwrap(), "/users/1");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let error = build_path("/users/:id", &params(json!({"id": null}))).unwrap_err();
        assert_eq!(error.name, "id");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let result = build_path("/files/:name", &params(json!({"name": "a b/c"})));
        assert_eq!(result.unwrap(), "/files/a%20b%2Fc");
    }

    #[test]
    fn test_resolve_path_returns_unconsumed_params() {
        let (path, remaining) = resolve_path(
            "/users/:user_id/comments",
            &params(json!({"user_id": 1, "_id": 9, "page": 2})),
        )
        .unwrap();

        assert_eq!(path, "/users/1/comments");
        assert!(!remaining.contains_key("user_id"));
        assert_eq!(remaining.get("page"), Some(&json!(2)));
        assert_eq!(remaining.get("_id"), Some(&json!(9)));
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let result = build_path("/users", &Map::new());
        assert_eq!(result.unwrap(), "/users");
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("/users/:user_id/comments/:id"),
            vec!["user_id", "id"]
        );
        assert!(placeholders("/users").is_empty());
    }

    #[test]
    fn test_resource_paths_default_member_template() {
        let paths = ResourcePaths::new("/users");
        assert_eq!(paths.collection(), "/users");
        assert_eq!(paths.resource(), "/users/:id");
    }

    #[test]
    fn test_setting_collection_resets_member_template() {
        let mut paths = ResourcePaths::new("/users");
        paths.set_resource("/people/:id");
        paths.set_collection("/admins");
        assert_eq!(paths.resource(), "/admins/:id");
    }

    #[test]
    fn test_select_uses_member_template_only_for_scalar_primary_key() {
        let paths = ResourcePaths::new("/users");

        assert_eq!(paths.select(&params(json!({"id": 1})), "id"), "/users/:id");
        assert_eq!(paths.select(&params(json!({"id": null})), "id"), "/users");
        assert_eq!(paths.select(&params(json!({"id": [1, 2]})), "id"), "/users");
        assert_eq!(paths.select(&Map::new(), "id"), "/users");
    }

    #[test]
    fn test_select_rewrites_id_segment_for_custom_primary_key() {
        let paths = ResourcePaths::new("/users");
        assert_eq!(
            paths.select(&params(json!({"_id": "abc"})), "_id"),
            "/users/:_id"
        );
    }

    #[test]
    fn test_action_default_http_method() {
        assert_eq!(Action::Find.default_http_method(), HttpMethod::Get);
        assert_eq!(Action::New.default_http_method(), HttpMethod::Get);
        assert_eq!(Action::Create.default_http_method(), HttpMethod::Post);
        assert_eq!(Action::Update.default_http_method(), HttpMethod::Put);
        assert_eq!(Action::Destroy.default_http_method(), HttpMethod::Delete);
    }
}
