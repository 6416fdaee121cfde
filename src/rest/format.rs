//! Parse and serialize strategies for resource payloads.
//!
//! The envelope parser decides where the data of a response lives; the
//! functions here decide what that data looks like for one schema:
//! whether attributes are wrapped under a root key, whether collections are
//! keyed by the plural root, or whether the payload follows JSON:API.

use serde_json::{Map, Value};

use crate::rest::Schema;

/// Payload layout of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Attributes as a plain object, optionally wrapped as `{root: {...}}`.
    #[default]
    Plain,
    /// Like `Plain`, but collections arrive as `{plural_root: [...]}`.
    ActiveModelSerializers,
    /// Attributes wrapped as `{root: [{...}]}`.
    RootArray,
    /// JSON:API resource objects (`type`, `id`, `attributes`, `relationships`).
    JsonApi,
}

/// Extracts the attributes of a single resource from response data.
///
/// With root parsing enabled the value under the root key is used if it is
/// a container; otherwise `data` itself is used. For JSON:API, relationship
/// linkage is resolved against `included` and spliced in under the
/// relationship name.
#[must_use]
pub fn parse(schema: &Schema, data: &Value, included: &[Value]) -> Map<String, Value> {
    match schema.format() {
        Format::JsonApi => parse_json_api(schema, data, included),
        Format::RootArray if schema.parse_root_in_json() => {
            match data.get(schema.root_element()) {
                Some(Value::Array(items)) => items.first().map_or_else(Map::new, as_map),
                Some(Value::Object(map)) => map.clone(),
                _ => as_map(data),
            }
        }
        _ if schema.parse_root_in_json() => match data.get(schema.root_element()) {
            Some(Value::Object(map)) => map.clone(),
            _ => as_map(data),
        },
        _ => as_map(data),
    }
}

/// Returns `true` if response data describes a collection for this schema.
#[must_use]
pub fn is_collection(schema: &Schema, data: &Value) -> bool {
    if data.is_array() {
        return true;
    }
    schema.format() == Format::ActiveModelSerializers
        && schema.parse_root_in_json()
        && data
            .get(schema.plural_root_element())
            .is_some_and(Value::is_array)
}

/// Splits collection data into per-resource values.
///
/// Each element is later passed through [`parse`]. A non-empty object is
/// treated as a one-element collection.
#[must_use]
pub fn extract_array(schema: &Schema, data: &Value) -> Vec<Value> {
    if schema.format() == Format::ActiveModelSerializers && schema.parse_root_in_json() {
        if let Some(Value::Array(items)) = data.get(schema.plural_root_element()) {
            return items.clone();
        }
    }

    match data {
        Value::Array(items) => items.clone(),
        Value::Object(map) if !map.is_empty() => vec![data.clone()],
        _ => Vec::new(),
    }
}

/// Wraps outgoing attributes according to the schema's root settings.
#[must_use]
pub fn wrap(schema: &Schema, mut attributes: Map<String, Value>) -> Map<String, Value> {
    match schema.format() {
        Format::JsonApi => {
            let mut resource = Map::new();
            resource.insert(
                "type".to_string(),
                Value::String(schema.plural_root_element()),
            );
            if let Some(id) = attributes.remove(schema.primary_key()) {
                if !id.is_null() {
                    resource.insert("id".to_string(), id);
                }
            }
            resource.insert("attributes".to_string(), Value::Object(attributes));

            single_key("data".to_string(), Value::Object(resource))
        }
        Format::RootArray if schema.include_root_in_json() => {
            single_key(schema.root_element(), Value::Array(vec![Value::Object(attributes)]))
        }
        _ if schema.include_root_in_json() => {
            single_key(schema.root_element(), Value::Object(attributes))
        }
        _ => attributes,
    }
}

fn single_key(key: String, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key, value);
    map
}

fn as_map(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn parse_json_api(schema: &Schema, data: &Value, included: &[Value]) -> Map<String, Value> {
    // Accept a whole document as well as a bare resource object.
    let object = match data.get("data") {
        Some(inner @ Value::Object(_)) if data.get("attributes").is_none() => inner,
        _ => data,
    };

    // Locally built values are plain attribute objects.
    if ["attributes", "relationships", "type"]
        .iter()
        .all(|key| object.get(key).is_none())
    {
        return as_map(object);
    }

    let mut attributes = object
        .get("attributes")
        .map_or_else(Map::new, as_map);

    if let Some(id) = object.get("id") {
        attributes.insert(schema.primary_key().to_string(), id.clone());
    }

    if let Some(Value::Object(relationships)) = object.get("relationships") {
        for (name, relationship) in relationships {
            if attributes.contains_key(name) {
                continue;
            }
            match relationship.get("data") {
                Some(Value::Null) => {
                    attributes.insert(name.clone(), Value::Null);
                }
                Some(Value::Object(linkage)) => {
                    if let Some(found) = lookup_included(linkage, included) {
                        attributes.insert(name.clone(), Value::Object(found));
                    }
                }
                Some(Value::Array(linkages)) => {
                    let found: Vec<Value> = linkages
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(|linkage| lookup_included(linkage, included))
                        .map(Value::Object)
                        .collect();
                    attributes.insert(name.clone(), Value::Array(found));
                }
                _ => {}
            }
        }
    }

    attributes
}

/// Finds the included resource object with the linkage's `(type, id)`.
///
/// The object is returned whole; the target schema unwraps it on parse.
fn lookup_included(linkage: &Map<String, Value>, included: &[Value]) -> Option<Map<String, Value>> {
    let kind = linkage.get("type")?;
    let id = linkage.get("id")?;

    included
        .iter()
        .find(|item| item.get("type") == Some(kind) && item.get("id") == Some(id))
        .and_then(Value::as_object)
        .cloned()
}
