//! Ordered resource batches.
//!
//! A [`Collection`] holds the resources of one list response in response
//! order, together with that response's metadata and errors. It implements
//! `Deref<Target = [Resource]>`, so slice methods work directly:
//!
//! ```rust,ignore
//! let mut users = api.model("User")?.all();
//! let users = users.fetch().await?;
//!
//! for user in users.iter() {
//!     println!("{:?}", user.get("name")?);
//! }
//! let first = users.first();
//! let page = users.metadata().get("page");
//! ```

use std::ops::Deref;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::rest::attributes::{is_blank, to_map};
use crate::rest::{Model, Resource, ResourceError};

/// The resources of one response, in response order.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    model: Model,
    items: Vec<Resource>,
    metadata: Map<String, Value>,
    errors: Value,
}

impl Collection {
    /// Creates a collection.
    #[must_use]
    pub fn new(model: Model, items: Vec<Resource>, metadata: Map<String, Value>, errors: Value) -> Self {
        Self {
            model,
            items,
            metadata,
            errors,
        }
    }

    /// Creates an empty collection for a model.
    #[must_use]
    pub fn empty(model: Model) -> Self {
        Self::new(model, Vec::new(), Map::new(), Value::Array(Vec::new()))
    }

    /// Returns the model the members belong to.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the response metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the server-reported errors.
    #[must_use]
    pub const fn errors(&self) -> &Value {
        &self.errors
    }

    /// Returns `true` if the response reported errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !is_blank(&self.errors)
    }

    /// Builds a new, unsaved member of the collection's model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if the attributes do not serialize to an
    /// object or a setter or hook fails.
    pub fn build<P: Serialize>(&self, attributes: P) -> Result<Resource, ResourceError> {
        self.model.new_resource_map(to_map(&attributes)?)
    }

    /// Consumes the collection, returning its members.
    #[must_use]
    pub fn into_vec(self) -> Vec<Resource> {
        self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Resource> {
        &mut self.items
    }
}

impl Deref for Collection {
    type Target = [Resource];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl IntoIterator for Collection {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// Verify Collection is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Collection>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Api;
    use crate::config::{ApiConfig, BaseUrl};
    use crate::rest::Schema;
    use serde_json::json;

    fn users() -> Model {
        let config = ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        let api = Api::builder(config)
            .model(
                Schema::builder("User")
                    .default_scope(|_| json!({"active": true}).as_object().cloned().unwrap_or_default())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        api.model("User").unwrap()
    }

    fn members(model: &Model, ids: &[i64]) -> Vec<Resource> {
        ids.iter()
            .map(|id| model.instantiate(json!({"id": id}).as_object().cloned().unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_build_applies_default_scope() {
        let collection = Collection::empty(users());
        let built = collection.build(json!({"name": "Lucille"})).unwrap();

        assert!(built.is_new());
        assert_eq!(built.get("name").unwrap(), &json!("Lucille"));
        assert_eq!(built.get("active").unwrap(), &json!(true));
    }

    #[test]
    fn test_has_errors_ignores_blank_errors() {
        let model = users();
        assert!(!Collection::empty(model.clone()).has_errors());
        assert!(!Collection::new(model.clone(), Vec::new(), Map::new(), Value::Null).has_errors());

        let rejected = Collection::new(model, Vec::new(), Map::new(), json!({"base": ["denied"]}));
        assert!(rejected.has_errors());
        assert_eq!(rejected.errors(), &json!({"base": ["denied"]}));
    }

    #[test]
    fn test_iteration_keeps_response_order() {
        let model = users();
        let mut metadata = Map::new();
        metadata.insert("page".to_string(), json!(2));
        let collection = Collection::new(model.clone(), members(&model, &[3, 1, 2]), metadata, Value::Null);

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.first().and_then(Resource::id), Some(&json!(3)));
        assert_eq!(collection.metadata().get("page"), Some(&json!(2)));

        let borrowed: Vec<_> = (&collection).into_iter().map(|user| user.id().cloned()).collect();
        assert_eq!(borrowed, [Some(json!(3)), Some(json!(1)), Some(json!(2))]);

        let owned: Vec<_> = collection.into_iter().map(|user| user.id().cloned()).collect();
        assert_eq!(owned, [Some(json!(3)), Some(json!(1)), Some(json!(2))]);
    }
}
