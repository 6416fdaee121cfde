//! Class-level operations on a resource type.
//!
//! A [`Model`] is a cheap handle pairing a registered [`Schema`] with the
//! [`Api`] it was registered on. It is what `find`, `all`, `create` and the
//! other type-level operations are called on, and it is the factory every
//! [`Resource`] of the type comes from.
//!
//! # Example
//!
//! ```rust,ignore
//! let users = api.model("User")?;
//!
//! // GET /users/1
//! let user = users.find(1).await?;
//!
//! // GET /users?role=admin (lazily, on first fetch)
//! let mut admins = users.filter(json!({"role": "admin"}))?;
//! let admins = admins.fetch().await?;
//!
//! // POST /users
//! let created = users.create(json!({"name": "Lindsay"})).await?;
//! if !created.is_valid() {
//!     println!("{}", created.errors());
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::clients::{Api, ApiResponse, HttpMethod};
use crate::rest::attributes::to_map;
use crate::rest::envelope::Envelope;
use crate::rest::format;
use crate::rest::path::{build_path, resolve_path, Action, PathError};
use crate::rest::schema::{Event, Timing};
use crate::rest::{Collection, Relation, Resource, ResourceError, Schema};

/// A handle on one registered resource type.
///
/// Two handles are equal if they name the same type.
#[derive(Clone)]
pub struct Model {
    api: Arc<Api>,
    schema: Arc<Schema>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model").field(&self.schema.name()).finish()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
    }
}

// Verify Model is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Model>();
    assert_send_sync::<Fetched>();
};

/// The result of a generic request: one resource or a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// The response data was a single object.
    One(Resource),
    /// The response data was a collection.
    Many(Collection),
}

impl Fetched {
    /// Returns the resource, if the response held one.
    #[must_use]
    pub fn into_one(self) -> Option<Resource> {
        match self {
            Self::One(resource) => Some(resource),
            Self::Many(_) => None,
        }
    }

    /// Returns the collection, if the response held one.
    #[must_use]
    pub fn into_many(self) -> Option<Collection> {
        match self {
            Self::Many(collection) => Some(collection),
            Self::One(_) => None,
        }
    }
}

impl Model {
    pub(crate) const fn new(api: Arc<Api>, schema: Arc<Schema>) -> Self {
        Self { api, schema }
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Returns the type's schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the connection the type is registered on.
    #[must_use]
    pub const fn api(&self) -> &Arc<Api> {
        &self.api
    }

    /// Returns another type registered on the same connection.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownModel`] if `name` is not registered.
    pub fn related(&self, name: &str) -> Result<Self, ResourceError> {
        self.api.model(name)
    }

    /// Resolves the collection path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if a placeholder has no matching parameter.
    pub fn collection_path(&self, params: &Map<String, Value>) -> Result<String, PathError> {
        build_path(self.schema.paths().collection(), params)
    }

    /// Resolves the member path when `params` carries a primary key, the
    /// collection path otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if a placeholder has no matching parameter.
    pub fn build_request_path(&self, params: &Map<String, Value>) -> Result<String, PathError> {
        build_path(&self.request_template(params), params)
    }

    fn request_template(&self, params: &Map<String, Value>) -> String {
        self.schema.paths().select(params, self.schema.primary_key())
    }

    /// Creates an unsaved resource.
    ///
    /// Default-scope parameters are applied first, then `attributes`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if `attributes` does not serialize to an
    /// object, or a setter or initialize hook fails.
    pub fn new_resource<P: Serialize>(&self, attributes: P) -> Result<Resource, ResourceError> {
        self.new_resource_map(to_map(&attributes)?)
    }

    /// Creates an unsaved resource from an attribute map.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if a setter or initialize hook fails.
    pub fn new_resource_map(&self, attributes: Map<String, Value>) -> Result<Resource, ResourceError> {
        let mut merged = self.default_scope_params();
        merged.extend(attributes);

        let mut resource = Resource::blank(self.clone());
        resource.run_hooks(Timing::Before, Event::Initialize)?;
        resource.assign_attributes(merged)?;
        resource.run_hooks(Timing::After, Event::Initialize)?;
        Ok(resource)
    }

    /// Materializes a resource from parsed server data.
    ///
    /// Runs the initialize and find hooks and leaves the resource clean.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if a setter, hook or embedded association
    /// fails.
    pub fn instantiate(&self, attributes: Map<String, Value>) -> Result<Resource, ResourceError> {
        let mut resource = Resource::blank(self.clone());
        resource.run_hooks(Timing::Before, Event::Initialize)?;
        resource.assign_attributes(attributes)?;
        resource.run_hooks(Timing::After, Event::Initialize)?;
        resource.run_hooks(Timing::Before, Event::Find)?;
        resource.run_hooks(Timing::After, Event::Find)?;
        resource.clear_changes_information();
        Ok(resource)
    }

    /// Materializes the single resource of an envelope.
    ///
    /// # Errors
    ///
    /// See [`instantiate`](Self::instantiate).
    pub fn from_envelope(&self, envelope: &Envelope) -> Result<Resource, ResourceError> {
        let attributes = format::parse(&self.schema, &envelope.data, &envelope.included);
        let mut resource = self.instantiate(attributes)?;
        resource.set_response_info(envelope);
        Ok(resource)
    }

    /// Materializes every resource of an envelope, in response order.
    ///
    /// # Errors
    ///
    /// See [`instantiate`](Self::instantiate).
    pub fn collection_from_envelope(&self, envelope: &Envelope) -> Result<Collection, ResourceError> {
        let items = format::extract_array(&self.schema, &envelope.data)
            .iter()
            .map(|item| self.instantiate(format::parse(&self.schema, item, &envelope.included)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Collection::new(
            self.clone(),
            items,
            envelope.metadata.clone(),
            envelope.errors.clone(),
        ))
    }

    /// Materializes the collection of a list exchange.
    ///
    /// A non-2xx answer yields no members; its errors and metadata are kept.
    ///
    /// # Errors
    ///
    /// See [`instantiate`](Self::instantiate).
    pub fn collection_from_response(&self, response: &ApiResponse) -> Result<Collection, ResourceError> {
        if response.is_ok() {
            return self.collection_from_envelope(&response.envelope);
        }

        tracing::debug!(
            model = %self.name(),
            status = response.response.code,
            "list request returned no collection"
        );
        Ok(Collection::new(
            self.clone(),
            Vec::new(),
            response.envelope.metadata.clone(),
            response.envelope.errors.clone(),
        ))
    }

    pub(crate) fn default_scope_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        for scope in self.schema.default_scopes() {
            params.extend(scope(&[]));
        }
        params
    }

    /// Returns a relation over the whole collection.
    #[must_use]
    pub fn all(&self) -> Relation {
        Relation::new(self.clone())
    }

    /// Returns a relation filtered by `params`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Serialization`] if `params` does not
    /// serialize to an object.
    pub fn filter<P: Serialize>(&self, params: P) -> Result<Relation, ResourceError> {
        self.all().filter(params)
    }

    /// Returns a relation with a named scope applied.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownScope`] if the scope is not defined.
    pub fn scope(&self, name: &str, args: &[Value]) -> Result<Relation, ResourceError> {
        self.all().scope(name, args)
    }

    /// Finds one resource by primary key.
    ///
    /// Returns `None` if the server answered with a non-2xx status.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if the path cannot be built, the exchange
    /// fails or the body cannot be parsed. An array id is rejected with
    /// [`ResourceError::Serialization`]; use [`find_many`](Self::find_many).
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Resource>, ResourceError> {
        self.find_with(id, ()).await
    }

    /// Finds one resource by primary key, sending extra parameters.
    ///
    /// Parameters not consumed by the path are sent as query string.
    ///
    /// # Errors
    ///
    /// See [`find`](Self::find).
    pub async fn find_with<P: Serialize>(
        &self,
        id: impl Into<Value>,
        params: P,
    ) -> Result<Option<Resource>, ResourceError> {
        let id = id.into();
        if id.is_array() {
            return Err(serde_json::Error::custom(format!(
                "find takes a single id, got `{id}`; use find_many for several"
            ))
            .into());
        }

        let mut params = to_map(&params)?;
        params.insert(self.schema.primary_key().to_string(), id);

        let template = self.request_template(&params);
        let response = self
            .request_template_path(self.schema.method_for(Action::Find), &template, params)
            .await?;

        if !response.is_ok() {
            tracing::debug!(
                model = %self.name(),
                status = response.response.code,
                "find returned no resource"
            );
            return Ok(None);
        }
        self.from_envelope(&response.envelope).map(Some)
    }

    /// Finds several resources, one request per distinct id.
    ///
    /// Results keep the order of `ids`; ids the server answered with a
    /// non-2xx status are skipped.
    ///
    /// # Errors
    ///
    /// See [`find`](Self::find).
    pub async fn find_many<I, V>(&self, ids: I) -> Result<Vec<Resource>, ResourceError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut seen = BTreeSet::new();
        let ids: Vec<Value> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| seen.insert(id.to_string()))
            .collect();

        let found = try_join_all(ids.into_iter().map(|id| self.find(id))).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Builds an unsaved resource.
    ///
    /// With `request_new_object_on_build`, server defaults are fetched from
    /// `{collection}/new` first and `params` are applied over them. A non-2xx
    /// answer falls back to building locally.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if `params` does not serialize to an object,
    /// the exchange fails or a setter or hook fails.
    pub async fn build<P: Serialize>(&self, params: P) -> Result<Resource, ResourceError> {
        let params = to_map(&params)?;
        if !self.schema.request_new_object_on_build() {
            return self.new_resource_map(params);
        }

        let mut path_params = params.clone();
        path_params.insert(
            self.schema.primary_key().to_string(),
            Value::String("new".to_string()),
        );
        let template = self.request_template(&path_params);
        let response = self
            .request_template_path(self.schema.method_for(Action::New), &template, path_params)
            .await?;

        let mut attributes = if response.is_ok() {
            format::parse(&self.schema, &response.envelope.data, &response.envelope.included)
        } else {
            tracing::debug!(
                model = %self.name(),
                status = response.response.code,
                "no server defaults, building locally"
            );
            Map::new()
        };
        attributes.extend(params);
        self.new_resource_map(attributes)
    }

    /// Creates and saves a resource.
    ///
    /// The resource is returned whether or not the server accepted it;
    /// inspect [`Resource::errors`] and [`Resource::is_valid`].
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] for transport, path and hook failures only.
    pub async fn create<P: Serialize>(&self, params: P) -> Result<Resource, ResourceError> {
        let mut resource = self.new_resource(params)?;
        resource.save().await?;
        Ok(resource)
    }

    /// Updates a resource by primary key without fetching it first.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn save_existing<P: Serialize>(
        &self,
        id: impl Into<Value>,
        params: P,
    ) -> Result<Resource, ResourceError> {
        let mut params = to_map(&params)?;
        params.insert(self.schema.primary_key().to_string(), id.into());

        let mut resource = self.new_resource_map(params)?;
        resource.save().await?;
        Ok(resource)
    }

    /// Deletes a resource by primary key without fetching it first.
    ///
    /// The returned resource is flagged destroyed if the server answered 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if the path cannot be built, the exchange
    /// fails or the body cannot be parsed.
    pub async fn destroy_existing<P: Serialize>(
        &self,
        id: impl Into<Value>,
        params: P,
    ) -> Result<Resource, ResourceError> {
        let id = id.into();
        let mut params = to_map(&params)?;
        params.insert(self.schema.primary_key().to_string(), id.clone());

        let template = self.request_template(&params);
        let response = self
            .request_template_path(self.schema.method_for(Action::Destroy), &template, params)
            .await?;

        let mut attributes =
            format::parse(&self.schema, &response.envelope.data, &response.envelope.included);
        attributes
            .entry(self.schema.primary_key().to_string())
            .or_insert(id);

        let mut resource = self.instantiate(attributes)?;
        resource.set_response_info(&response.envelope);
        resource.set_destroyed(response.is_ok());
        Ok(resource)
    }

    /// Invokes a named custom request at `{request path}/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownRequest`] if `name` was not registered
    /// with [`SchemaBuilder::custom`](crate::rest::SchemaBuilder::custom),
    /// otherwise the errors of [`get`](Self::get).
    pub async fn custom<P: Serialize>(&self, name: &str, params: P) -> Result<Fetched, ResourceError> {
        let method = self
            .schema
            .custom_request(name)
            .ok_or_else(|| ResourceError::UnknownRequest {
                model: self.name().to_string(),
                name: name.to_string(),
            })?;
        let params = to_map(&params)?;
        let template = format!("{}/{name}", self.request_template(&params));
        let response = self.request_template_path(method, &template, params).await?;
        self.fetched(&response.envelope)
    }

    /// Resolves `template` against `params` and sends the leftovers.
    async fn request_template_path(
        &self,
        method: HttpMethod,
        template: &str,
        params: Map<String, Value>,
    ) -> Result<ApiResponse, ResourceError> {
        let (path, remaining) = resolve_path(template, &params)?;
        self.api.request(method, &path, remaining).await
    }

    fn fetched(&self, envelope: &Envelope) -> Result<Fetched, ResourceError> {
        if format::is_collection(&self.schema, &envelope.data) {
            self.collection_from_envelope(envelope).map(Fetched::Many)
        } else {
            self.from_envelope(envelope).map(Fetched::One)
        }
    }

    pub(crate) async fn fetch_collection(
        &self,
        params: Map<String, Value>,
    ) -> Result<Collection, ResourceError> {
        let response = self
            .request_template_path(
                self.schema.method_for(Action::Find),
                self.schema.paths().collection(),
                params,
            )
            .await?;
        self.collection_from_response(&response)
    }
}

/// Generates the per-verb escape hatches.
///
/// Each verb `v` gets `v` (resource or collection, by response shape),
/// `v_raw` (the unparsed exchange), `v_collection` and `v_resource`.
/// Paths are templates resolved against `params`; what the template does
/// not consume is sent as query string or body.
macro_rules! verb_requests {
    ($($verb:ident => $method:expr),* $(,)?) => {
        paste::paste! {
            impl Model {
                $(
                    #[doc = "Sends a `" $verb "` request and materializes the result by its shape."]
                    ///
                    /// # Errors
                    ///
                    /// Returns [`ResourceError`] if the path cannot be built,
                    /// the exchange fails or the body cannot be parsed.
                    pub async fn $verb<P: Serialize>(
                        &self,
                        path: &str,
                        params: P,
                    ) -> Result<Fetched, ResourceError> {
                        let response = self.[<$verb _raw>](path, params).await?;
                        self.fetched(&response.envelope)
                    }

                    #[doc = "Sends a `" $verb "` request and returns the parsed exchange."]
                    ///
                    /// # Errors
                    ///
                    /// Returns [`ResourceError`] if the path cannot be built,
                    /// the exchange fails or the body cannot be parsed.
                    pub async fn [<$verb _raw>]<P: Serialize>(
                        &self,
                        path: &str,
                        params: P,
                    ) -> Result<ApiResponse, ResourceError> {
                        self.request_template_path($method, path, to_map(&params)?).await
                    }

                    #[doc = "Sends a `" $verb "` request and materializes a collection."]
                    ///
                    /// # Errors
                    ///
                    /// Returns [`ResourceError`] if the path cannot be built,
                    /// the exchange fails or the body cannot be parsed.
                    pub async fn [<$verb _collection>]<P: Serialize>(
                        &self,
                        path: &str,
                        params: P,
                    ) -> Result<Collection, ResourceError> {
                        let response = self.[<$verb _raw>](path, params).await?;
                        self.collection_from_response(&response)
                    }

                    #[doc = "Sends a `" $verb "` request and materializes one resource."]
                    ///
                    /// # Errors
                    ///
                    /// Returns [`ResourceError`] if the path cannot be built,
                    /// the exchange fails or the body cannot be parsed.
                    pub async fn [<$verb _resource>]<P: Serialize>(
                        &self,
                        path: &str,
                        params: P,
                    ) -> Result<Resource, ResourceError> {
                        let response = self.[<$verb _raw>](path, params).await?;
                        self.from_envelope(&response.envelope)
                    }
                )*
            }
        }
    };
}

verb_requests! {
    get => HttpMethod::Get,
    post => HttpMethod::Post,
    put => HttpMethod::Put,
    patch => HttpMethod::Patch,
    delete => HttpMethod::Delete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, BaseUrl};
    use serde_json::json;

    fn api() -> Arc<Api> {
        let config = ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        Api::builder(config)
            .model(
                Schema::builder("User")
                    .collection_path("/organizations/:organization_id/users")
                    .default_scope(|_| json!({"active": true}).as_object().cloned().unwrap_or_default())
                    .before(Event::Initialize, |resource| {
                        resource.set("initialized", true);
                        Ok(())
                    })
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_request_path_selection() {
        let users = api().model("User").unwrap();

        assert_eq!(
            users
                .build_request_path(&params(json!({"organization_id": 2})))
                .unwrap(),
            "/organizations/2/users"
        );
        assert_eq!(
            users
                .build_request_path(&params(json!({"organization_id": 2, "id": 7})))
                .unwrap(),
            "/organizations/2/users/7"
        );
        assert_eq!(
            users.collection_path(&Map::new()).unwrap_err().name,
            "organization_id"
        );
    }

    #[test]
    fn test_new_resource_applies_default_scope_then_attributes() {
        let users = api().model("User").unwrap();

        let user = users.new_resource(json!({"name": "Gob"})).unwrap();
        assert_eq!(user.get("active").unwrap(), &json!(true));
        assert_eq!(user.get("initialized").unwrap(), &json!(true));
        assert!(user.is_new());

        let user = users.new_resource(json!({"active": false})).unwrap();
        assert_eq!(user.get("active").unwrap(), &json!(false));
    }

    #[test]
    fn test_instantiate_leaves_resource_clean() {
        let users = api().model("User").unwrap();
        let user = users.instantiate(params(json!({"id": 1, "name": "Gob"}))).unwrap();

        assert!(!user.is_dirty());
        assert!(user.is_persisted());
        assert!(!user.has_attribute("active"));
    }

    #[test]
    fn test_collection_from_envelope_keeps_order_and_metadata() {
        let users = api().model("User").unwrap();
        let envelope = Envelope::new(
            json!([{"id": 2}, {"id": 1}]),
            Value::Null,
            json!({"total": 2}),
        );

        let collection = users.collection_from_envelope(&envelope).unwrap();
        let ids: Vec<_> = collection.iter().map(|user| user.get("id").unwrap().clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(1)]);
        assert_eq!(collection.metadata().get("total"), Some(&json!(2)));
    }

    #[test]
    fn test_models_compare_by_name() {
        let api = api();
        assert_eq!(api.model("User").unwrap(), api.model("User").unwrap());
    }
}
