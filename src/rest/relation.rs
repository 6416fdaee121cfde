//! Lazy, chainable queries.
//!
//! A [`Relation`] accumulates query parameters and issues its request only
//! when a result is first needed. Each [`filter`](Relation::filter) or
//! [`scope`](Relation::scope) call returns a new relation; the receiver
//! keeps its own parameters and its own memo.
//!
//! ```rust,ignore
//! let users = api.model("User")?;
//!
//! let admins = users.filter(json!({"role": "admin"}))?;
//! let mut recent = admins.filter(json!({"since": "2024-01-01"}))?;
//!
//! assert_eq!(admins.params().len(), 1);
//! assert_eq!(recent.params().len(), 2);
//!
//! // GET /users?role=admin&since=2024-01-01, once
//! let first = recent.first().await?;
//! let all = recent.fetch().await?;
//! ```
//!
//! # Batched Fetching
//!
//! [`fetch_all`] loads several relations concurrently and stores each result
//! in its relation's memo slot. [`Relation::prime`] does the same for a
//! result obtained elsewhere; either way, later access issues no request.

use std::collections::BTreeSet;

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::rest::attributes::to_map;
use crate::rest::{Collection, Model, Resource, ResourceError};

/// A deferred query over a resource type's collection.
#[derive(Debug, Clone)]
pub struct Relation {
    model: Model,
    params: Map<String, Value>,
    fetched: Option<Collection>,
}

// Verify Relation is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Relation>();
};

impl Relation {
    /// Creates a relation carrying the model's default-scope parameters.
    pub(crate) fn new(model: Model) -> Self {
        let params = model.default_scope_params();
        Self {
            model,
            params,
            fetched: None,
        }
    }

    /// Returns the model queried.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the accumulated parameters.
    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Returns a new relation with `params` merged over this one's.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Serialization`] if `params` does not
    /// serialize to an object.
    pub fn filter<P: Serialize>(&self, params: P) -> Result<Self, ResourceError> {
        Ok(self.merged(to_map(&params)?))
    }

    /// Returns a new relation with a named scope applied.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownScope`] if the scope is not defined.
    pub fn scope(&self, name: &str, args: &[Value]) -> Result<Self, ResourceError> {
        let scope = self
            .model
            .schema()
            .scope(name)
            .ok_or_else(|| ResourceError::UnknownScope {
                model: self.model.name().to_string(),
                name: name.to_string(),
            })?;
        Ok(self.merged(scope(args)))
    }

    fn merged(&self, params: Map<String, Value>) -> Self {
        let mut merged = self.params.clone();
        merged.extend(params);
        Self {
            model: self.model.clone(),
            params: merged,
            fetched: None,
        }
    }

    /// Returns `true` once a result is memoized.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.fetched.is_some()
    }

    /// Stores an externally obtained result as this relation's result.
    pub fn prime(&mut self, collection: Collection) {
        self.fetched = Some(collection);
    }

    /// Drops the memoized result so the next access fetches again.
    pub fn reset(&mut self) {
        self.fetched = None;
    }

    /// Returns the result, fetching it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if the collection path cannot be built, the
    /// exchange fails or the body cannot be parsed.
    pub async fn fetch(&mut self) -> Result<&Collection, ResourceError> {
        let collection = match self.fetched.take() {
            Some(collection) => collection,
            None => self.load().await?,
        };
        Ok(self.fetched.insert(collection))
    }

    async fn load(&self) -> Result<Collection, ResourceError> {
        tracing::debug!(model = %self.model.name(), "loading relation");
        self.model.fetch_collection(self.params.clone()).await
    }

    /// Consumes the relation, returning its result.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn into_collection(mut self) -> Result<Collection, ResourceError> {
        self.fetch().await?;
        Ok(self.fetched.take().unwrap_or_else(|| Collection::empty(self.model.clone())))
    }

    /// Returns the first resource of the result.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn first(&mut self) -> Result<Option<Resource>, ResourceError> {
        Ok(self.fetch().await?.first().cloned())
    }

    /// Returns the number of resources in the result.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn len(&mut self) -> Result<usize, ResourceError> {
        Ok(self.fetch().await?.len())
    }

    /// Returns `true` if the result holds no resources.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn is_empty(&mut self) -> Result<bool, ResourceError> {
        Ok(self.fetch().await?.is_empty())
    }

    /// Finds one resource by primary key, sending this relation's parameters.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Resource>, ResourceError> {
        self.model.find_with(id, &self.params).await
    }

    /// Finds several resources by primary key, preserving order.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    pub async fn find_many<I, V>(&self, ids: I) -> Result<Vec<Resource>, ResourceError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut seen = BTreeSet::new();
        let lookups: Vec<_> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &Value| seen.insert(id.to_string()))
            .map(|id| self.find(id))
            .collect();

        let found = try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Builds an unsaved resource from this relation's parameters and `attributes`.
    ///
    /// # Errors
    ///
    /// See [`Model::build`].
    pub async fn build<P: Serialize>(&self, attributes: P) -> Result<Resource, ResourceError> {
        self.model.build(self.with(attributes)?).await
    }

    /// Creates a resource from this relation's parameters and `attributes`.
    ///
    /// # Errors
    ///
    /// See [`Model::create`].
    pub async fn create<P: Serialize>(&self, attributes: P) -> Result<Resource, ResourceError> {
        self.model.create(self.with(attributes)?).await
    }

    /// Returns the first resource, or creates one.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch) and [`Model::create`].
    pub async fn first_or_create<P: Serialize>(
        &mut self,
        attributes: P,
    ) -> Result<Resource, ResourceError> {
        match self.first().await? {
            Some(resource) => Ok(resource),
            None => self.create(attributes).await,
        }
    }

    /// Returns the first resource, or builds an unsaved one.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch) and [`Model::build`].
    pub async fn first_or_initialize<P: Serialize>(
        &mut self,
        attributes: P,
    ) -> Result<Resource, ResourceError> {
        match self.first().await? {
            Some(resource) => Ok(resource),
            None => self.build(attributes).await,
        }
    }

    fn with<P: Serialize>(&self, attributes: P) -> Result<Map<String, Value>, ResourceError> {
        let mut params = self.params.clone();
        params.extend(to_map(&attributes)?);
        Ok(params)
    }
}

/// Fetches every relation that has no result yet, concurrently.
///
/// Results land in each relation's memo slot, so later access issues no
/// request. Relations already loaded are left alone.
///
/// # Errors
///
/// Returns the first error; no relation is primed in that case.
pub async fn fetch_all(relations: &mut [Relation]) -> Result<(), ResourceError> {
    let pending: Vec<usize> = relations
        .iter()
        .enumerate()
        .filter(|(_, relation)| !relation.is_loaded())
        .map(|(index, _)| index)
        .collect();

    let shared = &*relations;
    let results = try_join_all(pending.iter().map(|&index| shared[index].load())).await?;

    for (index, collection) in pending.into_iter().zip(results) {
        relations[index].prime(collection);
    }
    Ok(())
}
