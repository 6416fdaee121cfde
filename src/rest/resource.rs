//! Resources: one entity of a modeled type.
//!
//! A [`Resource`] combines an [`Attributes`] bag, the materialized
//! associations, the metadata and errors of the last response, and a
//! lifecycle flag:
//!
//! ```text
//! new (no primary key) --save--> persisted --destroy--> destroyed
//! ```
//!
//! # Attribute Access
//!
//! [`get`](Resource::get), [`set`](Resource::set) and
//! [`has_attribute`](Resource::has_attribute) read and write the bag
//! directly. [`call`](Resource::call) dispatches a message by name the way
//! accessors would: `name=` writes (through a custom setter if one is
//! installed), `name?` tests presence and a bare `name` reads the bag or a
//! materialized association.
//!
//! # Mass Assignment
//!
//! [`assign_attributes`](Resource::assign_attributes) processes each pair in
//! turn:
//!
//! 1. a custom setter for the key consumes the value
//! 2. declared attributes go straight to the bag
//! 3. data under an association's data key is materialized as that
//!    association, unless it does not look like association data
//! 4. everything else goes to the bag
//!
//! # Example
//!
//! ```rust,ignore
//! let mut user = api.model("User")?.find(1).await?.unwrap();
//!
//! user.set("name", "Lindsay");
//! assert!(user.is_changed("name"));
//!
//! if user.save().await? {
//!     println!("{:?}", user.previous_changes());
//! } else {
//!     println!("{}", user.errors());
//! }
//!
//! let organization = user.one("organization").await?;
//! let comments = user.many("comments").await?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::rest::associations::{self, build_nested, parse_embedded, Linked};
use crate::rest::attributes::{is_blank, to_map, Attributes, Change};
use crate::rest::envelope::Envelope;
use crate::rest::format;
use crate::rest::path::{Action, PathError};
use crate::rest::schema::{Event, FieldErrors, Timing};
use crate::rest::{Collection, Model, ResourceError};

static NULL: Value = Value::Null;

/// One entity of a modeled type.
///
/// Equality requires the same type name, equal attribute bags and equal
/// materialized associations. Hashing uses the type name and the bag.
#[derive(Clone)]
pub struct Resource {
    model: Model,
    attributes: Attributes,
    associations: BTreeMap<String, Linked>,
    metadata: Map<String, Value>,
    errors: Value,
    validation_errors: FieldErrors,
    destroyed: bool,
}

// Verify Resource is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resource>();
};

impl Resource {
    pub(crate) fn blank(model: Model) -> Self {
        Self {
            model,
            attributes: Attributes::new(),
            associations: BTreeMap::new(),
            metadata: Map::new(),
            errors: Value::Array(Vec::new()),
            validation_errors: FieldErrors::default(),
            destroyed: false,
        }
    }

    /// Returns the resource's type.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the attribute bag.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Reads an attribute.
    ///
    /// A declared attribute that was never set reads as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownAttribute`] if the bag has no such key
    /// and the attribute was not declared.
    pub fn get(&self, name: &str) -> Result<&Value, ResourceError> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value);
        }
        if self.model.schema().is_declared(name) {
            return Ok(&NULL);
        }
        Err(self.unknown(name))
    }

    /// Reads an attribute and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownAttribute`] as [`get`](Self::get) does,
    /// or [`ResourceError::Serialization`] if the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ResourceError> {
        Ok(serde_json::from_value(self.get(name)?.clone())?)
    }

    /// Writes an attribute directly to the bag, bypassing custom setters.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(name, value.into());
    }

    /// Returns `true` if the bag holds `name`, even as `null`.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Returns `true` if `name` holds a non-blank value.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.attributes.is_present(name)
    }

    /// Dispatches an accessor message.
    ///
    /// - `name=` writes `value` through the custom setter for `name`, or
    ///   directly to the bag; returns the written value
    /// - `name?` returns whether `name` is present
    /// - `name` reads the bag, then a materialized association, then
    ///   `null` for declared attributes
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownAttribute`] naming the message if a
    /// read matches nothing, or the setter's error.
    pub fn call(&mut self, message: &str, value: Option<Value>) -> Result<Value, ResourceError> {
        if let Some(name) = message.strip_suffix('=') {
            let value = value.unwrap_or(Value::Null);
            let model = self.model.clone();
            match model.schema().setter(name) {
                Some(setter) => setter(self, value.clone())?,
                None => self.set(name, value.clone()),
            }
            return Ok(value);
        }

        if let Some(name) = message.strip_suffix('?') {
            let present = self.is_present(name)
                || self
                    .associations
                    .get(name)
                    .is_some_and(|linked| !linked.is_empty());
            return Ok(Value::Bool(present));
        }

        if let Some(value) = self.attributes.get(message) {
            return Ok(value.clone());
        }
        if let Some(linked) = self.associations.get(message) {
            return Ok(linked.to_value());
        }
        if self.model.schema().is_declared(message) {
            return Ok(Value::Null);
        }
        Err(self.unknown(message))
    }

    fn unknown(&self, message: &str) -> ResourceError {
        ResourceError::UnknownAttribute {
            model: self.model.name().to_string(),
            message: message.to_string(),
        }
    }

    /// Returns the primary-key value, if set and non-null.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.attributes
            .get(self.model.schema().primary_key())
            .filter(|value| !value.is_null())
    }

    /// Returns `true` if the resource has no primary key yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Returns `true` if the resource has a primary key and was not destroyed.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !self.is_new() && !self.destroyed
    }

    /// Returns `true` after a successful delete.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn set_destroyed(&mut self, destroyed: bool) {
        self.destroyed = destroyed;
    }

    /// Returns the metadata of the last response.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the server-reported errors of the last response.
    #[must_use]
    pub const fn errors(&self) -> &Value {
        &self.errors
    }

    /// Returns the messages of the last client-side validation run.
    #[must_use]
    pub const fn validation_errors(&self) -> &FieldErrors {
        &self.validation_errors
    }

    /// Runs the validators.
    ///
    /// Returns `true` if no validator added a message and the last response
    /// reported no errors.
    pub fn is_valid(&mut self) -> bool {
        self.run_validations() && is_blank(&self.errors)
    }

    /// The negation of [`is_valid`](Self::is_valid).
    pub fn is_invalid(&mut self) -> bool {
        !self.is_valid()
    }

    fn run_validations(&mut self) -> bool {
        let mut errors = FieldErrors::default();
        for validator in self.model.schema().validators() {
            validator(self, &mut errors);
        }
        self.validation_errors = errors;
        self.validation_errors.is_empty()
    }

    /// Returns `{name: (old, new)}` for every changed attribute.
    #[must_use]
    pub fn changes(&self) -> BTreeMap<String, Change> {
        self.attributes.changes()
    }

    /// Returns `true` if `name` changed since the last load or save.
    #[must_use]
    pub fn is_changed(&self, name: &str) -> bool {
        self.attributes.is_changed(name)
    }

    /// Returns `true` if any attribute changed since the last load or save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.attributes.is_dirty()
    }

    /// Returns the changes persisted by the last successful save.
    #[must_use]
    pub const fn previous_changes(&self) -> &BTreeMap<String, Change> {
        self.attributes.previous_changes()
    }

    /// Forgets all change information.
    pub fn clear_changes_information(&mut self) {
        self.attributes.clear_changes_information();
    }

    /// Reverts unsaved attribute changes.
    pub fn restore_attributes(&mut self) {
        self.attributes.restore();
    }

    /// Mass-assigns attributes.
    ///
    /// # Errors
    ///
    /// Returns the first error of a custom setter or of materializing
    /// embedded association data.
    pub fn assign_attributes(&mut self, attributes: Map<String, Value>) -> Result<(), ResourceError> {
        let model = self.model.clone();
        let schema = model.schema();

        for (key, value) in attributes {
            if let Some(setter) = schema.setter(&key) {
                setter(self, value)?;
                continue;
            }
            if schema.is_declared(&key) {
                self.attributes.set(key, value);
                continue;
            }
            if let Some(def) = schema.association_for_data_key(&key) {
                let target = model.related(def.target())?;
                if let Some(linked) = parse_embedded(def, &target, &value)? {
                    self.associations.insert(def.name().to_string(), linked);
                    continue;
                }
            }
            self.attributes.set(key, value);
        }
        Ok(())
    }

    /// Mass-assigns attributes given as any serializable value.
    ///
    /// # Errors
    ///
    /// See [`assign_attributes`](Self::assign_attributes).
    pub fn assign<P: Serialize>(&mut self, attributes: P) -> Result<(), ResourceError> {
        self.assign_attributes(to_map(&attributes)?)
    }

    /// Replaces an association with unsaved members built from raw data.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::AssociationUnknown`] if `name` is not a
    /// declared association.
    pub fn assign_nested_attributes(&mut self, name: &str, value: Value) -> Result<(), ResourceError> {
        let def = self
            .model
            .schema()
            .association(name)
            .cloned()
            .ok_or_else(|| ResourceError::AssociationUnknown {
                model: self.model.name().to_string(),
                name: name.to_string(),
            })?;
        let target = self.model.related(def.target())?;
        let linked = build_nested(&def, &target, value)?;
        self.associations.insert(name.to_string(), linked);
        Ok(())
    }

    /// Returns the materialized value of an association, if any.
    #[must_use]
    pub fn cached_association(&self, name: &str) -> Option<&Linked> {
        self.associations.get(name)
    }

    /// Stores the value of an association.
    pub fn set_association(&mut self, name: impl Into<String>, linked: Linked) {
        self.associations.insert(name.into(), linked);
    }

    /// Forgets the materialized value of an association.
    pub fn reset_association(&mut self, name: &str) -> Option<Linked> {
        self.associations.remove(name)
    }

    /// Resolves an association, fetching it if needed.
    ///
    /// Embedded and previously fetched values are returned without a
    /// request. `null`, `{}` and `[]` mean known absent.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::AssociationUnknown`] for undeclared names and
    /// the errors of the underlying request.
    pub async fn association(&mut self, name: &str) -> Result<Linked, ResourceError> {
        associations::resolve(self, name, Map::new()).await
    }

    /// Fetches an association with extra parameters.
    ///
    /// Always issues a request; the result is not memoized.
    ///
    /// # Errors
    ///
    /// As [`association`](Self::association), plus [`ResourceError::Path`]
    /// if the association path cannot be built.
    pub async fn association_with<P: Serialize>(
        &mut self,
        name: &str,
        params: P,
    ) -> Result<Linked, ResourceError> {
        associations::resolve(self, name, to_map(&params)?).await
    }

    /// Resolves a `belongs_to` or `has_one` association.
    ///
    /// # Errors
    ///
    /// See [`association`](Self::association).
    pub async fn one(&mut self, name: &str) -> Result<Option<Self>, ResourceError> {
        Ok(self.association(name).await?.into_one())
    }

    /// Fetches a `belongs_to` or `has_one` association with extra parameters.
    ///
    /// # Errors
    ///
    /// See [`association_with`](Self::association_with).
    pub async fn one_with<P: Serialize>(
        &mut self,
        name: &str,
        params: P,
    ) -> Result<Option<Self>, ResourceError> {
        Ok(self.association_with(name, params).await?.into_one())
    }

    /// Resolves a `has_many` association.
    ///
    /// # Errors
    ///
    /// See [`association`](Self::association).
    pub async fn many(&mut self, name: &str) -> Result<Collection, ResourceError> {
        let linked = self.association(name).await?;
        self.collection_or_empty(name, linked)
    }

    /// Fetches a `has_many` association with extra parameters.
    ///
    /// # Errors
    ///
    /// See [`association_with`](Self::association_with).
    pub async fn many_with<P: Serialize>(
        &mut self,
        name: &str,
        params: P,
    ) -> Result<Collection, ResourceError> {
        let linked = self.association_with(name, params).await?;
        self.collection_or_empty(name, linked)
    }

    fn collection_or_empty(&self, name: &str, linked: Linked) -> Result<Collection, ResourceError> {
        match linked {
            Linked::Many(collection) => Ok(collection),
            Linked::One(_) => {
                let target = self
                    .model
                    .schema()
                    .association(name)
                    .map(|def| def.target().to_string())
                    .unwrap_or_default();
                Ok(Collection::empty(self.model.related(&target)?))
            }
        }
    }

    /// Returns the attributes to send on save, wrapped per the schema.
    ///
    /// With `send_only_modified_attributes` only changed keys are kept.
    /// Materialized associations are added under their data key.
    #[must_use]
    pub fn to_params(&self) -> Map<String, Value> {
        let schema = self.model.schema();
        let mut params = self.attribute_params();

        for def in schema.associations() {
            let value = match self.associations.get(def.name()) {
                Some(Linked::One(Some(member))) => Value::Object(member.attribute_params()),
                Some(Linked::Many(members)) if !members.is_empty() => Value::Array(
                    members
                        .iter()
                        .map(|member| Value::Object(member.attribute_params()))
                        .collect(),
                ),
                _ => continue,
            };
            params.insert(def.data_key().to_string(), value);
        }

        format::wrap(schema, params)
    }

    fn attribute_params(&self) -> Map<String, Value> {
        if self.model.schema().send_only_modified_attributes() {
            self.attributes
                .changes()
                .into_keys()
                .filter_map(|key| {
                    let value = self.attributes.get(&key)?.clone();
                    Some((key, value))
                })
                .collect()
        } else {
            self.attributes.as_map().clone()
        }
    }

    /// Resolves this resource's request path, with `params` over attributes.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if a placeholder has no matching value.
    pub fn request_path(&self, params: &Map<String, Value>) -> Result<String, PathError> {
        let mut path_params = self.attributes.as_map().clone();
        path_params.extend(params.clone());
        self.model.build_request_path(&path_params)
    }

    /// Creates or updates the resource.
    ///
    /// New resources are sent to the collection path with the create method,
    /// persisted ones to the member path with the update method. Hooks run as
    /// `before save`, `before create|update`, request, `after create|update`,
    /// `after save`.
    ///
    /// Returns `false` without a request if a validator fails, and `false`
    /// after the request if the server answered non-2xx or reported errors.
    /// Response data is merged into the bag either way.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] for hook, path, transport and parse failures.
    pub async fn save(&mut self) -> Result<bool, ResourceError> {
        if !self.run_validations() {
            return Ok(false);
        }

        let (action, event) = if self.is_new() {
            (Action::Create, Event::Create)
        } else {
            (Action::Update, Event::Update)
        };

        self.run_hooks(Timing::Before, Event::Save)?;
        self.run_hooks(Timing::Before, event)?;

        let path = self.request_path(&Map::new())?;
        let method = self.model.schema().method_for(action);
        let api = self.model.api().clone();
        let response = api.request(method, &path, self.to_params()).await?;

        self.load(&response.envelope)?;
        if !response.is_ok() || response.envelope.has_errors() {
            return Ok(false);
        }

        self.attributes.changes_applied();
        self.run_hooks(Timing::After, event)?;
        self.run_hooks(Timing::After, Event::Save)?;
        Ok(true)
    }

    /// Deletes the resource.
    ///
    /// Returns `true` and flags the resource destroyed if the server
    /// answered 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] for hook, path, transport and parse failures.
    pub async fn destroy(&mut self) -> Result<bool, ResourceError> {
        self.run_hooks(Timing::Before, Event::Destroy)?;

        let path = self.request_path(&Map::new())?;
        let method = self.model.schema().method_for(Action::Destroy);
        let api = self.model.api().clone();
        let response = api.request(method, &path, Map::new()).await?;

        self.load(&response.envelope)?;
        self.destroyed = response.is_ok();
        if self.destroyed {
            self.run_hooks(Timing::After, Event::Destroy)?;
        }
        Ok(self.destroyed)
    }

    /// Re-fetches the resource and replaces its state.
    ///
    /// New resources are left untouched. Materialized associations are
    /// dropped so they resolve again.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] for path, transport and parse failures.
    pub async fn reload(&mut self) -> Result<(), ResourceError> {
        if self.is_new() {
            return Ok(());
        }

        let path = self.request_path(&Map::new())?;
        let method = self.model.schema().method_for(Action::Find);
        let api = self.model.api().clone();
        let response = api.request(method, &path, Map::new()).await?;

        if response.is_ok() {
            self.associations.clear();
            self.load(&response.envelope)?;
            self.attributes.clear_changes_information();
        }
        Ok(())
    }

    /// Flips a boolean attribute based on its presence.
    pub fn toggle(&mut self, name: &str) {
        let present = self.is_present(name);
        self.set(name, !present);
    }

    /// Adds `by` to a numeric attribute, treating absent or `null` as 0.
    pub fn increment(&mut self, name: &str, by: i64) {
        let next = match self.attributes.get(name) {
            Some(Value::Number(n)) if n.is_f64() => {
                #[allow(clippy::cast_precision_loss)]
                let by = by as f64;
                Value::from(n.as_f64().unwrap_or_default() + by)
            }
            Some(Value::Number(n)) => Value::from(n.as_i64().unwrap_or_default() + by),
            _ => Value::from(by),
        };
        self.set(name, next);
    }

    /// Subtracts `by` from a numeric attribute, treating absent or `null` as 0.
    pub fn decrement(&mut self, name: &str, by: i64) {
        self.increment(name, -by);
    }

    /// Runs the hooks registered for a timing and event, in order.
    ///
    /// # Errors
    ///
    /// Returns the first hook error; later hooks do not run.
    pub fn run_hooks(&mut self, timing: Timing, event: Event) -> Result<(), ResourceError> {
        let model = self.model.clone();
        for hook in model.schema().hooks(timing, event) {
            hook(self)?;
        }
        Ok(())
    }

    /// Merges a response into the resource.
    ///
    /// Non-empty data is assigned; metadata and errors are replaced.
    pub(crate) fn load(&mut self, envelope: &Envelope) -> Result<(), ResourceError> {
        let data = format::parse(self.model.schema(), &envelope.data, &envelope.included);
        if !data.is_empty() {
            self.assign_attributes(data)?;
        }
        self.set_response_info(envelope);
        Ok(())
    }

    pub(crate) fn set_response_info(&mut self, envelope: &Envelope) {
        self.metadata = envelope.metadata.clone();
        self.errors = envelope.errors.clone();
    }

    /// Returns a copy without materialized associations.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            associations: BTreeMap::new(),
            ..self.clone()
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name()
            && self.attributes == other.attributes
            && self.associations == other.associations
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.name().hash(state);
        Value::Object(self.attributes.as_map().clone())
            .to_string()
            .hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .request_path(&Map::new())
            .unwrap_or_else(|_| self.model.schema().paths().collection().to_string());
        write!(f, "#<{}({path})", self.model.name())?;
        for (key, value) in self.attributes.iter() {
            write!(f, " {key}={value}")?;
        }
        for (name, linked) in &self.associations {
            write!(f, " {name}={}", linked.to_value())?;
        }
        write!(f, ">")
    }
}
