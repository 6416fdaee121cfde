//! Per-type resource descriptors.
//!
//! A [`Schema`] describes everything a resource type knows about itself:
//! its paths, root-element conventions, declared attributes and
//! associations, custom setters, lifecycle hooks, validators, scopes and the
//! HTTP verb used for each action. Schemas are built once with
//! [`Schema::builder`] and registered on an [`Api`](crate::clients::Api).
//!
//! # Inheritance
//!
//! [`Schema::inherit`] starts a builder for a child type from a parent's
//! settings. Registries are shared with the parent until the child changes
//! one, at which point the child gets its own copy; the parent is never
//! affected.
//!
//! ```rust
//! use rest_model::rest::Schema;
//!
//! let user = Schema::builder("User").has_many("comments").build().unwrap();
//! let admin = user.inherit("Admin").has_many("reports").build().unwrap();
//!
//! assert_eq!(user.associations().len(), 1);
//! assert_eq!(admin.associations().len(), 2);
//! assert_eq!(admin.paths().collection(), "/admins");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::clients::HttpMethod;
use crate::error::ConfigError;
use crate::rest::associations::{AssociationDefinition, AssociationKind};
use crate::rest::format::Format;
use crate::rest::inflect::{pluralize, snake_case};
use crate::rest::path::{Action, ResourcePaths};
use crate::rest::{Resource, ResourceError};

/// A lifecycle hook. Hooks run in registration order; an error aborts the operation.
pub type Hook = Arc<dyn Fn(&mut Resource) -> Result<(), ResourceError> + Send + Sync>;

/// A custom attribute setter, invoked by mass assignment instead of a raw write.
pub type Setter = Arc<dyn Fn(&mut Resource, Value) -> Result<(), ResourceError> + Send + Sync>;

/// A client-side validator adding messages to [`FieldErrors`].
pub type Validator = Arc<dyn Fn(&Resource, &mut FieldErrors) + Send + Sync>;

/// A named scope turning arguments into query parameters.
pub type Scope = Arc<dyn Fn(&[Value]) -> Map<String, Value> + Send + Sync>;

/// When a hook runs relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    /// Before the event.
    Before,
    /// After the event completed successfully.
    After,
}

/// Lifecycle events hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A resource was constructed.
    Initialize,
    /// A resource was materialized from a response.
    Find,
    /// A resource is saved (wraps create and update).
    Save,
    /// A new resource is persisted.
    Create,
    /// An existing resource is persisted.
    Update,
    /// A resource is deleted.
    Destroy,
}

/// Client-side validation messages, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Adds a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns the messages for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if no messages were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes all messages.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterates over fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Returns `"field message"` strings for every message.
    #[must_use]
    pub fn full_messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field} {m}")))
            .collect()
    }
}

/// The descriptor of one resource type.
///
/// Cloning is cheap: registries are reference-counted.
#[derive(Clone)]
pub struct Schema {
    name: String,
    primary_key: String,
    paths: ResourcePaths,
    custom_paths: bool,
    format: Format,
    include_root_in_json: bool,
    parse_root_in_json: bool,
    root_element: Option<String>,
    request_new_object_on_build: bool,
    send_only_modified_attributes: bool,
    attributes: Arc<BTreeSet<String>>,
    associations: Arc<Vec<AssociationDefinition>>,
    setters: Arc<HashMap<String, Setter>>,
    hooks: Arc<HashMap<(Timing, Event), Vec<Hook>>>,
    validators: Arc<Vec<Validator>>,
    methods: HashMap<Action, HttpMethod>,
    scopes: Arc<HashMap<String, Scope>>,
    default_scopes: Arc<Vec<Scope>>,
    custom_requests: Arc<BTreeMap<String, HttpMethod>>,
    nested_attributes: Arc<BTreeSet<String>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("paths", &self.paths)
            .field("format", &self.format)
            .field("attributes", &self.attributes)
            .field("associations", &self.associations)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("custom_requests", &self.custom_requests)
            .finish_non_exhaustive()
    }
}

// Verify Schema is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Schema>();
};

impl Schema {
    /// Starts a builder for a type with default conventions.
    ///
    /// The collection path defaults to `/{plural snake name}`, the member path
    /// to `{collection}/:id` and the primary key to `id`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        let name = name.into();
        let paths = ResourcePaths::new(default_collection_path(&name));
        SchemaBuilder {
            schema: Self {
                name,
                primary_key: "id".to_string(),
                paths,
                custom_paths: false,
                format: Format::Plain,
                include_root_in_json: false,
                parse_root_in_json: false,
                root_element: None,
                request_new_object_on_build: false,
                send_only_modified_attributes: false,
                attributes: Arc::default(),
                associations: Arc::default(),
                setters: Arc::default(),
                hooks: Arc::default(),
                validators: Arc::default(),
                methods: HashMap::new(),
                scopes: Arc::default(),
                default_scopes: Arc::default(),
                custom_requests: Arc::default(),
                nested_attributes: Arc::default(),
            },
        }
    }

    /// Starts a builder for a child type that shares this schema's settings.
    ///
    /// Paths and the root element are re-derived from the child's name
    /// unless they were set explicitly on this schema.
    #[must_use]
    pub fn inherit(&self, name: impl Into<String>) -> SchemaBuilder {
        let mut schema = self.clone();
        schema.name = name.into();
        if !schema.custom_paths {
            schema.paths = ResourcePaths::new(default_collection_path(&schema.name));
        }
        SchemaBuilder { schema }
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the primary-key attribute name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Returns the path templates.
    #[must_use]
    pub const fn paths(&self) -> &ResourcePaths {
        &self.paths
    }

    /// Returns the serialization format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Returns `true` if outgoing params are wrapped under the root element.
    #[must_use]
    pub const fn include_root_in_json(&self) -> bool {
        self.include_root_in_json
    }

    /// Returns `true` if incoming data is unwrapped from the root element.
    #[must_use]
    pub const fn parse_root_in_json(&self) -> bool {
        self.parse_root_in_json
    }

    /// Returns the root element, defaulting to the snake-cased type name.
    #[must_use]
    pub fn root_element(&self) -> String {
        self.root_element
            .clone()
            .unwrap_or_else(|| snake_case(&self.name))
    }

    /// Returns the pluralized root element.
    #[must_use]
    pub fn plural_root_element(&self) -> String {
        pluralize(&self.root_element())
    }

    /// Returns `true` if `build` fetches server-side defaults.
    #[must_use]
    pub const fn request_new_object_on_build(&self) -> bool {
        self.request_new_object_on_build
    }

    /// Returns `true` if only changed attributes are sent on save.
    #[must_use]
    pub const fn send_only_modified_attributes(&self) -> bool {
        self.send_only_modified_attributes
    }

    /// Returns the declared attribute names.
    #[must_use]
    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    /// Returns `true` if `name` was declared as an attribute.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Returns the declared associations, in declaration order.
    #[must_use]
    pub fn associations(&self) -> &[AssociationDefinition] {
        &self.associations
    }

    /// Looks up an association by name.
    #[must_use]
    pub fn association(&self, name: &str) -> Option<&AssociationDefinition> {
        self.associations.iter().find(|def| def.name() == name)
    }

    /// Looks up the association whose data arrives under `key`.
    #[must_use]
    pub fn association_for_data_key(&self, key: &str) -> Option<&AssociationDefinition> {
        self.associations.iter().find(|def| def.data_key() == key)
    }

    /// Returns the custom setter for `name`, if any.
    #[must_use]
    pub fn setter(&self, name: &str) -> Option<&Setter> {
        self.setters.get(name)
    }

    /// Returns the hooks registered for a timing and event.
    #[must_use]
    pub fn hooks(&self, timing: Timing, event: Event) -> &[Hook] {
        self.hooks.get(&(timing, event)).map_or(&[], Vec::as_slice)
    }

    /// Returns the validators.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Returns the HTTP method used for an action.
    #[must_use]
    pub fn method_for(&self, action: Action) -> HttpMethod {
        self.methods
            .get(&action)
            .copied()
            .unwrap_or_else(|| action.default_http_method())
    }

    /// Returns a named scope.
    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    /// Returns the scopes applied to every relation.
    #[must_use]
    pub fn default_scopes(&self) -> &[Scope] {
        &self.default_scopes
    }

    /// Returns the method of a named custom request.
    #[must_use]
    pub fn custom_request(&self, name: &str) -> Option<HttpMethod> {
        self.custom_requests.get(name).copied()
    }

    /// Returns the associations accepting nested attributes.
    #[must_use]
    pub fn nested_attributes(&self) -> &BTreeSet<String> {
        &self.nested_attributes
    }
}

fn default_collection_path(name: &str) -> String {
    format!("/{}", pluralize(&snake_case(name)))
}

/// Builder for [`Schema`].
///
/// # Example
///
/// ```rust
/// use rest_model::clients::HttpMethod;
/// use rest_model::rest::{Action, Format, Schema};
///
/// let schema = Schema::builder("User")
///     .collection_path("/organizations/:organization_id/users")
///     .attributes(["name", "email"])
///     .belongs_to("organization")
///     .has_many("comments")
///     .include_root_in_json(true)
///     .method_for(Action::Update, HttpMethod::Patch)
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.paths().resource(), "/organizations/:organization_id/users/:id");
/// assert_eq!(schema.method_for(Action::Update), HttpMethod::Patch);
/// assert_eq!(schema.format(), Format::Plain);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Sets the primary-key attribute name.
    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.schema.primary_key = key.into();
        self
    }

    /// Sets the collection path, resetting the member path to `{collection}/:id`.
    #[must_use]
    pub fn collection_path(mut self, path: impl Into<String>) -> Self {
        self.schema.paths.set_collection(path);
        self.schema.custom_paths = true;
        self
    }

    /// Sets the member path.
    #[must_use]
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.schema.paths.set_resource(path);
        self.schema.custom_paths = true;
        self
    }

    /// Sets the serialization format.
    #[must_use]
    pub const fn format(mut self, format: Format) -> Self {
        self.schema.format = format;
        self
    }

    /// Wraps outgoing params under the root element.
    #[must_use]
    pub const fn include_root_in_json(mut self, enabled: bool) -> Self {
        self.schema.include_root_in_json = enabled;
        self
    }

    /// Unwraps incoming data from the root element.
    #[must_use]
    pub const fn parse_root_in_json(mut self, enabled: bool) -> Self {
        self.schema.parse_root_in_json = enabled;
        self
    }

    /// Overrides the root element key.
    #[must_use]
    pub fn root_element(mut self, key: impl Into<String>) -> Self {
        self.schema.root_element = Some(key.into());
        self
    }

    /// Makes `build` fetch server-side defaults from `{collection}/new`.
    #[must_use]
    pub const fn request_new_object_on_build(mut self, enabled: bool) -> Self {
        self.schema.request_new_object_on_build = enabled;
        self
    }

    /// Sends only changed attributes on save.
    #[must_use]
    pub const fn send_only_modified_attributes(mut self, enabled: bool) -> Self {
        self.schema.send_only_modified_attributes = enabled;
        self
    }

    /// Declares a single attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.schema.attributes).insert(name.into());
        self
    }

    /// Declares several attributes.
    #[must_use]
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.schema.attributes).extend(names.into_iter().map(Into::into));
        self
    }

    /// Installs a custom setter for `name`.
    #[must_use]
    pub fn setter<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut Resource, Value) -> Result<(), ResourceError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.schema.setters).insert(name.into(), Arc::new(setter));
        self
    }

    /// Declares a `belongs_to` association with default settings.
    #[must_use]
    pub fn belongs_to(self, name: impl Into<String>) -> Self {
        self.association(AssociationDefinition::new(AssociationKind::BelongsTo, name))
    }

    /// Declares a `has_one` association with default settings.
    #[must_use]
    pub fn has_one(self, name: impl Into<String>) -> Self {
        self.association(AssociationDefinition::new(AssociationKind::HasOne, name))
    }

    /// Declares a `has_many` association with default settings.
    #[must_use]
    pub fn has_many(self, name: impl Into<String>) -> Self {
        self.association(AssociationDefinition::new(AssociationKind::HasMany, name))
    }

    /// Declares an association, replacing any with the same name.
    #[must_use]
    pub fn association(mut self, definition: AssociationDefinition) -> Self {
        let associations = Arc::make_mut(&mut self.schema.associations);
        associations.retain(|def| def.name() != definition.name());
        associations.push(definition);
        self
    }

    /// Registers a hook that runs before `event`.
    #[must_use]
    pub fn before<F>(self, event: Event, hook: F) -> Self
    where
        F: Fn(&mut Resource) -> Result<(), ResourceError> + Send + Sync + 'static,
    {
        self.hook(Timing::Before, event, Arc::new(hook))
    }

    /// Registers a hook that runs after `event` succeeds.
    #[must_use]
    pub fn after<F>(self, event: Event, hook: F) -> Self
    where
        F: Fn(&mut Resource) -> Result<(), ResourceError> + Send + Sync + 'static,
    {
        self.hook(Timing::After, event, Arc::new(hook))
    }

    fn hook(mut self, timing: Timing, event: Event, hook: Hook) -> Self {
        Arc::make_mut(&mut self.schema.hooks)
            .entry((timing, event))
            .or_default()
            .push(hook);
        self
    }

    /// Registers a client-side validator.
    #[must_use]
    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Resource, &mut FieldErrors) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.schema.validators).push(Arc::new(validator));
        self
    }

    /// Overrides the HTTP method used for an action.
    #[must_use]
    pub fn method_for(mut self, action: Action, method: HttpMethod) -> Self {
        self.schema.methods.insert(action, method);
        self
    }

    /// Registers a named scope.
    #[must_use]
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&[Value]) -> Map<String, Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.schema.scopes).insert(name.into(), Arc::new(scope));
        self
    }

    /// Registers a scope applied to every relation and built resource.
    #[must_use]
    pub fn default_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&[Value]) -> Map<String, Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.schema.default_scopes).push(Arc::new(scope));
        self
    }

    /// Registers a named request to `{request path}/{name}`.
    #[must_use]
    pub fn custom(mut self, method: HttpMethod, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.schema.custom_requests).insert(name.into(), method);
        self
    }

    /// Accepts `<name>_attributes` during mass assignment.
    ///
    /// The association must be declared by the time [`build`](Self::build)
    /// runs.
    #[must_use]
    pub fn accepts_nested_attributes_for(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.schema.nested_attributes).insert(name.into());
        self
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAssociation`] if nested attributes were
    /// accepted for an association that is not declared.
    pub fn build(mut self) -> Result<Schema, ConfigError> {
        let nested: Vec<String> = self.schema.nested_attributes.iter().cloned().collect();
        for name in nested {
            if self.schema.association(&name).is_none() {
                return Err(ConfigError::UnknownAssociation {
                    model: self.schema.name.clone(),
                    association: name,
                });
            }

            let setter_name = format!("{name}_attributes");
            if self.schema.setters.contains_key(&setter_name) {
                continue;
            }
            let setter: Setter = Arc::new(move |resource: &mut Resource, value: Value| {
                resource.assign_nested_attributes(&name, value)
            });
            Arc::make_mut(&mut self.schema.setters).insert(setter_name, setter);
        }

        Ok(self.schema)
    }
}
