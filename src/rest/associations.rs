//! Association definitions and resolution.
//!
//! An association links one resource type to another. Its value is taken
//! from embedded response data when the server sent it, and fetched lazily
//! otherwise:
//!
//! | kind         | default path            | fetched from                       |
//! |--------------|-------------------------|------------------------------------|
//! | `belongs_to` | `/{plural name}/:id`    | the path, `:id` = `{name}_id`      |
//! | `has_one`    | `/{name}`               | parent's request path + the path   |
//! | `has_many`   | `/{name}`               | parent's request path + the path   |
//!
//! Resolution without parameters is memoized per resource. An association
//! that arrived as `null`, `{}` or `[]` is known to be absent and resolves
//! without a request. Resolution with parameters always issues a request and
//! never touches the memo.

use serde_json::{Map, Value};

use crate::clients::HttpMethod;
use crate::rest::attributes::is_blank;
use crate::rest::format;
use crate::rest::inflect::{camel_case, pluralize, singularize, snake_case};
use crate::rest::path::{build_path, PathError};
use crate::rest::{Collection, Model, Resource, ResourceError};

/// The kind of link an association describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// The owner holds a foreign key to the target.
    BelongsTo,
    /// The target is nested under the owner; at most one.
    HasOne,
    /// The targets are nested under the owner.
    HasMany,
}

/// A declared association.
///
/// # Example
///
/// ```rust
/// use rest_model::rest::{AssociationDefinition, AssociationKind};
///
/// let def = AssociationDefinition::new(AssociationKind::BelongsTo, "organization");
/// assert_eq!(def.target(), "Organization");
/// assert_eq!(def.foreign_key(), "organization_id");
/// assert_eq!(def.path_template(), "/organizations/:id");
///
/// let def = AssociationDefinition::new(AssociationKind::HasMany, "comments")
///     .with_class_name("Note")
///     .with_inverse_of("author");
/// assert_eq!(def.target(), "Note");
/// assert_eq!(def.path_template(), "/comments");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDefinition {
    name: String,
    kind: AssociationKind,
    target: String,
    data_key: String,
    path: String,
    foreign_key: String,
    inverse_of: Option<String>,
}

impl AssociationDefinition {
    /// Creates a definition with conventional defaults.
    #[must_use]
    pub fn new(kind: AssociationKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let (target, path) = match kind {
            AssociationKind::BelongsTo => {
                (camel_case(&name), format!("/{}/:id", pluralize(&name)))
            }
            AssociationKind::HasOne => (camel_case(&name), format!("/{name}")),
            AssociationKind::HasMany => (camel_case(&singularize(&name)), format!("/{name}")),
        };
        Self {
            foreign_key: format!("{name}_id"),
            data_key: name.clone(),
            name,
            kind,
            target,
            path,
            inverse_of: None,
        }
    }

    /// Sets the target model name.
    #[must_use]
    pub fn with_class_name(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the key the association's data arrives under.
    #[must_use]
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = key.into();
        self
    }

    /// Sets the path template used to fetch the association.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the foreign-key attribute of a `belongs_to` association.
    #[must_use]
    pub fn with_foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = key.into();
        self
    }

    /// Sets the back-reference name set on fetched `has_many` members.
    #[must_use]
    pub fn with_inverse_of(mut self, name: impl Into<String>) -> Self {
        self.inverse_of = Some(name.into());
        self
    }

    /// Returns the association name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the association kind.
    #[must_use]
    pub const fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// Returns the target model name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the key the association's data arrives under.
    #[must_use]
    pub fn data_key(&self) -> &str {
        &self.data_key
    }

    /// Returns the path template.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.path
    }

    /// Returns the foreign-key attribute name.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// Returns the configured back-reference name, if any.
    #[must_use]
    pub fn inverse_of(&self) -> Option<&str> {
        self.inverse_of.as_deref()
    }
}

/// A materialized association value.
#[derive(Debug, Clone, PartialEq)]
pub enum Linked {
    /// A `belongs_to` or `has_one` value; `None` when known absent.
    One(Option<Box<Resource>>),
    /// A `has_many` value.
    Many(Collection),
}

impl Linked {
    /// Returns the known-absent value for a kind.
    #[must_use]
    pub fn empty(kind: AssociationKind, target: &Model) -> Self {
        match kind {
            AssociationKind::HasMany => Self::Many(Collection::empty(target.clone())),
            AssociationKind::BelongsTo | AssociationKind::HasOne => Self::One(None),
        }
    }

    /// Returns `true` if nothing is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(one) => one.is_none(),
            Self::Many(many) => many.is_empty(),
        }
    }

    /// Returns the linked resource of a singular association.
    #[must_use]
    pub fn as_one(&self) -> Option<&Resource> {
        match self {
            Self::One(one) => one.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// Returns the linked collection of a `has_many` association.
    #[must_use]
    pub const fn as_many(&self) -> Option<&Collection> {
        match self {
            Self::Many(many) => Some(many),
            Self::One(_) => None,
        }
    }

    /// Converts into the linked resource of a singular association.
    #[must_use]
    pub fn into_one(self) -> Option<Resource> {
        match self {
            Self::One(one) => one.map(|resource| *resource),
            Self::Many(_) => None,
        }
    }

    /// Converts into the linked collection, or an empty one for singular values.
    #[must_use]
    pub fn into_many(self, target: &Model) -> Collection {
        match self {
            Self::Many(many) => many,
            Self::One(_) => Collection::empty(target.clone()),
        }
    }

    /// Returns the attribute view used by dynamic reads.
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Self::One(None) => Value::Null,
            Self::One(Some(resource)) => Value::Object(resource.attributes().as_map().clone()),
            Self::Many(many) => Value::Array(
                many.iter()
                    .map(|resource| Value::Object(resource.attributes().as_map().clone()))
                    .collect(),
            ),
        }
    }
}

/// Turns embedded data into a linked value.
///
/// Returns `None` when the value does not look like association data, in
/// which case it is stored as a plain attribute.
pub(crate) fn parse_embedded(
    def: &AssociationDefinition,
    target: &Model,
    value: &Value,
) -> Result<Option<Linked>, ResourceError> {
    let absent = match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if absent {
        return Ok(Some(Linked::empty(def.kind(), target)));
    }

    let schema = target.schema();
    let linked = match (def.kind(), value) {
        (AssociationKind::HasMany, Value::Array(_) | Value::Object(_)) => {
            let items = format::extract_array(schema, value)
                .iter()
                .map(|item| target.instantiate(format::parse(schema, item, &[])))
                .collect::<Result<Vec<_>, _>>()?;
            Linked::Many(Collection::new(target.clone(), items, Map::new(), Value::Array(Vec::new())))
        }
        (AssociationKind::BelongsTo | AssociationKind::HasOne, Value::Object(_)) => {
            let resource = target.instantiate(format::parse(schema, value, &[]))?;
            Linked::One(Some(Box::new(resource)))
        }
        _ => return Ok(None),
    };

    Ok(Some(linked))
}

/// Builds unsaved association members from nested-attribute input.
///
/// A `has_many` accepts an array or an index-keyed object of attribute
/// objects; a singular association accepts one attribute object.
pub(crate) fn build_nested(
    def: &AssociationDefinition,
    target: &Model,
    value: Value,
) -> Result<Linked, ResourceError> {
    match (def.kind(), value) {
        (AssociationKind::HasMany, Value::Array(items)) => build_members(target, items),
        (AssociationKind::HasMany, Value::Object(indexed)) => {
            build_members(target, indexed.into_iter().map(|(_, item)| item).collect())
        }
        (_, Value::Object(attributes)) => {
            let resource = target.new_resource_map(attributes)?;
            Ok(Linked::One(Some(Box::new(resource))))
        }
        (kind, _) => Ok(Linked::empty(kind, target)),
    }
}

fn build_members(target: &Model, items: Vec<Value>) -> Result<Linked, ResourceError> {
    let members = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(attributes) => Some(target.new_resource_map(attributes)),
            _ => None,
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Linked::Many(Collection::new(
        target.clone(),
        members,
        Map::new(),
        Value::Array(Vec::new()),
    )))
}

/// Resolves an association of `parent`, fetching it when needed.
pub(crate) async fn resolve(
    parent: &mut Resource,
    name: &str,
    params: Map<String, Value>,
) -> Result<Linked, ResourceError> {
    let def = parent
        .model()
        .schema()
        .association(name)
        .cloned()
        .ok_or_else(|| ResourceError::AssociationUnknown {
            model: parent.model().name().to_string(),
            name: name.to_string(),
        })?;
    let target = parent.model().related(def.target())?;

    if params.is_empty() {
        if let Some(linked) = parent.cached_association(name) {
            return Ok(linked.clone());
        }
    }

    let path = match association_path(parent, &def, &target, &params) {
        Ok(Some(path)) => path,
        Ok(None) => {
            tracing::debug!(
                model = %parent.model().name(),
                association = %name,
                "association has nothing to fetch"
            );
            return Ok(Linked::empty(def.kind(), &target));
        }
        Err(error) if params.is_empty() => {
            tracing::debug!(
                model = %parent.model().name(),
                association = %name,
                %error,
                "association path unresolved, treating as empty"
            );
            return Ok(Linked::empty(def.kind(), &target));
        }
        Err(error) => return Err(error.into()),
    };

    let response = target
        .api()
        .request(HttpMethod::Get, &path, params.clone())
        .await?;

    let linked = match def.kind() {
        AssociationKind::HasMany => {
            let mut collection = target.collection_from_response(&response)?;
            let inverse = def
                .inverse_of()
                .map_or_else(|| snake_case(parent.model().name()), str::to_string);
            let back_reference = parent.snapshot();
            for child in collection.items_mut() {
                child.set_association(
                    inverse.clone(),
                    Linked::One(Some(Box::new(back_reference.clone()))),
                );
            }
            Linked::Many(collection)
        }
        AssociationKind::BelongsTo | AssociationKind::HasOne => {
            if response.response.is_ok() && !response.envelope.is_data_empty() {
                let resource = target.from_envelope(&response.envelope)?;
                Linked::One(Some(Box::new(resource)))
            } else {
                Linked::One(None)
            }
        }
    };

    if params.is_empty() {
        parent.set_association(name, linked.clone());
    }
    Ok(linked)
}

/// Builds the fetch path, or `None` when there is nothing to fetch.
fn association_path(
    parent: &Resource,
    def: &AssociationDefinition,
    target: &Model,
    params: &Map<String, Value>,
) -> Result<Option<String>, PathError> {
    match def.kind() {
        AssociationKind::BelongsTo => {
            let Some(foreign_key) = parent
                .attributes()
                .get(def.foreign_key())
                .filter(|value| !is_blank(value))
                .cloned()
            else {
                return Ok(None);
            };

            let mut path_params = parent.attributes().as_map().clone();
            path_params.extend(params.clone());
            path_params.insert("id".to_string(), foreign_key.clone());
            path_params.insert(target.schema().primary_key().to_string(), foreign_key);

            build_path(def.path_template(), &path_params).map(Some)
        }
        AssociationKind::HasOne | AssociationKind::HasMany => {
            if parent.is_new() {
                return Ok(None);
            }

            let mut path_params = params.clone();
            path_params.extend(parent.attributes().as_map().clone());

            let base = parent.request_path(params)?;
            build_path(&format!("{base}{}", def.path_template()), &path_params).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belongs_to_defaults() {
        let def = AssociationDefinition::new(AssociationKind::BelongsTo, "organization");
        assert_eq!(def.name(), "organization");
        assert_eq!(def.target(), "Organization");
        assert_eq!(def.data_key(), "organization");
        assert_eq!(def.foreign_key(), "organization_id");
        assert_eq!(def.path_template(), "/organizations/:id");
        assert_eq!(def.inverse_of(), None);
    }

    #[test]
    fn test_has_one_defaults() {
        let def = AssociationDefinition::new(AssociationKind::HasOne, "role");
        assert_eq!(def.target(), "Role");
        assert_eq!(def.path_template(), "/role");
    }

    #[test]
    fn test_has_many_defaults_singularize_target() {
        let def = AssociationDefinition::new(AssociationKind::HasMany, "blog_posts");
        assert_eq!(def.target(), "BlogPost");
        assert_eq!(def.path_template(), "/blog_posts");
    }

    #[test]
    fn test_overrides() {
        let def = AssociationDefinition::new(AssociationKind::BelongsTo, "owner")
            .with_class_name("User")
            .with_data_key("owner_data")
            .with_foreign_key("user_id")
            .with_path("/users/:id");
        assert_eq!(def.target(), "User");
        assert_eq!(def.data_key(), "owner_data");
        assert_eq!(def.foreign_key(), "user_id");
        assert_eq!(def.path_template(), "/users/:id");
    }
}
