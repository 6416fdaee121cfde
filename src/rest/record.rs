//! Typed views over resources.
//!
//! [`Resource`] is dynamically typed. The [`record!`](crate::record) macro
//! generates a newtype with typed accessors for known fields, while still
//! dereferencing to the underlying resource for everything else:
//!
//! ```rust
//! use rest_model::record;
//!
//! record! {
//!     /// A user of the API.
//!     pub struct User: "User" {
//!         name: String,
//!         age: u32,
//!     }
//! }
//!
//! let schema = User::schema_builder().belongs_to("organization");
//! # let _ = schema;
//! ```
//!
//! For each field `f` of type `T` the newtype gets:
//!
//! - `f(&self) -> Option<T>`: the value, or `None` when absent, `null` or
//!   not convertible to `T`
//! - `set_f(&mut self, T)`: writes through the custom setter for `f` if one
//!   is installed
//! - `f_present(&self) -> bool`: presence test
//!
//! The [`Record`] trait adds typed `find`, `all`, `build` and `create`.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::clients::Api;
use crate::rest::{Model, Resource, ResourceError};

/// A typed newtype over [`Resource`], usually generated by [`record!`](crate::record).
#[allow(async_fn_in_trait)]
pub trait Record: Sized + Deref<Target = Resource> + DerefMut {
    /// The registered model name.
    const MODEL: &'static str;

    /// Wraps a resource.
    fn from_resource(resource: Resource) -> Self;

    /// Unwraps the resource.
    fn into_resource(self) -> Resource;

    /// Returns the model handle on `api`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownModel`] if [`Self::MODEL`] is not
    /// registered.
    fn model(api: &Arc<Api>) -> Result<Model, ResourceError> {
        api.model(Self::MODEL)
    }

    /// Builds an unsaved record locally.
    ///
    /// # Errors
    ///
    /// See [`Model::new_resource`].
    fn build<P: Serialize>(api: &Arc<Api>, attributes: P) -> Result<Self, ResourceError> {
        Self::model(api)?.new_resource(attributes).map(Self::from_resource)
    }

    /// Finds a record by primary key.
    ///
    /// # Errors
    ///
    /// See [`Model::find`].
    async fn find(api: &Arc<Api>, id: impl Into<Value>) -> Result<Option<Self>, ResourceError> {
        Ok(Self::model(api)?.find(id).await?.map(Self::from_resource))
    }

    /// Fetches the whole collection.
    ///
    /// # Errors
    ///
    /// See [`Relation::fetch`](crate::rest::Relation::fetch).
    async fn all(api: &Arc<Api>) -> Result<Vec<Self>, ResourceError> {
        let collection = Self::model(api)?.all().into_collection().await?;
        Ok(collection.into_iter().map(Self::from_resource).collect())
    }

    /// Creates a record.
    ///
    /// # Errors
    ///
    /// See [`Model::create`].
    async fn create<P: Serialize>(api: &Arc<Api>, attributes: P) -> Result<Self, ResourceError> {
        Self::model(api)?
            .create(attributes)
            .await
            .map(Self::from_resource)
    }
}

/// Declares a typed record over a registered model.
///
/// See the [module documentation](crate::rest::record) for the generated
/// accessors.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $model:literal {
            $($field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name($crate::rest::Resource);

        impl $crate::rest::Record for $name {
            const MODEL: &'static str = $model;

            fn from_resource(resource: $crate::rest::Resource) -> Self {
                Self(resource)
            }

            fn into_resource(self) -> $crate::rest::Resource {
                self.0
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::rest::Resource;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        $crate::paste::paste! {
            impl $name {
                /// Starts a schema for the model with the record's fields declared.
                #[must_use]
                pub fn schema_builder() -> $crate::rest::SchemaBuilder {
                    $crate::rest::Schema::builder($model).attributes([$(stringify!($field)),+])
                }

                $(
                    #[doc = "Returns `" $field "`, or `None` if absent, null or of another type."]
                    #[must_use]
                    pub fn $field(&self) -> ::std::option::Option<$ty> {
                        self.0
                            .attributes()
                            .get(stringify!($field))
                            .cloned()
                            .and_then(|value| $crate::serde_json::from_value(value).ok())
                    }

                    #[doc = "Sets `" $field "`, through its custom setter if one is installed."]
                    ///
                    /// # Errors
                    ///
                    /// Returns the setter's error, or a serialization error.
                    pub fn [<set_ $field>](
                        &mut self,
                        value: $ty,
                    ) -> ::std::result::Result<(), $crate::rest::ResourceError> {
                        let value = $crate::serde_json::to_value(value)?;
                        self.0.call(concat!(stringify!($field), "="), Some(value))?;
                        Ok(())
                    }

                    #[doc = "Returns `true` if `" $field "` holds a non-blank value."]
                    #[must_use]
                    pub fn [<$field _present>](&self) -> bool {
                        self.0.is_present(stringify!($field))
                    }
                )+
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, BaseUrl};
    use serde_json::json;

    record! {
        struct User: "User" {
            name: String,
            age: u32,
        }
    }

    fn api() -> Arc<Api> {
        let config = ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        Api::builder(config)
            .model(
                User::schema_builder()
                    .setter("name", |user, value| {
                        let name = value.as_str().unwrap_or_default().trim().to_string();
                        user.set("name", name);
                        Ok(())
                    })
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_builder_declares_fields() {
        let schema = User::schema_builder().build().unwrap();
        assert!(schema.is_declared("name"));
        assert!(schema.is_declared("age"));
    }

    #[test]
    fn test_typed_accessors() {
        let mut user = User::build(&api(), json!({"age": 40})).unwrap();

        assert_eq!(user.age(), Some(40));
        assert_eq!(user.name(), None);
        assert!(!user.name_present());

        user.set_name("  Tobias ".to_string()).unwrap();
        assert_eq!(user.name().as_deref(), Some("Tobias"));
        assert!(user.name_present());
    }

    #[test]
    fn test_mistyped_value_reads_as_none() {
        let user = User::build(&api(), json!({"age": "forty"})).unwrap();
        assert_eq!(user.age(), None);
        assert!(user.age_present());
    }

    #[test]
    fn test_deref_to_resource() {
        let mut user = User::build(&api(), json!({"id": 3})).unwrap();
        assert!(user.is_persisted());

        user.set("nickname", "Tobi");
        assert_eq!(user.into_resource().get("nickname").unwrap(), &json!("Tobi"));
    }
}
