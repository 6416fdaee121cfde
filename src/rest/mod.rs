//! The resource layer.
//!
//! This module maps JSON API responses onto mutable resource objects:
//!
//! - **[`Schema`]**: per-type descriptor (paths, root element, attributes,
//!   associations, hooks, scopes), built with [`Schema::builder`]
//! - **[`Model`]**: type-level operations (`find`, `all`, `create`, ...)
//! - **[`Resource`]**: one entity with an [`Attributes`] bag, associations,
//!   dirty tracking and `save`/`destroy`
//! - **[`Relation`]**: a lazy, chainable query fetched at most once
//! - **[`Collection`]**: the resources of one list response plus its
//!   metadata and errors
//! - **Path building**: [`build_path`] and [`resolve_path`]
//! - **Response contract**: [`Envelope`] and the [`ResponseParser`]
//!   implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_model::{Api, ApiConfig, BaseUrl};
//! use rest_model::rest::Schema;
//! use serde_json::json;
//!
//! let config = ApiConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com")?)
//!     .build()?;
//!
//! let api = Api::builder(config)
//!     .model(
//!         Schema::builder("User")
//!             .attributes(["name", "email"])
//!             .belongs_to("organization")
//!             .has_many("comments")
//!             .build()?,
//!     )
//!     .model(Schema::builder("Organization").build()?)
//!     .model(Schema::builder("Comment").build()?)
//!     .build()?;
//!
//! let users = api.model("User")?;
//!
//! // GET /users/1
//! let mut user = users.find(1).await?.expect("user 1 exists");
//!
//! // Embedded data is used as-is; otherwise GET /organizations/:organization_id
//! let organization = user.one("organization").await?;
//!
//! // GET /users/1/comments
//! let comments = user.many("comments").await?;
//!
//! // PUT /users/1
//! user.set("name", "Tobias");
//! if !user.save().await? {
//!     println!("rejected: {}", user.errors());
//! }
//! ```

mod associations;
mod attributes;
mod collection;
mod envelope;
mod errors;
mod format;
pub mod inflect;
mod model;
mod path;
pub mod record;
mod relation;
mod resource;
mod schema;

pub use associations::{AssociationDefinition, AssociationKind, Linked};
pub use attributes::{is_blank, to_map, Attributes, Change};
pub use collection::Collection;
pub use envelope::{Envelope, FirstLevelParser, JsonApiParser, ResponseParser, SecondLevelParser};
pub use errors::ResourceError;
pub use format::Format;
pub use model::{Fetched, Model};
pub use path::{build_path, placeholders, resolve_path, Action, PathError, ResourcePaths};
pub(crate) use path::param_to_string;
pub use record::Record;
pub use relation::{fetch_all, Relation};
pub use resource::Resource;
pub use schema::{Event, FieldErrors, Hook, Schema, SchemaBuilder, Scope, Setter, Timing, Validator};
