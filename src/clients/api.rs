//! The API connection.
//!
//! An [`Api`] ties together everything a resource needs to talk to the
//! server: the [`HttpClient`], an ordered list of request transforms, the
//! response parser that reduces bodies to [`Envelope`]s and the registry of
//! resource schemas.
//!
//! # Pipeline
//!
//! Every call to [`Api::request`] runs through the same steps:
//!
//! 1. `_`-prefixed parameters are dropped; `_headers` becomes extra headers
//! 2. GET parameters are encoded as a nested query string, other verbs send
//!    them as a JSON body
//! 3. each [`RequestTransform`] is applied, in registration order
//! 4. the request is sent
//! 5. the configured [`ResponseParser`] turns the response into an envelope
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_model::{Api, ApiConfig, BaseUrl};
//! use rest_model::rest::{Schema, SecondLevelParser};
//!
//! let config = ApiConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com")?)
//!     .build()?;
//!
//! let api = Api::builder(config)
//!     .parser(SecondLevelParser)
//!     .request_transform(|request| request)
//!     .model(Schema::builder("User").belongs_to("organization").build()?)
//!     .model(Schema::builder("Organization").build()?)
//!     .build()?;
//!
//! let user = api.model("User")?.find(1).await?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::clients::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
use crate::config::ApiConfig;
use crate::error::ConfigError;
use crate::rest::{param_to_string, Envelope, FirstLevelParser, Model, ResourceError, ResponseParser, Schema};

/// A request rewriting step, applied before sending.
pub type RequestTransform = Arc<dyn Fn(HttpRequest) -> HttpRequest + Send + Sync>;

/// The outcome of one exchange: the parsed envelope plus the raw response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// The normalized body.
    pub envelope: Envelope,
    /// The raw response the envelope was parsed from.
    pub response: HttpResponse,
}

impl ApiResponse {
    /// Returns `true` if the status was 2xx.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.response.is_ok()
    }
}

/// A connection to a REST API with its registered resource types.
///
/// Built once with [`Api::builder`] and shared as `Arc<Api>` by every
/// [`Model`] and resource created from it.
///
/// `Api` is `Send + Sync`.
pub struct Api {
    client: HttpClient,
    transforms: Vec<RequestTransform>,
    parser: Arc<dyn ResponseParser>,
    models: HashMap<String, Arc<Schema>>,
    tries: u32,
}

// Verify Api is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Api>();
    assert_send_sync::<ApiResponse>();
};

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<&String> = self.models.keys().collect();
        models.sort();
        f.debug_struct("Api")
            .field("client", &self.client)
            .field("transforms", &self.transforms.len())
            .field("parser", &self.parser)
            .field("models", &models)
            .field("tries", &self.tries)
            .finish()
    }
}

impl Api {
    /// Starts a builder for a connection.
    #[must_use]
    pub fn builder(config: ApiConfig) -> ApiBuilder {
        ApiBuilder {
            config,
            transforms: Vec::new(),
            parser: Arc::new(FirstLevelParser),
            schemas: Vec::new(),
        }
    }

    /// Returns a handle on a registered resource type.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownModel`] if no schema with that name
    /// was registered.
    pub fn model(self: &Arc<Self>, name: &str) -> Result<Model, ResourceError> {
        let schema = self
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownModel {
                name: name.to_string(),
            })?;
        Ok(Model::new(Arc::clone(self), schema))
    }

    /// Returns a registered schema.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.models.get(name).map(AsRef::as_ref)
    }

    /// Returns the names of the registered resource types.
    #[must_use]
    pub fn model_names(&self) -> BTreeSet<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Sends a request and parses the response.
    ///
    /// Non-2xx responses are not errors: they are parsed like any other so
    /// server-reported errors reach the caller as data.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The resolved path, relative to the base URL
    /// * `params` - Query parameters for GET, the JSON body otherwise
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] for transport failures and
    /// [`ResourceError::Parse`] if the body violates the envelope contract.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        mut params: Map<String, Value>,
    ) -> Result<ApiResponse, ResourceError> {
        let headers = match params.remove("_headers") {
            Some(Value::Object(headers)) => headers
                .iter()
                .map(|(key, value)| (key.clone(), param_to_string(value)))
                .collect(),
            _ => HashMap::new(),
        };
        params.retain(|key, _| !key.starts_with('_'));

        let mut builder = HttpRequest::builder(method, path)
            .extra_headers(headers)
            .tries(self.tries);

        builder = match method {
            HttpMethod::Get => builder.query(to_query_pairs(&params)),
            HttpMethod::Delete if params.is_empty() => builder,
            _ => builder.body(Value::Object(params)),
        };

        let mut request = builder.build().map_err(HttpError::from)?;
        for transform in &self.transforms {
            request = transform(request);
        }

        tracing::debug!(method = %request.http_method, path = %request.path, "resource request");

        let response = self.client.request(request).await?;
        let envelope = self.parser.parse(&response)?;

        Ok(ApiResponse { envelope, response })
    }
}

/// Builder for [`Api`].
pub struct ApiBuilder {
    config: ApiConfig,
    transforms: Vec<RequestTransform>,
    parser: Arc<dyn ResponseParser>,
    schemas: Vec<Schema>,
}

impl fmt::Debug for ApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBuilder")
            .field("config", &self.config)
            .field("transforms", &self.transforms.len())
            .field("parser", &self.parser)
            .field("schemas", &self.schemas)
            .finish()
    }
}

impl ApiBuilder {
    /// Appends a request transform. Transforms run in the order added.
    #[must_use]
    pub fn request_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(HttpRequest) -> HttpRequest + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// Sets the response parser. Defaults to [`FirstLevelParser`].
    #[must_use]
    pub fn parser<P: ResponseParser + 'static>(mut self, parser: P) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Registers a resource type.
    #[must_use]
    pub fn model(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Builds the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Config`] if a model name is registered twice
    /// or an association targets a model that was not registered, and
    /// [`ResourceError::Http`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<Arc<Api>, ResourceError> {
        let mut models: HashMap<String, Arc<Schema>> = HashMap::new();
        for schema in self.schemas {
            let name = schema.name().to_string();
            if models.contains_key(&name) {
                return Err(ConfigError::DuplicateModel { model: name }.into());
            }
            models.insert(name, Arc::new(schema));
        }

        for schema in models.values() {
            for def in schema.associations() {
                if !models.contains_key(def.target()) {
                    return Err(ConfigError::UnknownAssociationTarget {
                        model: schema.name().to_string(),
                        association: def.name().to_string(),
                        target: def.target().to_string(),
                    }
                    .into());
                }
            }
        }

        let client = HttpClient::new(&self.config)?;

        Ok(Arc::new(Api {
            client,
            transforms: self.transforms,
            parser: self.parser,
            models,
            tries: self.config.tries(),
        }))
    }
}

/// Encodes parameters as nested-bracket query pairs.
///
/// Objects nest as `a[b]=1`, arrays repeat as `ids[]=1&ids[]=2` and `null`
/// becomes an empty value.
///
/// # Example
///
/// ```rust
/// use rest_model::clients::to_query_pairs;
/// use serde_json::json;
///
/// let params = json!({"filter": {"role": "admin"}, "ids": [1, 2]});
/// let pairs = to_query_pairs(params.as_object().unwrap());
///
/// assert_eq!(
///     pairs,
///     vec![
///         ("filter[role]".to_string(), "admin".to_string()),
///         ("ids[]".to_string(), "1".to_string()),
///         ("ids[]".to_string(), "2".to_string()),
///     ]
/// );
/// ```
#[must_use]
pub fn to_query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_pairs(key.clone(), value, &mut pairs);
    }
    pairs
}

fn push_pairs(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                push_pairs(format!("{prefix}[{key}]"), nested, pairs);
            }
        }
        Value::Array(items) => {
            for item in items {
                push_pairs(format!("{prefix}[]"), item, pairs);
            }
        }
        scalar => pairs.push((prefix, param_to_string(scalar))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaseUrl;
    use serde_json::json;

    fn config() -> ApiConfig {
        ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_query_pairs_flatten_nested_values() {
        let params = json!({"a": {"b": {"c": 1}}, "q": null, "s": "x y"});
        let pairs = to_query_pairs(params.as_object().unwrap());

        assert!(pairs.contains(&("a[b][c]".to_string(), "1".to_string())));
        assert!(pairs.contains(&("q".to_string(), String::new())));
        assert!(pairs.contains(&("s".to_string(), "x y".to_string())));
    }

    #[test]
    fn test_build_rejects_duplicate_models() {
        let result = Api::builder(config())
            .model(Schema::builder("User").build().unwrap())
            .model(Schema::builder("User").build().unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ResourceError::Config(ConfigError::DuplicateModel { .. }))
        ));
    }

    #[test]
    fn test_build_rejects_unregistered_association_target() {
        let result = Api::builder(config())
            .model(Schema::builder("User").belongs_to("organization").build().unwrap())
            .build();

        match result {
            Err(ResourceError::Config(ConfigError::UnknownAssociationTarget { target, .. })) => {
                assert_eq!(target, "Organization");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_model_lookup() {
        let api = Api::builder(config())
            .model(Schema::builder("User").build().unwrap())
            .build()
            .unwrap();

        assert_eq!(api.model("User").unwrap().name(), "User");
        assert!(matches!(
            api.model("Ghost"),
            Err(ResourceError::UnknownModel { .. })
        ));
        assert_eq!(api.model_names().into_iter().collect::<Vec<_>>(), vec!["User"]);
        assert!(api.schema("User").is_some());
    }
}
