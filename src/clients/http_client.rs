//! HTTP client for API communication.
//!
//! This module provides the [`HttpClient`] type, which sends
//! [`HttpRequest`]s with the connection's default headers and retries
//! rate-limited or failed exchanges.

use std::collections::HashMap;

use crate::clients::errors::{HttpError, MaxHttpRetriesExceededError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::config::{ApiConfig, BaseUrl};

/// Fixed retry wait time in seconds.
pub const RETRY_WAIT_TIME: u64 = 1;

/// Library version from Cargo.toml.
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client for making requests to the remote API.
///
/// The client handles:
/// - URL construction from the configured base URL
/// - Default headers including User-Agent, Accept and Authorization
/// - Automatic retry logic for 429 and 500 responses
///
/// Responses with any other status are returned as-is; interpreting them
/// is left to the envelope parser.
///
/// `HttpClient` is `Send + Sync`.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: BaseUrl,
    default_headers: HashMap<String, String>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client from a connection configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(config: &ApiConfig) -> Result<Self, HttpError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}rest-model v{LIB_VERSION}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        if let Some(token) = config.access_token() {
            default_headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", token.as_ref()),
            );
        }

        for (key, value) in config.default_headers() {
            default_headers.insert(key.clone(), value.clone());
        }

        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            base_url: config.base_url().clone(),
            default_headers,
        })
    }

    /// Returns the base URL for this client.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Sends an HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error occurs (`Network`)
    /// - 429/500 persisted through more than one try (`MaxRetries`)
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = self.base_url.join(&request.path);

        let mut headers = self.default_headers.clone();
        if request.body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        for (key, value) in &request.extra_headers {
            headers.insert(key.clone(), value.clone());
        }

        let mut tries: u32 = 0;
        loop {
            tries += 1;

            let mut req_builder = match request.http_method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
                HttpMethod::Put => self.client.put(&url),
                HttpMethod::Patch => self.client.patch(&url),
                HttpMethod::Delete => self.client.delete(&url),
            };

            for (key, value) in &headers {
                req_builder = req_builder.header(key, value);
            }

            if !request.query.is_empty() {
                req_builder = req_builder.query(&request.query);
            }

            if let Some(body) = &request.body {
                req_builder = req_builder.body(body.to_string());
            }

            tracing::debug!(method = %request.http_method, path = %request.path, "sending request");

            let res = req_builder.send().await?;

            let code = res.status().as_u16();
            let res_headers = Self::parse_response_headers(res.headers());
            let body_text = res.text().await?;

            let response = HttpResponse::new(code, res_headers, body_text);

            if let Some(notice) = response.deprecation_notice() {
                tracing::warn!(
                    "Deprecated request to {} {}, server notice: {}",
                    request.http_method,
                    request.path,
                    notice
                );
            }

            let should_retry = code == 429 || code == 500;
            if !should_retry || request.tries <= 1 {
                return Ok(response);
            }

            if tries >= request.tries {
                tracing::warn!(
                    "Giving up on {} {} after {} tries (last status {})",
                    request.http_method,
                    request.path,
                    tries,
                    code
                );
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code,
                    tries: request.tries,
                    message: response.body.clone(),
                    error_reference: response.request_id().map(String::from),
                }));
            }

            let delay = Self::calculate_retry_delay(&response, code);
            tokio::time::sleep(delay).await;
        }
    }

    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    fn calculate_retry_delay(response: &HttpResponse, status: u16) -> std::time::Duration {
        // For 429: use Retry-After if present, otherwise fixed delay
        if status == 429 {
            // Negative or non-finite values fall through to the fixed delay.
            if let Some(delay) = response
                .retry_request_after
                .and_then(|retry_after| std::time::Duration::try_from_secs_f64(retry_after).ok())
            {
                return delay;
            }
        }
        std::time::Duration::from_secs(RETRY_WAIT_TIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessToken;

    fn config() -> ApiConfig {
        ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .access_token(AccessToken::new("test-access-token").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_construction_from_config() {
        let client = HttpClient::new(&config()).unwrap();
        assert_eq!(client.base_url().as_ref(), "https://api.example.com");
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = HttpClient::new(&config()).unwrap();
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.contains("rest-model v"));
    }

    #[test]
    fn test_authorization_header_injection() {
        let client = HttpClient::new(&config()).unwrap();
        assert_eq!(
            client.default_headers().get("Authorization"),
            Some(&"Bearer test-access-token".to_string())
        );
    }

    #[test]
    fn test_no_authorization_header_without_token() {
        let config = ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();
        assert!(client.default_headers().get("Authorization").is_none());
    }

    #[test]
    fn test_user_agent_with_prefix_and_custom_headers() {
        let config = ApiConfig::builder()
            .base_url(BaseUrl::new("https://api.example.com").unwrap())
            .user_agent_prefix("MyApp/1.0")
            .default_header("X-Tenant", "acme")
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();

        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("MyApp/1.0 | "));
        assert_eq!(
            client.default_headers().get("X-Tenant"),
            Some(&"acme".to_string())
        );
    }

    #[test]
    fn test_retry_delay_prefers_retry_after_for_429() {
        let mut headers = HashMap::new();
        headers.insert("retry-after".to_string(), vec!["0.5".to_string()]);
        let response = HttpResponse::new(429, headers, "");

        assert_eq!(
            HttpClient::calculate_retry_delay(&response, 429),
            std::time::Duration::from_millis(500)
        );
        assert_eq!(
            HttpClient::calculate_retry_delay(&response, 500),
            std::time::Duration::from_secs(RETRY_WAIT_TIME)
        );
    }

    #[test]
    fn test_retry_delay_ignores_unusable_retry_after() {
        for value in ["-1", "inf", "NaN"] {
            let mut headers = HashMap::new();
            headers.insert("retry-after".to_string(), vec![value.to_string()]);
            let response = HttpResponse::new(429, headers, "");

            assert_eq!(
                HttpClient::calculate_retry_delay(&response, 429),
                std::time::Duration::from_secs(RETRY_WAIT_TIME),
                "{value}"
            );
        }
    }
}
