use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::response::ApiResponse;
use quotabatch_quota::{Coordinator, ResponseHeaders};
use reqwest::blocking::Client as HttpClient;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A blocking HTTP client that paces every request through a shared
/// [`Coordinator`] and retries 429 responses up to a configured budget.
///
/// A 429 is fed to [`Coordinator::record_response`] before the client does
/// anything else, so the global pause it may arm is visible to every other
/// worker immediately. The client then sleeps for the same `Retry-After`
/// (or a 5 second default when the server didn't send one) before retrying.
pub struct Client {
    http: HttpClient,
    coordinator: Arc<Coordinator>,
    base_url: String,
    api_key: String,
    max_retries: u32,
    default_retry_after_secs: u64,
}

impl Client {
    /// Builds a client from `config`, sharing `coordinator` with every other
    /// client admitted against the same quota.
    pub fn new(config: ClientConfig, coordinator: Arc<Coordinator>) -> Result<Self> {
        let http = HttpClient::builder().build()?;
        Ok(Self {
            http,
            coordinator,
            base_url: config.base_url,
            api_key: config.api_key,
            max_retries: config.max_retries,
            default_retry_after_secs: config.default_retry_after_secs,
        })
    }

    /// Issues a `GET` request against `path`, relative to the client's base URL.
    pub fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::GET, path, None)
    }

    /// Issues a `POST` request with a JSON `body` against `path`.
    pub fn post(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.request(Method::POST, path, Some(body))
    }

    /// Issues a `PUT` request with a JSON `body` against `path`.
    pub fn put(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.request(Method::PUT, path, Some(body))
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut attempts = 0u32;

        loop {
            self.coordinator.await_admission();

            let mut request = self
                .http
                .request(method.clone(), &url)
                .basic_auth(&self.api_key, Some("X"));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send() {
                Ok(response) => response,
                Err(err) => {
                    self.coordinator.record_response(&ResponseHeaders::empty());
                    return Err(ClientError::Transport(err));
                }
            };

            let headers = ResponseHeaders::from_pairs(response.headers().iter().filter_map(
                |(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)),
            ));
            let status = response.status();
            self.coordinator.record_response(&headers);

            if status.as_u16() == 429 {
                attempts += 1;
                if attempts > self.max_retries {
                    return Err(ClientError::RateLimitExhausted { attempts });
                }
                let wait_secs = headers.retry_after_secs.unwrap_or(self.default_retry_after_secs);
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts, wait_secs, "received 429, retrying after backoff");
                std::thread::sleep(Duration::from_secs(wait_secs));
                continue;
            }

            if status.as_u16() == 204 {
                return Ok(ApiResponse {
                    status: status.as_u16(),
                    body: Value::Object(serde_json::Map::new()),
                });
            }

            if status.is_client_error() || status.is_server_error() {
                let status_code = status.as_u16();
                let body = response.text().unwrap_or_default();
                return Err(ClientError::Http {
                    status: status_code,
                    body,
                });
            }

            let status_code = status.as_u16();
            return response
                .json::<Value>()
                .map(|body| ApiResponse { status: status_code, body })
                .map_err(ClientError::Transport);
        }
    }
}
