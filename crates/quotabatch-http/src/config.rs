/// Configuration for a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) max_retries: u32,
    pub(crate) default_retry_after_secs: u64,
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    base_url: String,
    api_key: String,
    max_retries: u32,
    default_retry_after_secs: u64,
}

impl ClientConfigBuilder {
    /// Creates a new builder for the given base URL and API key.
    ///
    /// `max_retries` defaults to 5, matching the documented 429 retry budget.
    pub fn new<S: Into<String>, K: Into<String>>(base_url: S, api_key: K) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_retries: 5,
            default_retry_after_secs: 5,
        }
    }

    /// Sets the number of 429 retries attempted before giving up.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the wait applied on a 429 whose `Retry-After` header is absent
    /// or unparseable (SPEC_FULL §4.6; the Python original falls back to
    /// exponential backoff in that case, this workspace keeps the simpler
    /// spec.md-documented fixed fallback but makes it configurable).
    pub fn default_retry_after_secs(mut self, seconds: u64) -> Self {
        self.default_retry_after_secs = seconds;
        self
    }

    /// Builds the client configuration.
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url,
            api_key: self.api_key,
            max_retries: self.max_retries,
            default_retry_after_secs: self.default_retry_after_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_five_retries_and_a_five_second_fallback() {
        let config = ClientConfigBuilder::new("https://example.freshservice.com/api/v2", "key").build();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.default_retry_after_secs, 5);
    }

    #[test]
    fn builder_overrides_max_retries_and_fallback() {
        let config = ClientConfigBuilder::new("https://example.freshservice.com/api/v2", "key")
            .max_retries(2)
            .default_retry_after_secs(10)
            .build();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.default_retry_after_secs, 10);
    }
}
