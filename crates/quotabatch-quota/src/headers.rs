//! A transport-agnostic view of the response headers the coordinator cares about.
//!
//! The coordinator never touches an HTTP library directly; callers translate
//! whatever header map their client returns into a [`ResponseHeaders`] and
//! hand it to [`crate::Coordinator::record_response`]. Lookups are
//! case-insensitive: the server is documented to send lowercase
//! `x-ratelimit-*` but mixed-case `Retry-After`, so names are canonicalized
//! before comparison rather than assumed.

/// Rate-limit-relevant headers extracted from one HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// `Retry-After`, in whole seconds, if present and parseable.
    pub retry_after_secs: Option<u64>,
    /// `x-ratelimit-total`, if present and parseable.
    pub ratelimit_total: Option<u32>,
    /// `x-ratelimit-remaining`, if present and parseable.
    pub ratelimit_remaining: Option<u32>,
}

impl ResponseHeaders {
    /// Builds a [`ResponseHeaders`] from an iterator of raw `(name, value)`
    /// pairs, matching header names case-insensitively and silently
    /// discarding values that fail to parse (per spec: "invalid headers are
    /// ignored, not fatal").
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let canonical = name.to_ascii_lowercase();
            match canonical.as_str() {
                "retry-after" => headers.retry_after_secs = Self::parse_or_warn(&canonical, value),
                "x-ratelimit-total" => headers.ratelimit_total = Self::parse_or_warn(&canonical, value),
                "x-ratelimit-remaining" => headers.ratelimit_remaining = Self::parse_or_warn(&canonical, value),
                _ => {}
            }
        }
        headers
    }

    fn parse_or_warn<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
        match value.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(header = name, value, "ignoring malformed rate-limit header");
                #[cfg(not(feature = "tracing"))]
                let _ = name;
                None
            }
        }
    }

    /// An empty header set, used when a transport error means no response
    /// headers were ever received.
    pub fn empty() -> Self {
        Self::default()
    }
}
