use serde_json::Value;

/// The HTTP call a [`crate::JobStrategy`] wants made for one row, already
/// wrapped in the API's entity envelope (e.g. `{"ticket": {...}}`) where the
/// wire contract requires one.
///
/// Kept as a small enum rather than handing the processor a raw method
/// string: the processor dispatches on it directly against
/// [`quotabatch_http::Client`]'s three verb-specific methods, so a
/// strategy can never typo a method the client doesn't support.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    Get { path: String },
    Post { path: String, body: Value },
    Put { path: String, body: Value },
}

impl ApiRequest {
    /// The request path, for logging.
    pub fn path(&self) -> &str {
        match self {
            ApiRequest::Get { path } | ApiRequest::Post { path, .. } | ApiRequest::Put { path, .. } => path,
        }
    }
}
