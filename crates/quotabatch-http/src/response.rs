use serde_json::Value;

/// A successful (2xx) response: status plus the parsed JSON body.
///
/// A `204 No Content` response is represented with `body` as an empty JSON
/// object, per the wire contract's `json()` accessor returning an empty
/// mapping for that status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}
