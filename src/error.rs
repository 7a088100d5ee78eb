//! Client Errors
//!
//! One error type for everything a store action can fail with. Stores turn
//! these into user-facing strings with [`ClientError::user_message`].

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// 401 from the backend
    #[error("Unauthorized")]
    Unauthorized { detail: Option<String> },

    #[error("API error {status}")]
    Api { status: u16, detail: Option<String> },

    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Realtime channel not connected")]
    NotConnected,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// The server-provided detail when there is one, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Unauthorized { detail: Some(detail) }
            | ClientError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ClientError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Build from a non-success status and its raw body
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        if status == 401 {
            ClientError::Unauthorized { detail }
        } else {
            ClientError::Api { status, detail }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ClientError::Timeout;
        }
        if is_connect(&e) {
            return ClientError::Unavailable;
        }
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn is_connect(e: &reqwest::Error) -> bool {
    e.is_connect()
}

#[cfg(target_arch = "wasm32")]
fn is_connect(_: &reqwest::Error) -> bool {
    false
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Error body shapes the backend produces
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull a human-readable message out of an error body.
///
/// `detail` is either a string or a validation list of `{ msg }` objects.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    match parsed.detail {
        Some(serde_json::Value::String(detail)) => return Some(detail),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    parsed.message.or(parsed.error)
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let body = r#"{"detail": "Incorrect email or password"}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn test_detail_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required"));
    }

    #[test]
    fn test_detail_missing() {
        assert_eq!(extract_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"other": 1}"#), None);
    }

    #[test]
    fn test_user_message_fallback() {
        let err = ClientError::from_status(500, "");
        assert_eq!(err.user_message("Login failed"), "Login failed");

        let err = ClientError::from_status(400, r#"{"detail": "Email already registered"}"#);
        assert_eq!(err.user_message("Registration failed"), "Email already registered");
    }

    #[test]
    fn test_unauthorized_status() {
        let err = ClientError::from_status(401, r#"{"detail": "Could not validate credentials"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message("x"), "Could not validate credentials");
    }
}
