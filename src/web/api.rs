//! Request and response bodies for the HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /start`. Missing or malformed fields read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    /// Host, domain or address to scan.
    pub target: Option<String>,
    /// Comma or whitespace separated list of tools to skip.
    pub skip: Option<String>,
}

impl StartRequest {
    /// Parse a request body leniently.
    ///
    /// A body that is not a JSON object is an empty request. Each field is
    /// read on its own, so a non-string `skip` does not discard `target`.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };
        let text = |name: &str| fields.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            target: text("target"),
            skip: text("skip"),
        }
    }

    /// The trimmed target, or an empty string.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or_default().trim()
    }

    /// The trimmed skip list, or an empty string.
    #[must_use]
    pub fn skip(&self) -> &str {
        self.skip.as_deref().unwrap_or_default().trim()
    }
}

/// Response for `POST /start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// Identifier of the new scan session.
    pub scan_id: String,
}

/// Response for `POST /stop/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    /// Always `"stopping"`; stop requests are best effort.
    pub status: String,
}

impl StopResponse {
    /// The only stop response.
    #[must_use]
    pub fn stopping() -> Self {
        Self {
            status: "stopping".to_string(),
        }
    }
}

/// Error body shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable error message.
    pub error: String,
}

impl ErrorResponse {
    /// Create an error response.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
