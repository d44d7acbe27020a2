//! Errors from the REST client layer.

/// Fallback shown to operators when the backend gives no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "The request failed. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// The backend's own explanation, taken from a JSON `message` or `error`
    /// field of an error response.
    pub fn backend_message(&self) -> Option<String> {
        let Self::Api { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "error"]
            .iter()
            .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Text suitable for an operator-facing notice.
    pub fn user_message(&self, fallback: &str) -> String {
        self.backend_message()
            .unwrap_or_else(|| fallback.to_string())
    }
}
