use std::time::Duration;

use thiserror::Error;

/// Message used when a failed response carries no JSON body.
pub const REQUEST_FAILED: &str = "Request failed";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session storage error: {0}")]
    Session(String),
}

impl ApiError {
    /// Map a failed (non-2xx) response to an error.
    ///
    /// 401 and 403 carry fixed messages and ignore the body. Everything
    /// else uses the `detail` field of a JSON body when it is a string.
    pub fn from_status(status: reqwest::StatusCode, body: &[u8]) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            code => ApiError::Http {
                status: code,
                message: Self::message_from_body(code, body),
            },
        }
    }

    fn message_from_body(status: u16, body: &[u8]) -> String {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => match json.get("detail").and_then(|d| d.as_str()) {
                Some(detail) => detail.to_string(),
                None => format!("HTTP {}", status),
            },
            Err(_) => REQUEST_FAILED.to_string(),
        }
    }

    /// HTTP status behind the error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }
}
