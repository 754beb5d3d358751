use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LoginResponse;

/// The authenticated user as remembered by the client.
///
/// Expiry is decided by the server; a stale token surfaces as a 401 on the
/// next request, which tears the session down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub token: String,
    pub business_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a successful login response.
    pub fn from_login(response: &LoginResponse, email: &str) -> Self {
        Self {
            token: response.token.clone(),
            business_name: response.business_name.clone(),
            is_admin: response.is_admin,
            client_id: response.client_id.clone(),
            email: Some(email.to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }

    /// Human readable age for `whoami` style output.
    pub fn age_display(&self) -> String {
        let minutes = self.age().num_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn role(&self) -> &'static str {
        if self.is_admin {
            "admin"
        } else {
            "client"
        }
    }
}
