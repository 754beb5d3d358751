//! Typed request and response bodies.
//!
//! Most endpoints return shapes owned by the server and are handled as
//! `serde_json::Value`; only the login exchange has a fixed contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(alias = "businessName", alias = "business")]
    pub business_name: String,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
}
