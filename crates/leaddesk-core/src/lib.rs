//! Core library for the LeadDesk dashboard client.
//!
//! - `api`: the authenticated request client, endpoint families and polling
//! - `auth`: session data, session stores and auth events
//! - `config`: persisted client configuration
//! - `models`: typed responses for the few endpoints with a fixed shape

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, Endpoint, RequestOptions};
pub use auth::{AuthEvent, AuthEvents, FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use config::Config;
