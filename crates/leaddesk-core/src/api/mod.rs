//! REST API client module for the LeadDesk backend.
//!
//! This module provides the `ApiClient` that every screen goes through,
//! the endpoint families scoped by base path (`dashboard`, `admin`,
//! `sales`, `analytics`, `agents`, `auth`) and a polling helper.
//!
//! The API uses bearer token authentication obtained from the login
//! endpoint and kept in a `SessionStore`.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod polling;

pub use client::{ApiClient, ApiClientBuilder, RequestOptions, REQUEST_TIMEOUT};
pub use endpoints::{
    AdminApi, AgentsApi, AnalyticsApi, ApiFamily, AuthApi, DashboardApi, Endpoint, Page, SalesApi,
};
pub use error::ApiError;
pub use polling::{poll, Poller};
