//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `Session`: the bearer token and account flags written at login
//! - `SessionStore`: where the session lives (`FileSessionStore` on disk,
//!   `MemorySessionStore` for tests and short-lived tools)
//! - `AuthEvents`: notifies the application shell when the server rejects
//!   the session, so it can move the user to the login view

pub mod events;
pub mod session;
pub mod store;

pub use events::{AuthEvent, AuthEvents, LOGIN_ROUTE};
pub use session::Session;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
