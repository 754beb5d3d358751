//! The application shell: owns the login view and reacts to auth events.
//!
//! The API client only reports a rejected session. The shell drains those
//! events after each command and moves the user to the login prompt.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use leaddesk_core::auth::AuthEvent;
use leaddesk_core::{ApiClient, ApiError, AuthEvents, Config, FileSessionStore};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Turns auth events into routing decisions for the shell.
pub struct AuthRouter {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthRouter {
    pub fn new(events: &AuthEvents) -> Self {
        Self {
            rx: events.subscribe(),
        }
    }

    /// Where to send the user after `err`, if anywhere.
    ///
    /// Pending events are drained either way so a stale expiry does not
    /// leak into the next command.
    pub fn route(&mut self, err: &ApiError) -> Option<&'static str> {
        let redirect = self.drain();
        if err.is_unauthorized() {
            redirect
        } else {
            None
        }
    }

    /// Drain pending events, returning the redirect target if the session
    /// expired.
    pub fn drain(&mut self) -> Option<&'static str> {
        let mut redirect = None;
        loop {
            match self.rx.try_recv() {
                Ok(AuthEvent::SessionExpired { redirect_to }) => redirect = Some(redirect_to),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Auth event receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return redirect,
            }
        }
    }

    /// Wait for the next auth event.
    pub async fn next_event(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Auth event receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

pub struct Shell {
    config: Config,
    client: ApiClient,
    router: AuthRouter,
}

impl Shell {
    pub fn new(api_url: Option<&str>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }

        let store = FileSessionStore::new(config.cache_dir()?);
        let events = AuthEvents::new();
        let router = AuthRouter::new(&events);

        let client = ApiClient::builder(config.api_url.as_str())
            .store(Arc::new(store))
            .events(events)
            .build()
            .context("Failed to create API client")?;
        debug!(api_url = %config.api_url, "Shell ready");

        Ok(Self {
            config,
            client,
            router,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The login view: prompt for credentials and store the session.
    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password(format!("Password for {}: ", email))
            .context("Failed to read password")?;

        let result = self.client.auth().login(&email, &password).await;
        // Rejected credentials also clear the session; we are already at the login view
        self.router.drain();

        let login = result.context("Login failed")?;
        println!(
            "Logged in to {} ({})",
            login.business_name,
            if login.is_admin { "admin" } else { "client" }
        );

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    /// Settle a command result, sending the user to the login view if the
    /// session was rejected along the way.
    pub async fn finish(&mut self, result: Result<(), ApiError>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => match self.router.route(&e) {
                Some(redirect_to) => self.redirect_to_login(redirect_to).await,
                None => Err(e.into()),
            },
        }
    }

    pub async fn redirect_to_login(&mut self, redirect_to: &str) -> Result<()> {
        eprintln!("Session expired. Redirecting to {}", redirect_to);
        self.login(None).await?;
        println!("Run the command again to continue.");
        Ok(())
    }

    /// Wait for the next auth event.
    pub async fn next_auth_event(&mut self) -> Option<AuthEvent> {
        self.router.next_event().await
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label.trim_end_matches(": "));
    }
    Ok(value)
}
