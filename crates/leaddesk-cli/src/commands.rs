use std::time::Duration;

use anyhow::Result;
use leaddesk_core::api::{poll, ApiFamily};
use leaddesk_core::auth::AuthEvent;
use leaddesk_core::ApiError;
use serde_json::Value;

use crate::shell::Shell;

pub fn logout(shell: &Shell) -> Result<()> {
    shell.client().auth().logout()?;
    println!("Logged out");
    Ok(())
}

pub fn whoami(shell: &Shell) -> Result<()> {
    match shell.client().store().get()? {
        Some(session) => {
            println!("Business:  {}", session.business_name);
            if let Some(email) = &session.email {
                println!("Email:     {}", email);
            }
            println!("Role:      {}", session.role());
            if let Some(client_id) = &session.client_id {
                println!("Client ID: {}", client_id);
            }
            println!("Logged in: {}", session.age_display());
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

pub async fn get(shell: &Shell, family: ApiFamily, path: &str) -> Result<(), ApiError> {
    let value: Value = shell.client().family(family).get(path).await?;
    print_json(&value);
    Ok(())
}

/// Both calls run concurrently and fail independently.
pub async fn overview(shell: &Shell) -> Result<(), ApiError> {
    let dashboard = shell.client().dashboard();
    let admin = shell.client().admin();
    let (overview, health) = futures::join!(dashboard.overview(), admin.health());

    let mut errors = Vec::new();
    for (label, result) in [("Overview", overview), ("Health", health)] {
        println!("== {}", label);
        match result {
            Ok(value) => print_json(&value),
            Err(e) => {
                eprintln!("{} unavailable: {}", label, e);
                errors.push(e);
            }
        }
    }

    settle_parts(errors, 2)
}

/// Outcome of a page assembled from `parts` independent calls: an expired
/// session wins, otherwise it fails only when no part succeeded.
fn settle_parts(errors: Vec<ApiError>, parts: usize) -> Result<(), ApiError> {
    let all_failed = errors.len() >= parts;
    let mut first = None;
    for e in errors {
        if e.is_unauthorized() {
            return Err(e);
        }
        first.get_or_insert(e);
    }

    match first {
        Some(e) if all_failed => Err(e),
        _ => Ok(()),
    }
}

pub async fn watch(shell: &mut Shell, family: ApiFamily, path: &str, interval: u64) -> Result<()> {
    let endpoint = shell.client().family(family);
    let path = path.to_string();
    let mut poller = poll(Duration::from_secs(interval), move || {
        let endpoint = endpoint.clone();
        let path = path.clone();
        async move { endpoint.get::<Value>(&path).await }
    });

    loop {
        tokio::select! {
            result = poller.next() => match result {
                Some(Ok(value)) => print_json(&value),
                Some(Err(e)) => eprintln!("Error: {}", e),
                None => return Ok(()),
            },
            Some(AuthEvent::SessionExpired { redirect_to }) = shell.next_auth_event() => {
                poller.stop();
                return shell.redirect_to_login(redirect_to).await;
            }
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
