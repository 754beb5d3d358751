//! Authenticated request client for the LeadDesk REST API.
//!
//! Every call reads the session store, attaches the bearer token when one
//! is stored, runs under a fixed time budget and maps failures onto
//! `ApiError`. A 401 clears the session and publishes
//! `AuthEvent::SessionExpired` before the error reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{AuthEvents, MemorySessionStore, SessionStore};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Wall-clock budget for a whole exchange (send plus body read).
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Per-call request options. The body must already be serialized.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn post(body: impl Into<String>) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn put(body: impl Into<String>) -> Self {
        Self::new(Method::PUT).with_body(body)
    }

    /// Serialize `body` to JSON and use it as the request body.
    pub fn json<B: Serialize + ?Sized>(method: Method, body: &B) -> Result<Self, ApiError> {
        let encoded = serde_json::to_string(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        Ok(Self::new(method).with_body(encoded))
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// API client for the LeadDesk backend.
/// Clone is cheap - the connection pool, session store and event channel are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    events: AuthEvents,
    timeout: Duration,
}

pub struct ApiClientBuilder {
    base_url: String,
    store: Option<Arc<dyn SessionStore>>,
    events: Option<AuthEvents>,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn events(mut self, events: AuthEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidRequest(format!(
                "API base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }

        let http = Client::builder().build()?;

        Ok(ApiClient {
            http,
            base_url,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            events: self.events.unwrap_or_default(),
            timeout: self.timeout,
        })
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            store: None,
            events: None,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    /// Perform one request against `base_path` + `path` and decode the JSON body.
    ///
    /// No retries: every failure is returned once.
    pub async fn request<T: DeserializeOwned>(
        &self,
        base_path: &str,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.url(base_path, path);
        let method = options.method.clone();

        // Dropping the exchange future on expiry aborts the in-flight request.
        match tokio::time::timeout(self.timeout, self.exchange(&url, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    method = %method,
                    url = %url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(ApiError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let RequestOptions {
            method,
            headers,
            body,
        } = options;

        let mut builder = self
            .http
            .request(method.clone(), url)
            .headers(self.headers(headers));
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(method = %method, url = url, status = status.as_u16(), "API response");

        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                self.end_session();
                Err(ApiError::Unauthorized)
            }
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            _ => {
                // A body that cannot be read is treated like one that is not JSON.
                let body = response.bytes().await.unwrap_or_default();
                Err(ApiError::from_status(status, &body))
            }
        }
    }

    /// Default headers plus the caller's. Authorization always follows the store.
    fn headers(&self, extra: HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        for (name, value) in extra.iter() {
            if *name != header::AUTHORIZATION {
                headers.insert(name.clone(), value.clone());
            }
        }

        match self.store.token() {
            Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                // Sent unauthenticated; a 401 then tears the broken session down
                Err(_) => {
                    warn!("Stored token is not a valid header value, sending request without token")
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to read session, sending request without token");
            }
        }

        headers
    }

    fn end_session(&self) {
        warn!("Server rejected the session, clearing local session");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.events.session_expired();
    }

    fn url(&self, base_path: &str, path: &str) -> String {
        let base_path = base_path.trim_matches('/');
        let mut url = self.base_url.clone();
        if !base_path.is_empty() {
            url.push('/');
            url.push_str(base_path);
        }
        if !path.is_empty() {
            if !path.starts_with('/') && !path.starts_with('?') {
                url.push('/');
            }
            url.push_str(path);
        }
        url
    }
}
