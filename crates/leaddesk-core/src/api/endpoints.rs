//! Endpoint families of the LeadDesk API, each scoped by a base path.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::Session;
use crate::models::{LoginRequest, LoginResponse};

use super::{ApiClient, ApiError, RequestOptions};

/// Prefix shared by every versioned endpoint.
pub const API_PREFIX: &str = "/api/v1";

const DEFAULT_PAGE_SIZE: u32 = 25;

/// Characters left as-is inside one path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode a caller-supplied id as a single path segment.
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Functional areas of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFamily {
    Auth,
    Dashboard,
    Admin,
    Sales,
    Analytics,
    Agents,
}

impl ApiFamily {
    pub const ALL: [ApiFamily; 6] = [
        ApiFamily::Auth,
        ApiFamily::Dashboard,
        ApiFamily::Admin,
        ApiFamily::Sales,
        ApiFamily::Analytics,
        ApiFamily::Agents,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ApiFamily::Auth => "auth",
            ApiFamily::Dashboard => "dashboard",
            ApiFamily::Admin => "admin",
            ApiFamily::Sales => "sales",
            ApiFamily::Analytics => "analytics",
            ApiFamily::Agents => "agents",
        }
    }

    pub fn base_path(self) -> String {
        format!("{}/{}", API_PREFIX, self.name())
    }
}

impl fmt::Display for ApiFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ApiFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ApiFamily::ALL
            .into_iter()
            .find(|family| family.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ApiFamily::ALL.iter().map(|f| f.name()).collect();
                format!("unknown API family {:?} (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Pagination cursor rendered as a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn query(&self) -> String {
        format!("?page={}&per_page={}", self.page, self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1)
    }
}

/// A client bound to one base path.
#[derive(Clone)]
pub struct Endpoint {
    client: ApiClient,
    base_path: String,
}

impl Endpoint {
    pub fn new(client: ApiClient, base_path: impl Into<String>) -> Self {
        Self {
            client,
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.client.request(&self.base_path, path, options).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::get()).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(path, RequestOptions::json(Method::POST, body)?)
            .await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(path, RequestOptions::json(Method::PUT, body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::delete()).await
    }
}

impl ApiClient {
    /// Bind the client to an arbitrary base path.
    pub fn endpoint(&self, base_path: impl Into<String>) -> Endpoint {
        Endpoint::new(self.clone(), base_path)
    }

    pub fn family(&self, family: ApiFamily) -> Endpoint {
        self.endpoint(family.base_path())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi(self.family(ApiFamily::Auth))
    }

    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi(self.family(ApiFamily::Dashboard))
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi(self.family(ApiFamily::Admin))
    }

    pub fn sales(&self) -> SalesApi {
        SalesApi(self.family(ApiFamily::Sales))
    }

    pub fn analytics(&self) -> AnalyticsApi {
        AnalyticsApi(self.family(ApiFamily::Analytics))
    }

    pub fn agents(&self) -> AgentsApi {
        AgentsApi(self.family(ApiFamily::Agents))
    }
}

// ===== Auth =====

pub struct AuthApi(Endpoint);

impl AuthApi {
    /// Log in and persist the resulting session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response: LoginResponse = self
            .0
            .post_json("/login", &LoginRequest { email, password })
            .await?;

        let session = Session::from_login(&response, email);
        self.0
            .client()
            .store()
            .set(&session)
            .map_err(|e| ApiError::Session(format!("{:#}", e)))?;

        info!(business = %response.business_name, admin = response.is_admin, "Logged in");
        Ok(response)
    }

    /// Forget the local session. The server keeps no logout state.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.0
            .client()
            .store()
            .clear()
            .map_err(|e| ApiError::Session(format!("{:#}", e)))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

// ===== Client dashboard =====

pub struct DashboardApi(Endpoint);

impl DashboardApi {
    pub async fn overview(&self) -> Result<Value, ApiError> {
        self.0.get("/overview").await
    }

    pub async fn leads(&self, page: Page) -> Result<Value, ApiError> {
        self.0.get(&format!("/leads{}", page.query())).await
    }

    pub async fn lead(&self, id: &str) -> Result<Value, ApiError> {
        self.0.get(&format!("/leads/{}", segment(id))).await
    }

    pub async fn bookings(&self, page: Page) -> Result<Value, ApiError> {
        self.0.get(&format!("/bookings{}", page.query())).await
    }

    pub async fn billing(&self) -> Result<Value, ApiError> {
        self.0.get("/billing").await
    }

    pub async fn campaigns(&self) -> Result<Value, ApiError> {
        self.0.get("/campaigns").await
    }

    pub async fn settings(&self) -> Result<Value, ApiError> {
        self.0.get("/settings").await
    }

    pub async fn update_settings(&self, settings: &Value) -> Result<Value, ApiError> {
        self.0.put_json("/settings", settings).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

// ===== Admin =====

pub struct AdminApi(Endpoint);

impl AdminApi {
    pub async fn overview(&self) -> Result<Value, ApiError> {
        self.0.get("/overview").await
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        self.0.get("/health").await
    }

    pub async fn clients(&self, page: Page) -> Result<Value, ApiError> {
        self.0.get(&format!("/clients{}", page.query())).await
    }

    pub async fn client(&self, id: &str) -> Result<Value, ApiError> {
        self.0.get(&format!("/clients/{}", segment(id))).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

// ===== Agent fleet =====

pub struct AgentsApi(Endpoint);

impl AgentsApi {
    pub async fn fleet(&self) -> Result<Value, ApiError> {
        self.0.get("").await
    }

    pub async fn agent(&self, name: &str) -> Result<Value, ApiError> {
        self.0.get(&format!("/{}", segment(name))).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

// ===== Sales outreach =====

pub struct SalesApi(Endpoint);

impl SalesApi {
    pub async fn prospects(&self, page: Page) -> Result<Value, ApiError> {
        self.0.get(&format!("/prospects{}", page.query())).await
    }

    pub async fn create_prospect(&self, prospect: &Value) -> Result<Value, ApiError> {
        self.0.post_json("/prospects", prospect).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

// ===== Analytics =====

pub struct AnalyticsApi(Endpoint);

impl AnalyticsApi {
    pub async fn summary(&self, days: u32) -> Result<Value, ApiError> {
        self.0.get(&format!("/summary?days={}", days)).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}
