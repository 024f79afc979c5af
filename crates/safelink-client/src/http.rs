//! HTTP client for the SafeLink alert API.

use std::time::Duration;

use reqwest::RequestBuilder;
use safelink_core::{
    Alert, AlertDetail, AlertId, AlertPatch, AlertStatus, DebugCheckRequest, Feedback, FeedbackAck,
    NewUser, Severity, User,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::session::Session;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the API lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    /// Explicit WebSocket base; derived from `api_base` when unset.
    pub ws_base: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            ws_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_ws_base(mut self, ws_base: impl Into<String>) -> Self {
        self.ws_base = Some(ws_base.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ws_base(&self) -> String {
        self.ws_base
            .clone()
            .unwrap_or_else(|| derive_ws_base(&self.api_base))
    }

    /// URL of the live alert push endpoint.
    pub fn alerts_ws_url(&self) -> String {
        format!("{}/ws/alerts", self.ws_base())
    }
}

/// `https://host` → `wss://host`, `http://host` → `ws://host`.
pub fn derive_ws_base(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https:") {
        format!("wss:{rest}")
    } else if let Some(rest) = base.strip_prefix("http:") {
        format!("ws:{rest}")
    } else {
        base.to_string()
    }
}

/// Extra filters accepted by `GET /alerts`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Typed client for the alert API.
///
/// Every request except [`login`](Self::login) carries the bearer token of
/// the attached [`Session`]. Nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a session. The client itself is unchanged;
    /// attach the result with [`with_session`](Self::with_session).
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = format!("{}/auth/login", self.base_url);
        info!(url = %url, email, "logging in");
        let req = self.client.post(&url).json(&LoginRequest { email, password });
        let resp: LoginResponse = self.send(req).await?;
        Ok(Session::new(resp.access_token))
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let url = format!("{}/auth/me", self.base_url);
        self.send(self.authed(self.client.get(&url))).await
    }

    /// List alerts, optionally restricted to one status.
    pub async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<Alert>, ApiError> {
        self.search_alerts(&AlertQuery {
            status,
            ..AlertQuery::default()
        })
        .await
    }

    pub async fn search_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, ApiError> {
        let url = format!("{}/alerts", self.base_url);
        debug!(url = %url, ?query, "listing alerts");
        let alerts: Vec<Alert> = self
            .send(self.authed(self.client.get(&url).query(query)))
            .await?;
        info!(count = alerts.len(), status = ?query.status, "listed alerts");
        Ok(alerts)
    }

    pub async fn get_alert(&self, id: AlertId) -> Result<AlertDetail, ApiError> {
        let url = format!("{}/alerts/{id}", self.base_url);
        self.send(self.authed(self.client.get(&url))).await
    }

    /// Patch status and/or assignee. The API answers with the alert summary.
    pub async fn update_alert(&self, id: AlertId, patch: &AlertPatch) -> Result<Alert, ApiError> {
        let url = format!("{}/alerts/{id}", self.base_url);
        info!(
            url = %url,
            status = ?patch.status,
            assigned_to = ?patch.assigned_to,
            "updating alert"
        );
        self.send(self.authed(self.client.patch(&url).json(patch))).await
    }

    pub async fn submit_feedback(
        &self,
        id: AlertId,
        feedback: &Feedback,
    ) -> Result<FeedbackAck, ApiError> {
        let url = format!("{}/alerts/{id}/feedback", self.base_url);
        info!(url = %url, decision = ?feedback.decision, "submitting feedback");
        self.send(self.authed(self.client.post(&url).json(feedback))).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let url = format!("{}/users", self.base_url);
        self.send(self.authed(self.client.get(&url))).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let url = format!("{}/users", self.base_url);
        info!(url = %url, email = %user.email, role = %user.role, "creating user");
        self.send(self.authed(self.client.post(&url).json(user))).await
    }

    /// Re-run the classifier on ad-hoc input. The result is passed through
    /// untouched.
    pub async fn run_debug_check(
        &self,
        request: &DebugCheckRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/debug/model-check", self.base_url);
        info!(
            url = %url,
            video = request.video_path.is_some(),
            run_audio = request.run_audio,
            "running model check"
        );
        self.send(self.authed(self.client.post(&url).json(request))).await
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => req.bearer_auth(session.token()),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Failure text for the debug console: the server's body verbatim when it
/// sent one.
pub fn debug_check_failure(err: &ApiError) -> String {
    match err.body() {
        Some(body) => format!("Debug model check failed: {body}"),
        None => format!("Debug model check failed: {err}"),
    }
}
