//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Backend API client with session-expiry interception."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
//! HTTP client used by dashboard views to reach the brewery backend.
//!
//! Every request carries the session bearer token. A `401 Unauthorized`
//! answer ends the session: the store is reset and the shared route guard is
//! told about it, so sign-in is opened once per expiry with the view that
//! issued the call as resume target. Other failures are returned to the
//! caller and leave the session alone.

use std::sync::Arc;
use std::time::Duration;

use brewops_access::{AccessMetrics, SessionStore, SharedRouteGuard};
use brewops_common::BackendConfig;
use brewops_logging::{brew_debug, brew_warn, AccessLogContext};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The backend rejected the session token; sign-in is required.
    #[error("session rejected by backend, sign in again at {redirect}")]
    Unauthorized { redirect: String },
    #[error("backend answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("request to backend failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unable to decode backend response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Backend client shared by the dashboard views.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionStore,
    guard: SharedRouteGuard,
    current_path: Arc<RwLock<String>>,
    metrics: Option<AccessMetrics>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("sign_in", self.guard.lock().sign_in())
            .field("current_path", &*self.current_path.read())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionStore,
        guard: SharedRouteGuard,
    ) -> Result<Self, ClientError> {
        let base_url = parse_base(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            http,
            base_url,
            session,
            guard,
            current_path: Arc::new(RwLock::new("/".to_owned())),
            metrics: None,
        })
    }

    /// Build a client from the `backend` configuration section. Sign-in
    /// redirects go through `guard`, which carries the `access` settings.
    pub fn from_config(
        backend: &BackendConfig,
        session: SessionStore,
        guard: SharedRouteGuard,
    ) -> Result<Self, ClientError> {
        Self::new(&backend.base_url, backend.timeout, session, guard)
    }

    /// Count session resets in the given metrics.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Record the view currently displayed; it becomes the resume target
    /// when the backend ends the session.
    pub fn set_current_path(&self, path: impl Into<String>) {
        *self.current_path.write() = path.into();
    }

    pub fn current_path(&self) -> String {
        self.current_path.read().clone()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        response.json().await.map_err(ClientError::Decode)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::POST, path)?.json(body))
            .await?;
        response.json().await.map_err(ClientError::Decode)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::PUT, path)?.json(body))
            .await?;
        response.json().await.map_err(ClientError::Decode)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidUrl {
                url: path.to_owned(),
                source,
            })?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token.as_str());
        }
        Ok(builder)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.expire_session());
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        });
        let path = self.current_path();
        brew_debug!(
            context = AccessLogContext::new().with_route(&path),
            "backend answered {}: {}",
            status,
            message
        );
        Err(ClientError::Status { status, message })
    }

    fn expire_session(&self) -> ClientError {
        let path = self.current_path();
        // Held across the reset; watchers of the store observe after this redirect.
        let mut guard = self.guard.lock();
        let ended = self.session.reset();
        if ended {
            brew_warn!(
                context = AccessLogContext::new().with_route(&path),
                "backend rejected session token"
            );
            if let Some(metrics) = &self.metrics {
                metrics.inc_session_reset();
            }
        }

        guard.observe(&self.session.snapshot(), &path);
        ClientError::Unauthorized {
            redirect: guard.sign_in().redirect_for(&path),
        }
    }
}

fn parse_base(raw: &str) -> Result<Url, ClientError> {
    let normalised = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalised).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })
}

/// Pull `message` or `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_owned());
            }
        }
    }
    Some(trimmed.to_owned())
}
