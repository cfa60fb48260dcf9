//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Shell API exposing session, navigation and access decisions."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use brewops_access::{
    is_elevated, AccessDecision, AccessMetrics, Actor, MenuDescriptor, Navigation,
    NavigationBuilder, Navigator, RouteGuard, RouteTable, SessionError, SessionStore,
    SessionToken, SharedRouteGuard, SignInRoute, TracingNavigator,
};
use brewops_common::AccessConfig;
use brewops_logging::{brew_debug, brew_info, AccessLogContext};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::{Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared API state exposed to handlers.
pub struct ApiState {
    session: SessionStore,
    navigation: NavigationBuilder,
    routes: RouteTable,
    guard: SharedRouteGuard,
    current_path: Mutex<String>,
    elevated_role: String,
    metrics: AccessMetrics,
    session_file: Option<PathBuf>,
    start: Instant,
}

impl ApiState {
    pub fn new(
        access: &AccessConfig,
        session: SessionStore,
        menu: MenuDescriptor,
        routes: RouteTable,
        registry: Arc<Registry>,
    ) -> Result<Self> {
        Self::with_navigator(access, session, menu, routes, registry, Arc::new(TracingNavigator))
    }

    /// Like [`ApiState::new`] but redirects through the given navigator.
    pub fn with_navigator(
        access: &AccessConfig,
        session: SessionStore,
        menu: MenuDescriptor,
        routes: RouteTable,
        registry: Arc<Registry>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let metrics =
            AccessMetrics::new(registry).context("failed to register access metrics")?;
        let sign_in = SignInRoute::from(access);
        let guard = RouteGuard::new(navigator, sign_in).with_metrics(metrics.clone());
        Ok(Self {
            session,
            navigation: NavigationBuilder::new(menu, access.default_organization.clone()),
            routes,
            guard: guard.into_shared(),
            current_path: Mutex::new("/".to_owned()),
            elevated_role: access.elevated_role.clone(),
            metrics,
            session_file: access.session_file.clone(),
            start: Instant::now(),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Guard enforcing sign-in for the open view. Backend clients built on
    /// the same session hand their rejections to it.
    pub fn guard(&self) -> SharedRouteGuard {
        self.guard.clone()
    }

    fn navigation(&self) -> Navigation {
        let session = self.session.snapshot();
        let actor = session.actor().filter(|_| session.is_authenticated());
        self.navigation
            .build(actor, is_elevated(actor, &self.elevated_role))
    }

    fn check(&self, path: &str) -> AccessDecision {
        let target = self.routes.resolve(path);
        *self.current_path.lock() = path.to_owned();
        self.guard.lock().check(path, &target, &self.session.snapshot())
    }

    fn observe_session(&self) {
        let session = self.session.snapshot();
        let path = self.current_path.lock().clone();
        if self.guard.lock().observe(&session, &path) {
            brew_debug!(
                context = AccessLogContext::new().with_route(&path),
                "session ended while a view was open"
            );
        }
    }

    fn persist_session(&self) -> Result<(), SessionError> {
        if let Some(path) = &self.session_file {
            self.session.save(path)?;
        }
        Ok(())
    }

    fn metrics_body(&self) -> Result<String> {
        let families = self.metrics.registry().gather();
        TextEncoder::new()
            .encode_to_string(&families)
            .context("failed to encode metrics")
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("routes", &self.routes.len())
            .field("elevated_role", &self.elevated_role)
            .field("session_file", &self.session_file)
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
    watcher: JoinHandle<()>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.watcher.abort();
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/api/session",
            get(get_session).put(put_session).delete(delete_session),
        )
        .route("/api/navigation", get(get_navigation))
        .route("/api/access", get(get_access))
        .route("/api/routes", get(get_routes))
        .route("/metrics", get(get_metrics))
        .route("/healthz", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Spawn the shell API together with the session watcher.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let addr = listener
        .local_addr()
        .context("failed to read API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let watcher = spawn_session_watcher(state.clone());
    let router = router(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr,
        shutdown: Some(shutdown_tx),
        task,
        watcher,
    })
}

fn spawn_session_watcher(state: Arc<ApiState>) -> JoinHandle<()> {
    let mut rx = state.session.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            state.observe_session();
        }
    })
}

#[derive(Debug, Serialize)]
struct SessionView {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<Actor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issued_at: Option<DateTime<Utc>>,
}

impl SessionView {
    fn current(store: &SessionStore) -> Self {
        let session = store.snapshot();
        let authenticated = session.is_authenticated();
        Self {
            authenticated,
            actor: session.actor.filter(|_| authenticated),
            issued_at: session.issued_at.filter(|_| authenticated),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    token: String,
    #[serde(alias = "usuario")]
    user: Actor,
}

#[derive(Debug, Deserialize)]
struct AccessQuery {
    path: String,
}

#[derive(Debug, Serialize)]
struct AccessResponse {
    path: String,
    #[serde(flatten)]
    decision: AccessDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    authenticated: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match err {
            SessionError::NotSignedIn => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

async fn get_session(State(state): State<Arc<ApiState>>) -> Json<SessionView> {
    Json(SessionView::current(&state.session))
}

async fn put_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionView>, ApiError> {
    if request.token.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "session token cannot be empty",
        ));
    }
    let actor_id = request.user.id.clone();
    state
        .session
        .login(SessionToken::new(request.token), request.user);
    state.persist_session()?;
    brew_info!(
        context = AccessLogContext::new().with_actor(&actor_id),
        "session opened through shell api"
    );
    Ok(Json(SessionView::current(&state.session)))
}

async fn delete_session(State(state): State<Arc<ApiState>>) -> Result<StatusCode, ApiError> {
    if state.session.reset() {
        state.metrics.inc_session_reset();
    }
    state.persist_session()?;
    brew_info!("session closed through shell api");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_navigation(State(state): State<Arc<ApiState>>) -> Json<Navigation> {
    Json(state.navigation())
}

async fn get_access(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AccessQuery>,
) -> Response {
    let decision = state.check(&query.path);
    let status = match &decision {
        AccessDecision::Allowed => StatusCode::OK,
        AccessDecision::Denied => StatusCode::FORBIDDEN,
        AccessDecision::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
    };
    let body = AccessResponse {
        path: query.path,
        notice: decision.notice(),
        decision,
    };
    (status, Json(body)).into_response()
}

async fn get_routes(State(state): State<Arc<ApiState>>) -> Json<RouteTable> {
    Json(state.routes.clone())
}

async fn get_metrics(State(state): State<Arc<ApiState>>) -> Response {
    match state.metrics_body() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.start.elapsed().as_secs(),
        authenticated: state.session.is_authenticated(),
    })
}
