//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Route guard deciding whether a protected view may be shown."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::sync::Arc;

use brewops_common::{AccessConfig, RouteRequirementConfig};
use brewops_logging::{log_access_event, AccessEventOutcome, AccessLogContext};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::metrics::AccessMetrics;
use crate::permissions::PermissionModel;
use crate::session::Session;

/// Notice rendered in place of a view the actor may not open.
pub const NO_ACCESS_NOTICE: &str = "No tienes permisos para acceder a esta sección.";

/// Requirements a protected view declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    /// Any-of permission names. `None` means no permission requirement;
    /// `Some(vec![])` can never be satisfied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    /// Module that must be held exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_module: Option<String>,
}

impl RouteTarget {
    /// Target with no requirements beyond a session.
    pub fn open() -> Self {
        Self::default()
    }

    /// Require at least one of the given permission names.
    pub fn requiring_any<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Require the given module.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.required_module = Some(module.into());
        self
    }

    /// Evaluate the requirements against a permission model.
    pub fn is_satisfied_by(&self, model: &PermissionModel) -> bool {
        let has_permission = match &self.required_permissions {
            None => true,
            Some(names) => model.has_any_permission(names),
        };
        let has_module = match &self.required_module {
            None => true,
            Some(module) => model.has_module(module),
        };
        has_permission && has_module
    }
}

impl From<&RouteRequirementConfig> for RouteTarget {
    fn from(config: &RouteRequirementConfig) -> Self {
        Self {
            required_permissions: config.required_permissions.clone(),
            required_module: config.required_module.clone(),
        }
    }
}

/// Result of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    /// Session present but grants insufficient; shown as an inline notice.
    Denied,
    /// No session; the visitor must sign in and resume at `redirect`.
    Unauthenticated { redirect: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Notice to render for denied views.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            AccessDecision::Denied => Some(NO_ACCESS_NOTICE),
            _ => None,
        }
    }

    pub fn outcome(&self) -> AccessEventOutcome {
        match self {
            AccessDecision::Allowed => AccessEventOutcome::Allowed,
            AccessDecision::Denied => AccessEventOutcome::Denied,
            AccessDecision::Unauthenticated { .. } => AccessEventOutcome::Unauthenticated,
        }
    }
}

/// Sign-in entry point plus the query parameter carrying the resume path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRoute {
    path: String,
    resume_param: String,
}

impl Default for SignInRoute {
    fn default() -> Self {
        Self::new("/login", "redirect")
    }
}

impl SignInRoute {
    pub fn new(path: impl Into<String>, resume_param: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resume_param: resume_param.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sign-in location that resumes at `requested_path` after login.
    pub fn redirect_for(&self, requested_path: &str) -> String {
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.path,
            separator,
            self.resume_param,
            urlencoding::encode(requested_path)
        )
    }
}

impl From<&AccessConfig> for SignInRoute {
    fn from(config: &AccessConfig) -> Self {
        Self::new(config.sign_in_path.clone(), config.resume_param.clone())
    }
}

/// Decide whether the session may open the view at `requested_path`.
///
/// Total over its inputs: every combination maps to exactly one decision.
pub fn evaluate_access(
    target: &RouteTarget,
    session: &Session,
    sign_in: &SignInRoute,
    requested_path: &str,
) -> AccessDecision {
    if !session.is_authenticated() {
        return AccessDecision::Unauthenticated {
            redirect: sign_in.redirect_for(requested_path),
        };
    }
    let model = PermissionModel::from_session(session);
    if target.is_satisfied_by(&model) {
        AccessDecision::Allowed
    } else {
        AccessDecision::Denied
    }
}

/// Imperative navigation performed when the guard redirects.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate(&self, location: &str) {
        (**self).navigate(location)
    }
}

/// Navigator for headless hosts: records the redirect in the trace log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, location: &str) {
        info!(location, "redirecting to sign-in");
    }
}

/// Stateful guard that enforces decisions.
///
/// The sign-in redirect fires once per transition into the unauthenticated
/// state, not on every evaluation while signed out.
#[derive(Debug)]
pub struct RouteGuard<N> {
    navigator: N,
    sign_in: SignInRoute,
    last_authenticated: Option<bool>,
    metrics: Option<AccessMetrics>,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(navigator: N, sign_in: SignInRoute) -> Self {
        Self {
            navigator,
            sign_in,
            last_authenticated: None,
            metrics: None,
        }
    }

    /// Record decisions and redirects in the given metrics.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn sign_in(&self) -> &SignInRoute {
        &self.sign_in
    }

    /// Evaluate `target` for the view at `requested_path` and enforce the result.
    pub fn check(
        &mut self,
        requested_path: &str,
        target: &RouteTarget,
        session: &Session,
    ) -> AccessDecision {
        let decision = evaluate_access(target, session, &self.sign_in, requested_path);
        self.track_authentication(session.is_authenticated(), requested_path);

        let actor = session.actor().map(|actor| actor.id.as_str());
        let mut context = AccessLogContext::new().with_route(requested_path);
        if let Some(actor) = actor.filter(|_| session.is_authenticated()) {
            context = context.with_actor(actor);
        }
        if let Some(module) = target.required_module.as_deref() {
            context = context.with_module(module);
        }
        log_access_event(
            Some(&context),
            "access.check",
            "route guard evaluated",
            decision.outcome(),
        );
        if let Some(metrics) = &self.metrics {
            metrics.observe(&decision);
        }
        decision
    }

    /// React to a session change while `current_path` is displayed.
    ///
    /// Returns true when this call fired the sign-in redirect.
    pub fn observe(&mut self, session: &Session, current_path: &str) -> bool {
        self.track_authentication(session.is_authenticated(), current_path)
    }

    fn track_authentication(&mut self, authenticated: bool, path: &str) -> bool {
        let transitioned = !authenticated && self.last_authenticated != Some(false);
        self.last_authenticated = Some(authenticated);
        if transitioned {
            self.navigator.navigate(&self.sign_in.redirect_for(path));
            if let Some(metrics) = &self.metrics {
                metrics.inc_redirect();
            }
        }
        transitioned
    }
}

/// Guard shared by the views and the backend client.
pub type SharedRouteGuard = Arc<Mutex<RouteGuard<Arc<dyn Navigator>>>>;

impl RouteGuard<Arc<dyn Navigator>> {
    pub fn into_shared(self) -> SharedRouteGuard {
        Arc::new(Mutex::new(self))
    }
}
