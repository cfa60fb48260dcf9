//! ---
//! brew_section: "03-logging"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Structured logging adapters for access events."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for tools and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct AccessLogContext<'a> {
    /// Identifier of the signed-in actor, if any.
    pub actor: Option<&'a str>,
    /// Route or view path being evaluated.
    pub route: Option<&'a str>,
    /// Module requirement attached to the route.
    pub module: Option<&'a str>,
}

impl<'a> AccessLogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an actor identifier.
    pub fn with_actor(mut self, actor: &'a str) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Attach the evaluated route.
    pub fn with_route(mut self, route: &'a str) -> Self {
        self.route = Some(route);
        self
    }

    /// Attach the required module.
    pub fn with_module(mut self, module: &'a str) -> Self {
        self.module = Some(module);
        self
    }
}

/// Outcome recorded when emitting access log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEventOutcome {
    /// The view may be shown.
    Allowed,
    /// A session exists but lacks the required grants.
    Denied,
    /// No session; the visitor is sent to sign-in.
    Unauthenticated,
}

impl AccessEventOutcome {
    /// Stable label used in log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessEventOutcome::Allowed => "allowed",
            AccessEventOutcome::Denied => "denied",
            AccessEventOutcome::Unauthenticated => "unauthenticated",
        }
    }
}

/// Emit a standardized access event with its outcome.
pub fn log_access_event(
    context: Option<&AccessLogContext>,
    event: &str,
    message: &str,
    outcome: AccessEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let actor = ctx.actor.unwrap_or("");
    let route = ctx.route.unwrap_or("");
    let module = ctx.module.unwrap_or("");
    let label = outcome.as_str();
    // `tracing::event!` needs a constant level, so dispatch per variant.
    match outcome {
        AccessEventOutcome::Denied => {
            tracing::warn!(event, outcome = label, actor, route, module, message = %message)
        }
        AccessEventOutcome::Unauthenticated => {
            tracing::info!(event, outcome = label, actor, route, module, message = %message)
        }
        AccessEventOutcome::Allowed => {
            tracing::debug!(event, outcome = label, actor, route, module, message = %message)
        }
    }
}
