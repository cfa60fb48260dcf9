//! ---
//! brew_section: "01-core-functionality"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Shared configuration and tracing primitives."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
//! Shared primitives for the BrewOps workspace: configuration loading and
//! tracing initialisation consumed by the daemon and the control CLI.

pub mod config;
pub mod logging;

pub use config::{
    AccessConfig, ApiConfig, AppConfig, BackendConfig, LoadedAppConfig, LoggingConfig,
    RouteRequirementConfig,
};
pub use logging::{init_tracing, log_startup, LogFormat, LOG_ENV};
