//! ---
//! brew_section: "01-core-functionality"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Tracing setup and startup reporting for BrewOps processes."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, LoggingConfig};

/// Environment variable holding the log filter, e.g. `debug,brewops_access=trace`.
pub const LOG_ENV: &str = "BREWOPS_LOG";
const DEFAULT_DIRECTIVE: &str = "info,brewops_access=debug";

// Flushes the non-blocking writers on exit.
static WRITER_GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Output format of the stdout layer. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the global subscriber: stdout in the configured format plus a
/// daily rolling JSON file under `config.directory`.
///
/// The filter is read from `BREWOPS_LOG`, then `RUST_LOG`. An invalid value
/// is reported once the subscriber is up and the default filter is used.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "failed to create log directory {}",
            config.directory.display()
        )
    })?;

    let file = rolling::daily(&config.directory, log_file_name(service_name, config));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = WRITER_GUARDS.set([file_guard, stdout_guard]);

    let (directive, rejected) = filter_directive(
        std::env::var(LOG_ENV).ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    );

    let timer = UtcTime::rfc_3339();
    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_timer(timer.clone())
            .with_target(false)
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(timer.clone())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_timer(timer)
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::new(&directive))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if let Some(rejected) = rejected {
        warn!(env = LOG_ENV, %rejected, fallback = %directive, "ignoring invalid log filter");
    }
    if installed {
        info!(service = service_name, filter = %directive, format = ?config.format, "tracing initialised");
    }
    Ok(())
}

/// Report where the configuration came from and the access settings in force.
pub fn log_startup(service_name: &str, source: &Path, config: &AppConfig) {
    let access = &config.access;
    info!(
        service = service_name,
        config_path = %source.display(),
        log_dir = %config.logging.directory.display(),
        "configuration loaded"
    );
    info!(
        service = service_name,
        sign_in = %access.sign_in_path,
        resume_param = %access.resume_param,
        elevated_role = %access.elevated_role,
        menu_file = %display_path(access.menu_file.as_deref()),
        session_file = %display_path(access.session_file.as_deref()),
        backend = %config.backend.base_url,
        route_overrides = config.routes.len(),
        "access settings"
    );
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_owned())
}

fn log_file_name(service_name: &str, config: &LoggingConfig) -> String {
    match config.file_prefix.as_deref() {
        Some(prefix) => format!("{prefix}-{service_name}.log"),
        None => format!("{service_name}.log"),
    }
}

/// Pick the first valid directive. Returns it with the rejected `BREWOPS_LOG`
/// value, if there was one.
fn filter_directive(brewops: Option<&str>, rust_log: Option<&str>) -> (String, Option<String>) {
    let valid = |raw: &str| EnvFilter::try_new(raw).is_ok();
    match brewops {
        Some(raw) if valid(raw) => (raw.to_owned(), None),
        Some(raw) => (DEFAULT_DIRECTIVE.to_owned(), Some(raw.to_owned())),
        None => match rust_log.filter(|raw| valid(raw)) {
            Some(raw) => (raw.to_owned(), None),
            None => (DEFAULT_DIRECTIVE.to_owned(), None),
        },
    }
}
