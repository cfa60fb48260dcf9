//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "binary"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Control CLI for administrators inspecting BrewOps access."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use brewops_common::AppConfig;
use brewops_logging as logging;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

mod access;
mod menu;
mod session;

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("BrewOps ", env!("CARGO_PKG_VERSION")),
    about = "BrewOps access administration utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Evaluate the route guard for a view path")]
    Check(access::CheckArgs),
    #[command(about = "Print the navigation built for the stored session")]
    Nav(SharedOptions),
    #[command(about = "List route requirements enforced by the guard")]
    Routes(SharedOptions),
    #[command(subcommand, about = "Menu descriptor tooling")]
    Menu(menu::MenuCommand),
    #[command(subcommand, about = "Manage the persisted session")]
    Session(session::SessionCommand),
}

/// Options shared by every command reading configuration or session state.
#[derive(Debug, Clone, Args)]
pub struct SharedOptions {
    /// Path to the configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Session file, overriding `access.session_file`.
    #[arg(long, value_name = "FILE")]
    pub session: Option<PathBuf>,
}

impl SharedOptions {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load_config(&self) -> Result<AppConfig> {
        let default_path = Path::new(AppConfig::DEFAULT_PATH);
        if self.config.is_none()
            && std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_none()
            && !default_path.exists()
        {
            debug!("no configuration file found; using defaults");
            return Ok(AppConfig::default());
        }
        let mut candidates = Vec::new();
        if let Some(path) = &self.config {
            candidates.push(path.clone());
        }
        candidates.push(default_path.to_path_buf());
        AppConfig::load(&candidates)
    }

    /// Session file from the command line or configuration.
    pub fn session_file(&self, config: &AppConfig) -> Result<PathBuf> {
        self.session
            .clone()
            .or_else(|| config.access.session_file.clone())
            .ok_or_else(|| {
                anyhow!("no session file given; pass --session or set access.session_file")
            })
    }
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => access::check(args)?,
        Commands::Nav(options) => access::nav(options)?,
        Commands::Routes(options) => access::routes(options)?,
        Commands::Menu(cmd) => menu::run(cmd)?,
        Commands::Session(cmd) => session::run(cmd)?,
    }
    Ok(())
}
