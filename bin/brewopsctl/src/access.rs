//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "binary"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Guard evaluation, navigation and route listing commands."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use brewops_access::{
    is_elevated, AccessDecision, MenuDescriptor, NavigationBuilder, RouteGuard, RouteTable,
    SessionStore, SignInRoute, TracingNavigator,
};
use brewops_common::AppConfig;
use clap::Args;
use serde::Serialize;

use crate::SharedOptions;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// View path to evaluate, e.g. `/inventario/productos`.
    pub path: String,
    #[command(flatten)]
    pub options: SharedOptions,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    path: &'a str,
    #[serde(flatten)]
    decision: AccessDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let config = args.options.load_config()?;
    let session = load_session(&args.options, &config)?;
    let menu = load_menu(&config)?;
    let routes = RouteTable::from_config(&menu, &config);

    let mut guard = RouteGuard::new(TracingNavigator, SignInRoute::from(&config.access));
    let decision = guard.check(&args.path, &routes.resolve(&args.path), &session.snapshot());
    let report = CheckReport {
        path: &args.path,
        notice: decision.notice(),
        decision,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn nav(options: SharedOptions) -> Result<()> {
    let config = options.load_config()?;
    let session = load_session(&options, &config)?.snapshot();
    let builder = NavigationBuilder::new(
        load_menu(&config)?,
        config.access.default_organization.clone(),
    );
    let actor = session.actor().filter(|_| session.is_authenticated());
    let navigation = builder.build(actor, is_elevated(actor, &config.access.elevated_role));
    println!("{}", serde_json::to_string_pretty(&navigation)?);
    Ok(())
}

pub fn routes(options: SharedOptions) -> Result<()> {
    let config = options.load_config()?;
    let routes = RouteTable::from_config(&load_menu(&config)?, &config);
    for (path, target) in routes.iter() {
        let permissions = match &target.required_permissions {
            None => "-".to_owned(),
            Some(names) if names.is_empty() => "[]".to_owned(),
            Some(names) => names.join("|"),
        };
        let module = target.required_module.as_deref().unwrap_or("-");
        println!("{path:<32} {permissions:<40} {module}");
    }
    Ok(())
}

fn load_menu(config: &AppConfig) -> Result<MenuDescriptor> {
    MenuDescriptor::from_access_config(&config.access).context("failed to load menu descriptor")
}

/// The persisted session, or an empty one when no session file is known.
fn load_session(options: &SharedOptions, config: &AppConfig) -> Result<SessionStore> {
    match options.session_file(config) {
        Ok(path) => SessionStore::restore(&path)
            .with_context(|| format!("failed to read session file {}", path.display())),
        Err(_) => Ok(SessionStore::new()),
    }
}
