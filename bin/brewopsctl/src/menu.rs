//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "binary"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Menu descriptor validation command."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use brewops_access::{MenuDescriptor, RouteTable, RouteTarget};
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum MenuCommand {
    /// Parse a menu descriptor and report its shape.
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub fn run(command: MenuCommand) -> Result<()> {
    match command {
        MenuCommand::Validate { file } => {
            let menu = MenuDescriptor::load(&file)
                .with_context(|| format!("menu {} is invalid", file.display()))?;
            let routes = RouteTable::from_menu(&menu);
            println!(
                "menu ok: {} top-level nodes, {} links, {} guarded routes, elevated node: {}",
                menu.nodes.len(),
                menu.leaves().len(),
                routes
                    .iter()
                    .filter(|(_, target)| **target != RouteTarget::open())
                    .count(),
                menu.elevated
                    .as_ref()
                    .map(|elevated| elevated.node.title())
                    .unwrap_or("none")
            );
        }
    }
    Ok(())
}
