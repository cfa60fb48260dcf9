//! ---
//! brew_section: "05-networking-external-interfaces"
//! brew_subsection: "binary"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Session file management commands."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use brewops_access::{Actor, SessionStore, SessionToken};
use clap::Subcommand;
use serde_json::json;

use crate::SharedOptions;

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Store a signed-in session built from a backend profile document.
    Login {
        /// Bearer token issued by the backend.
        #[arg(long)]
        token: String,
        /// JSON file holding the user profile, including its grants.
        #[arg(long, value_name = "FILE")]
        user: PathBuf,
        #[command(flatten)]
        options: SharedOptions,
    },
    /// Clear the persisted session.
    Logout {
        #[command(flatten)]
        options: SharedOptions,
    },
    /// Print the persisted session without its token.
    Show {
        #[command(flatten)]
        options: SharedOptions,
    },
}

pub fn run(command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Login {
            token,
            user,
            options,
        } => {
            if token.trim().is_empty() {
                bail!("session token cannot be empty");
            }
            let raw = fs::read_to_string(&user)
                .with_context(|| format!("unable to read user profile {}", user.display()))?;
            let actor: Actor = serde_json::from_str(&raw)
                .with_context(|| format!("invalid user profile {}", user.display()))?;
            let path = options.session_file(&options.load_config()?)?;
            let store = SessionStore::new();
            store.login(SessionToken::new(token), actor);
            store.save(&path)?;
            println!("session stored in {}", path.display());
        }
        SessionCommand::Logout { options } => {
            let path = options.session_file(&options.load_config()?)?;
            let store = SessionStore::restore(&path)?;
            let ended = store.reset();
            store.save(&path)?;
            if ended {
                println!("session cleared in {}", path.display());
            } else {
                println!("no active session in {}", path.display());
            }
        }
        SessionCommand::Show { options } => {
            let path = options.session_file(&options.load_config()?)?;
            let session = SessionStore::restore(&path)?.snapshot();
            let authenticated = session.is_authenticated();
            let view = json!({
                "authenticated": authenticated,
                "actor": session.actor().filter(|_| authenticated),
                "issued_at": session.issued_at.filter(|_| authenticated),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}
