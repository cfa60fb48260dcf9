//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Permission model derived from the actor's grants."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use serde::Serialize;

use crate::actor::Actor;
use crate::session::Session;

/// Read-only view of what an actor may see: the flattened permission names
/// and module names across all of its grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionModel {
    permissions: BTreeSet<String>,
    modules: BTreeSet<String>,
}

impl PermissionModel {
    /// Derive the model from an actor. An absent actor holds nothing.
    pub fn from_actor(actor: Option<&Actor>) -> Self {
        let mut model = Self::default();
        for grant in actor.into_iter().flat_map(|actor| actor.grants.iter()) {
            model.permissions.insert(grant.permission.clone());
            model.modules.insert(grant.module.clone());
        }
        model
    }

    /// Derive the model from a session. Without a token the actor record is
    /// ignored and the model is empty.
    pub fn from_session(session: &Session) -> Self {
        if session.is_authenticated() {
            Self::from_actor(session.actor())
        } else {
            Self::default()
        }
    }

    /// Permission names held.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// Module names held.
    pub fn modules(&self) -> &BTreeSet<String> {
        &self.modules
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains(name)
    }

    /// Any-of check. An empty `names` slice is never satisfied.
    pub fn has_any_permission<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.has_permission(name.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.modules.is_empty()
    }
}
