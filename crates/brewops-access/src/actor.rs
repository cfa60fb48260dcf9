//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Signed-in actor, grants and session tokens."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// One capability held by an actor: a permission name scoped to a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// Fine-grained capability, e.g. `inventario:read`.
    #[serde(alias = "perm", alias = "nombre")]
    pub permission: String,
    /// Coarse functional area, e.g. `Inventario`.
    #[serde(alias = "modulo")]
    pub module: String,
}

impl Grant {
    /// Build a grant from its permission and module names.
    pub fn new(permission: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            module: module.into(),
        }
    }
}

/// The signed-in principal as returned by the backend profile endpoint.
///
/// Actors are replaced wholesale on login and profile refresh; nothing in
/// this crate mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Backend identifier.
    pub id: String,
    /// Display name.
    #[serde(alias = "nombre")]
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Role label, compared against the configured elevated role.
    #[serde(default, alias = "rol")]
    pub role: String,
    /// Company or organization the actor belongs to.
    #[serde(default, alias = "empresa")]
    pub company: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Grants in no particular order; duplicates are tolerated.
    #[serde(default, alias = "permisos")]
    pub grants: Vec<Grant>,
}

impl Actor {
    /// Short helper for constructing an actor without optional attributes.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        grants: Vec<Grant>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: String::new(),
            company: None,
            avatar: None,
            grants,
        }
    }

    /// Attach a role label.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Attach a company name.
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }
}

/// Bearer token identifying an authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}
