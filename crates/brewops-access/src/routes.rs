//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Route requirement table consulted by the guard."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use brewops_common::AppConfig;
use indexmap::IndexMap;
use serde::Serialize;

use crate::guard::RouteTarget;
use crate::menu::MenuDescriptor;

/// Requirements per view path.
///
/// Lookups are segment-wise longest-prefix: `/inventario/lotes/42` inherits
/// the requirements of `/inventario/lotes` unless it is listed itself. The
/// root path only matches itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: IndexMap<String, RouteTarget>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the table from the menu's link annotations.
    pub fn from_menu(menu: &MenuDescriptor) -> Self {
        let mut table = Self::new();
        for link in menu.leaves() {
            table.insert(&link.target, link.route_target());
        }
        table
    }

    /// Insert or replace the requirements of a path.
    pub fn insert(&mut self, path: &str, target: RouteTarget) {
        self.routes.insert(normalize(path), target);
    }

    /// Layer additional entries over the table.
    pub fn with_overrides<I, P>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (P, RouteTarget)>,
        P: AsRef<str>,
    {
        for (path, target) in overrides {
            self.insert(path.as_ref(), target);
        }
        self
    }

    /// Menu-derived table with the `[routes]` section of `config` layered on top.
    pub fn from_config(menu: &MenuDescriptor, config: &AppConfig) -> Self {
        Self::from_menu(menu).with_overrides(
            config
                .routes
                .iter()
                .map(|(path, requirement)| (path, RouteTarget::from(requirement))),
        )
    }

    /// Requirements that apply to `path`. Unlisted paths carry none.
    pub fn resolve(&self, path: &str) -> RouteTarget {
        let mut candidate = normalize(path);
        loop {
            if let Some(target) = self.routes.get(&candidate) {
                return target.clone();
            }
            match candidate.rfind('/') {
                Some(0) | None => return RouteTarget::open(),
                Some(index) => candidate.truncate(index),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteTarget)> {
        self.routes.iter().map(|(path, target)| (path.as_str(), target))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strip query and fragment, force a leading slash, drop trailing slashes.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new().with_overrides([
            ("/", RouteTarget::open().in_module("Dashboard")),
            (
                "/inventario",
                RouteTarget::open().requiring_any(["inventario:read"]),
            ),
            (
                "/inventario/ajustes/",
                RouteTarget::open().requiring_any(["inventario:write"]),
            ),
        ])
    }

    #[test]
    fn nested_paths_inherit_closest_prefix() {
        let table = table();
        assert_eq!(
            table.resolve("/inventario/lotes/42?tab=historial"),
            RouteTarget::open().requiring_any(["inventario:read"])
        );
        assert_eq!(
            table.resolve("/inventario/ajustes/7"),
            RouteTarget::open().requiring_any(["inventario:write"])
        );
    }

    #[test]
    fn root_entry_does_not_cover_other_paths() {
        let table = table();
        assert_eq!(
            table.resolve(""),
            RouteTarget::open().in_module("Dashboard")
        );
        assert_eq!(table.resolve("/comercial/pedidos"), RouteTarget::open());
    }

    #[test]
    fn prefix_matching_respects_segment_boundaries() {
        let table = table();
        assert_eq!(table.resolve("/inventarios"), RouteTarget::open());
    }

    #[test]
    fn built_in_menu_produces_guarded_routes() {
        let table = RouteTable::from_menu(&MenuDescriptor::brewery_default());
        assert_eq!(
            table.resolve("/produccion/lotes/2024-07"),
            RouteTarget::open()
                .requiring_any(["lotes:read"])
                .in_module("Producción")
        );
        assert_eq!(table.resolve("/roles"), RouteTarget::open());
    }

    #[test]
    fn configured_routes_override_menu_annotations() {
        let config: AppConfig = r#"
            [routes."/produccion"]
            required_module = "Producción"

            [routes."/produccion/lotes"]
            required_permissions = ["lotes:read", "lotes:audit"]
        "#
        .parse()
        .unwrap();
        let table = RouteTable::from_config(&MenuDescriptor::brewery_default(), &config);
        assert_eq!(
            table.resolve("/produccion/lotes"),
            RouteTarget::open().requiring_any(["lotes:read", "lotes:audit"])
        );
        assert_eq!(
            table.resolve("/produccion/mantenimiento"),
            RouteTarget::open().in_module("Producción")
        );
    }
}
