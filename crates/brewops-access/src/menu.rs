//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Static menu descriptor: built-in brewery menu and TOML loader."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use brewops_common::AccessConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::navigation::{NavGroup, NavLink, NavigationNode};

/// Errors raised while loading a menu descriptor.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("unable to read menu descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("menu descriptor is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// A node declared both a target and children.
    #[error("menu node '{0}' has both a target and children")]
    AmbiguousNode(String),
    /// A node declared neither a target nor children.
    #[error("menu node '{0}' has neither a target nor children")]
    EmptyNode(String),
    #[error("menu group '{0}' has no children")]
    EmptyGroup(String),
    /// Requirements only make sense on links.
    #[error("menu group '{0}' declares access requirements")]
    GroupRequirements(String),
    #[error("menu node title cannot be empty")]
    MissingTitle,
    #[error("menu node '{title}' target '{target}' must be an absolute path")]
    RelativeTarget { title: String, target: String },
}

/// Node spliced into the menu for the elevated role only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatedNode {
    /// Title of the top-level node to insert after; appended when absent.
    pub after: Option<String>,
    pub node: NavigationNode,
}

/// The static, externally authored menu tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuDescriptor {
    pub nodes: Vec<NavigationNode>,
    pub elevated: Option<ElevatedNode>,
}

impl MenuDescriptor {
    /// Parse a descriptor from TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, MenuError> {
        let document: RawMenu = toml::from_str(raw)?;
        let nodes = document
            .nodes
            .into_iter()
            .map(RawNode::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        let elevated = document
            .elevated
            .map(|elevated| -> Result<ElevatedNode, MenuError> {
                Ok(ElevatedNode {
                    after: elevated.after,
                    node: elevated.node.into_node()?,
                })
            })
            .transpose()?;
        Ok(Self { nodes, elevated })
    }

    /// Load a descriptor from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MenuError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| MenuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The configured menu file, or the built-in menu when none is set.
    pub fn from_access_config(access: &AccessConfig) -> Result<Self, MenuError> {
        match &access.menu_file {
            Some(path) => {
                debug!(menu_file = %path.display(), "loading menu descriptor");
                Self::load(path)
            }
            None => Ok(Self::brewery_default()),
        }
    }

    /// Every link in the descriptor, including the elevated node's.
    pub fn leaves(&self) -> Vec<&NavLink> {
        self.nodes
            .iter()
            .chain(self.elevated.iter().map(|elevated| &elevated.node))
            .flat_map(NavigationNode::leaves)
            .collect()
    }

    /// The built-in brewery operations menu.
    pub fn brewery_default() -> Self {
        let inventory = NavGroup::new(
            "Inventario",
            vec![
                NavLink::new("Materias primas", "/inventario/materias-primas")
                    .requiring_any(["inventario:read"])
                    .in_module("Inventario")
                    .into(),
                NavLink::new("Productos terminados", "/inventario/productos")
                    .requiring_any(["inventario:read"])
                    .in_module("Inventario")
                    .into(),
                NavLink::new("Movimientos", "/inventario/movimientos")
                    .requiring_any(["inventario:read", "inventario:write"])
                    .in_module("Inventario")
                    .into(),
            ],
        )
        .with_icon("package");
        let production = NavGroup::new(
            "Producción",
            vec![
                NavLink::new("Lotes", "/produccion/lotes")
                    .requiring_any(["lotes:read"])
                    .in_module("Producción")
                    .into(),
                NavLink::new("Recetas", "/produccion/recetas")
                    .requiring_any(["recetas:read"])
                    .in_module("Producción")
                    .into(),
            ],
        )
        .with_icon("flask-conical");
        let commercial = NavGroup::new(
            "Comercial",
            vec![
                NavLink::new("Clientes", "/comercial/clientes")
                    .requiring_any(["clientes:read"])
                    .in_module("Comercial")
                    .into(),
                NavLink::new("Pedidos", "/comercial/pedidos")
                    .requiring_any(["pedidos:read"])
                    .in_module("Comercial")
                    .into(),
                NavLink::new("Ventas", "/comercial/ventas")
                    .requiring_any(["ventas:read"])
                    .in_module("Comercial")
                    .into(),
            ],
        )
        .with_icon("shopping-cart");
        let settings = NavGroup::new(
            "Configuración",
            vec![NavLink::new("Usuarios", "/configuracion/usuarios")
                .requiring_any(["usuarios:read"])
                .in_module("Configuración")
                .into()],
        )
        .with_icon("settings");

        Self {
            nodes: vec![
                NavLink::new("Dashboard", "/")
                    .with_icon("layout-dashboard")
                    .into(),
                inventory.into(),
                production.into(),
                commercial.into(),
                settings.into(),
            ],
            elevated: Some(ElevatedNode {
                after: Some("Configuración".into()),
                node: NavLink::new("Roles", "/roles").with_icon("shield").into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMenu {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    elevated: Option<RawElevated>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawElevated {
    #[serde(default)]
    after: Option<String>,
    node: RawNode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    title: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    required_permissions: Option<Vec<String>>,
    #[serde(default)]
    required_module: Option<String>,
    #[serde(default)]
    children: Option<Vec<RawNode>>,
}

impl RawNode {
    fn into_node(self) -> Result<NavigationNode, MenuError> {
        if self.title.trim().is_empty() {
            return Err(MenuError::MissingTitle);
        }
        match (self.target, self.children) {
            (Some(_), Some(_)) => Err(MenuError::AmbiguousNode(self.title)),
            (None, None) => Err(MenuError::EmptyNode(self.title)),
            (Some(target), None) => {
                if !target.starts_with('/') {
                    return Err(MenuError::RelativeTarget {
                        title: self.title,
                        target,
                    });
                }
                Ok(NavigationNode::Leaf(NavLink {
                    title: self.title,
                    target,
                    icon: self.icon,
                    required_permissions: self.required_permissions,
                    required_module: self.required_module,
                }))
            }
            (None, Some(children)) => {
                if self.required_permissions.is_some() || self.required_module.is_some() {
                    return Err(MenuError::GroupRequirements(self.title));
                }
                if children.is_empty() {
                    return Err(MenuError::EmptyGroup(self.title));
                }
                let children = children
                    .into_iter()
                    .map(RawNode::into_node)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NavigationNode::Group(NavGroup {
                    title: self.title,
                    icon: self.icon,
                    children,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[nodes]]
        title = "Dashboard"
        target = "/"

        [[nodes]]
        title = "Producción"
        icon = "flask-conical"

        [[nodes.children]]
        title = "Lotes"
        target = "/produccion/lotes"
        required_permissions = ["lotes:read"]
        required_module = "Producción"

        [elevated]
        after = "Dashboard"

        [elevated.node]
        title = "Roles"
        target = "/roles"
    "#;

    #[test]
    fn parses_leaves_groups_and_elevated_node() {
        let menu = MenuDescriptor::from_toml_str(SAMPLE).unwrap();
        assert_eq!(menu.nodes.len(), 2);
        let NavigationNode::Group(group) = &menu.nodes[1] else {
            panic!("expected group");
        };
        assert_eq!(group.children.len(), 1);
        let elevated = menu.elevated.as_ref().unwrap();
        assert_eq!(elevated.after.as_deref(), Some("Dashboard"));
        assert_eq!(elevated.node.title(), "Roles");

        let targets: Vec<_> = menu.leaves().iter().map(|l| l.target.clone()).collect();
        assert_eq!(targets, vec!["/", "/produccion/lotes", "/roles"]);
    }

    #[test]
    fn rejects_node_with_target_and_children() {
        let err = MenuDescriptor::from_toml_str(
            r#"
            [[nodes]]
            title = "Inventario"
            target = "/inventario"

            [[nodes.children]]
            title = "Lotes"
            target = "/inventario/lotes"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::AmbiguousNode(title) if title == "Inventario"));
    }

    #[test]
    fn rejects_node_without_target_or_children() {
        let err = MenuDescriptor::from_toml_str(
            r#"
            [[nodes]]
            title = "Huérfano"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::EmptyNode(_)));
    }

    #[test]
    fn rejects_requirements_on_groups() {
        let err = MenuDescriptor::from_toml_str(
            r#"
            [[nodes]]
            title = "Comercial"
            required_module = "Comercial"

            [[nodes.children]]
            title = "Pedidos"
            target = "/comercial/pedidos"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::GroupRequirements(_)));
    }

    #[test]
    fn rejects_relative_targets() {
        let err = MenuDescriptor::from_toml_str(
            r#"
            [[nodes]]
            title = "Ventas"
            target = "comercial/ventas"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::RelativeTarget { .. }));
    }

    #[test]
    fn built_in_menu_links_are_absolute() {
        let menu = MenuDescriptor::brewery_default();
        assert!(menu.leaves().iter().all(|link| link.target.starts_with('/')));
        assert!(menu.nodes.iter().all(|node| node.title() != "Roles"));
    }

    #[test]
    fn access_config_without_menu_file_uses_built_in_menu() {
        let menu = MenuDescriptor::from_access_config(&AccessConfig::default()).unwrap();
        assert_eq!(menu, MenuDescriptor::brewery_default());
    }

    #[test]
    fn access_config_menu_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.toml");
        fs::write(
            &path,
            "[[nodes]]\ntitle = \"Catas\"\ntarget = \"/catas\"\n",
        )
        .unwrap();
        let access = AccessConfig {
            menu_file: Some(path),
            ..AccessConfig::default()
        };
        let menu = MenuDescriptor::from_access_config(&access).unwrap();
        assert_eq!(menu.nodes.len(), 1);
        assert_eq!(menu.nodes[0].title(), "Catas");
        assert!(menu.elevated.is_none());
    }
}
