//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Sidebar navigation model and builder."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::guard::RouteTarget;
use crate::menu::MenuDescriptor;

/// Menu entry linking to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub title: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_module: Option<String>,
}

impl NavLink {
    pub fn new(title: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            target: target.into(),
            icon: None,
            required_permissions: None,
            required_module: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requiring_any<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.required_module = Some(module.into());
        self
    }

    /// Requirements the linked view is guarded with.
    pub fn route_target(&self) -> RouteTarget {
        RouteTarget {
            required_permissions: self.required_permissions.clone(),
            required_module: self.required_module.clone(),
        }
    }
}

/// Collapsible menu group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavGroup {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub children: Vec<NavigationNode>,
}

impl NavGroup {
    pub fn new(title: impl Into<String>, children: Vec<NavigationNode>) -> Self {
        Self {
            title: title.into(),
            icon: None,
            children,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A menu node is either a leaf link or a group, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationNode {
    Leaf(NavLink),
    Group(NavGroup),
}

impl NavigationNode {
    pub fn title(&self) -> &str {
        match self {
            NavigationNode::Leaf(link) => &link.title,
            NavigationNode::Group(group) => &group.title,
        }
    }

    /// All links under this node, depth first.
    pub fn leaves(&self) -> Vec<&NavLink> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

impl From<NavLink> for NavigationNode {
    fn from(link: NavLink) -> Self {
        NavigationNode::Leaf(link)
    }
}

impl From<NavGroup> for NavigationNode {
    fn from(group: NavGroup) -> Self {
        NavigationNode::Group(group)
    }
}

fn collect_leaves<'a>(node: &'a NavigationNode, out: &mut Vec<&'a NavLink>) {
    match node {
        NavigationNode::Leaf(link) => out.push(link),
        NavigationNode::Group(group) => {
            for child in &group.children {
                collect_leaves(child, out);
            }
        }
    }
}

/// User block shown at the bottom of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBlock {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Organization block shown at the top of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationBlock {
    pub name: String,
    pub role: String,
}

/// Navigation description handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub user: Option<UserBlock>,
    pub organization: OrganizationBlock,
    pub nodes: Vec<NavigationNode>,
}

impl Navigation {
    /// Find a top-level node by title.
    pub fn node(&self, title: &str) -> Option<&NavigationNode> {
        self.nodes.iter().find(|node| node.title() == title)
    }
}

/// Whether the actor's role equals the elevated super-role value.
pub fn is_elevated(actor: Option<&Actor>, elevated_role: &str) -> bool {
    actor.is_some_and(|actor| actor.role == elevated_role)
}

/// Organization label used when the actor has no company.
pub const DEFAULT_ORGANIZATION: &str = "BrewOps";

/// One-shot navigation build with the default organization label.
pub fn build_navigation(
    descriptor: &MenuDescriptor,
    actor: Option<&Actor>,
    is_elevated: bool,
) -> Navigation {
    NavigationBuilder::new(descriptor.clone(), DEFAULT_ORGANIZATION).build(actor, is_elevated)
}

/// Builds the navigation for an actor from a static descriptor.
///
/// No grant-based pruning happens here; the route guard enforces access when
/// a view is opened. The elevated node is the only build-time decision.
#[derive(Debug, Clone)]
pub struct NavigationBuilder {
    descriptor: MenuDescriptor,
    default_organization: String,
}

impl NavigationBuilder {
    pub fn new(descriptor: MenuDescriptor, default_organization: impl Into<String>) -> Self {
        Self {
            descriptor,
            default_organization: default_organization.into(),
        }
    }

    pub fn descriptor(&self) -> &MenuDescriptor {
        &self.descriptor
    }

    pub fn build(&self, actor: Option<&Actor>, is_elevated: bool) -> Navigation {
        let user = actor.map(|actor| UserBlock {
            name: actor.name.clone(),
            email: actor.email.clone(),
            avatar: actor.avatar.clone(),
        });
        let organization = OrganizationBlock {
            name: actor
                .and_then(|actor| actor.company.clone())
                .filter(|company| !company.trim().is_empty())
                .unwrap_or_else(|| self.default_organization.clone()),
            role: actor.map(|actor| actor.role.clone()).unwrap_or_default(),
        };

        let mut nodes = self.descriptor.nodes.clone();
        if is_elevated {
            if let Some(elevated) = &self.descriptor.elevated {
                let position = elevated
                    .after
                    .as_deref()
                    .and_then(|title| nodes.iter().position(|node| node.title() == title))
                    .map(|index| index + 1)
                    .unwrap_or(nodes.len());
                nodes.insert(position, elevated.node.clone());
            }
        }

        Navigation {
            user,
            organization,
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Grant;

    fn actor(role: &str) -> Actor {
        Actor::new("u-3", "Iker", "iker@cerveceria.invalid", Vec::new())
            .with_role(role)
            .with_company("Cervecería del Norte")
    }

    fn builder() -> NavigationBuilder {
        NavigationBuilder::new(MenuDescriptor::brewery_default(), "BrewOps")
    }

    #[test]
    fn elevated_role_splices_roles_node() {
        let admin = actor("SuperAdmin");
        let nav = builder().build(Some(&admin), is_elevated(Some(&admin), "SuperAdmin"));
        let titles: Vec<_> = nav.nodes.iter().map(NavigationNode::title).collect();
        let config = titles.iter().position(|t| *t == "Configuración").unwrap();
        assert_eq!(titles[config + 1], "Roles");
    }

    #[test]
    fn other_roles_omit_roles_node() {
        for role in ["Operario", "superadmin", ""] {
            let user = actor(role);
            let nav = builder().build(Some(&user), is_elevated(Some(&user), "SuperAdmin"));
            assert!(nav.node("Roles").is_none(), "role {role:?}");
            assert_eq!(
                nav.nodes.len(),
                MenuDescriptor::brewery_default().nodes.len()
            );
        }
    }

    #[test]
    fn all_nodes_present_regardless_of_grants() {
        let bare = actor("Operario");
        let granted = Actor {
            grants: vec![Grant::new("inventario:read", "Inventario")],
            ..actor("Operario")
        };
        assert_eq!(
            builder().build(Some(&bare), false).nodes,
            builder().build(Some(&granted), false).nodes
        );
    }

    #[test]
    fn user_and_organization_blocks_follow_actor() {
        let user = actor("Operario");
        let nav = builder().build(Some(&user), false);
        assert_eq!(nav.user.as_ref().unwrap().name, "Iker");
        assert_eq!(nav.organization.name, "Cervecería del Norte");
        assert_eq!(nav.organization.role, "Operario");

        let anonymous = builder().build(None, false);
        assert!(anonymous.user.is_none());
        assert_eq!(anonymous.organization.name, "BrewOps");
    }

    #[test]
    fn elevated_node_appends_when_anchor_missing() {
        let mut descriptor = MenuDescriptor::brewery_default();
        if let Some(elevated) = descriptor.elevated.as_mut() {
            elevated.after = Some("Inexistente".into());
        }
        let nav = NavigationBuilder::new(descriptor, "BrewOps").build(None, true);
        assert_eq!(nav.nodes.last().unwrap().title(), "Roles");
    }

    #[test]
    fn leaves_walk_groups_depth_first() {
        let group: NavigationNode = NavGroup::new(
            "Producción",
            vec![
                NavLink::new("Lotes", "/produccion/lotes").into(),
                NavGroup::new(
                    "Calidad",
                    vec![NavLink::new("Análisis", "/produccion/calidad").into()],
                )
                .into(),
            ],
        )
        .into();
        let targets: Vec<_> = group.leaves().iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, vec!["/produccion/lotes", "/produccion/calidad"]);
    }

    #[test]
    fn one_shot_build_matches_builder() {
        let admin = actor("SuperAdmin");
        let descriptor = MenuDescriptor::brewery_default();
        assert_eq!(
            build_navigation(&descriptor, Some(&admin), true),
            builder().build(Some(&admin), true)
        );
    }
}
