//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Access-control core of the BrewOps dashboard."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
//! Access control for the BrewOps dashboard: the permission model derived
//! from the signed-in actor, the route guard, the session store both read
//! from, and the builder producing the sidebar navigation.

pub mod actor;
pub mod guard;
pub mod menu;
pub mod metrics;
pub mod navigation;
pub mod permissions;
pub mod routes;
pub mod session;

pub use actor::{Actor, Grant, SessionToken};
pub use guard::{
    evaluate_access, AccessDecision, Navigator, RouteGuard, RouteTarget, SharedRouteGuard,
    SignInRoute, TracingNavigator, NO_ACCESS_NOTICE,
};
pub use menu::{ElevatedNode, MenuDescriptor, MenuError};
pub use metrics::AccessMetrics;
pub use navigation::{
    build_navigation, is_elevated, NavGroup, NavLink, Navigation, NavigationBuilder,
    NavigationNode, OrganizationBlock, UserBlock, DEFAULT_ORGANIZATION,
};
pub use permissions::PermissionModel;
pub use routes::RouteTable;
pub use session::{Session, SessionError, SessionStore};
