/*!
 * # Authorization Module
 *
 * Permission checks for the Bale warehouse platform. Granted permissions
 * arrive as flat lists of dot-path patterns (loaded by the host from the
 * role tables); this module decides whether they satisfy a required
 * permission, and guards warehouse pages through a static route registry.
 *
 * - [`matches_wildcard`]: one required permission against one pattern
 * - [`has_permission`] / [`GrantedPermissions`]: against a whole granted list
 * - [`check_route_access`] / [`RouteGuard`]: page-level decisions with redirects
 * - [`AccessRouterExt`]: axum layers built on the above
 */

// Feature modules
mod matcher;
mod middleware;
mod permissions;
mod rbac;
mod route_guard;
mod routes;

// Re-exports
pub use matcher::*;
pub use middleware::*;
pub use permissions::*;
pub use rbac::*;
pub use route_guard::*;
pub use routes::*;
