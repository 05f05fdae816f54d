/*!
 * # Route Guard
 *
 * Page-level access control for warehouse-scoped URLs. A pathname such as
 * `/warehouse/acme/goods-outward/42` resolves to the route key
 * `goods-outward`, whose registry entry names the permission to check. Denials
 * carry a redirect to the restricted page of the same warehouse.
 */

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::permissions::{has_permission, GrantedPermissions};
use super::routes::RouteRegistry;
use crate::errors::AccessError;

/// URL prefix under which every warehouse-scoped page lives.
pub const WAREHOUSE_PREFIX: &str = "/warehouse";

/// Route key of the page users are sent to when access is denied.
pub const RESTRICTED_ROUTE: &str = "restricted";

/// What to do when a warehouse page has no registry entry.
///
/// No variant opens an unregistered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnregisteredRoutePolicy {
    /// Return [`AccessError::UnregisteredRoute`] to the caller.
    #[default]
    Error,
    /// Log the gap and deny with a redirect to the restricted page.
    Deny,
}

/// Outcome of a route check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAccess {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl RouteAccess {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            redirect_to: None,
        }
    }

    pub fn deny(redirect_to: impl Into<String>) -> Self {
        Self {
            allowed: false,
            redirect_to: Some(redirect_to.into()),
        }
    }
}

/// Extract the route key for `pathname` inside warehouse `warehouse_slug`.
///
/// The key is the first segment after `/warehouse/{slug}/`; query strings and
/// fragments are ignored. Only the bare warehouse root (`/warehouse/{slug}` or
/// `/warehouse/{slug}/`) yields an empty key. Repeated slashes before the
/// first segment are skipped, and a remainder made only of slashes is rejected.
pub fn route_key<'a>(pathname: &'a str, warehouse_slug: &str) -> Result<&'a str, AccessError> {
    let path = pathname.split(['?', '#']).next().unwrap_or_default();
    let scope = format!("{}/{}", WAREHOUSE_PREFIX, warehouse_slug);

    let rest = path
        .strip_prefix(scope.as_str())
        .ok_or_else(|| outside_scope(pathname, warehouse_slug))?;

    match rest {
        "" | "/" => Ok(""),
        _ => rest
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').find(|segment| !segment.is_empty()))
            .ok_or_else(|| outside_scope(pathname, warehouse_slug)),
    }
}

fn outside_scope(pathname: &str, warehouse_slug: &str) -> AccessError {
    AccessError::OutsideWarehouseScope {
        path: pathname.to_string(),
        warehouse: warehouse_slug.to_string(),
    }
}

/// Redirect target for a denied page, with `page` form-encoded.
pub fn restricted_redirect(warehouse_slug: &str, page: &str) -> String {
    let page: String = url::form_urlencoded::byte_serialize(page.as_bytes()).collect();
    format!(
        "{}/{}/{}?page={}",
        WAREHOUSE_PREFIX, warehouse_slug, RESTRICTED_ROUTE, page
    )
}

/// Decides page access from a registry and a caller's granted permissions.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    registry: RouteRegistry,
    policy: UnregisteredRoutePolicy,
}

impl RouteGuard {
    pub fn new(registry: RouteRegistry) -> Self {
        Self {
            registry,
            policy: UnregisteredRoutePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnregisteredRoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn policy(&self) -> UnregisteredRoutePolicy {
        self.policy
    }

    /// Check `pathname` against a plain granted list.
    pub fn check<S: AsRef<str>>(
        &self,
        pathname: &str,
        warehouse_slug: &str,
        granted: &[S],
    ) -> Result<RouteAccess, AccessError> {
        self.check_with(pathname, warehouse_slug, |required| {
            has_permission(required, granted)
        })
    }

    /// Check `pathname` against a prepared [`GrantedPermissions`] set.
    pub fn check_granted(
        &self,
        pathname: &str,
        warehouse_slug: &str,
        granted: &GrantedPermissions,
    ) -> Result<RouteAccess, AccessError> {
        self.check_with(pathname, warehouse_slug, |required| {
            granted.has_permission(required)
        })
    }

    fn check_with<F>(
        &self,
        pathname: &str,
        warehouse_slug: &str,
        is_granted: F,
    ) -> Result<RouteAccess, AccessError>
    where
        F: Fn(&str) -> bool,
    {
        let key = route_key(pathname, warehouse_slug)?;

        // Warehouse root and the restricted page are always reachable.
        if key.is_empty() || key == RESTRICTED_ROUTE {
            return Ok(RouteAccess::allow());
        }

        let Some(entry) = self.registry.get(key) else {
            return match self.policy {
                UnregisteredRoutePolicy::Error => {
                    Err(AccessError::UnregisteredRoute(key.to_string()))
                }
                UnregisteredRoutePolicy::Deny => {
                    error!(
                        route = key,
                        warehouse = warehouse_slug,
                        "Route has no permission entry; denying access"
                    );
                    Ok(RouteAccess::deny(restricted_redirect(warehouse_slug, key)))
                }
            };
        };

        if is_granted(&entry.permission) {
            debug!(route = key, permission = %entry.permission, "Route access granted");
            Ok(RouteAccess::allow())
        } else {
            debug!(route = key, permission = %entry.permission, "Route access denied");
            Ok(RouteAccess::deny(restricted_redirect(
                warehouse_slug,
                &entry.display_name,
            )))
        }
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(RouteRegistry::builtin())
    }
}

lazy_static! {
    static ref DEFAULT_GUARD: RouteGuard = RouteGuard::default();
}

/// Check page access against the built-in registry.
///
/// Unregistered pages are reported as [`AccessError::UnregisteredRoute`].
pub fn check_route_access<S: AsRef<str>>(
    pathname: &str,
    warehouse_slug: &str,
    granted: &[S],
) -> Result<RouteAccess, AccessError> {
    DEFAULT_GUARD.check(pathname, warehouse_slug, granted)
}
