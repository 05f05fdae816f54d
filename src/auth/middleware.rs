/*!
 * # Access Middleware
 *
 * axum glue for hosts that serve Bale pages or APIs. The host authenticates
 * the request and inserts an `Arc<GrantedPermissions>` into the request
 * extensions; these layers only read it. A request without one is treated as
 * having no permissions.
 */

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::permissions::GrantedPermissions;
use super::route_guard::{RouteGuard, WAREHOUSE_PREFIX};
use crate::errors::AccessError;

fn granted_from(request: &Request) -> Arc<GrantedPermissions> {
    request
        .extensions()
        .get::<Arc<GrantedPermissions>>()
        .cloned()
        .unwrap_or_else(|| Arc::new(GrantedPermissions::empty()))
}

/// Slug of the warehouse a path belongs to, if it is warehouse-scoped.
///
/// Extra slashes before the slug are skipped so such paths still reach the guard.
pub fn warehouse_slug(path: &str) -> Option<&str> {
    path.strip_prefix(WAREHOUSE_PREFIX)?
        .strip_prefix('/')?
        .trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .filter(|slug| !slug.is_empty())
}

/// Permission middleware to check if the caller holds the required permission
pub async fn permission_middleware(
    State(required_permission): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let granted = granted_from(&request);

    if !granted.has_permission(&required_permission) {
        debug!(
            path = %request.uri().path(),
            permission = %required_permission,
            "Permission denied"
        );
        return Err(AccessError::Forbidden(required_permission.to_string()));
    }

    Ok(next.run(request).await)
}

/// Page guard for `/warehouse/{slug}/...` paths.
///
/// Denied pages redirect to the restricted page; registry gaps under the
/// `Error` policy become a 500 response. Other paths pass through.
pub async fn route_guard_middleware(
    State(guard): State<Arc<RouteGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(slug) = warehouse_slug(&path) else {
        return next.run(request).await;
    };

    let granted = granted_from(&request);
    match guard.check_granted(&path, slug, &granted) {
        Ok(access) if access.allowed => next.run(request).await,
        Ok(access) => {
            let target = access.redirect_to.unwrap_or_default();
            Redirect::to(&target).into_response()
        }
        Err(err) => {
            error!(path = %path, error = %err, "Route guard rejected request");
            err.into_response()
        }
    }
}

/// Extension methods for Router to add access middleware
pub trait AccessRouterExt {
    fn with_permission(self, permission: &str) -> Self;
    fn with_route_guard(self, guard: Arc<RouteGuard>) -> Self;
}

impl<S> AccessRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            Arc::<str>::from(permission),
            permission_middleware,
        ))
    }

    fn with_route_guard(self, guard: Arc<RouteGuard>) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            guard,
            route_guard_middleware,
        ))
    }
}
