/*!
 * # Role Presets
 *
 * Built-in roles and the granted patterns each starts with. Companies assign
 * roles and edit their permissions in the database; these presets are the
 * read-only seeds used by fixtures, tests and the diagnostic CLI.
 */

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use super::permissions::{consts, GrantedPermissions};

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

// Define standard roles and their permissions
lazy_static! {
    pub static ref ROLES: HashMap<String, Role> = {
        let mut roles = HashMap::new();

        // Admin role - has all permissions
        roles.insert(
            "admin".to_string(),
            Role {
                name: "admin".to_string(),
                description: "Company administrator with full access".to_string(),
                permissions: vec!["*".to_string()],
            },
        );

        roles.insert(
            "manager".to_string(),
            Role {
                name: "manager".to_string(),
                description: "Warehouse manager running day-to-day operations".to_string(),
                permissions: vec![
                    "inventory.*".to_string(),
                    "movement.*".to_string(),
                    "orders.*".to_string(),
                    "partners.*".to_string(),
                    consts::WAREHOUSES_READ.to_string(),
                    consts::USERS_READ.to_string(),
                    consts::INVITES_READ.to_string(),
                    consts::INVITES_CREATE.to_string(),
                ],
            },
        );

        // Floor staff record movements and look up stock
        roles.insert(
            "staff".to_string(),
            Role {
                name: "staff".to_string(),
                description: "Warehouse staff recording goods movements".to_string(),
                permissions: vec![
                    "movement.*".to_string(),
                    consts::PRODUCTS_READ.to_string(),
                ],
            },
        );

        roles.insert(
            "viewer".to_string(),
            Role {
                name: "viewer".to_string(),
                description: "Read-only access to warehouse data".to_string(),
                permissions: vec![
                    "inventory.*.read".to_string(),
                    "movement.*.read".to_string(),
                    "orders.*.read".to_string(),
                    consts::PARTNERS_READ.to_string(),
                    consts::WAREHOUSES_READ.to_string(),
                ],
            },
        );

        roles
    };
}

/// Lookup service over the built-in role presets
#[derive(Clone, Default)]
pub struct RbacService;

impl RbacService {
    pub fn new() -> Self {
        Self
    }

    /// Get a role by name
    pub fn get_role(&self, role_name: &str) -> Option<&'static Role> {
        ROLES.get(role_name)
    }

    /// Get all roles, sorted by name
    pub fn get_all_roles(&self) -> Vec<&'static Role> {
        let mut roles: Vec<_> = ROLES.values().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    /// Get all permissions for a role. Unknown roles grant nothing.
    pub fn get_role_permissions(&self, role_name: &str) -> Vec<String> {
        match ROLES.get(role_name) {
            Some(role) => role.permissions.clone(),
            None => {
                warn!("Role not found: {}", role_name);
                vec![]
            }
        }
    }

    /// Union of the permissions of several roles, de-duplicated and sorted.
    pub fn get_permissions_for_roles(&self, role_names: &[String]) -> Vec<String> {
        let mut permissions = BTreeSet::new();

        for role_name in role_names {
            permissions.extend(self.get_role_permissions(role_name));
        }

        permissions.into_iter().collect()
    }

    /// A ready-to-evaluate permission set for one role.
    pub fn granted_for_role(&self, role_name: &str) -> GrantedPermissions {
        GrantedPermissions::new(self.get_role_permissions(role_name))
    }
}
