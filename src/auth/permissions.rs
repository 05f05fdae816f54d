/*!
 * # Permissions Module
 *
 * Evaluates a required permission against a caller's granted patterns, and
 * describes the capabilities Bale guards. Permissions are dot-paths organised
 * by resource and action, e.g. `movement.outward.create`.
 */

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::matcher::{has_wildcard, matches_wildcard, SEGMENT_SEPARATOR};

/// Check whether any granted pattern satisfies `required`.
///
/// An exact string match short-circuits before any wildcard pattern is split
/// and walked. Only patterns containing `*` go through the matcher. An empty
/// granted list denies everything.
pub fn has_permission<S: AsRef<str>>(required: &str, granted: &[S]) -> bool {
    if granted.iter().any(|perm| perm.as_ref() == required) {
        return true;
    }

    granted
        .iter()
        .map(AsRef::as_ref)
        .filter(|pattern| has_wildcard(pattern))
        .any(|pattern| matches_wildcard(required, pattern))
}

/// Permission definition
#[derive(Debug, Clone)]
pub struct Permission {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub action: String,
}

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const COMPANIES: &'static str = "companies";
    pub const WAREHOUSES: &'static str = "warehouses";
    pub const PARTNERS: &'static str = "partners";
    pub const PRODUCTS: &'static str = "inventory.products";
    pub const STOCK_UNITS: &'static str = "inventory.stock_units";
    pub const QR_BATCHES: &'static str = "inventory.qr_batches";
    pub const GOODS_INWARD: &'static str = "movement.inward";
    pub const GOODS_OUTWARD: &'static str = "movement.outward";
    pub const GOODS_TRANSFER: &'static str = "movement.transfer";
    pub const SALES_ORDERS: &'static str = "orders.sales";
    pub const PURCHASE_ORDERS: &'static str = "orders.purchase";
    pub const USERS: &'static str = "users";
    pub const INVITES: &'static str = "users.invites";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Company
    pub const COMPANIES_READ: &str = "companies.read";
    pub const COMPANIES_UPDATE: &str = "companies.update";

    // Warehouses
    pub const WAREHOUSES_READ: &str = "warehouses.read";
    pub const WAREHOUSES_CREATE: &str = "warehouses.create";
    pub const WAREHOUSES_UPDATE: &str = "warehouses.update";
    pub const WAREHOUSES_DELETE: &str = "warehouses.delete";

    // Partners (customers, suppliers, agents)
    pub const PARTNERS_READ: &str = "partners.read";
    pub const PARTNERS_CREATE: &str = "partners.create";
    pub const PARTNERS_UPDATE: &str = "partners.update";
    pub const PARTNERS_DELETE: &str = "partners.delete";

    // Inventory
    pub const PRODUCTS_READ: &str = "inventory.products.read";
    pub const PRODUCTS_CREATE: &str = "inventory.products.create";
    pub const PRODUCTS_UPDATE: &str = "inventory.products.update";
    pub const PRODUCTS_DELETE: &str = "inventory.products.delete";
    pub const STOCK_UNITS_READ: &str = "inventory.stock_units.read";
    pub const STOCK_UNITS_UPDATE: &str = "inventory.stock_units.update";
    pub const QR_BATCHES_READ: &str = "inventory.qr_batches.read";
    pub const QR_BATCHES_CREATE: &str = "inventory.qr_batches.create";

    // Goods movements
    pub const INWARD_READ: &str = "movement.inward.read";
    pub const INWARD_CREATE: &str = "movement.inward.create";
    pub const OUTWARD_READ: &str = "movement.outward.read";
    pub const OUTWARD_CREATE: &str = "movement.outward.create";
    pub const TRANSFER_READ: &str = "movement.transfer.read";
    pub const TRANSFER_CREATE: &str = "movement.transfer.create";

    // Orders
    pub const SALES_ORDERS_READ: &str = "orders.sales.read";
    pub const SALES_ORDERS_CREATE: &str = "orders.sales.create";
    pub const SALES_ORDERS_UPDATE: &str = "orders.sales.update";
    pub const PURCHASE_ORDERS_READ: &str = "orders.purchase.read";
    pub const PURCHASE_ORDERS_CREATE: &str = "orders.purchase.create";
    pub const PURCHASE_ORDERS_UPDATE: &str = "orders.purchase.update";

    // Staff
    pub const USERS_READ: &str = "users.read";
    pub const USERS_UPDATE: &str = "users.update";
    pub const USERS_DELETE: &str = "users.delete";
    pub const INVITES_READ: &str = "users.invites.read";
    pub const INVITES_CREATE: &str = "users.invites.create";
    pub const INVITES_DELETE: &str = "users.invites.delete";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}{}{}", resource, SEGMENT_SEPARATOR, action)
}

fn define(perms: &mut HashMap<String, Permission>, resource: &str, action: &str, description: &str) {
    let name = format_permission(resource, action);
    perms.insert(
        name.clone(),
        Permission {
            name,
            description: description.to_string(),
            resource_type: resource.to_string(),
            action: action.to_string(),
        },
    );
}

// Permission set definition with descriptions
lazy_static! {
    pub static ref PERMISSIONS: HashMap<String, Permission> = {
        let mut perms = HashMap::new();

        define(&mut perms, Resources::COMPANIES, Actions::READ, "View company profile");
        define(&mut perms, Resources::COMPANIES, Actions::UPDATE, "Edit company settings");

        define(&mut perms, Resources::WAREHOUSES, Actions::READ, "View warehouses");
        define(&mut perms, Resources::WAREHOUSES, Actions::CREATE, "Create warehouses");
        define(&mut perms, Resources::WAREHOUSES, Actions::UPDATE, "Update warehouses");
        define(&mut perms, Resources::WAREHOUSES, Actions::DELETE, "Delete warehouses");

        define(&mut perms, Resources::PARTNERS, Actions::READ, "View customers, suppliers and agents");
        define(&mut perms, Resources::PARTNERS, Actions::CREATE, "Add partners");
        define(&mut perms, Resources::PARTNERS, Actions::UPDATE, "Update partners");
        define(&mut perms, Resources::PARTNERS, Actions::DELETE, "Delete partners");

        define(&mut perms, Resources::PRODUCTS, Actions::READ, "View products");
        define(&mut perms, Resources::PRODUCTS, Actions::CREATE, "Create products");
        define(&mut perms, Resources::PRODUCTS, Actions::UPDATE, "Update products");
        define(&mut perms, Resources::PRODUCTS, Actions::DELETE, "Delete products");

        define(&mut perms, Resources::STOCK_UNITS, Actions::READ, "View stock units");
        define(&mut perms, Resources::STOCK_UNITS, Actions::UPDATE, "Adjust stock units");

        define(&mut perms, Resources::QR_BATCHES, Actions::READ, "View QR code batches");
        define(&mut perms, Resources::QR_BATCHES, Actions::CREATE, "Generate QR code labels");

        define(&mut perms, Resources::GOODS_INWARD, Actions::READ, "View goods inward");
        define(&mut perms, Resources::GOODS_INWARD, Actions::CREATE, "Record goods inward");
        define(&mut perms, Resources::GOODS_OUTWARD, Actions::READ, "View goods outward");
        define(&mut perms, Resources::GOODS_OUTWARD, Actions::CREATE, "Record goods outward");
        define(&mut perms, Resources::GOODS_TRANSFER, Actions::READ, "View goods transfers");
        define(&mut perms, Resources::GOODS_TRANSFER, Actions::CREATE, "Transfer goods between warehouses");

        define(&mut perms, Resources::SALES_ORDERS, Actions::READ, "View sales orders");
        define(&mut perms, Resources::SALES_ORDERS, Actions::CREATE, "Create sales orders");
        define(&mut perms, Resources::SALES_ORDERS, Actions::UPDATE, "Update sales orders");
        define(&mut perms, Resources::PURCHASE_ORDERS, Actions::READ, "View purchase orders");
        define(&mut perms, Resources::PURCHASE_ORDERS, Actions::CREATE, "Create purchase orders");
        define(&mut perms, Resources::PURCHASE_ORDERS, Actions::UPDATE, "Update purchase orders");

        define(&mut perms, Resources::USERS, Actions::READ, "View staff");
        define(&mut perms, Resources::USERS, Actions::UPDATE, "Change staff roles");
        define(&mut perms, Resources::USERS, Actions::DELETE, "Remove staff");
        define(&mut perms, Resources::INVITES, Actions::READ, "View pending invites");
        define(&mut perms, Resources::INVITES, Actions::CREATE, "Invite staff");
        define(&mut perms, Resources::INVITES, Actions::DELETE, "Revoke invites");

        perms
    };
}

/// Service for looking up catalogued permissions
#[derive(Clone, Default)]
pub struct PermissionService;

impl PermissionService {
    /// Create a new permission service
    pub fn new() -> Self {
        Self
    }

    /// Get a permission by name
    pub fn get_permission(&self, name: &str) -> Option<&'static Permission> {
        PERMISSIONS.get(name)
    }

    /// Get all permissions, sorted by name
    pub fn get_all_permissions(&self) -> Vec<&'static Permission> {
        let mut all: Vec<_> = PERMISSIONS.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Get all permissions for a resource
    pub fn get_resource_permissions(&self, resource: &str) -> Vec<&'static Permission> {
        self.get_all_permissions()
            .into_iter()
            .filter(|p| p.resource_type == resource)
            .collect()
    }

    /// Check if a permission exists
    pub fn permission_exists(&self, name: &str) -> bool {
        PERMISSIONS.contains_key(name)
    }

    /// Catalogued permissions a single granted pattern satisfies, sorted by name.
    pub fn expand(&self, pattern: &str) -> Vec<&'static Permission> {
        self.get_all_permissions()
            .into_iter()
            .filter(|p| has_permission(&p.name, &[pattern]))
            .collect()
    }
}

/// A caller's granted patterns for one session/warehouse context.
///
/// Splits the list once into an exact-match set and the wildcard subset, and
/// can memoise decisions. Answers are always identical to [`has_permission`]
/// over the original list.
pub struct GrantedPermissions {
    granted: Vec<String>,
    exact: HashSet<String>,
    wildcards: Vec<String>,
    decisions: Option<DashMap<String, bool>>,
    cached: AtomicUsize,
    cache_capacity: usize,
}

impl GrantedPermissions {
    pub fn new<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let granted: Vec<String> = granted.into_iter().map(Into::into).collect();
        let exact = granted.iter().cloned().collect();
        let wildcards = granted
            .iter()
            .filter(|pattern| has_wildcard(pattern))
            .cloned()
            .collect();

        Self {
            granted,
            exact,
            wildcards,
            decisions: None,
            cached: AtomicUsize::new(0),
            cache_capacity: 0,
        }
    }

    /// An empty set; denies every permission.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Remember up to `capacity` decisions. A capacity of 0 disables the memo.
    pub fn with_decision_cache(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self.cached = AtomicUsize::new(0);
        self.decisions = (capacity > 0).then(DashMap::new);
        self
    }

    pub fn has_permission(&self, required: &str) -> bool {
        if self.exact.contains(required) {
            return true;
        }

        let Some(decisions) = &self.decisions else {
            return self.scan_wildcards(required);
        };

        if let Some(hit) = decisions.get(required) {
            return *hit;
        }

        let allowed = self.scan_wildcards(required);
        if self.reserve_cache_slot() && decisions.insert(required.to_string(), allowed).is_some() {
            // Another caller cached the same permission first.
            self.cached.fetch_sub(1, Ordering::AcqRel);
        }
        allowed
    }

    /// True when at least one of `required` is granted.
    pub fn has_any(&self, required: &[&str]) -> bool {
        required.iter().any(|perm| self.has_permission(perm))
    }

    /// True when every one of `required` is granted. Vacuously true for an empty slice.
    pub fn has_all(&self, required: &[&str]) -> bool {
        required.iter().all(|perm| self.has_permission(perm))
    }

    /// The granted patterns in their original order.
    pub fn as_slice(&self) -> &[String] {
        &self.granted
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    /// Number of memoised decisions currently held.
    pub fn cached_decisions(&self) -> usize {
        self.cached.load(Ordering::Acquire)
    }

    fn reserve_cache_slot(&self) -> bool {
        self.cached
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.cache_capacity).then_some(used + 1)
            })
            .is_ok()
    }

    fn scan_wildcards(&self, required: &str) -> bool {
        self.wildcards
            .iter()
            .any(|pattern| matches_wildcard(required, pattern))
    }
}

impl Clone for GrantedPermissions {
    fn clone(&self) -> Self {
        Self::new(self.granted.clone()).with_decision_cache(self.cache_capacity)
    }
}

impl fmt::Debug for GrantedPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantedPermissions")
            .field("granted", &self.granted)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl<S: Into<String>> FromIterator<S> for GrantedPermissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_fast_path() {
        assert!(has_permission("partners.read", &["partners.read"]));
        assert!(has_permission(
            consts::PRODUCTS_READ,
            &[consts::PARTNERS_READ.to_string(), consts::PRODUCTS_READ.to_string()]
        ));
    }

    #[test]
    fn wildcard_grants_are_scanned() {
        let granted = ["partners.read", "movement.*"];
        assert!(has_permission(consts::OUTWARD_CREATE, &granted));
        assert!(!has_permission(consts::COMPANIES_UPDATE, &granted));
    }

    #[test]
    fn patterns_without_star_never_widen() {
        // `inventory` is not a wildcard; it only matches itself.
        assert!(!has_permission(consts::PRODUCTS_READ, &["inventory"]));
        assert!(has_permission("inventory", &["inventory"]));
    }

    #[test]
    fn empty_grant_list_denies() {
        let granted: [&str; 0] = [];
        assert!(!has_permission(consts::PRODUCTS_READ, &granted));
        assert!(!GrantedPermissions::empty().has_permission(consts::PRODUCTS_READ));
    }

    #[test]
    fn global_wildcard_grants_everything() {
        assert!(has_permission(consts::COMPANIES_UPDATE, &["*"]));
        assert!(has_permission("anything.at.all", &["*"]));
    }

    #[test]
    fn granted_set_agrees_with_free_function() {
        let granted = vec!["movement.*", "inventory.products.read", "orders.*.read"];
        let set = GrantedPermissions::new(granted.clone()).with_decision_cache(16);
        for required in [
            consts::OUTWARD_CREATE,
            consts::PRODUCTS_READ,
            consts::PRODUCTS_UPDATE,
            consts::SALES_ORDERS_READ,
            consts::SALES_ORDERS_CREATE,
            consts::COMPANIES_UPDATE,
        ] {
            assert_eq!(
                set.has_permission(required),
                has_permission(required, &granted),
                "disagreement on {required}"
            );
        }
    }

    #[test]
    fn decision_cache_respects_capacity() {
        let set = GrantedPermissions::new(["movement.*"]).with_decision_cache(2);
        assert!(set.has_permission(consts::INWARD_READ));
        assert!(set.has_permission(consts::OUTWARD_READ));
        assert!(!set.has_permission(consts::PARTNERS_READ));
        assert_eq!(set.cached_decisions(), 2);
        // Cached answers stay correct on repeat lookups.
        assert!(set.has_permission(consts::INWARD_READ));
        assert!(!set.has_permission(consts::PARTNERS_READ));
    }

    #[test]
    fn concurrent_misses_stay_within_capacity() {
        let set = GrantedPermissions::new(["movement.*"]).with_decision_cache(8);
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let set = &set;
                scope.spawn(move || {
                    for n in 0..50 {
                        let required = format!("movement.w{worker}.n{n}");
                        assert!(set.has_permission(&required));
                        assert!(!set.has_permission(&format!("partners.w{worker}.n{n}")));
                    }
                });
            }
        });

        assert_eq!(set.cached_decisions(), 8);
        let held = set.decisions.as_ref().map_or(0, DashMap::len);
        assert_eq!(held, 8);
    }

    #[test]
    fn repeated_misses_on_one_permission_use_one_slot() {
        let set = GrantedPermissions::new(["movement.*"]).with_decision_cache(4);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| assert!(set.has_permission(consts::INWARD_READ)));
            }
        });
        assert_eq!(set.cached_decisions(), 1);
    }

    #[test]
    fn exact_hits_are_not_cached() {
        let set = GrantedPermissions::new([consts::PARTNERS_READ]).with_decision_cache(8);
        assert!(set.has_permission(consts::PARTNERS_READ));
        assert_eq!(set.cached_decisions(), 0);
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let set = GrantedPermissions::new(["movement.*"]).with_decision_cache(0);
        assert!(set.has_permission(consts::TRANSFER_CREATE));
        assert_eq!(set.cached_decisions(), 0);
    }

    #[test]
    fn has_any_and_has_all() {
        let set: GrantedPermissions = ["movement.*", consts::PRODUCTS_READ].into_iter().collect();
        assert!(set.has_any(&[consts::COMPANIES_UPDATE, consts::INWARD_CREATE]));
        assert!(!set.has_any(&[consts::COMPANIES_UPDATE, consts::USERS_READ]));
        assert!(set.has_all(&[consts::PRODUCTS_READ, consts::INWARD_CREATE]));
        assert!(!set.has_all(&[consts::PRODUCTS_READ, consts::PRODUCTS_UPDATE]));
        assert!(set.has_all(&[]));
    }

    #[test]
    fn clone_keeps_patterns_but_starts_a_fresh_cache() {
        let set = GrantedPermissions::new(["movement.*"]).with_decision_cache(4);
        assert!(set.has_permission(consts::INWARD_READ));
        let copy = set.clone();
        assert_eq!(copy.as_slice(), set.as_slice());
        assert_eq!(copy.cached_decisions(), 0);
        assert!(copy.has_permission(consts::INWARD_READ));
    }

    #[test]
    fn catalogue_lookups() {
        let service = PermissionService::new();
        assert!(service.permission_exists(consts::COMPANIES_UPDATE));
        assert!(!service.permission_exists("movement.*"));

        let perm = service
            .get_permission(consts::OUTWARD_CREATE)
            .expect("outward create is catalogued");
        assert_eq!(perm.resource_type, Resources::GOODS_OUTWARD);
        assert_eq!(perm.action, Actions::CREATE);

        let partners = service.get_resource_permissions(Resources::PARTNERS);
        assert_eq!(partners.len(), 4);
    }

    #[test]
    fn expand_lists_catalogue_entries_covered_by_a_pattern() {
        let service = PermissionService::new();
        let names: Vec<&str> = service
            .expand("movement.*.create")
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![consts::INWARD_CREATE, consts::OUTWARD_CREATE, consts::TRANSFER_CREATE]
        );

        assert_eq!(service.expand("*").len(), PERMISSIONS.len());
        assert!(service.expand("reports.*").is_empty());
    }
}
