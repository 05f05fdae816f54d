/*!
 * # Route Registry
 *
 * Static mapping from a warehouse-scoped page (the first path segment after
 * `/warehouse/{slug}/`) to the permission required to open it. The built-in
 * table ships with the application; deployments may replace it with a JSON
 * file of the same shape:
 *
 * ```json
 * {
 *   "inventory": { "permission": "inventory.products.read", "displayName": "Inventory" },
 *   "settings": { "permission": "companies.update", "displayName": "Settings", "description": "Company settings" }
 * }
 * ```
 */

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::permissions::consts;
use crate::errors::AccessError;

/// Permission requirement for one warehouse page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub permission: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RouteEntry {
    pub fn new(permission: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            display_name: display_name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// Built-in Bale page table
lazy_static! {
    pub static ref ROUTE_PERMISSIONS: BTreeMap<String, RouteEntry> = {
        let mut routes = BTreeMap::new();

        let mut add = |key: &str, entry: RouteEntry| {
            routes.insert(key.to_string(), entry);
        };

        add(
            "inventory",
            RouteEntry::new(consts::PRODUCTS_READ, "Inventory")
                .with_description("Stock overview across products"),
        );
        add("products", RouteEntry::new(consts::PRODUCTS_READ, "Products"));
        add(
            "stock-units",
            RouteEntry::new(consts::STOCK_UNITS_READ, "Stock Units"),
        );
        add(
            "goods-inward",
            RouteEntry::new(consts::INWARD_READ, "Goods Inward")
                .with_description("Receipts of goods into the warehouse"),
        );
        add(
            "goods-outward",
            RouteEntry::new(consts::OUTWARD_READ, "Goods Outward")
                .with_description("Dispatches of goods out of the warehouse"),
        );
        add(
            "goods-transfer",
            RouteEntry::new(consts::TRANSFER_READ, "Goods Transfer")
                .with_description("Movements between warehouses"),
        );
        add("partners", RouteEntry::new(consts::PARTNERS_READ, "Partners"));
        add(
            "sales-orders",
            RouteEntry::new(consts::SALES_ORDERS_READ, "Sales Orders"),
        );
        add(
            "purchase-orders",
            RouteEntry::new(consts::PURCHASE_ORDERS_READ, "Purchase Orders"),
        );
        add(
            "qr-codes",
            RouteEntry::new(consts::QR_BATCHES_READ, "QR Codes")
                .with_description("Label batches for stock units"),
        );
        add("staff", RouteEntry::new(consts::USERS_READ, "Staff"));
        add("invites", RouteEntry::new(consts::INVITES_READ, "Invites"));
        add(
            "warehouses",
            RouteEntry::new(consts::WAREHOUSES_READ, "Warehouses"),
        );
        add(
            "settings",
            RouteEntry::new(consts::COMPANIES_UPDATE, "Settings")
                .with_description("Company settings"),
        );

        routes
    };
}

/// Read-only lookup table consulted by the route guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRegistry {
    routes: BTreeMap<String, RouteEntry>,
}

impl RouteRegistry {
    /// The table compiled into the application.
    pub fn builtin() -> Self {
        Self {
            routes: ROUTE_PERMISSIONS.clone(),
        }
    }

    /// Build a registry from explicit entries. Later duplicates replace earlier ones.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, RouteEntry)>,
        K: Into<String>,
    {
        Self {
            routes: entries
                .into_iter()
                .map(|(key, entry)| (key.into(), entry))
                .collect(),
        }
    }

    /// Parse and validate a JSON object of route key to entry.
    pub fn from_json_str(raw: &str) -> Result<Self, AccessError> {
        let routes: BTreeMap<String, RouteEntry> = serde_json::from_str(raw)?;

        for (key, entry) in &routes {
            if key.is_empty() || key.contains('/') {
                return Err(AccessError::InvalidRegistry(format!(
                    "route key '{}' must be a single non-empty path segment",
                    key
                )));
            }
            if entry.permission.trim().is_empty() {
                return Err(AccessError::InvalidRegistry(format!(
                    "route '{}' has an empty permission",
                    key
                )));
            }
            if entry.display_name.trim().is_empty() {
                return Err(AccessError::InvalidRegistry(format!(
                    "route '{}' has an empty displayName",
                    key
                )));
            }
        }

        Ok(Self { routes })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AccessError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.routes.get(key)
    }

    /// Route keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteEntry)> {
        self.routes.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn builtin_covers_the_warehouse_pages() {
        let registry = RouteRegistry::builtin();
        let inventory = registry.get("inventory").expect("inventory registered");
        assert_eq!(inventory.permission, "inventory.products.read");
        assert_eq!(inventory.display_name, "Inventory");

        let settings = registry.get("settings").expect("settings registered");
        assert_eq!(settings.permission, "companies.update");
        assert_eq!(settings.display_name, "Settings");

        for key in ["goods-inward", "goods-outward", "goods-transfer", "partners", "staff"] {
            assert!(registry.get(key).is_some(), "{key} should be registered");
        }
        assert!(registry.get("restricted").is_none());
    }

    #[test]
    fn builtin_keys_are_single_segments() {
        for key in RouteRegistry::builtin().keys() {
            assert!(!key.is_empty());
            assert!(!key.contains('/'));
        }
    }

    #[test]
    fn parses_json_with_camel_case_fields() {
        let registry = RouteRegistry::from_json_str(
            r#"{
                "inventory": { "permission": "inventory.products.read", "displayName": "Inventory" },
                "settings": {
                    "permission": "companies.update",
                    "displayName": "Settings",
                    "description": "Company settings"
                }
            }"#,
        )
        .expect("valid registry");

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("settings"),
            Some(&RouteEntry::new("companies.update", "Settings").with_description("Company settings"))
        );
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["inventory", "settings"]);
    }

    #[test]
    fn rejects_malformed_entries() {
        assert_matches!(
            RouteRegistry::from_json_str(r#"{ "a/b": { "permission": "x", "displayName": "X" } }"#),
            Err(AccessError::InvalidRegistry(_))
        );
        assert_matches!(
            RouteRegistry::from_json_str(r#"{ "": { "permission": "x", "displayName": "X" } }"#),
            Err(AccessError::InvalidRegistry(_))
        );
        assert_matches!(
            RouteRegistry::from_json_str(r#"{ "a": { "permission": " ", "displayName": "X" } }"#),
            Err(AccessError::InvalidRegistry(_))
        );
        assert_matches!(
            RouteRegistry::from_json_str(r#"{ "a": { "permission": "x", "displayName": "" } }"#),
            Err(AccessError::InvalidRegistry(_))
        );
        assert_matches!(
            RouteRegistry::from_json_str(r#"{ "a": { "permission": "x" } }"#),
            Err(AccessError::Serialization(_))
        );
    }

    #[test]
    fn serialises_back_to_the_same_shape() {
        let entry = RouteEntry::new("partners.read", "Partners");
        let json = serde_json::to_value(&entry).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({ "permission": "partners.read", "displayName": "Partners" })
        );
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("routes.json");
        std::fs::write(
            &path,
            r#"{ "partners": { "permission": "partners.read", "displayName": "Partners" } }"#,
        )
        .expect("write routes");

        let registry = RouteRegistry::from_json_file(&path).expect("load");
        assert_eq!(registry.len(), 1);

        assert_matches!(
            RouteRegistry::from_json_file(dir.path().join("missing.json")),
            Err(AccessError::Io(_))
        );
    }
}
