//! Bale access control
//!
//! Hierarchical wildcard permission matching and warehouse route guarding for
//! the Bale inventory platform.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;

pub use auth::{
    check_route_access, has_permission, matches_wildcard, GrantedPermissions, RouteAccess,
    RouteGuard, RouteRegistry,
};
pub use errors::AccessError;
