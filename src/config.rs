use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::auth::{RouteGuard, RouteRegistry, UnregisteredRoutePolicy};
use crate::errors::AccessError;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DECISION_CACHE_CAPACITY: usize = 1024;

/// Access layer configuration with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// JSON route registry replacing the built-in table
    #[serde(default)]
    pub routes_file: Option<String>,

    /// Behaviour for warehouse pages missing from the registry
    #[serde(default)]
    pub unregistered_route_policy: UnregisteredRoutePolicy,

    /// Memoised decisions per granted set, 0 = disabled
    #[serde(default = "default_decision_cache_capacity")]
    pub decision_cache_capacity: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            routes_file: None,
            unregistered_route_policy: UnregisteredRoutePolicy::default(),
            decision_cache_capacity: default_decision_cache_capacity(),
        }
    }
}

impl AccessConfig {
    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// The registry named by `routes_file`, or the built-in one.
    pub fn route_registry(&self) -> Result<RouteRegistry, AccessError> {
        match &self.routes_file {
            Some(path) => {
                info!("Loading route registry from {}", path);
                RouteRegistry::from_json_file(path)
            }
            None => Ok(RouteRegistry::builtin()),
        }
    }

    /// Route guard with the configured registry and policy.
    pub fn build_route_guard(&self) -> Result<RouteGuard, AccessError> {
        Ok(RouteGuard::new(self.route_registry()?).with_policy(self.unregistered_route_policy))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AccessConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_decision_cache_capacity() -> usize {
    DEFAULT_DECISION_CACHE_CAPACITY
}

fn profile_path(config_dir: &Path, profile: &str) -> String {
    config_dir.join(profile).to_string_lossy().into_owned()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("bale_access={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Loads access configuration from `config/` under the working directory.
pub fn load_config() -> Result<AccessConfig, AccessConfigError> {
    load_config_from(CONFIG_DIR)
}

/// Loads access configuration
///
/// Emits no log events; callers report the outcome after [`init_tracing`].
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config ({dir}/default.toml)
/// 3. Environment-specific config ({dir}/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config_from(config_dir: impl AsRef<Path>) -> Result<AccessConfig, AccessConfigError> {
    let config_dir = config_dir.as_ref();
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&profile_path(config_dir, "default")).required(false))
        .add_source(File::with_name(&profile_path(config_dir, &run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let access_config: AccessConfig = config.try_deserialize()?;

    access_config.validate()?;
    Ok(access_config)
}
