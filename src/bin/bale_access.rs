use anyhow::{Context, Result};
use bale_access::{
    auth::{PermissionService, RbacService, RouteEntry, RouteGuard},
    config::{self, AccessConfig},
    GrantedPermissions, RouteAccess,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load configuration")?;
    config::init_tracing(config.log_level(), config.log_json);
    info!(
        environment = %config.environment,
        routes_file = config.routes_file.as_deref().unwrap_or("builtin"),
        policy = ?config.unregistered_route_policy,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Check(args) => handle_check(&config, args, cli.json)?,
        Commands::Route(args) => handle_route(&config, args, cli.json)?,
        Commands::Routes => handle_routes(&config, cli.json)?,
        Commands::Role(args) => handle_role(args, cli.json)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "bale-access",
    about = "Inspect Bale permission and route access decisions",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a required permission against granted patterns
    Check(CheckArgs),
    /// Check page access for a warehouse pathname
    Route(RouteArgs),
    /// List the active route registry
    Routes,
    /// Show the granted patterns of a built-in role
    Role(RoleArgs),
}

#[derive(Args)]
struct GrantArgs {
    #[arg(
        long,
        value_delimiter = ',',
        help = "Granted permission patterns, comma separated"
    )]
    granted: Vec<String>,
    #[arg(
        long,
        conflicts_with = "granted",
        help = "Use the patterns of a built-in role instead of --granted"
    )]
    role: Option<String>,
}

impl GrantArgs {
    fn resolve(self, cache_capacity: usize) -> GrantedPermissions {
        let patterns = match self.role {
            Some(role) => RbacService::new().get_role_permissions(&role),
            None => self.granted,
        };
        GrantedPermissions::new(patterns).with_decision_cache(cache_capacity)
    }
}

#[derive(Args)]
struct CheckArgs {
    #[arg(help = "Required permission, e.g. movement.outward.create")]
    required: String,
    #[command(flatten)]
    grants: GrantArgs,
}

#[derive(Args)]
struct RouteArgs {
    #[arg(help = "Pathname, e.g. /warehouse/acme/inventory")]
    pathname: String,
    #[arg(long, help = "Warehouse slug the pathname belongs to")]
    slug: String,
    #[command(flatten)]
    grants: GrantArgs,
}

#[derive(Args)]
struct RoleArgs {
    #[arg(help = "Role name, e.g. staff")]
    name: String,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "List the catalogued permissions each pattern grants"
    )]
    explain: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    required: String,
    granted: Vec<String>,
    allowed: bool,
}

#[derive(Debug, Serialize)]
struct RoleReport {
    name: String,
    description: String,
    permissions: Vec<PatternReport>,
}

#[derive(Debug, Serialize)]
struct PatternReport {
    pattern: String,
    grants: Vec<String>,
}

fn check_report(args: CheckArgs, cache_capacity: usize) -> CheckReport {
    let granted = args.grants.resolve(cache_capacity);
    let allowed = granted.has_permission(&args.required);
    debug!(required = %args.required, allowed, "Evaluated permission");

    CheckReport {
        required: args.required,
        granted: granted.as_slice().to_vec(),
        allowed,
    }
}

fn route_report(guard: &RouteGuard, args: RouteArgs, cache_capacity: usize) -> Result<RouteAccess> {
    let granted = args.grants.resolve(cache_capacity);
    guard
        .check_granted(&args.pathname, &args.slug, &granted)
        .with_context(|| format!("cannot decide access for {}", args.pathname))
}

fn role_report(args: &RoleArgs) -> Result<RoleReport> {
    let role = RbacService::new()
        .get_role(&args.name)
        .with_context(|| format!("unknown role '{}'", args.name))?;
    let catalogue = PermissionService::new();

    let permissions = role
        .permissions
        .iter()
        .map(|pattern| PatternReport {
            pattern: pattern.clone(),
            grants: if args.explain {
                catalogue
                    .expand(pattern)
                    .into_iter()
                    .map(|p| p.name.clone())
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    Ok(RoleReport {
        name: role.name.clone(),
        description: role.description.clone(),
        permissions,
    })
}

fn handle_check(config: &AccessConfig, args: CheckArgs, json: bool) -> Result<()> {
    let report = check_report(args, config.decision_cache_capacity);

    if json {
        print_json(&report)?;
    } else {
        let verdict = if report.allowed { "allowed" } else { "denied" };
        println!("{}: {}", report.required, verdict);
    }

    Ok(())
}

fn handle_route(config: &AccessConfig, args: RouteArgs, json: bool) -> Result<()> {
    let guard = build_guard(config)?;
    let pathname = args.pathname.clone();
    let access = route_report(&guard, args, config.decision_cache_capacity)?;

    if json {
        print_json(&access)?;
    } else if access.allowed {
        println!("{}: allowed", pathname);
    } else {
        println!(
            "{}: denied, redirect to {}",
            pathname,
            access.redirect_to.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn handle_routes(config: &AccessConfig, json: bool) -> Result<()> {
    let guard = build_guard(config)?;
    let registry = guard.registry();

    if json {
        let routes: BTreeMap<&str, &RouteEntry> = registry.iter().collect();
        print_json(&routes)?;
    } else {
        for (key, entry) in registry.iter() {
            println!("{:<18} {:<30} {}", key, entry.permission, entry.display_name);
        }
    }

    Ok(())
}

fn handle_role(args: RoleArgs, json: bool) -> Result<()> {
    let report = role_report(&args)?;

    if json {
        return print_json(&report);
    }

    let catalogue = PermissionService::new();
    println!("{} - {}", report.name, report.description);
    for pattern in &report.permissions {
        println!("  {}", pattern.pattern);
        for name in &pattern.grants {
            let description = catalogue
                .get_permission(name)
                .map_or("", |p| p.description.as_str());
            println!("      {:<30} {}", name, description);
        }
    }

    Ok(())
}

fn build_guard(config: &AccessConfig) -> Result<RouteGuard> {
    config
        .build_route_guard()
        .context("failed to build route guard")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
