//! rss-registry - Registry lookups
//!
//! Commands:
//! - users: List all registered users
//! - dn: DNs registered for a user
//! - user: User owning a DN
//! - groups: Groups of a user (or of a DN with --dn)
//! - host: Host owning a DN
//! - members: Users in a group
//! - properties: Properties of a group or host
//! - voms: VOMS role and VO of a group
//! - voms-groups: Groups carrying a VOMS role
//! - banned-ips: Banned IP addresses
//! - value: Raw option lookup

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rss_core::{logging, ConfigRegistry, LogLevel, Registry};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "rss-registry")]
#[command(about = "Look up users, groups, hosts and VOMS attributes in the registry")]
#[command(version)]
struct Cli {
    /// Registry configuration (default: ~/.config/rss/config.yaml, or $RSS_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Extra options as KEY=VALUE, e.g. LogLevel=DEBUG
    #[arg(short = 'o', long = "option", global = true, value_name = "KEY=VALUE")]
    options: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registered users
    Users,

    /// DNs registered for a user
    Dn { username: String },

    /// User owning a DN
    User { dn: String },

    /// Groups of a user
    Groups {
        username: Option<String>,

        /// Resolve the user from this DN instead
        #[arg(long, conflicts_with = "username")]
        dn: Option<String>,
    },

    /// Host owning a DN
    Host { dn: String },

    /// Users in a group
    Members { group: String },

    /// Properties of a group; `properties hosts --host NAME` (or `--dn DN`) for a host
    Properties {
        group: String,

        /// Host name, when group is `hosts`
        #[arg(long)]
        host: Option<String>,

        /// Host DN, when group is `hosts` and no name is given
        #[arg(long)]
        dn: Option<String>,
    },

    /// VOMS role and VO of a group
    Voms { group: String },

    /// Groups carrying a VOMS role
    VomsGroups { attribute: String },

    /// Banned IP addresses
    BannedIps,

    /// Raw option lookup, e.g. /Registry/DefaultGroup
    Value { path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogLevel::from_options(&cli.options).unwrap_or_default());

    let config = match &cli.config {
        Some(path) => ConfigRegistry::load_from(path),
        None => ConfigRegistry::load(),
    }
    .context("Failed to load registry configuration")?;
    debug!("registry configuration loaded");

    let registry = Registry::new(&config);
    let output = lookup(&registry, &config, &cli.command)?;
    print(&output, cli.json)
}

/// Lookup result: a single value or a list
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Output {
    One(String),
    Many(Vec<String>),
    Voms(VomsInfo),
}

#[derive(Debug, Serialize)]
struct VomsInfo {
    role: String,
    vo: String,
}

fn lookup(registry: &Registry<'_>, config: &ConfigRegistry, command: &Commands) -> Result<Output> {
    let output = match command {
        Commands::Users => Output::Many(registry.all_users()),
        Commands::Dn { username } => Output::Many(registry.dn_for_username(username)?),
        Commands::User { dn } => Output::One(registry.username_for_dn(dn)?),
        Commands::Groups { username, dn } => match (username, dn) {
            (_, Some(dn)) => Output::Many(registry.groups_for_dn(dn)?),
            (Some(username), None) => Output::Many(registry.groups_for_user(username)?),
            (None, None) => anyhow::bail!("Give a username or --dn"),
        },
        Commands::Host { dn } => Output::One(registry.hostname_for_dn(dn)?),
        Commands::Members { group } => Output::Many(registry.users_in_group(group)),
        Commands::Properties { group, host, dn } => Output::Many(registry.properties_for_entity(
            group,
            host.as_deref(),
            dn.as_deref(),
        )),
        Commands::Voms { group } => Output::Voms(VomsInfo {
            role: registry.voms_attribute_for_group(group),
            vo: registry.voms_vo_for_group(group),
        }),
        Commands::VomsGroups { attribute } => {
            Output::Many(registry.groups_with_voms_attribute(attribute))
        }
        Commands::BannedIps => Output::Many(registry.banned_ips()),
        Commands::Value { path } => Output::One(
            config
                .get_value(path)
                .with_context(|| format!("No option at {}", path))?,
        ),
    };
    Ok(output)
}

fn print(output: &Output, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    match output {
        Output::One(value) => println!("{}", value),
        Output::Many(values) => {
            for value in values {
                println!("{}", value);
            }
        }
        Output::Voms(info) => {
            println!("role: {}", info.role);
            println!("vo:   {}", info.vo);
        }
    }
    Ok(())
}
