//! Command line interface
//!
//! | Command | Description |
//! |---------|-------------|
//! | `status` | Registered services and their integration modes |
//! | `migration` | MCP → direct migration progress |
//! | `classify <query> [--domain d]...` | Content type and default TTL |
//! | `ping` | Resolve the cache service, ping it and print its statistics |
//!
//! Output is JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;
use waypoint_domain::classifier::classify;
use waypoint_infrastructure::AppContext;
use waypoint_infrastructure::config::{AppConfig, ConfigLoader};
use waypoint_infrastructure::logging::init_logging;

/// Command line interface for Waypoint
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Waypoint - service registry and content-aware cache tooling")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print registered services and their status
    Status,
    /// Print the integration migration report
    Migration,
    /// Classify a query and print its content type and TTL
    Classify {
        /// Query text
        query: String,
        /// Source domain of the content (repeatable)
        #[arg(short, long = "domain")]
        domains: Vec<String>,
    },
    /// Connect to the cache service and ping it
    Ping,
}

/// Run a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // classification is pure; it needs neither configuration nor logging
    if let Command::Classify { query, domains } = &cli.command {
        return print_json(&classification(query, domains));
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    let context = AppContext::bootstrap(config).context("Failed to bootstrap")?;

    let outcome = match cli.command {
        Command::Status => print_json(&context.registry().list_services()),
        Command::Migration => print_json(&context.flags().migration_report()),
        Command::Ping => ping(&context).await,
        Command::Classify { .. } => Ok(()),
    };

    context.shutdown().await.context("Failed to shut down cleanly")?;
    outcome
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
    loader.load().context("Failed to load configuration")
}

async fn ping(context: &AppContext) -> anyhow::Result<()> {
    let cache = context
        .cache()
        .await
        .context("Failed to resolve cache service")?;
    cache.ping().await.context("Cache ping failed")?;
    info!(backend = %cache.store().backend_name(), "Cache reachable");

    let stats = cache.stats().await;
    print_json(&json!({
        "backend": cache.store().backend_name(),
        "namespace": cache.namespace(),
        "stats": stats,
    }))
}

/// Content type and TTL for a query, as printed by `classify`
pub fn classification(query: &str, domains: &[String]) -> Value {
    let domains: Vec<&str> = domains.iter().map(String::as_str).collect();
    let content_type = classify(query, &domains);
    json!({
        "query": query,
        "domains": domains,
        "content_type": content_type,
        "ttl_secs": content_type.ttl_secs(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}
