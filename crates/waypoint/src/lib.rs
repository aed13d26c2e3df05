//! # Waypoint
//!
//! Service registry with switchable MCP/direct integrations and a
//! content-aware distributed cache.
//!
//! This crate is the public facade: it re-exports the layer crates and
//! hosts the command line interface.
//!
//! ## Example
//!
//! ```ignore
//! use waypoint::infrastructure::{AppContext, config::AppConfig};
//!
//! let context = AppContext::bootstrap(AppConfig::default())?;
//! let cache = context.cache().await?;
//! cache.set("greeting", "hello", None).await;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - Ports, value objects, classifier and errors
//! - `infrastructure` - Registry, cache client, config, logging, composition root
//! - `providers` - Redis, MCP and in-memory cache stores

/// Domain layer - ports, value objects and errors
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use waypoint_domain::*;
}

/// Infrastructure layer - registry, cache client, config and logging
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use waypoint_infrastructure::*;
}

/// Cache store implementations
///
/// Re-exports from the providers crate for convenience
pub mod providers {
    pub use waypoint_providers::*;
}

pub mod cli;

pub use cli::{Cli, Command, run};
