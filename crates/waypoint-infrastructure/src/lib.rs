//! # Infrastructure Layer
//!
//! Everything between the domain contracts and a running process.
//!
//! ## Module Categories
//!
//! ### Services
//! | Module | Description |
//! |--------|-------------|
//! | [`registry`] | Named singleton services with per-name construction locks |
//! | [`cache`] | Cache client, pipelines, locks, memoization, cache adapter |
//! | [`operations`] | Explicit name → operation table |
//!
//! ### Configuration & Composition
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | TOML + environment configuration via figment |
//! | [`flags`] | Live integration modes and migration report |
//! | [`di`] | `AppContext` composition root |
//! | [`constants`] | Infrastructure defaults |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`logging`] | Structured logging with tracing |

pub mod cache;
pub mod config;
pub mod constants;
pub mod di;
pub mod error_ext;
pub mod flags;
pub mod logging;
pub mod operations;
pub mod registry;

pub use cache::CacheClient;
pub use di::AppContext;
pub use error_ext::ErrorContext;
pub use flags::{IntegrationFlags, MigrationReport};
pub use registry::ServiceRegistry;
