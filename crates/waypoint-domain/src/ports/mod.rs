//! Port definitions
//!
//! Traits implemented by providers and infrastructure:
//!
//! | Port | Implemented by |
//! |------|----------------|
//! | [`CacheStore`] | Redis, MCP wrapper and in-memory stores |
//! | [`ManagedService`] | Anything the service registry owns |
//! | [`ServiceAdapter`] | Per-service mode-aware factories |
//! | [`Operation`] | Entries of the operation table |

pub mod cache;
pub mod operation;
pub mod service;

pub use cache::{CacheStore, StoreCommand, StoreReply, apply_command};
pub use operation::Operation;
pub use service::{ManagedService, ServiceAdapter};
