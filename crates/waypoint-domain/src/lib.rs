//! # Waypoint Domain Layer
//!
//! Types and contracts shared by every other crate. Nothing in here performs
//! I/O.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error taxonomy and `Result` alias |
//! | [`value_objects`] | Integration modes, content types, cache and registry values |
//! | [`ports`] | `CacheStore`, `ManagedService`, `ServiceAdapter`, `Operation` |
//! | [`classifier`] | Content classification driving default TTLs |
//! | [`keys`] | Namespaced, lock and memoization key derivation |
//! | [`constants`] | TTL buckets, key layout, environment naming |

pub mod classifier;
pub mod constants;
pub mod error;
pub mod keys;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
pub use value_objects::{ContentType, IntegrationMode};
