//! Composition root
//!
//! [`AppContext`] is built once at startup and passed to whatever needs the
//! registry, flags or operation table. There are no module-level globals.

pub mod bootstrap;

pub use bootstrap::AppContext;
