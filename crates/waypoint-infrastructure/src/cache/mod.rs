//! Cache client, locks, pipelines, memoization and the cache service adapter

pub mod adapter;
pub mod client;
pub mod lock;
pub mod memoize;
pub mod pipeline;

pub use adapter::{
    CacheServiceAdapter, InMemoryConnector, McpConnector, RedisConnector, StoreConnector,
};
pub use client::{CacheClient, SetOptions};
pub use lock::LockGuard;
pub use memoize::{CacheSource, MemoArgs, MemoizeOptions, Memoized, Memoizer, memoize};
pub use pipeline::Pipeline;
