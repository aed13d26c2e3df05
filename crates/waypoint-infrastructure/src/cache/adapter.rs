//! Cache service adapter
//!
//! Resolves the `cache` service for whichever [`IntegrationMode`] the flags
//! currently hold. Each mode has a [`StoreConnector`]: the direct one opens a
//! Redis connection, the MCP one opens a session with the wrapper server.
//! Both end up behind the same [`CacheClient`], so callers never see which
//! strategy was taken.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use waypoint_domain::constants::CACHE_SERVICE_NAME;
use waypoint_domain::error::Result;
use waypoint_domain::ports::{CacheStore, ManagedService, ServiceAdapter};
use waypoint_domain::value_objects::IntegrationMode;
use waypoint_providers::cache::{InMemoryCacheStore, McpCacheStore, RedisCacheStore};
use waypoint_providers::constants::{MCP_DEFAULT_ENDPOINT, REDIS_DEFAULT_URL};

use super::client::CacheClient;
use crate::config::{AppConfig, CacheConfig, LockConfig};
use crate::constants::CACHE_ADAPTER_TYPE;
use crate::flags::IntegrationFlags;

/// Opens a connected store for one integration strategy
#[async_trait]
pub trait StoreConnector: Send + Sync + fmt::Debug {
    /// Connector name for logs
    fn name(&self) -> &str;

    /// Open and connect a fresh store
    async fn connect(&self) -> Result<Arc<dyn CacheStore>>;
}

/// Direct Redis connection
#[derive(Debug, Clone)]
pub struct RedisConnector {
    url: String,
    connect_timeout: Duration,
    scan_count: usize,
}

impl RedisConnector {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            scan_count: waypoint_providers::constants::REDIS_SCAN_COUNT,
        }
    }

    /// Connector for the configured Redis URL
    pub fn from_config(config: &CacheConfig) -> Self {
        let url = if config.redis_url.is_empty() {
            REDIS_DEFAULT_URL
        } else {
            config.redis_url.as_str()
        };
        Self {
            url: url.to_string(),
            connect_timeout: config.connect_timeout(),
            scan_count: config.key_scan_count,
        }
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    fn name(&self) -> &str {
        "redis"
    }

    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        let store = RedisCacheStore::new(&self.url)?.with_scan_count(self.scan_count);
        store.connect(self.connect_timeout).await?;
        Ok(Arc::new(store))
    }
}

/// Session with the MCP server wrapping the store
#[derive(Debug, Clone)]
pub struct McpConnector {
    endpoint: String,
    timeout: Duration,
}

impl McpConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Connector for the configured MCP endpoint
    pub fn from_config(config: &CacheConfig) -> Self {
        let endpoint = if config.mcp_url.is_empty() {
            MCP_DEFAULT_ENDPOINT
        } else {
            config.mcp_url.as_str()
        };
        Self::new(endpoint, config.connect_timeout())
    }
}

#[async_trait]
impl StoreConnector for McpConnector {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        let store = McpCacheStore::open(self.endpoint.clone(), self.timeout).await?;
        Ok(Arc::new(store))
    }
}

/// Process-local store, a fresh one per connect
///
/// Counts connects, which makes it the connector of choice for lifecycle
/// tests.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    name: String,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connects: AtomicUsize::new(0),
        }
    }

    /// How many stores this connector has opened
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemoryCacheStore::named(self.name.clone())))
    }
}

/// Mode-aware factory for the `cache` service
#[derive(Debug)]
pub struct CacheServiceAdapter {
    service_name: String,
    flags: Arc<IntegrationFlags>,
    cache: CacheConfig,
    lock: LockConfig,
    direct: Arc<dyn StoreConnector>,
    mcp: Arc<dyn StoreConnector>,
}

impl CacheServiceAdapter {
    /// Adapter using Redis for `direct` and the MCP wrapper for `mcp`
    pub fn new(flags: Arc<IntegrationFlags>, config: &AppConfig) -> Self {
        Self::with_connectors(
            flags,
            config,
            Arc::new(RedisConnector::from_config(&config.cache)),
            Arc::new(McpConnector::from_config(&config.cache)),
        )
    }

    /// Adapter with explicit connectors per mode
    pub fn with_connectors(
        flags: Arc<IntegrationFlags>,
        config: &AppConfig,
        direct: Arc<dyn StoreConnector>,
        mcp: Arc<dyn StoreConnector>,
    ) -> Self {
        Self {
            service_name: CACHE_SERVICE_NAME.to_string(),
            flags,
            cache: config.cache.clone(),
            lock: config.lock.clone(),
            direct,
            mcp,
        }
    }

    /// Serve under a different registry name
    #[must_use]
    pub fn named(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    fn connector(&self, mode: IntegrationMode) -> &Arc<dyn StoreConnector> {
        match mode {
            IntegrationMode::Direct => &self.direct,
            IntegrationMode::Mcp => &self.mcp,
        }
    }
}

#[async_trait]
impl ServiceAdapter for CacheServiceAdapter {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn integration_mode(&self) -> IntegrationMode {
        self.flags.mode(&self.service_name)
    }

    fn adapter_type(&self) -> &str {
        CACHE_ADAPTER_TYPE
    }

    async fn get_service_instance(&self) -> Result<Arc<dyn ManagedService>> {
        let mode = self.integration_mode();
        let connector = self.connector(mode);
        let store = connector.connect().await?;
        info!(
            service = %self.service_name,
            mode = %mode,
            backend = %store.backend_name(),
            "Cache service connected"
        );
        Ok(Arc::new(CacheClient::new(store, &self.cache, &self.lock)))
    }
}
