//! Application context bootstrap
//!
//! ```text
//! AppConfig → IntegrationFlags (env + config)
//!           → ServiceRegistry ← CacheServiceAdapter("cache")
//!           → OperationRegistry (builtins + caller registrations)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut context = AppContext::bootstrap(config)?;
//! context.register_operations(|ops, cache| {
//!     ops.register_cached("weather", cache, MemoizeOptions::new("weather"), fetch_weather)
//! })?;
//!
//! let cache = context.cache().await?;
//! cache.set("greeting", "hello", None).await;
//!
//! // ops tooling flips a service and rebuilds it
//! context.switch_mode("cache", IntegrationMode::Mcp).await?;
//!
//! context.shutdown().await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::info;
use waypoint_domain::constants::CACHE_SERVICE_NAME;
use waypoint_domain::error::Result;
use waypoint_domain::ports::{ManagedService, ServiceAdapter};
use waypoint_domain::value_objects::IntegrationMode;

use crate::cache::{CacheClient, CacheServiceAdapter, CacheSource, StoreConnector};
use crate::config::AppConfig;
use crate::flags::IntegrationFlags;
use crate::operations::OperationRegistry;
use crate::registry::ServiceRegistry;

/// Process-wide context: configuration, flags, services and operations
pub struct AppContext {
    /// Application configuration
    pub config: Arc<AppConfig>,

    flags: Arc<IntegrationFlags>,
    registry: Arc<ServiceRegistry>,
    operations: OperationRegistry,
}

impl AppContext {
    /// Build the context with the production cache connectors
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        let flags = Arc::new(IntegrationFlags::from_env(
            &known_services(&config),
            &config.integrations,
        ));
        let adapter = CacheServiceAdapter::new(Arc::clone(&flags), &config);
        Self::assemble(config, flags, adapter)
    }

    /// Build the context with explicit cache connectors per mode
    pub fn bootstrap_with(
        config: AppConfig,
        flags: Arc<IntegrationFlags>,
        direct: Arc<dyn StoreConnector>,
        mcp: Arc<dyn StoreConnector>,
    ) -> Result<Self> {
        let adapter = CacheServiceAdapter::with_connectors(Arc::clone(&flags), &config, direct, mcp);
        Self::assemble(config, flags, adapter)
    }

    fn assemble(
        config: AppConfig,
        flags: Arc<IntegrationFlags>,
        cache_adapter: CacheServiceAdapter,
    ) -> Result<Self> {
        info!("Initializing application context");

        let registry = Arc::new(ServiceRegistry::new());
        let cache_adapter: Arc<dyn ServiceAdapter> = Arc::new(cache_adapter);
        registry.register_service(CACHE_SERVICE_NAME, cache_adapter)?;

        let operations = OperationRegistry::with_builtins()?;

        info!(
            services = ?registry.names(),
            operations = operations.len(),
            cache_mode = %flags.mode(CACHE_SERVICE_NAME),
            "Application context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            flags,
            registry,
            operations,
        })
    }

    /// Register additional operations, with a cache source for memoized ones
    pub fn register_operations<F>(&mut self, register: F) -> Result<()>
    where
        F: FnOnce(&mut OperationRegistry, CacheSource) -> Result<()>,
    {
        let source = self.cache_source();
        register(&mut self.operations, source)
    }

    /// Cache source resolving the `cache` service through the registry
    pub fn cache_source(&self) -> CacheSource {
        CacheSource::Registry {
            registry: Arc::clone(&self.registry),
            service: CACHE_SERVICE_NAME.to_string(),
        }
    }

    pub fn flags(&self) -> Arc<IntegrationFlags> {
        Arc::clone(&self.flags)
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    /// Resolve the shared cache client
    pub async fn cache(&self) -> Result<Arc<CacheClient>> {
        self.registry.get_typed::<CacheClient>(CACHE_SERVICE_NAME).await
    }

    /// Flip `service` to `mode` and rebuild its instance
    pub async fn switch_mode(
        &self,
        service: &str,
        mode: IntegrationMode,
    ) -> Result<Arc<dyn ManagedService>> {
        if !self.registry.is_registered(service) {
            return Err(waypoint_domain::error::Error::not_registered(service));
        }
        self.flags.set_mode(service, mode);
        self.registry.refresh_service(service).await
    }

    /// Close every resolved service
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application context");
        self.registry.close_all().await
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("registry", &self.registry)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

/// The cache service plus every service named in the configuration
fn known_services(config: &AppConfig) -> Vec<String> {
    let mut services = vec![CACHE_SERVICE_NAME.to_string()];
    services.extend(
        config
            .integrations
            .services
            .keys()
            .filter(|name| name.as_str() != CACHE_SERVICE_NAME)
            .cloned(),
    );
    services
}
