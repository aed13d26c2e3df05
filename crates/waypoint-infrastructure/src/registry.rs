//! Service registry
//!
//! Maps service names to an adapter and a lazily constructed singleton
//! instance.
//!
//! ```text
//! get_service(name) → entry → instance? ──yes──→ Arc clone
//!                                │ no
//!                                ▼
//!                  construction mutex (per name)
//!                                │
//!                  recheck → adapter.get_service_instance()
//! ```
//!
//! Construction is serialized by a per-name async mutex, so concurrent first
//! callers trigger exactly one connection attempt while different services
//! still build in parallel. Instances are only closed explicitly, through
//! [`ServiceRegistry::refresh_service`] or [`ServiceRegistry::close_all`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::{ManagedService, ServiceAdapter};
use waypoint_domain::value_objects::ServiceStatus;

struct ServiceEntry {
    adapter: RwLock<Arc<dyn ServiceAdapter>>,
    instance: RwLock<Option<Arc<dyn ManagedService>>>,
    construction: Mutex<()>,
}

impl ServiceEntry {
    fn new(adapter: Arc<dyn ServiceAdapter>) -> Self {
        Self {
            adapter: RwLock::new(adapter),
            instance: RwLock::new(None),
            construction: Mutex::new(()),
        }
    }

    fn adapter(&self) -> Arc<dyn ServiceAdapter> {
        let adapter = self.adapter.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*adapter)
    }

    fn set_adapter(&self, adapter: Arc<dyn ServiceAdapter>) {
        *self.adapter.write().unwrap_or_else(PoisonError::into_inner) = adapter;
    }

    fn instance(&self) -> Option<Arc<dyn ManagedService>> {
        self.instance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_instance(
        &self,
        instance: Option<Arc<dyn ManagedService>>,
    ) -> Option<Arc<dyn ManagedService>> {
        let mut slot = self.instance.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, instance)
    }
}

/// Concurrency-safe map of named singleton services
#[derive(Default)]
pub struct ServiceRegistry {
    entries: DashMap<String, Arc<ServiceEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `name`
    ///
    /// Registering an existing name replaces its adapter only. An instance
    /// already built keeps serving until the service is refreshed.
    pub fn register_service(&self, name: &str, adapter: Arc<dyn ServiceAdapter>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("Service name cannot be empty"));
        }

        let adapter_type = adapter.adapter_type().to_string();
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                existing.get().set_adapter(adapter);
                debug!(service = %name, adapter = %adapter_type, "Service adapter replaced");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(ServiceEntry::new(adapter)));
                debug!(service = %name, adapter = %adapter_type, "Service registered");
            }
        }
        Ok(())
    }

    /// Whether `name` is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    fn entry(&self, name: &str) -> Result<Arc<ServiceEntry>> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_registered(name))
    }

    /// Resolve `name`, constructing its instance on first use
    pub async fn get_service(&self, name: &str) -> Result<Arc<dyn ManagedService>> {
        let entry = self.entry(name)?;
        if let Some(instance) = entry.instance() {
            return Ok(instance);
        }

        let _construction = entry.construction.lock().await;
        // another caller may have finished while we waited
        if let Some(instance) = entry.instance() {
            return Ok(instance);
        }

        let instance = construct(name, &entry).await?;
        entry.replace_instance(Some(Arc::clone(&instance)));
        Ok(instance)
    }

    /// Resolve `name` as its concrete type
    pub async fn get_typed<T: ManagedService>(&self, name: &str) -> Result<Arc<T>> {
        let instance = self.get_service(name).await?;
        let implementation = instance.implementation();
        instance.downcast_arc::<T>().map_err(|_| {
            Error::internal(format!(
                "Service '{name}' is backed by {implementation}, not {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Close the current instance (if any) and construct a new one
    ///
    /// The adapter is consulted again, so a changed integration mode takes
    /// effect here. Failures closing the old instance are logged and ignored.
    pub async fn refresh_service(&self, name: &str) -> Result<Arc<dyn ManagedService>> {
        let entry = self.entry(name)?;
        let _construction = entry.construction.lock().await;

        if let Some(old) = entry.replace_instance(None) {
            if let Err(e) = old.close().await {
                warn!(service = %name, error = %e, "Closing replaced instance failed");
            }
        }

        let instance = construct(name, &entry).await?;
        entry.replace_instance(Some(Arc::clone(&instance)));
        info!(service = %name, implementation = %instance.implementation(), "Service refreshed");
        Ok(instance)
    }

    /// Close every constructed instance; adapters stay registered
    ///
    /// Every instance is attempted even if some fail to close.
    pub async fn close_all(&self) -> Result<()> {
        let entries: Vec<(String, Arc<ServiceEntry>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut failures = Vec::new();
        for (name, entry) in entries {
            let _construction = entry.construction.lock().await;
            let Some(instance) = entry.replace_instance(None) else {
                continue;
            };
            match instance.close().await {
                Ok(()) => debug!(service = %name, "Service closed"),
                Err(e) => {
                    warn!(service = %name, error = %e, "Closing service failed");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "Failed to close {} service(s): {}",
                failures.len(),
                failures.join("; ")
            )))
        }
    }

    /// Status of every registered service; never constructs anything
    pub fn list_services(&self) -> BTreeMap<String, ServiceStatus> {
        self.entries
            .iter()
            .map(|e| {
                let adapter = e.value().adapter();
                let status = ServiceStatus {
                    name: e.key().clone(),
                    integration_mode: adapter.integration_mode(),
                    is_connected: e.value().instance().is_some(),
                    adapter_type: adapter.adapter_type().to_string(),
                };
                (e.key().clone(), status)
            })
            .collect()
    }
}

async fn construct(name: &str, entry: &ServiceEntry) -> Result<Arc<dyn ManagedService>> {
    let adapter = entry.adapter();
    let mode = adapter.integration_mode();
    debug!(service = %name, mode = %mode, "Constructing service instance");
    adapter.get_service_instance().await.map_err(|e| match e {
        Error::Connect { .. } => e,
        other => Error::connect_with_source(name, format!("{mode} construction failed"), other),
    })
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}
