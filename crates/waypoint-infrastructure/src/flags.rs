//! Integration flags
//!
//! Live per-service [`IntegrationMode`] values. Seeded from
//! `FEATURE_<SERVICE>_INTEGRATION` variables at startup (falling back to
//! configured defaults) and mutable at runtime, so migration tooling and
//! tests can flip a service between strategies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use waypoint_domain::value_objects::{IntegrationMode, integration_env_var};

use crate::config::IntegrationConfig;

/// Process-wide integration mode table
///
/// Adapters read it on every resolution; nothing caches a mode.
#[derive(Debug, Default)]
pub struct IntegrationFlags {
    modes: DashMap<String, IntegrationMode>,
    default_mode: IntegrationMode,
}

impl IntegrationFlags {
    /// Flags with every service on `default_mode`
    pub fn new(default_mode: IntegrationMode) -> Self {
        Self {
            modes: DashMap::new(),
            default_mode,
        }
    }

    /// Seed flags for `services` from the process environment
    pub fn from_env<S: AsRef<str>>(services: &[S], config: &IntegrationConfig) -> Self {
        Self::from_lookup(services, config, |name| std::env::var(name).ok())
    }

    /// Seed flags for `services` from an arbitrary variable lookup
    ///
    /// Configured modes apply first; a valid `FEATURE_<SERVICE>_INTEGRATION`
    /// value overrides them. Invalid values are logged and ignored.
    pub fn from_lookup<S, F>(services: &[S], config: &IntegrationConfig, lookup: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let flags = Self::new(config.default_mode);
        for (service, mode) in &config.services {
            flags.modes.insert(service.clone(), *mode);
        }

        for service in services {
            let service = service.as_ref();
            let variable = integration_env_var(service);
            let configured = config.mode_for(service);
            let mode = match lookup(&variable) {
                Some(raw) => match raw.parse::<IntegrationMode>() {
                    Ok(mode) => mode,
                    Err(e) => {
                        warn!(variable = %variable, value = %raw, error = %e, "Ignoring invalid integration mode");
                        configured
                    }
                },
                None => configured,
            };
            debug!(service = %service, mode = %mode, "Integration mode resolved");
            flags.modes.insert(service.to_string(), mode);
        }
        flags
    }

    /// Current mode for `service`
    pub fn mode(&self, service: &str) -> IntegrationMode {
        self.modes
            .get(service)
            .map_or(self.default_mode, |mode| *mode)
    }

    /// Change the mode for `service`
    ///
    /// Takes effect for already-resolved services on their next refresh.
    pub fn set_mode(&self, service: &str, mode: IntegrationMode) {
        let previous = self.modes.insert(service.to_string(), mode);
        if previous != Some(mode) {
            info!(service = %service, mode = %mode, "Integration mode changed");
        }
    }

    /// Whether `service` currently uses the direct SDK
    pub fn is_direct(&self, service: &str) -> bool {
        self.mode(service).is_direct()
    }

    /// Known service names, sorted
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modes.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of migration progress
    pub fn migration_report(&self) -> MigrationReport {
        let services: BTreeMap<String, IntegrationMode> = self
            .modes
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        MigrationReport::from_modes(services)
    }
}

/// Progress of the MCP → direct migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Number of known services
    pub total: usize,
    /// Services on the direct SDK
    pub direct: usize,
    /// Services still on the MCP wrapper
    pub mcp: usize,
    /// Share of services on the direct SDK, 0-100
    pub percent_direct: f64,
    /// Mode per service
    pub services: BTreeMap<String, IntegrationMode>,
    /// When the snapshot was taken
    pub generated_at: DateTime<Utc>,
}

impl MigrationReport {
    #[allow(clippy::cast_precision_loss)]
    fn from_modes(services: BTreeMap<String, IntegrationMode>) -> Self {
        let total = services.len();
        let direct = services.values().filter(|mode| mode.is_direct()).count();
        let percent_direct = if total == 0 {
            0.0
        } else {
            (direct as f64 / total as f64) * 100.0
        };
        Self {
            total,
            direct,
            mcp: total - direct,
            percent_direct,
            services,
            generated_at: Utc::now(),
        }
    }

    /// Whether every service is on the direct SDK
    pub fn is_complete(&self) -> bool {
        self.mcp == 0
    }
}
