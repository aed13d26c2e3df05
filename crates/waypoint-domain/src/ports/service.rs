//! Service lifecycle ports
//!
//! A [`ServiceAdapter`] knows how to build one named service for the current
//! [`IntegrationMode`]. Whatever it builds implements [`ManagedService`], the
//! minimal `{connect, close}` capability set the registry needs to manage
//! lifecycle uniformly across strategies.

use crate::error::Result;
use crate::value_objects::IntegrationMode;
use async_trait::async_trait;
use downcast_rs::{DowncastSync, impl_downcast};
use std::fmt;
use std::sync::Arc;

/// A long-lived, connected backend service handle
///
/// Registry consumers get an `Arc<dyn ManagedService>` and recover the
/// concrete type with `downcast_arc`.
#[async_trait]
pub trait ManagedService: DowncastSync + fmt::Debug {
    /// Establish (or verify) the connection
    async fn connect(&self) -> Result<()>;

    /// Drain and close the connection
    async fn close(&self) -> Result<()>;

    /// Name of the concrete implementation behind this instance
    fn implementation(&self) -> String;
}

impl_downcast!(sync ManagedService);

/// Strategy object resolving a service name to a connected instance
///
/// # Example
///
/// ```ignore
/// if adapter.is_direct() {
///     println!("{} uses the direct SDK", adapter.service_name());
/// }
/// let instance = adapter.get_service_instance().await?;
/// ```
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Registry name of the service
    fn service_name(&self) -> &str;

    /// Live mode for this service; read on every call, never cached
    fn integration_mode(&self) -> IntegrationMode;

    /// Whether the next construction uses the direct SDK
    fn is_direct(&self) -> bool {
        self.integration_mode().is_direct()
    }

    /// Adapter implementation name for status reports
    fn adapter_type(&self) -> &str;

    /// Build and connect a fresh instance for the current mode
    ///
    /// Fails with a connect error when the backend cannot be reached.
    async fn get_service_instance(&self) -> Result<Arc<dyn ManagedService>>;
}
