//! Memoization through the distributed cache
//!
//! A [`Memoizer`] turns call arguments into a deterministic key
//! (`<prefix>:<sha256 of canonical JSON>`), returns the cached result when
//! present, and otherwise runs the computation and stores any non-null
//! result. The TTL comes from, in order: an explicit override, a fixed
//! [`ContentType`], or the classifier run over the call's string arguments.
//!
//! Cache trouble never fails a call: if the cache service cannot be resolved
//! the computation simply runs uncached.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use waypoint_domain::classifier::classify;
use waypoint_domain::error::Result;
use waypoint_domain::keys;
use waypoint_domain::value_objects::ContentType;

use super::client::CacheClient;
use crate::registry::ServiceRegistry;

/// Keyword arguments naming the source domains of a query
const DOMAIN_KWARGS: [&str; 2] = ["domains", "domain"];

/// Arguments of a memoized call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoArgs {
    /// Positional arguments, in call order
    pub positional: Vec<Value>,
    /// Keyword arguments, ordered by name
    pub keyword: BTreeMap<String, Value>,
}

impl MemoArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Look up a keyword argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    fn domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        for name in DOMAIN_KWARGS {
            match self.keyword.get(name) {
                Some(Value::String(domain)) => domains.push(domain.clone()),
                Some(Value::Array(items)) => domains.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(ToString::to_string),
                ),
                _ => {}
            }
        }
        domains
    }

    fn query_text(&self) -> String {
        let positional = self.positional.iter();
        let keyword = self
            .keyword
            .iter()
            .filter(|(name, _)| !DOMAIN_KWARGS.contains(&name.as_str()))
            .map(|(_, value)| value);
        positional
            .chain(keyword)
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a memoized function caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoizeOptions {
    /// Key prefix, also the scope of `invalidate_all`
    pub prefix: String,
    /// Fixed content type; classified per call when `None`
    pub content_type: Option<ContentType>,
    /// TTL override, beating any content type
    pub ttl: Option<Duration>,
    /// Leading positional arguments left out of the key (receivers, clients)
    pub skip_args: usize,
}

impl MemoizeOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            content_type: None,
            ttl: None,
            skip_args: 0,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_skip_args(mut self, skip_args: usize) -> Self {
        self.skip_args = skip_args;
        self
    }
}

/// Where a memoizer finds its cache
#[derive(Clone)]
pub enum CacheSource {
    /// A client held directly
    Client(Arc<CacheClient>),
    /// A client resolved from the registry on every call, so mode switches apply
    Registry {
        registry: Arc<ServiceRegistry>,
        service: String,
    },
}

impl CacheSource {
    async fn resolve(&self) -> Result<Arc<CacheClient>> {
        match self {
            Self::Client(client) => Ok(Arc::clone(client)),
            Self::Registry { registry, service } => {
                registry.get_typed::<CacheClient>(service).await
            }
        }
    }
}

impl fmt::Debug for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(client) => f.debug_tuple("Client").field(client).finish(),
            Self::Registry { service, .. } => f
                .debug_struct("Registry")
                .field("service", service)
                .finish_non_exhaustive(),
        }
    }
}

/// Cache-backed memoization policy, independent of any one function
#[derive(Debug, Clone)]
pub struct Memoizer {
    source: CacheSource,
    options: MemoizeOptions,
}

impl Memoizer {
    pub fn new(source: CacheSource, options: MemoizeOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &MemoizeOptions {
        &self.options
    }

    /// Cache key for a call (before namespacing)
    pub fn cache_key(&self, args: &MemoArgs) -> String {
        let skip = self.options.skip_args.min(args.positional.len());
        keys::memo_key(&self.options.prefix, &args.positional[skip..], &args.keyword)
    }

    /// TTL a result of this call is stored with
    pub fn ttl_for(&self, args: &MemoArgs) -> Duration {
        if let Some(ttl) = self.options.ttl {
            return ttl;
        }
        let content_type = self.options.content_type.unwrap_or_else(|| {
            let domains = args.domains();
            let domains: Vec<&str> = domains.iter().map(String::as_str).collect();
            classify(&args.query_text(), &domains)
        });
        content_type.ttl()
    }

    /// Return the cached result for `args`, or compute and store it
    ///
    /// `skip_cache` bypasses both the read and the write. `None` and JSON
    /// `null` results are never stored.
    pub async fn get_or_compute<T, Fut>(
        &self,
        args: &MemoArgs,
        skip_cache: bool,
        compute: impl FnOnce() -> Fut,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if skip_cache {
            debug!(prefix = %self.options.prefix, "Cache bypassed");
            return compute().await;
        }

        let client = match self.source.resolve().await {
            Ok(client) => client,
            Err(e) => {
                warn!(prefix = %self.options.prefix, error = %e, "Cache unavailable; computing uncached");
                return compute().await;
            }
        };

        let key = self.cache_key(args);
        if let Some(cached) = client.get_json::<T>(&key).await {
            debug!(key = %key, "Memoized hit");
            return Ok(Some(cached));
        }

        let result = compute().await?;
        if let Some(value) = &result {
            let is_null = serde_json::to_value(value).is_ok_and(|v| v.is_null());
            if !is_null {
                let ttl = self.ttl_for(args);
                client.set_json(&key, value, Some(ttl)).await;
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Memoized result stored");
            }
        }
        Ok(result)
    }

    /// Drop the cached result for `args`; `true` if one existed
    pub async fn invalidate(&self, args: &MemoArgs) -> Result<bool> {
        let client = self.source.resolve().await?;
        let key = self.cache_key(args);
        Ok(client.delete(&[key.as_str()]).await > 0)
    }

    /// Drop every cached result under the prefix, returning the count
    pub async fn invalidate_all(&self) -> Result<u64> {
        let client = self.source.resolve().await?;
        client
            .clear_pattern(&keys::prefix_pattern(&self.options.prefix))
            .await
    }
}

/// A function bundled with its memoization policy
pub struct Memoized<F> {
    memoizer: Memoizer,
    handler: F,
}

impl<F> Memoized<F> {
    /// Call through the cache
    pub async fn call<T, Fut>(&self, args: MemoArgs) -> Result<Option<T>>
    where
        F: Fn(MemoArgs) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
        T: Serialize + DeserializeOwned,
    {
        self.call_with(args, false).await
    }

    /// Call, optionally bypassing the cache for a forced refresh
    pub async fn call_with<T, Fut>(&self, args: MemoArgs, skip_cache: bool) -> Result<Option<T>>
    where
        F: Fn(MemoArgs) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
        T: Serialize + DeserializeOwned,
    {
        let handler = &self.handler;
        let call_args = args.clone();
        self.memoizer
            .get_or_compute(&args, skip_cache, move || handler(call_args))
            .await
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memoizer
    }

    /// Drop the cached result for `args`
    pub async fn invalidate(&self, args: &MemoArgs) -> Result<bool> {
        self.memoizer.invalidate(args).await
    }

    /// Drop every cached result of this function
    pub async fn invalidate_all(&self) -> Result<u64> {
        self.memoizer.invalidate_all().await
    }
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("memoizer", &self.memoizer)
            .finish_non_exhaustive()
    }
}

/// Wrap `handler` so repeated calls with identical arguments hit the cache
///
/// ```ignore
/// let forecast = memoize(
///     CacheSource::Client(cache),
///     MemoizeOptions::new("forecast").with_content_type(ContentType::Realtime),
///     |args: MemoArgs| async move { fetch_forecast(&args).await },
/// );
/// let today = forecast.call::<Forecast, _>(MemoArgs::new().arg("Rome")).await?;
/// ```
pub fn memoize<F>(source: CacheSource, options: MemoizeOptions, handler: F) -> Memoized<F> {
    Memoized {
        memoizer: Memoizer::new(source, options),
        handler,
    }
}
