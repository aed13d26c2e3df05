//! Operation table
//!
//! Operations exposed to collaborators are registered by name into an
//! explicit table at startup. Cacheable operations are registered through
//! [`OperationRegistry::register_cached`], which wraps them in a
//! [`Memoizer`], so the cached set is enumerable without inspecting any
//! handler.
//!
//! Cached operations take a reserved `_skip_cache` boolean in object params
//! to force a refresh; it never reaches the handler or the cache key.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Value, json};
use waypoint_domain::classifier::classify;
use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::Operation;

use crate::cache::{CacheSource, MemoArgs, MemoizeOptions, Memoizer};

/// Reserved params key bypassing the cache for one call
pub const SKIP_CACHE_PARAM: &str = "_skip_cache";

/// Name of the built-in classifier operation
pub const CLASSIFY_CONTENT_OPERATION: &str = "classify_content";

type Handler = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Operation backed by a closure
pub struct FnOperation {
    name: String,
    handler: Arc<Handler>,
}

impl fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Operation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        (self.handler)(params).await
    }
}

/// Build an operation closing over an async handler
pub fn operation_fn<F, Fut>(name: impl Into<String>, handler: F) -> FnOperation
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let handler: Arc<Handler> =
        Arc::new(move |params| -> BoxFuture<'static, Result<Value>> { Box::pin(handler(params)) });
    FnOperation {
        name: name.into(),
        handler,
    }
}

/// Operation whose results are memoized through the cache
pub struct CachedOperation {
    inner: FnOperation,
    memoizer: Memoizer,
}

impl CachedOperation {
    pub fn new(inner: FnOperation, memoizer: Memoizer) -> Self {
        Self { inner, memoizer }
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memoizer
    }
}

impl fmt::Debug for CachedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedOperation")
            .field("name", &self.inner.name)
            .field("prefix", &self.memoizer.options().prefix)
            .finish()
    }
}

#[async_trait]
impl Operation for CachedOperation {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn is_cached(&self) -> bool {
        true
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let (params, skip_cache) = split_skip_flag(params);
        let args = memo_args(&params);
        let handler = Arc::clone(&self.inner.handler);
        let result = self
            .memoizer
            .get_or_compute::<Value, _>(&args, skip_cache, move || async move {
                let value = handler(params).await?;
                Ok((!value.is_null()).then_some(value))
            })
            .await?;
        Ok(result.unwrap_or(Value::Null))
    }
}

fn split_skip_flag(params: Value) -> (Value, bool) {
    match params {
        Value::Object(mut map) => {
            let skip = map
                .remove(SKIP_CACHE_PARAM)
                .and_then(|flag| flag.as_bool())
                .unwrap_or(false);
            (Value::Object(map), skip)
        }
        other => (other, false),
    }
}

/// Objects become keyword arguments, arrays positional, anything else one positional
fn memo_args(params: &Value) -> MemoArgs {
    match params {
        Value::Object(map) => MemoArgs {
            positional: Vec::new(),
            keyword: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        },
        Value::Array(items) => MemoArgs {
            positional: items.clone(),
            keyword: BTreeMap::new(),
        },
        Value::Null => MemoArgs::default(),
        other => MemoArgs::new().arg(other.clone()),
    }
}

/// Name → operation table built at startup
#[derive(Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in operations registered
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_fn(CLASSIFY_CONTENT_OPERATION, classify_content)?;
        Ok(registry)
    }

    /// Add an operation; names must be unique
    pub fn register(&mut self, operation: Arc<dyn Operation>) -> Result<()> {
        let name = operation.name().to_string();
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("Operation name cannot be empty"));
        }
        if self.operations.contains_key(&name) {
            return Err(Error::invalid_argument(format!(
                "Operation '{name}' is already registered"
            )));
        }
        tracing::debug!(operation = %name, cached = operation.is_cached(), "Operation registered");
        self.operations.insert(name, operation);
        Ok(())
    }

    /// Add a closure-backed operation
    pub fn register_fn<F, Fut>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(Arc::new(operation_fn(name, handler)))
    }

    /// Add a closure-backed operation memoized through `source`
    pub fn register_cached<F, Fut>(
        &mut self,
        name: &str,
        source: CacheSource,
        options: MemoizeOptions,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let operation = CachedOperation::new(
            operation_fn(name, handler),
            Memoizer::new(source, options),
        );
        self.register(Arc::new(operation))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Run the operation registered as `name`
    pub async fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let operation = self
            .operations
            .get(name)
            .ok_or_else(|| Error::not_registered(name))?;
        operation.execute(params).await
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    /// Names of memoized operations, sorted
    pub fn cached_names(&self) -> Vec<String> {
        self.operations
            .values()
            .filter(|op| op.is_cached())
            .map(|op| op.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}

/// `{"query": "...", "domains": [...]}` → `{"content_type": ..., "ttl_secs": ...}`
async fn classify_content(params: Value) -> Result<Value> {
    let query = params
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_argument("classify_content requires a string 'query'"))?;
    let domains: Vec<&str> = params
        .get("domains")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let content_type = classify(query, &domains);
    Ok(json!({
        "content_type": content_type.as_str(),
        "ttl_secs": content_type.ttl_secs(),
    }))
}
