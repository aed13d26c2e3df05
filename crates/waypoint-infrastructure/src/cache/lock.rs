//! Distributed locks
//!
//! A lock is a `SET NX` with expiry on `<namespace>:lock:<name>`, holding a
//! random token. Release is a server-side compare-and-delete on that token,
//! so a holder whose lock already expired can never remove the lock of
//! whoever acquired it next. Contention is not an error: a busy lock is
//! `None` / `false`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;
use waypoint_domain::keys;
use waypoint_domain::ports::CacheStore;
use waypoint_domain::value_objects::{LockToken, SetCondition};

use super::client::{CacheClient, bounded};

impl CacheClient {
    /// Try to acquire `lock_key`, retrying up to `retry_count` times
    ///
    /// A zero `ttl` falls back to the configured lock TTL. Returns the token
    /// needed to release the lock, or `None` when the lock stayed busy or the
    /// backend failed.
    pub async fn acquire_lock(
        &self,
        lock_key: &str,
        ttl: Duration,
        retry_delay: Duration,
        retry_count: u32,
    ) -> Option<LockToken> {
        let key = self.key(&keys::lock_key(lock_key));
        let ttl = if ttl.is_zero() {
            self.lock_config().ttl()
        } else {
            ttl
        };
        let token = Uuid::new_v4().to_string();

        for attempt in 0..=retry_count {
            if attempt > 0 {
                tokio::time::sleep(retry_delay).await;
            }
            let claim = self
                .store()
                .set(&key, &token, Some(ttl), SetCondition::IfAbsent);
            match self.timed("acquire_lock", claim).await {
                Ok(true) => {
                    debug!(key = %key, attempt, "Lock acquired");
                    return Some(LockToken { key, token });
                }
                Ok(false) => {}
                Err(e) => {
                    self.absorb("acquire_lock", &key, &e);
                    return None;
                }
            }
        }

        debug!(key = %key, retries = retry_count, "Lock busy");
        None
    }

    /// Acquire with the configured TTL, delay and retry count
    pub async fn acquire_lock_default(&self, lock_key: &str) -> Option<LockToken> {
        let config = self.lock_config().clone();
        self.acquire_lock(lock_key, config.ttl(), config.retry_delay(), config.retry_count)
            .await
    }

    /// Release a held lock; `false` if the token no longer owns it
    pub async fn release_lock(&self, lock: &LockToken) -> bool {
        let release = self.store().compare_and_delete(&lock.key, &lock.token);
        match self.timed("release_lock", release).await {
            Ok(released) => {
                if !released {
                    debug!(key = %lock.key, "Lock no longer held by this token");
                }
                released
            }
            Err(e) => {
                self.absorb("release_lock", &lock.key, &e);
                false
            }
        }
    }

    /// Acquire `lock_key` for a scope
    ///
    /// The returned guard releases the lock when dropped, on every exit path
    /// of the caller. Check [`LockGuard::acquired`] and take the busy branch
    /// when it is `false`.
    ///
    /// ```ignore
    /// let guard = cache.with_lock("itinerary:42", None).await;
    /// if !guard.acquired() {
    ///     return Ok(Busy);
    /// }
    /// rebuild_itinerary().await?;
    /// guard.release().await;
    /// ```
    pub async fn with_lock(&self, lock_key: &str, ttl: Option<Duration>) -> LockGuard {
        let config = self.lock_config().clone();
        let ttl = ttl.unwrap_or_else(|| config.ttl());
        let token = self
            .acquire_lock(lock_key, ttl, config.retry_delay(), config.retry_count)
            .await;
        LockGuard {
            store: Arc::clone(self.store()),
            token,
            timeout: self.operation_timeout(),
        }
    }

    /// Run `critical` while holding `lock_key`
    ///
    /// Returns `None` without running it when the lock is busy.
    pub async fn run_locked<T, Fut>(
        &self,
        lock_key: &str,
        ttl: Option<Duration>,
        critical: impl FnOnce() -> Fut,
    ) -> Option<T>
    where
        Fut: Future<Output = T>,
    {
        let guard = self.with_lock(lock_key, ttl).await;
        if !guard.acquired() {
            return None;
        }
        let output = critical().await;
        guard.release().await;
        Some(output)
    }
}

/// Scoped lock ownership
///
/// Dropping a held guard schedules the release on the current tokio runtime.
/// Prefer [`LockGuard::release`] where the caller can await it.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct LockGuard {
    store: Arc<dyn CacheStore>,
    token: Option<LockToken>,
    timeout: Duration,
}

impl LockGuard {
    /// Whether the lock was acquired
    pub fn acquired(&self) -> bool {
        self.token.is_some()
    }

    /// Token of the held lock
    pub fn token(&self) -> Option<&LockToken> {
        self.token.as_ref()
    }

    /// Release now; `false` if not held or already taken over
    pub async fn release(mut self) -> bool {
        let Some(lock) = self.token.take() else {
            return false;
        };
        release_token(&*self.store, &lock, self.timeout).await
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(lock) = self.token.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                let timeout = self.timeout;
                handle.spawn(async move {
                    release_token(&*store, &lock, timeout).await;
                });
            }
            Err(_) => {
                warn!(key = %lock.key, "No runtime to release lock; it will expire by TTL");
            }
        }
    }
}

async fn release_token(store: &dyn CacheStore, lock: &LockToken, timeout: Duration) -> bool {
    let release = store.compare_and_delete(&lock.key, &lock.token);
    match bounded(timeout, "release_lock", release).await {
        Ok(released) => released,
        Err(e) => {
            warn!(key = %lock.key, error = %e, "Lock release failed; it will expire by TTL");
            false
        }
    }
}
