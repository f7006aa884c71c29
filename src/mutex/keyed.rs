/*!
 * Keyed Mutex
 *
 * Mutual exclusion scoped to arbitrary runtime keys, usable from blocking
 * and async call sites against the same underlying semaphore.
 */

use super::guard::KeyGuard;
use crate::errors::{LockError, LockResult};
use crate::registry::{DashStore, LockToken, TokenStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Keyed mutual-exclusion manager
///
/// One logical lock per distinct key, created on first contention and torn
/// down as soon as the last holder or waiter is gone. Blocking and async
/// acquires on the same key compete for the same semaphore, so the two call
/// styles may be mixed freely.
///
/// Handles are cheap to clone and share one registry. For process-wide use,
/// park a single instance in a `std::sync::OnceLock`.
///
/// # Examples
///
/// ```
/// use keymutex::KeyedMutex;
///
/// let locks = KeyedMutex::<String>::new();
///
/// let value = locks.with_lock("user:42".to_string(), || 7)?;
/// assert_eq!(value, 7);
/// # Ok::<(), keymutex::LockError>(())
/// ```
pub struct KeyedMutex<K, S = DashStore<K>>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    store: Arc<S>,
    _key: std::marker::PhantomData<fn(K)>,
}

/// Rolls back the reference taken during acquisition if the wait never
/// completes: timeout, semaphore closure, or the acquire future being
/// dropped mid-wait. Disarmed once the permit is obtained.
struct Reservation<'a, K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    store: &'a S,
    key: &'a K,
    token: &'a Arc<LockToken>,
    armed: bool,
}

impl<K, S> Drop for Reservation<'_, K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    fn drop(&mut self) {
        if self.armed && self.token.release() {
            self.store.discard(self.key, self.token);
        }
    }
}

impl<K> KeyedMutex<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    /// Create a manager backed by the default sharded store
    pub fn new() -> Self {
        Self::with_store(DashStore::new())
    }
}

impl<K> Default for KeyedMutex<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> KeyedMutex<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    /// Create a manager over a caller-supplied token store
    pub fn with_store(store: S) -> Self {
        Self {
            store: Arc::new(store),
            _key: std::marker::PhantomData,
        }
    }

    /// Acquire the key's lock, blocking the calling thread until available
    ///
    /// Do not call from an async task: it parks the OS thread. Use
    /// [`lock_async`](Self::lock_async) there instead.
    pub fn lock(&self, key: K) -> LockResult<KeyGuard<K, S>> {
        let token = self.store.checkout(&key);
        let mut reservation = Reservation {
            store: self.store.as_ref(),
            key: &key,
            token: &token,
            armed: true,
        };

        let permit = futures::executor::block_on(token.semaphore().acquire_owned())
            .map_err(|_| LockError::Cancelled)?;

        reservation.armed = false;
        drop(reservation);
        Ok(KeyGuard::new(Arc::clone(&self.store), key, token, permit))
    }

    /// Acquire the key's lock without blocking a thread
    ///
    /// Suspends the task until the semaphore is available. With a timeout,
    /// an expired wait resolves to [`LockError::Timeout`]; the reference
    /// taken during acquisition is rolled back so the token stays eligible
    /// for pruning. Cancel-safe: dropping the returned future mid-wait
    /// performs the same rollback.
    pub async fn lock_async(
        &self,
        key: K,
        timeout: Option<Duration>,
    ) -> LockResult<KeyGuard<K, S>> {
        let token = self.store.checkout(&key);
        let mut reservation = Reservation {
            store: self.store.as_ref(),
            key: &key,
            token: &token,
            armed: true,
        };

        let wait = token.semaphore().acquire_owned();
        let permit = match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(acquired) => acquired.map_err(|_| LockError::Cancelled)?,
                Err(_) => {
                    tracing::trace!(?limit, "keyed lock wait timed out");
                    return Err(LockError::Timeout);
                }
            },
            None => wait.await.map_err(|_| LockError::Cancelled)?,
        };

        reservation.armed = false;
        drop(reservation);
        Ok(KeyGuard::new(Arc::clone(&self.store), key, token, permit))
    }

    /// Run a callback while holding the key's lock
    ///
    /// The lock is released on every exit path, panics included. The
    /// callback's failure handling is its own business: errors and panics
    /// propagate unchanged.
    pub fn with_lock<R, F>(&self, key: K, f: F) -> LockResult<R>
    where
        F: FnOnce() -> R,
    {
        let _held = self.lock(key)?;
        Ok(f())
    }

    /// Run an async callback while holding the key's lock
    ///
    /// The closure is only invoked once the lock is held; an expired or
    /// cancelled wait never runs it.
    pub async fn with_lock_async<R, F, Fut>(
        &self,
        key: K,
        timeout: Option<Duration>,
        f: F,
    ) -> LockResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _held = self.lock_async(key, timeout).await?;
        Ok(f().await)
    }

    /// Number of keys with live tokens (diagnostic)
    ///
    /// Zero once every holder and waiter is gone; pruning is continuous.
    pub fn active_keys(&self) -> usize {
        self.store.len()
    }

    /// Callers currently holding or waiting on a key (diagnostic)
    pub fn holder_count(&self, key: &K) -> usize {
        self.store.peek(key).map_or(0, |token| token.holders())
    }

    /// Whether more than one caller is attached to the key right now
    pub fn is_contended(&self, key: &K) -> bool {
        self.holder_count(key) > 1
    }
}

impl<K, S> Clone for KeyedMutex<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _key: std::marker::PhantomData,
        }
    }
}
