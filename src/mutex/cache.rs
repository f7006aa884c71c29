/*!
 * Double-Checked Get-Or-Create
 *
 * Optimistic read, then lock, re-check, and create. The fast path never
 * touches the registry, so an already-populated value costs one callback
 * invocation and nothing else.
 */

use super::keyed::KeyedMutex;
use crate::errors::LockResult;
use crate::registry::TokenStore;
use std::future::Future;
use std::time::Duration;

impl<K, S> KeyedMutex<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    /// Get a value, creating it under the key's lock if absent
    ///
    /// `get` runs first with no lock taken; a `Some` short-circuits
    /// everything. Otherwise the key's lock is acquired and `get` runs
    /// again, because another caller may have populated the value while we
    /// waited. Only a still-absent value invokes `create`.
    ///
    /// At most one `create` is in flight per key at any time. It can run
    /// once per populate/invalidate cycle of the key, but never
    /// concurrently with itself.
    pub fn get_or_create<T, G, C>(&self, key: K, mut get: G, create: C) -> LockResult<T>
    where
        G: FnMut() -> Option<T>,
        C: FnOnce() -> T,
    {
        if let Some(value) = get() {
            return Ok(value);
        }

        let _held = self.lock(key)?;
        if let Some(value) = get() {
            return Ok(value);
        }
        Ok(create())
    }

    /// Async form of [`get_or_create`](Self::get_or_create)
    ///
    /// A timeout bounds only the wait for the lock, never the callbacks.
    /// An expired wait reports [`LockError::Timeout`](crate::LockError) and
    /// invokes nothing further.
    pub async fn get_or_create_async<T, G, GF, C, CF>(
        &self,
        key: K,
        timeout: Option<Duration>,
        mut get: G,
        create: C,
    ) -> LockResult<T>
    where
        G: FnMut() -> GF,
        GF: Future<Output = Option<T>>,
        C: FnOnce() -> CF,
        CF: Future<Output = T>,
    {
        if let Some(value) = get().await {
            return Ok(value);
        }

        let _held = self.lock_async(key, timeout).await?;
        if let Some(value) = get().await {
            return Ok(value);
        }
        Ok(create().await)
    }

    /// Sentinel-value form for types without an absent state
    ///
    /// `empty` plays the role `None` does in
    /// [`get_or_create`](Self::get_or_create): any `get` result equal to it
    /// counts as unpopulated.
    pub fn get_or_create_or<T, G, C>(
        &self,
        key: K,
        empty: T,
        mut get: G,
        create: C,
    ) -> LockResult<T>
    where
        T: PartialEq,
        G: FnMut() -> T,
        C: FnOnce() -> T,
    {
        let current = get();
        if current != empty {
            return Ok(current);
        }

        let _held = self.lock(key)?;
        let current = get();
        if current != empty {
            return Ok(current);
        }
        Ok(create())
    }

    /// Async sentinel-value form
    pub async fn get_or_create_or_async<T, G, GF, C, CF>(
        &self,
        key: K,
        timeout: Option<Duration>,
        empty: T,
        mut get: G,
        create: C,
    ) -> LockResult<T>
    where
        T: PartialEq,
        G: FnMut() -> GF,
        GF: Future<Output = T>,
        C: FnOnce() -> CF,
        CF: Future<Output = T>,
    {
        let current = get().await;
        if current != empty {
            return Ok(current);
        }

        let _held = self.lock_async(key, timeout).await?;
        let current = get().await;
        if current != empty {
            return Ok(current);
        }
        Ok(create().await)
    }
}
