/*!
 * Key Guard
 *
 * RAII witness that a key's lock is held
 */

use crate::registry::{DashStore, LockToken, TokenStore};
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

/// Held lock on a key
///
/// Dropping the guard releases the key on every exit path, including panic
/// unwinds out of a guarded callback: the semaphore permit is returned
/// first, then the token reference is dropped, and if that was the last
/// reference the token is offered back to the registry for pruning.
pub struct KeyGuard<K, S = DashStore<K>>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    store: Arc<S>,
    key: K,
    token: Arc<LockToken>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<K, S> KeyGuard<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    pub(crate) fn new(
        store: Arc<S>,
        key: K,
        token: Arc<LockToken>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            store,
            key,
            token,
            permit: Some(permit),
        }
    }

    /// The key this guard holds
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Callers referencing the key's token, this guard included (diagnostic)
    pub fn holders(&self) -> usize {
        self.token.holders()
    }
}

impl<K, S> Drop for KeyGuard<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    S: TokenStore<K>,
{
    fn drop(&mut self) {
        // Release order matters: give the permit back before dropping our
        // reference, so a parked waiter resumes on a token that is either
        // still registered or already signalled.
        drop(self.permit.take());

        if self.token.release() {
            self.store.discard(&self.key, &self.token);
        }
    }
}

impl<K, S> std::fmt::Debug for KeyGuard<K, S>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static + std::fmt::Debug,
    S: TokenStore<K>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .field("holders", &self.holders())
            .finish()
    }
}
