/*!
 * Token Store
 *
 * Concurrent key-to-token registry with atomic checkout and
 * prune-if-unreferenced semantics.
 */

use super::token::LockToken;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

/// Registry of live lock tokens
///
/// Implementations must provide lock-free-per-key concurrency: activity on
/// one key must never serialize behind activity on an unrelated key.
///
/// # Contract
///
/// - `checkout` performs get-or-insert *and* takes the caller's reference in
///   one step that is atomic with respect to `discard` on the same key. This
///   ordering is what prevents a releaser from pruning a token a contender
///   is about to park on.
/// - `discard` removes a key only if it still maps to the given token
///   instance and that token is unreferenced at the moment of the check.
///   Pruning is best-effort memory bounding; skipping it never breaks
///   exclusivity.
pub trait TokenStore<K>: Send + Sync
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    /// Get the key's token, creating it if absent, with one reference taken
    fn checkout(&self, key: &K) -> Arc<LockToken>;

    /// Prune the key's entry if it is still `token` and unreferenced
    ///
    /// Returns `true` if the entry was removed.
    fn discard(&self, key: &K, token: &Arc<LockToken>) -> bool;

    /// Current token for a key, if one is registered (diagnostic)
    fn peek(&self, key: &K) -> Option<Arc<LockToken>>;

    /// Number of keys with live tokens
    fn len(&self) -> usize;

    /// Whether no key currently has a token
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sharded concurrent token store
///
/// Default `TokenStore` backed by a `DashMap`, so unrelated keys land on
/// independent shards and never contend on a global lock.
pub struct DashStore<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    tokens: DashMap<K, Arc<LockToken>, RandomState>,
}

impl<K> DashStore<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tokens: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<K> Default for DashStore<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TokenStore<K> for DashStore<K>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    fn checkout(&self, key: &K) -> Arc<LockToken> {
        let entry = self.tokens.entry(key.clone()).or_insert_with(|| {
            tracing::trace!("lock token created");
            Arc::new(LockToken::new())
        });

        // Retain while the entry's shard lock is held: discard on this key
        // serializes behind us and can never observe a stale zero count.
        let token = Arc::clone(&entry);
        token.retain();
        drop(entry);
        token
    }

    fn discard(&self, key: &K, token: &Arc<LockToken>) -> bool {
        let removed = self
            .tokens
            .remove_if(key, |_, current| {
                Arc::ptr_eq(current, token) && current.is_idle()
            })
            .is_some();

        if removed {
            tracing::trace!("lock token pruned");
        }
        removed
    }

    fn peek(&self, key: &K) -> Option<Arc<LockToken>> {
        self.tokens.get(key).map(|entry| Arc::clone(&entry))
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}
