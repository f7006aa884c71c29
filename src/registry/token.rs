/*!
 * Lock Token
 *
 * The per-key exclusion primitive: a binary semaphore plus a reference
 * count of the holders and waiters currently attached to it.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Exclusion primitive bound to one key while it is live
///
/// The semaphore starts with a single available permit; acquiring the key's
/// lock takes that permit, releasing it gives it back. The reference count
/// tracks every caller that has checked the token out of the registry and
/// not yet dropped it, holders and parked waiters alike.
///
/// Tokens are disposable: a token may be pruned from the registry and a
/// fresh one created for the same key any number of times. Exclusivity is
/// enforced by the semaphore, never by token identity.
pub struct LockToken {
    semaphore: Arc<Semaphore>,
    holders: AtomicUsize,
}

impl LockToken {
    /// Create a fresh token with its permit available
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            holders: AtomicUsize::new(0),
        }
    }

    /// Number of callers currently referencing this token (diagnostic)
    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::Acquire)
    }

    /// Whether no caller references this token right now
    pub fn is_idle(&self) -> bool {
        self.holders() == 0
    }

    /// Take a reference on behalf of a caller about to wait
    ///
    /// Must happen before the semaphore wait, and atomically with respect
    /// to the registry's prune check, so a releaser can never observe zero
    /// while a contender is about to park on this very token.
    pub(crate) fn retain(&self) -> usize {
        self.holders.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop a reference; returns `true` if this was the last one
    ///
    /// A `true` return makes the caller responsible for offering the token
    /// back to the registry for pruning.
    pub(crate) fn release(&self) -> bool {
        self.holders.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Handle to the underlying semaphore for an owned acquire
    pub(crate) fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.semaphore)
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockToken")
            .field("holders", &self.holders())
            .field("available", &self.semaphore.available_permits())
            .finish()
    }
}
