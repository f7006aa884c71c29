/*!
 * Keyed Lock Manager
 *
 * Mutual exclusion scoped to arbitrary runtime keys rather than statically
 * declared lock objects. Blocking and async call sites compete for the
 * same per-key semaphore, and per-key state is created on first contention
 * and pruned the moment the last holder or waiter lets go.
 *
 * # Architecture
 *
 * - [`registry`]: per-key [`LockToken`]s (binary semaphore + reference
 *   count) behind the [`TokenStore`] interface, with a sharded
 *   [`DashStore`] default.
 * - [`mutex`]: the [`KeyedMutex`] manager, its RAII [`KeyGuard`], and the
 *   double-checked get-or-create operations.
 *
 * # Guarantees
 *
 * - One holder per key at a time, across both call styles.
 * - Release on every exit path, panicking callbacks included.
 * - Memory bounded to currently active keys: an idle key has no entry.
 * - No fairness promise beyond the semaphore's own queuing.
 */

pub mod errors;
pub mod mutex;
pub mod registry;

// Re-exports
pub use errors::{LockError, LockResult};
pub use mutex::{KeyGuard, KeyedMutex};
pub use registry::{DashStore, LockToken, TokenStore};
