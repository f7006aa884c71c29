/*!
 * Keyed Mutual Exclusion
 *
 * The manager and its RAII guard. Four operation families, each usable
 * from blocking threads and async tasks against the same per-key
 * semaphore:
 *
 * - raw acquisition (`lock`, `lock_async`) returning a [`KeyGuard`]
 * - guarded execution (`with_lock`, `with_lock_async`)
 * - double-checked get-or-create (`get_or_create`, `get_or_create_async`)
 * - sentinel-value get-or-create (`get_or_create_or`, `get_or_create_or_async`)
 */

mod cache;
mod guard;
mod keyed;

pub use guard::KeyGuard;
pub use keyed::KeyedMutex;
