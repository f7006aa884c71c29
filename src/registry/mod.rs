/*!
 * Token Registry
 *
 * Per-key lock tokens and the concurrent store that owns them. Tokens are
 * created lazily on first contention for a key and pruned as soon as the
 * last holder or waiter lets go, so the registry only ever holds entries
 * for currently active keys.
 */

mod store;
mod token;

pub use store::{DashStore, TokenStore};
pub use token::LockToken;
