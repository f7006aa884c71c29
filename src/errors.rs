/*!
 * Error Types
 *
 * Failure conditions for keyed lock acquisition
 */

use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Lock acquisition errors
///
/// Both variants mean the lock was never held: no callback ran, and the
/// waiter reference taken during acquisition has already been rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Timed out waiting to acquire the key's lock")]
    Timeout,

    #[error("Acquisition was cancelled before the lock was obtained")]
    Cancelled,
}
