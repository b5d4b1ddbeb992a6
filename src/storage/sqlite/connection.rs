//! Connection handling for the `SQLite` backend.

use crate::{Error, Result};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Mutex;
/// use snipster::storage::sqlite::acquire_lock;
///
/// let mutex = Mutex::new(connection);
/// let guard = acquire_lock(&mutex);
/// ```
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Storage mutex was poisoned, recovering");
            metrics::counter!("storage_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection.
///
/// - **WAL mode** for concurrent readers with a single writer
/// - **NORMAL synchronous**
/// - **`busy_timeout`** of 5 seconds instead of failing on lock contention
/// - **`foreign_keys`** so that deleting a snippet cascades to its gist
/// - **`unicode_lower`**, a scalar function folding case beyond ASCII, which
///   the built-in `lower()` and `LIKE` do not
///
/// # Errors
///
/// Returns [`Error::StorageUnavailable`] if foreign keys cannot be enabled or
/// the function cannot be registered.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row ("wal" / "memory"), so results are ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::storage("enable_foreign_keys", e))?;

    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
    .map_err(|e| Error::storage("register_unicode_lower", e))?;

    Ok(())
}
