//! Store file lifecycle: replace-on-open and explicit close.

use super::{StoreError, StoreResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

/// Creates a fresh store at `path`, deleting any file already there.
///
/// # Side effects
/// - Removes the existing file at `path`, if any.
/// - Emits `store_open` logging events with duration and status.
pub fn create_store(path: impl AsRef<Path>) -> StoreResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=store_open module=store status=start path={}",
        path.display()
    );

    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            error!(
                "event=store_open module=store status=error duration_ms={} error_code=store_remove_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(StoreError::RemoveExisting {
                path: path.to_path_buf(),
                source: err,
            });
        }
    }

    let conn = match Connection::open(path).and_then(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=store_open module=store status=error duration_ms={} error_code=store_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    info!(
        "event=store_open module=store status=ok duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

/// Opens an existing store for inspection without replacing it.
pub fn open_existing_store(path: impl AsRef<Path>) -> StoreResult<Connection> {
    let conn = Connection::open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Closes `conn`, surfacing the close error instead of discarding it.
pub fn close_store(conn: Connection) -> StoreResult<()> {
    match conn.close() {
        Ok(()) => {
            info!("event=store_close module=store status=ok");
            Ok(())
        }
        Err((_conn, err)) => {
            error!(
                "event=store_close module=store status=error error_code=store_close_failed error={}",
                err
            );
            Err(err.into())
        }
    }
}
