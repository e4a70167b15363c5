use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::{Result, SyncError};

/// Opens an existing store read-write. The file is never created here.
pub fn open_store(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| SyncError::StoreOpen(path.to_path_buf(), e))?;
    // The host application may hold the file briefly while saving.
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(|e| SyncError::StoreOpen(path.to_path_buf(), e))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_is_open_error() {
        let path = std::env::temp_dir().join("price-sync-missing-store.ibank");
        let err = open_store(&path).unwrap_err();
        assert!(matches!(err, SyncError::StoreOpen(p, _) if p == path));
        assert!(!path.exists());
    }

    #[test]
    fn opens_existing_store() {
        let path = std::env::temp_dir().join(format!(
            "price-sync-existing-{}.ibank",
            std::process::id()
        ));
        Connection::open(&path).unwrap();

        let conn = open_store(&path).unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);

        drop(conn);
        std::fs::remove_file(&path).unwrap();
    }
}
