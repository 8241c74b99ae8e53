use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "nestlist.db";

/// Returns the nestlist data directory, creating it if needed.
/// Location: `~/.local/share/nestlist` (XDG-compliant)
pub fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "nestlist").context("Could not determine data directory")?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.to_path_buf())
}

/// Opens (or creates) the SQLite database at `path` and returns the connection.
/// Enables WAL mode for better concurrent read performance.
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Open an in-memory database for testing.
pub fn open_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    Ok(conn)
}

/// Read the schema version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Stamp a fresh database with `version`, or check that an existing one matches.
pub fn ensure_schema_version(conn: &Connection, version: u32) -> Result<()> {
    match schema_version(conn)? {
        0 => {
            info!(version, "stamping new database schema");
            conn.pragma_update(None, "user_version", version)?;
            Ok(())
        }
        v if v == version => Ok(()),
        v if v > version => bail!("Database schema version {v} is newer than supported ({version})"),
        v => bail!("Database schema version {v} has no migration to {version}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_db_gets_stamped() {
        let conn = open_memory_db().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        ensure_schema_version(&conn, 1).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);

        // Second call is a no-op
        ensure_schema_version(&conn, 1).unwrap();
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = open_memory_db().unwrap();
        conn.pragma_update(None, "user_version", 7).unwrap();
        assert!(ensure_schema_version(&conn, 1).is_err());
    }

    #[test]
    fn test_open_db_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nestlist.db");
        let conn = open_db(&path).unwrap();
        ensure_schema_version(&conn, 1).unwrap();
        drop(conn);

        let conn = open_db(&path).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }
}
