//! Database connection and lifecycle management

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use super::schema::init_schema;
use crate::error::StoreError;

/// SQLite database shared between clones
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `db_path`; `":memory:"` is supported
    pub fn new(db_path: &str) -> Result<Self> {
        let existing = if db_path == ":memory:" {
            None
        } else {
            Some(Self::prepare_location(Path::new(db_path))?)
        };
        debug!(path = %db_path, existing = ?existing, "Opening scan report database");

        let conn = Connection::open(db_path)
            .inspect_err(|e| error!(path = %db_path, error = %e, "Cannot open scan report database"))
            .with_context(|| format!("Failed to open scan report database at {}", db_path))?;
        init_schema(&conn).context("Failed to prepare scan report schema")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_string(),
        };

        let (_, size) = db.get_db_size();
        info!(
            path = %db_path,
            reused = existing.unwrap_or(false),
            size = %size,
            reports = db.report_count().unwrap_or(0),
            "Scan report database ready"
        );

        Ok(db)
    }

    /// Make sure the parent directory exists; reports whether the file was already there
    fn prepare_location(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(true);
        }
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                info!(directory = %dir.display(), "Creating scan report storage directory");
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create storage directory {}", dir.display())
                })?;
            }
            _ => {}
        }
        Ok(false)
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Total number of report rows
    pub fn report_count(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM scan_reports", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Database file size
    pub fn get_db_size(&self) -> (u64, String) {
        match std::fs::metadata(&self.db_path) {
            Ok(metadata) => {
                let size = metadata.len();
                (size, Self::format_bytes(size))
            }
            Err(_) => (0, "0 B".to_string()),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            db_path: self.db_path.clone(),
        }
    }
}
