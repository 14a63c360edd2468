//! Database schema initialization

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Initializing database schema");

    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='scan_reports'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if table_exists {
        debug!("scan_reports table already exists");
    } else {
        info!("Creating new database schema");
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scan_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            digest TEXT NOT NULL,
            registration_uuid TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            report TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(digest, registration_uuid, mime_type)
        );

        CREATE INDEX IF NOT EXISTS idx_scan_reports_digest ON scan_reports(digest);
        CREATE INDEX IF NOT EXISTS idx_scan_reports_registration ON scan_reports(registration_uuid);

        CREATE TABLE IF NOT EXISTS vulnerability_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            report_uuid TEXT NOT NULL,
            cve_id TEXT NOT NULL,
            package TEXT NOT NULL,
            package_version TEXT NOT NULL DEFAULT '',
            fixed_version TEXT NOT NULL DEFAULT '',
            severity TEXT NOT NULL DEFAULT 'Unknown'
        );

        CREATE INDEX IF NOT EXISTS idx_vulnerability_records_report ON vulnerability_records(report_uuid);
        "#,
    )
    .context("Failed to initialize database schema")?;

    let index_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!(
        tables = "scan_reports,vulnerability_records",
        indexes = index_count,
        "Database schema initialized"
    );

    Ok(())
}
