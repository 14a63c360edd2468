//! Vulnerability record operations

use rusqlite::{params, params_from_iter};
use tracing::debug;

use super::database::Database;
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::model::VulnerabilityRecord;
use crate::store::VulnerabilityStore;

impl Database {
    /// Attach vulnerability records to their reports
    pub fn insert_vulnerabilities(
        &self,
        ctx: &RequestContext,
        records: &[VulnerabilityRecord],
    ) -> Result<usize, StoreError> {
        ctx.check()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO vulnerability_records (
                    report_uuid, cve_id, package, package_version, fixed_version, severity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for record in records {
                stmt.execute(params![
                    record.report_uuid,
                    record.cve_id,
                    record.package,
                    record.package_version,
                    record.fixed_version,
                    record.severity,
                ])?;
            }
        }
        tx.commit()?;

        debug!(records = records.len(), "Vulnerability records inserted");
        Ok(records.len())
    }

    /// Number of vulnerability records attached to a report
    pub fn vulnerability_count(&self, report_uuid: &str) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM vulnerability_records WHERE report_uuid = ?1",
            [report_uuid],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl VulnerabilityStore for Database {
    fn delete_for_report(
        &self,
        ctx: &RequestContext,
        report_uuid: &str,
    ) -> Result<u64, StoreError> {
        ctx.check()?;
        let conn = self.lock()?;

        let affected = conn.execute(
            "DELETE FROM vulnerability_records WHERE report_uuid = ?1",
            [report_uuid],
        )?;

        debug!(report_uuid = %report_uuid, deleted = affected, "Vulnerability records deleted");
        Ok(affected as u64)
    }

    fn delete_for_digests(
        &self,
        ctx: &RequestContext,
        digests: &[String],
    ) -> Result<u64, StoreError> {
        ctx.check()?;
        if digests.is_empty() {
            return Ok(0);
        }
        let conn = self.lock()?;

        let placeholders = vec!["?"; digests.len()].join(", ");
        let sql = format!(
            "DELETE FROM vulnerability_records WHERE report_uuid IN \
             (SELECT uuid FROM scan_reports WHERE digest IN ({}))",
            placeholders
        );
        let affected = conn.execute(&sql, params_from_iter(digests.iter()))?;

        debug!(digests = digests.len(), deleted = affected, "Vulnerability records deleted");
        Ok(affected as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Report;
    use crate::store::ReportStore;

    fn setup() -> Database {
        let db = Database::new(":memory:").expect("Failed to create database");
        let ctx = RequestContext::background();
        for (uuid, digest) in [("u1", "sha256:a"), ("u2", "sha256:b"), ("u3", "sha256:c")] {
            let mut report = Report::new(digest, "r1", "application/json");
            report.uuid = uuid.to_string();
            db.create(&ctx, &report).expect("Failed to insert report");
        }
        db.insert_vulnerabilities(
            &ctx,
            &[
                VulnerabilityRecord::new("u1", "CVE-2024-0001", "openssl", "High"),
                VulnerabilityRecord::new("u1", "CVE-2024-0002", "zlib", "Low"),
                VulnerabilityRecord::new("u2", "CVE-2024-0003", "curl", "Critical"),
                VulnerabilityRecord::new("u3", "CVE-2024-0004", "glibc", "Medium"),
            ],
        )
        .expect("Failed to insert vulnerabilities");
        db
    }

    fn list_vulnerabilities(db: &Database, report_uuid: &str) -> Vec<VulnerabilityRecord> {
        let conn = db.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT report_uuid, cve_id, package, package_version, fixed_version, severity \
                 FROM vulnerability_records WHERE report_uuid = ?1 ORDER BY id",
            )
            .unwrap();
        let records = stmt
            .query_map([report_uuid], |row| {
                Ok(VulnerabilityRecord {
                    report_uuid: row.get(0)?,
                    cve_id: row.get(1)?,
                    package: row.get(2)?,
                    package_version: row.get(3)?,
                    fixed_version: row.get(4)?,
                    severity: row.get(5)?,
                })
            })
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        records
    }

    #[test]
    fn test_insert_vulnerabilities_keeps_order() {
        let db = setup();
        let records = list_vulnerabilities(&db, "u1");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cve_id, "CVE-2024-0001");
        assert_eq!(records[1].severity, "Low");
    }

    #[test]
    fn test_delete_for_report() {
        let db = setup();
        let deleted = db
            .delete_for_report(&RequestContext::background(), "u1")
            .expect("Failed to delete");
        assert_eq!(deleted, 2);
        assert_eq!(db.vulnerability_count("u1").unwrap(), 0);
        assert_eq!(db.vulnerability_count("u2").unwrap(), 1);
    }

    #[test]
    fn test_delete_for_digests() {
        let db = setup();
        let deleted = db
            .delete_for_digests(
                &RequestContext::background(),
                &["sha256:a".to_string(), "sha256:b".to_string()],
            )
            .expect("Failed to delete");
        assert_eq!(deleted, 3);
        assert_eq!(db.vulnerability_count("u3").unwrap(), 1);
        // report rows are left to the caller
        assert_eq!(db.report_count().unwrap(), 3);
    }

    #[test]
    fn test_delete_for_unknown_digest() {
        let db = setup();
        let deleted = db
            .delete_for_digests(&RequestContext::background(), &["sha256:zzz".to_string()])
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
