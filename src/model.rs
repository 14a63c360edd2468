//! Data models for scan reports

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Columns a query may filter on.
pub(crate) const FILTER_COLUMNS: [&str; 4] = ["uuid", "digest", "registration_uuid", "mime_type"];

/// One scan result for one artifact, produced by one scanner registration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Report identifier, assigned once at creation
    #[serde(default)]
    pub uuid: String,
    /// Content digest of the scanned artifact
    pub digest: String,
    /// Scanner registration that produced the report
    pub registration_uuid: String,
    /// Format of the report payload
    pub mime_type: String,
    /// Serialized report payload
    #[serde(default)]
    pub report: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Report {
    pub fn new(
        digest: impl Into<String>,
        registration_uuid: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            digest: digest.into(),
            registration_uuid: registration_uuid.into(),
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    /// Value of a filterable or sortable column.
    pub(crate) fn value_of(&self, column: &str) -> Option<&str> {
        match column {
            "uuid" => Some(&self.uuid),
            "digest" => Some(&self.digest),
            "registration_uuid" => Some(&self.registration_uuid),
            "mime_type" => Some(&self.mime_type),
            "created_at" => self.created_at.as_deref(),
            _ => None,
        }
    }
}

/// Resolve a query keyword to a filter column.
pub(crate) fn filter_column(key: &str) -> Result<&'static str, StoreError> {
    FILTER_COLUMNS
        .iter()
        .find(|c| **c == key)
        .copied()
        .ok_or_else(|| StoreError::UnknownField(key.to_string()))
}

/// Resolve a sort key to a column.
pub(crate) fn sort_column(key: &str) -> Result<&'static str, StoreError> {
    if key == "created_at" {
        return Ok("created_at");
    }
    filter_column(key)
}

/// Report fields that may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutableField {
    /// Serialized report payload
    Report,
}

impl MutableField {
    pub const fn column(self) -> &'static str {
        match self {
            MutableField::Report => "report",
        }
    }
}

impl std::fmt::Display for MutableField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// A single finding attached to a report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub report_uuid: String,
    pub cve_id: String,
    pub package: String,
    #[serde(default)]
    pub package_version: String,
    #[serde(default)]
    pub fixed_version: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "Unknown".to_string()
}

impl VulnerabilityRecord {
    pub fn new(
        report_uuid: impl Into<String>,
        cve_id: impl Into<String>,
        package: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            report_uuid: report_uuid.into(),
            cve_id: cve_id.into(),
            package: package.into(),
            severity: severity.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_new_leaves_uuid_unset() {
        let report = Report::new("sha256:abc", "r1", "application/vnd.scanner");
        assert!(report.uuid.is_empty());
        assert!(report.report.is_empty());
        assert_eq!(report.digest, "sha256:abc");
    }

    #[test]
    fn test_filter_column_whitelist() {
        assert_eq!(filter_column("digest").unwrap(), "digest");
        assert_eq!(filter_column("mime_type").unwrap(), "mime_type");
        assert!(matches!(
            filter_column("report"),
            Err(StoreError::UnknownField(_))
        ));
        assert!(filter_column("digest; DROP TABLE scan_reports").is_err());
    }

    #[test]
    fn test_sort_column_allows_created_at() {
        assert_eq!(sort_column("created_at").unwrap(), "created_at");
        assert!(filter_column("created_at").is_err());
    }

    #[test]
    fn test_mutable_field_column() {
        assert_eq!(MutableField::Report.column(), "report");
        assert_eq!(MutableField::Report.to_string(), "report");
    }

    #[test]
    fn test_report_deserialize_without_uuid() {
        let report: Report = serde_json::from_str(
            r#"{"digest":"sha256:abc","registration_uuid":"r1","mime_type":"application/json"}"#,
        )
        .expect("Failed to parse report");
        assert!(report.uuid.is_empty());
        assert!(report.created_at.is_none());
    }

    #[test]
    fn test_vulnerability_record_default_severity() {
        let record: VulnerabilityRecord =
            serde_json::from_str(r#"{"report_uuid":"u1","cve_id":"CVE-2024-1","package":"openssl"}"#)
                .expect("Failed to parse record");
        assert_eq!(record.severity, "Unknown");
    }
}
