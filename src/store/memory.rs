//! In-memory report and vulnerability store

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{ReportStore, VulnerabilityStore};
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::model::{MutableField, Report, VulnerabilityRecord, filter_column, sort_column};
use crate::query::{Query, SortOrder};

#[derive(Debug, Default)]
struct State {
    reports: Vec<Report>,
    vulnerabilities: HashMap<String, Vec<VulnerabilityRecord>>,
}

/// Store keeping reports and vulnerability data in process memory.
///
/// Enforces the same uniqueness rules as the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Attach vulnerability records to their reports.
    pub fn insert_vulnerabilities(
        &self,
        ctx: &RequestContext,
        records: &[VulnerabilityRecord],
    ) -> Result<usize, StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;
        for record in records {
            state
                .vulnerabilities
                .entry(record.report_uuid.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(records.len())
    }

    /// Number of vulnerability records attached to a report.
    pub fn vulnerability_count(&self, report_uuid: &str) -> Result<usize, StoreError> {
        let state = self.lock()?;
        Ok(state
            .vulnerabilities
            .get(report_uuid)
            .map(Vec::len)
            .unwrap_or(0))
    }

    /// Total number of report rows.
    pub fn report_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.reports.len())
    }
}

fn matches(report: &Report, query: &Query) -> Result<bool, StoreError> {
    for (key, keyword) in &query.keywords {
        let column = filter_column(key)?;
        let value = report.value_of(column).unwrap_or_default();
        if !keyword.matches(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

impl ReportStore for MemoryStore {
    fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;

        if state.reports.iter().any(|r| r.uuid == report.uuid) {
            return Err(StoreError::Duplicate(format!("uuid {}", report.uuid)));
        }
        if state.reports.iter().any(|r| {
            r.digest == report.digest
                && r.registration_uuid == report.registration_uuid
                && r.mime_type == report.mime_type
        }) {
            return Err(StoreError::Duplicate(format!(
                "digest {} registration {} mime type {}",
                report.digest, report.registration_uuid, report.mime_type
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let row = Report {
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..report.clone()
        };
        state.reports.push(row.clone());

        debug!(uuid = %row.uuid, "Report row inserted");
        Ok(row)
    }

    fn delete_many(&self, ctx: &RequestContext, query: &Query) -> Result<u64, StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;

        // Validate every keyword before removing anything.
        let mut keep = Vec::with_capacity(state.reports.len());
        for report in &state.reports {
            keep.push(!matches(report, query)?);
        }

        let before = state.reports.len();
        let mut flags = keep.into_iter();
        state.reports.retain(|_| flags.next().unwrap_or(true));
        let deleted = (before - state.reports.len()) as u64;

        debug!(deleted = deleted, "Report rows deleted");
        Ok(deleted)
    }

    fn update_field(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        field: MutableField,
        value: &str,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut updated = 0;
        for report in state.reports.iter_mut().filter(|r| r.uuid == uuid) {
            match field {
                MutableField::Report => report.report = value.to_string(),
            }
            report.updated_at = Some(now.clone());
            updated += 1;
        }

        debug!(uuid = %uuid, field = %field, updated = updated, "Report field updated");
        Ok(())
    }

    fn list(&self, ctx: &RequestContext, query: &Query) -> Result<Vec<Report>, StoreError> {
        ctx.check()?;
        let state = self.lock()?;

        let mut rows = Vec::new();
        for report in &state.reports {
            if matches(report, query)? {
                rows.push(report.clone());
            }
        }

        if let Some(sort) = &query.sort {
            let column = sort_column(&sort.key)?;
            rows.sort_by(|a, b| {
                let ord = a.value_of(column).cmp(&b.value_of(column));
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        if let Some((limit, offset)) = query.page_window() {
            rows = rows
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect();
        }

        Ok(rows)
    }
}

impl VulnerabilityStore for MemoryStore {
    fn delete_for_report(
        &self,
        ctx: &RequestContext,
        report_uuid: &str,
    ) -> Result<u64, StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;
        let deleted = state
            .vulnerabilities
            .remove(report_uuid)
            .map(|records| records.len() as u64)
            .unwrap_or(0);

        debug!(report_uuid = %report_uuid, deleted = deleted, "Vulnerability records deleted");
        Ok(deleted)
    }

    fn delete_for_digests(
        &self,
        ctx: &RequestContext,
        digests: &[String],
    ) -> Result<u64, StoreError> {
        ctx.check()?;
        let mut state = self.lock()?;

        let uuids: Vec<String> = state
            .reports
            .iter()
            .filter(|r| digests.contains(&r.digest))
            .map(|r| r.uuid.clone())
            .collect();

        let mut deleted = 0;
        for uuid in uuids {
            if let Some(records) = state.vulnerabilities.remove(&uuid) {
                deleted += records.len() as u64;
            }
        }

        debug!(digests = digests.len(), deleted = deleted, "Vulnerability records deleted");
        Ok(deleted)
    }
}
