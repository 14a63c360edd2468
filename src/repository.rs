//! Report lifecycle management on top of the injected stores.
//!
//! [`ReportRepository`] validates its inputs, generates report identifiers and
//! forwards everything else to a [`ReportStore`] and a [`VulnerabilityStore`].
//! It holds no mutable state and is safe to share between threads.
//!
//! Deletes run in two steps: vulnerability data first, then report rows. The
//! steps are not transactional. A failure between them leaves report rows
//! without vulnerability data, never vulnerability data without a report.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::error::ReportError;
use crate::id::{IdGenerator, UuidGenerator};
use crate::model::{MutableField, Report};
use crate::query::{Keyword, Query};
use crate::store::{ReportStore, VulnerabilityStore};

#[derive(Clone)]
pub struct ReportRepository {
    reports: Arc<dyn ReportStore>,
    vulnerabilities: Arc<dyn VulnerabilityStore>,
    ids: Arc<dyn IdGenerator>,
}

impl ReportRepository {
    pub fn new(reports: Arc<dyn ReportStore>, vulnerabilities: Arc<dyn VulnerabilityStore>) -> Self {
        Self {
            reports,
            vulnerabilities,
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Replace the identifier generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Create a new report record and return its uuid.
    ///
    /// `digest`, `registration_uuid` and `mime_type` must be set. Any uuid
    /// already on the report is replaced by a freshly generated one.
    pub fn create(&self, ctx: &RequestContext, report: &mut Report) -> Result<String, ReportError> {
        if report.digest.is_empty()
            || report.registration_uuid.is_empty()
            || report.mime_type.is_empty()
        {
            return Err(ReportError::invalid("malformed scan report object"));
        }

        report.uuid = self.ids.generate();
        self.reports.create(ctx, report)?;

        info!(
            uuid = %report.uuid,
            digest = %report.digest,
            registration_uuid = %report.registration_uuid,
            mime_type = %report.mime_type,
            "Scan report created"
        );

        Ok(report.uuid.clone())
    }

    /// Delete a report and its vulnerability data.
    pub fn delete(&self, ctx: &RequestContext, uuid: &str) -> Result<(), ReportError> {
        let vulns = self.vulnerabilities.delete_for_report(ctx, uuid)?;

        let query = Query::new().keyword("uuid", Keyword::Exact(uuid.to_string()));
        let count = self.reports.delete_many(ctx, &query).map_err(|e| {
            warn!(
                uuid = %uuid,
                vulnerabilities_deleted = vulns,
                error = %e,
                "Report row delete failed after vulnerability data was removed"
            );
            e
        })?;

        if count == 0 {
            warn!(uuid = %uuid, "No report deleted");
            return Err(ReportError::NotFound(format!(
                "no report with uuid {} deleted",
                uuid
            )));
        }

        info!(uuid = %uuid, vulnerabilities_deleted = vulns, "Scan report deleted");
        Ok(())
    }

    /// Overwrite the report payload of the given report.
    pub fn update_report_data(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        report: &str,
    ) -> Result<(), ReportError> {
        if uuid.is_empty() {
            return Err(ReportError::invalid("missing uuid"));
        }
        if report.is_empty() {
            return Err(ReportError::invalid("missing report JSON data"));
        }

        self.reports
            .update_field(ctx, uuid, MutableField::Report, report)?;

        debug!(uuid = %uuid, bytes = report.len(), "Report data updated");
        Ok(())
    }

    /// All reports of an artifact digest.
    ///
    /// An empty or absent `registration_uuid` matches every registration and
    /// an empty `mime_types` matches every mime type.
    pub fn get_by(
        &self,
        ctx: &RequestContext,
        digest: &str,
        registration_uuid: Option<&str>,
        mime_types: &[String],
    ) -> Result<Vec<Report>, ReportError> {
        if digest.is_empty() {
            return Err(ReportError::invalid("empty digest to get report data"));
        }

        let mut query = Query::new().keyword("digest", Keyword::Exact(digest.to_string()));
        if let Some(registration) = registration_uuid.filter(|r| !r.is_empty()) {
            query = query.keyword(
                "registration_uuid",
                Keyword::Exact(registration.to_string()),
            );
        }
        if !mime_types.is_empty() {
            query = query.keyword("mime_type", Keyword::OneOf(mime_types.to_vec()));
        }

        let reports = self.reports.list(ctx, &query)?;
        debug!(digest = %digest, count = reports.len(), "Reports fetched by digest");
        Ok(reports)
    }

    /// Delete the reports, and their vulnerability data, of every listed digest.
    pub fn delete_by_digests(
        &self,
        ctx: &RequestContext,
        digests: &[String],
    ) -> Result<(), ReportError> {
        if digests.is_empty() {
            return Ok(());
        }

        let vulns = self.vulnerabilities.delete_for_digests(ctx, digests)?;

        let query = Query::new().keyword("digest", Keyword::Or(digests.to_vec()));
        let count = self.reports.delete_many(ctx, &query).map_err(|e| {
            warn!(
                digests = digests.len(),
                vulnerabilities_deleted = vulns,
                error = %e,
                "Report row delete failed after vulnerability data was removed"
            );
            e
        })?;

        info!(
            digests = digests.len(),
            reports_deleted = count,
            vulnerabilities_deleted = vulns,
            "Scan reports deleted by digest"
        );
        Ok(())
    }

    /// List reports matching the query, as returned by the store.
    pub fn list(&self, ctx: &RequestContext, query: &Query) -> Result<Vec<Report>, ReportError> {
        Ok(self.reports.list(ctx, query)?)
    }
}
