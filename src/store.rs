//! Persistence capabilities consumed by [`crate::ReportRepository`].
//!
//! Implementations must be safe to share across threads (`Send + Sync`) and
//! must check the [`RequestContext`] before doing any work.
//!
//! - `memory`: in-memory store for tests and embedding
//! - [`crate::storage::Database`]: SQLite-backed store

pub mod memory;

use crate::context::RequestContext;
use crate::error::StoreError;
use crate::model::{MutableField, Report};
use crate::query::Query;

pub use memory::MemoryStore;

/// CRUD and filtered listing of report rows.
pub trait ReportStore: Send + Sync {
    /// Persist a new report row and return it as stored.
    fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, StoreError>;

    /// Delete every row matching the query keywords, returning the count.
    fn delete_many(&self, ctx: &RequestContext, query: &Query) -> Result<u64, StoreError>;

    /// Overwrite a single field of the row identified by `uuid`.
    fn update_field(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        field: MutableField,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Rows matching the query, honouring its sort and paging.
    fn list(&self, ctx: &RequestContext, query: &Query) -> Result<Vec<Report>, StoreError>;
}

/// Deletion of vulnerability data attached to reports.
pub trait VulnerabilityStore: Send + Sync {
    fn delete_for_report(&self, ctx: &RequestContext, report_uuid: &str)
    -> Result<u64, StoreError>;

    /// Delete the data of every report whose artifact digest is listed.
    fn delete_for_digests(
        &self,
        ctx: &RequestContext,
        digests: &[String],
    ) -> Result<u64, StoreError>;
}
