//! Scan report lifecycle management.
//!
//! [`ReportRepository`] validates report operations and delegates persistence
//! to two injected capabilities: a [`ReportStore`] for report rows and a
//! [`VulnerabilityStore`] for the vulnerability data attached to them.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod query;
pub mod repository;
pub mod storage;
pub mod store;

pub use context::RequestContext;
pub use error::{ReportError, StoreError};
pub use id::{IdGenerator, UuidGenerator};
pub use model::{MutableField, Report, VulnerabilityRecord};
pub use query::{Keyword, Query, Sort, SortOrder};
pub use repository::ReportRepository;
pub use store::{ReportStore, VulnerabilityStore};
