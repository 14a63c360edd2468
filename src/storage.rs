//! SQLite storage for scan reports
//!
//! This module provides SQLite-based persistence for reports and their
//! vulnerability records.
//!
//! # Module Structure
//! - `database`: Database connection and lifecycle management
//! - `schema`: Database schema initialization
//! - `reports`: `ReportStore` implementation
//! - `vulnerabilities`: `VulnerabilityStore` implementation and record inserts

mod database;
mod reports;
mod schema;
mod vulnerabilities;

pub use database::Database;
