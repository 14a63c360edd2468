use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::context::RequestContext;

// ============================================
// Environment variable name constants
// ============================================
pub mod env {
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const STORAGE_PATH: &str = "STORAGE_PATH";
    pub const TIMEOUT_SECS: &str = "TIMEOUT_SECS";
}

pub const DB_FILE_NAME: &str = "scan-report.db";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a report record and print its uuid
    Create {
        /// Digest of the scanned artifact
        #[arg(long)]
        digest: String,
        /// Scanner registration that produced the report
        #[arg(long = "registration")]
        registration_uuid: String,
        /// Mime type of the report payload
        #[arg(long)]
        mime_type: String,
        /// Initial report payload
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Print the reports of an artifact digest
    Get {
        digest: String,
        #[arg(long = "registration")]
        registration_uuid: Option<String>,
        /// Mime types to include, comma-separated (empty = all)
        #[arg(long = "mime-type", value_delimiter = ',')]
        mime_types: Vec<String>,
    },
    /// Overwrite the payload of a report
    Update {
        uuid: String,
        #[arg(long)]
        data: String,
    },
    /// Delete a report and its vulnerability data
    Delete { uuid: String },
    /// Delete every report of the given artifact digests
    DeleteDigests { digests: Vec<String> },
    /// List reports with optional filters and paging
    List {
        #[arg(long)]
        digest: Option<String>,
        #[arg(long = "registration")]
        registration_uuid: Option<String>,
        #[arg(long = "mime-type", value_delimiter = ',')]
        mime_types: Vec<String>,
        /// Page number, starting at 1 (0 = unpaged)
        #[arg(long, default_value = "0")]
        page: u64,
        #[arg(long, default_value = "0")]
        page_size: u64,
    },
    /// Show version information
    Version,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "scan-report",
    version,
    about = "Vulnerability scan report lifecycle manager",
    long_about = "Creates, updates, queries and deletes vulnerability scan reports of container artifacts, cascading deletes to the vulnerability data attached to each report."
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Log format: json or pretty
    #[arg(long, env = env::LOG_FORMAT, default_value = "pretty")]
    pub log_format: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,

    /// Directory holding the SQLite database
    #[arg(long, env = env::STORAGE_PATH, default_value = "./data")]
    pub storage_path: String,

    /// Request timeout in seconds (0 to disable)
    #[arg(long, env = env::TIMEOUT_SECS, default_value = "0")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.log_format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            other => return Err(format!("Unsupported log format: {}", other)),
        }
        if self.storage_path.trim().is_empty() {
            return Err("STORAGE_PATH must not be empty".to_string());
        }
        Ok(())
    }

    /// Get SQLite database path
    pub fn get_db_path(&self) -> String {
        format!(
            "{}/{}",
            self.storage_path.trim_end_matches('/'),
            DB_FILE_NAME
        )
    }

    /// Request context for one command run
    pub fn context(&self) -> RequestContext {
        if self.timeout_secs == 0 {
            RequestContext::background()
        } else {
            RequestContext::with_timeout(Duration::from_secs(self.timeout_secs))
        }
    }
}
