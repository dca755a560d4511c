// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by the discovery loop,
//! the record stores and the CLI.

mod config;
mod record;
mod watch;

// Re-export all public types
pub use config::{CrawlerConfig, LoggingConfig, PathsConfig, Settings};
pub use record::{Candidate, Classification, Record, StoreId, StoredRecord};
pub use watch::{DEFAULT_INTERVAL_SECS, SiteRule, WatchConfig, is_valid_site_url};

/// Counters for one pass over the watch list. Purely informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CycleReport {
    /// Sites visited
    pub sites: usize,
    /// Page fetches attempted, one per (site, selector) pair
    pub fetches: usize,
    pub fetch_errors: usize,
    pub extraction_errors: usize,
    /// Link-bearing candidates processed
    pub candidates: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Individual appends that failed
    pub store_errors: usize,
    /// Match notifications emitted
    pub new_matches: usize,
}

impl CycleReport {
    /// Sum of the per-step failures seen during the cycle.
    pub fn error_count(&self) -> usize {
        self.fetch_errors + self.extraction_errors + self.store_errors
    }
}
