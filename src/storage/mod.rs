//! Record stores for discovered listing entries.
//!
//! Three independent stores keep what the discovery loop has seen:
//!
//! ```text
//! {data_dir}/
//! ├── matched.json      # titles that matched a keyword
//! ├── unmatched.json    # titles that matched none
//! └── all.json          # every link-bearing entry
//! ```
//!
//! Every store is keyed by link: appending a link that is already present is
//! a successful no-op and the first-seen title is kept.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Record, StoreId, StoredRecord};

// Re-export for convenience
pub use local::LocalStorage;

/// What an append did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The record was written.
    Inserted,
    /// A record with the same link already existed; nothing was written.
    AlreadyPresent,
}

/// On-disk layout of one store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    /// Timestamp of the last committed append
    pub updated_at: DateTime<Utc>,
    /// Number of records
    pub count: usize,
    /// Records in insertion order
    pub records: Vec<StoredRecord>,
}

impl StoreFile {
    pub fn new(records: Vec<StoredRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.records.iter().any(|r| r.link == link)
    }

    /// Index for the next appended record.
    pub fn next_index(&self) -> u64 {
        self.records.last().map_or(0, |r| r.index + 1)
    }
}

impl Default for StoreFile {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Trait for record storage backends.
///
/// Implementations must make each append a single transaction: the
/// membership check and the write happen under the store's own lock, and a
/// failure leaves the previously committed records untouched.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Whether `store` already holds a record for `link`.
    async fn contains(&self, store: StoreId, link: &str) -> Result<bool, StoreError>;

    /// Append `record` unless its link is already present.
    async fn append(&self, store: StoreId, record: &Record) -> Result<AppendOutcome, StoreError>;

    /// All records of `store` in insertion order.
    async fn load(&self, store: StoreId) -> Result<Vec<StoredRecord>, StoreError>;
}
