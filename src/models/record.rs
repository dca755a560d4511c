//! Listing entries: extraction candidates and persisted records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (title, link) pair pulled from one page by one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Visible text of the element, whitespace-normalized
    pub title: String,

    /// Absolute URL resolved against the site URL
    pub link: String,
}

/// Outcome of matching a title against the keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched { keyword: String },
    Unmatched,
}

/// A listing entry as handed to a record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub link: String,
}

impl From<&Candidate> for Record {
    fn from(candidate: &Candidate) -> Self {
        Self {
            title: candidate.title.clone(),
            link: candidate.link.clone(),
        }
    }
}

/// One persisted row. `link` is unique within its store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRecord {
    /// Insertion order within the store, starting at 0
    pub index: u64,

    /// Title as first seen; later titles for the same link are ignored
    pub title: String,

    pub link: String,

    pub first_seen: DateTime<Utc>,
}

impl StoredRecord {
    /// Format the row for display using a template.
    ///
    /// Supported placeholders: `{index}`, `{title}`, `{link}`, `{first_seen}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{index}", &self.index.to_string())
            .replace("{title}", &self.title)
            .replace("{link}", &self.link)
            .replace("{first_seen}", &self.first_seen.format("%Y-%m-%d %H:%M").to_string())
    }
}

/// The three disjoint record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreId {
    /// Entries whose title matched a keyword
    Matched,
    /// Entries whose title matched no keyword
    Unmatched,
    /// Every link-bearing entry, whatever the classification
    All,
}

impl StoreId {
    pub const ALL: [StoreId; 3] = [StoreId::Matched, StoreId::Unmatched, StoreId::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreId::Matched => "matched",
            StoreId::Unmatched => "unmatched",
            StoreId::All => "all",
        }
    }

    /// File name of the store inside the data directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "matched" => Ok(StoreId::Matched),
            "unmatched" => Ok(StoreId::Unmatched),
            "all" => Ok(StoreId::All),
            other => Err(format!(
                "unknown store '{other}' (expected matched, unmatched or all)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let record = StoredRecord {
            index: 3,
            title: "Przebudowa drogi gminnej".to_string(),
            link: "https://bip.example.pl/p/3".to_string(),
            first_seen: DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        assert_eq!(
            record.format("#{index} [{first_seen}] {title}"),
            "#3 [2024-05-01 08:30] Przebudowa drogi gminnej"
        );
    }

    #[test]
    fn store_id_parses_case_insensitively() {
        assert_eq!("Matched".parse::<StoreId>(), Ok(StoreId::Matched));
        assert_eq!("all".parse::<StoreId>(), Ok(StoreId::All));
        assert!("everything".parse::<StoreId>().is_err());
        assert_eq!(StoreId::Unmatched.file_name(), "unmatched.json");
    }
}
