//! Service layer for the watcher.
//!
//! This module contains the building blocks the discovery loop drives:
//! - Page fetching (`Transport`, `HttpTransport`)
//! - Candidate extraction (`CandidateExtractor`)
//! - Keyword classification (`KeywordClassifier`)
//! - Event reporting (`EventSink` and its implementations)

mod classifier;
mod events;
mod extractor;
mod transport;

pub use classifier::{KeywordClassifier, classify};
pub use events::{ChannelSink, EventSink, LogSink, NewMatch, NoopSink, WatchEvent};
pub use extractor::{CandidateExtractor, MAX_CANDIDATES, parse_selector};
pub use transport::{HttpTransport, Transport};
