// src/pipeline/cycle.rs

//! One pass over the watch list.
//!
//! For every site (in order) and every selector of that site (in order) the
//! page is fetched, candidates are extracted, each candidate is recorded in
//! `all`, classified, and recorded in `matched` or `unmatched`. Failures are
//! counted and logged; none of them aborts the cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Candidate, Classification, CycleReport, Record, StoreId, WatchConfig};
use crate::services::{CandidateExtractor, EventSink, KeywordClassifier, NewMatch, Transport};
use crate::storage::{AppendOutcome, RecordStorage};

/// Default per-fetch timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Titles already announced as matches during this process.
///
/// Created when the scheduler starts and handed to every cycle, so repeated
/// cycles do not announce the same entry again.
#[derive(Debug, Default)]
pub struct NotificationDedup {
    seen: HashSet<String>,
}

impl NotificationDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `title`; true only the first time it is seen.
    pub fn first_time(&mut self, title: &str) -> bool {
        self.seen.insert(title.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Runs discovery cycles against a transport, a record storage and a sink.
pub struct CycleRunner {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn RecordStorage>,
    sink: Arc<dyn EventSink>,
    extractor: CandidateExtractor,
    fetch_timeout: Duration,
}

impl CycleRunner {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn RecordStorage>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            storage,
            sink,
            extractor: CandidateExtractor::new(),
            fetch_timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Run one full cycle over `config`.
    pub async fn run_cycle(
        &self,
        config: &WatchConfig,
        notifications: &mut NotificationDedup,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        let classifier = KeywordClassifier::new(config.keywords.as_slice());

        self.sink.info(&format!(
            "Starting search over {} site(s), {} selector(s)",
            config.sites.len(),
            config.selector_count()
        ));

        for site in &config.sites {
            report.sites += 1;
            self.sink.info(&format!("Searching {}", site.url));

            for selector in &site.selectors {
                self.sink.debug(&format!("Using selector: {}", selector));
                report.fetches += 1;

                let content = match self.transport.fetch(&site.url, self.fetch_timeout).await {
                    Ok(content) => content,
                    Err(e) => {
                        report.fetch_errors += 1;
                        self.sink.warn(&format!("Failed to fetch {}: {}", site.url, e));
                        continue;
                    }
                };

                let candidates = match self.extractor.try_extract(
                    &content,
                    selector,
                    &site.url,
                    self.sink.as_ref(),
                ) {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        report.extraction_errors += 1;
                        self.sink
                            .warn(&format!("Extraction failed for {}: {}", site.url, e));
                        continue;
                    }
                };

                for candidate in &candidates {
                    self.process_candidate(candidate, &classifier, notifications, &mut report)
                        .await;
                }
            }
        }

        self.sink.on_cycle_done(&report);
        report
    }

    async fn process_candidate(
        &self,
        candidate: &Candidate,
        classifier: &KeywordClassifier,
        notifications: &mut NotificationDedup,
        report: &mut CycleReport,
    ) {
        if candidate.link.trim().is_empty() {
            self.sink
                .debug(&format!("Skipped entry without link: {}", candidate.title));
            return;
        }
        report.candidates += 1;

        let record = Record::from(candidate);
        self.store(StoreId::All, &record, report).await;

        match classifier.classify(&candidate.title) {
            Classification::Matched { keyword } => {
                report.matched += 1;
                self.sink.debug(&format!(
                    "Keyword '{}' matched: {}",
                    keyword, candidate.title
                ));
                self.store(StoreId::Matched, &record, report).await;

                if notifications.first_time(&candidate.title) {
                    report.new_matches += 1;
                    self.sink.on_match(&NewMatch {
                        title: candidate.title.clone(),
                        link: candidate.link.clone(),
                        keyword,
                    });
                }
            }
            Classification::Unmatched => {
                report.unmatched += 1;
                self.sink
                    .debug(&format!("No keyword matched: {}", candidate.title));
                self.store(StoreId::Unmatched, &record, report).await;
            }
        }
    }

    async fn store(&self, store: StoreId, record: &Record, report: &mut CycleReport) {
        match self.storage.append(store, record).await {
            Ok(AppendOutcome::Inserted) => {
                self.sink
                    .debug(&format!("Saved to {}: {}", store, record.title));
            }
            Ok(AppendOutcome::AlreadyPresent) => {
                self.sink
                    .debug(&format!("Already in {}: {}", store, record.link));
            }
            Err(e) => {
                report.store_errors += 1;
                self.sink
                    .warn(&format!("Could not save '{}' to {}: {}", record.title, store, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::error::{StoreError, TransportError};
    use crate::models::{SiteRule, StoredRecord};
    use crate::services::{ChannelSink, NoopSink, WatchEvent};
    use crate::storage::LocalStorage;

    /// Serves canned pages; unknown URLs time out.
    struct FakeTransport {
        pages: HashMap<String, String>,
    }

    impl FakeTransport {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
            self.pages
                .get(url)
                .map(|b| b.clone().into_bytes())
                .ok_or_else(|| TransportError::Timeout {
                    url: url.to_string(),
                })
        }
    }

    /// Storage whose `matched` store is broken.
    struct BrokenMatched {
        inner: LocalStorage,
    }

    #[async_trait]
    impl RecordStorage for BrokenMatched {
        async fn contains(&self, store: StoreId, link: &str) -> Result<bool, StoreError> {
            self.inner.contains(store, link).await
        }

        async fn append(&self, store: StoreId, record: &Record) -> Result<AppendOutcome, StoreError> {
            if store == StoreId::Matched {
                return Err(StoreError::Malformed {
                    path: "matched.json".into(),
                    message: "broken".into(),
                });
            }
            self.inner.append(store, record).await
        }

        async fn load(&self, store: StoreId) -> Result<Vec<StoredRecord>, StoreError> {
            self.inner.load(store).await
        }
    }

    const SITE_A: &str = "https://a.example.pl/przetargi/";
    const SITE_B: &str = "https://b.example.pl/ogloszenia/";

    const PAGE_B: &str = r#"
        <table>
          <tr><td><a class="t" href="/o/1">Budowa drogi powiatowej</a></td></tr>
          <tr><td><a class="t" href="/o/2">Dostawa papieru</a></td></tr>
          <tr><td><a class="t">Bez linku - budowa</a></td></tr>
        </table>"#;

    fn config(sites: Vec<SiteRule>) -> WatchConfig {
        WatchConfig {
            sites,
            keywords: vec!["drogi".into(), "budowa".into()],
            interval_secs: 1,
        }
    }

    fn links(records: &[StoredRecord]) -> Vec<&str> {
        records.iter().map(|r| r.link.as_str()).collect()
    }

    #[tokio::test]
    async fn failed_site_does_not_stop_the_next_one() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let runner = CycleRunner::new(
            Arc::new(FakeTransport::new(&[(SITE_B, PAGE_B)])),
            storage.clone(),
            Arc::new(NoopSink),
        );
        let config = config(vec![
            SiteRule::with_selectors(SITE_A, ["a.t"]),
            SiteRule::with_selectors(SITE_B, ["a.t"]),
        ]);

        let report = runner
            .run_cycle(&config, &mut NotificationDedup::new())
            .await;

        assert_eq!(report.sites, 2);
        assert_eq!(report.fetches, 2);
        assert_eq!(report.fetch_errors, 1);
        assert_eq!(report.candidates, 2);
        assert_eq!(
            links(&storage.load(StoreId::Matched).await.unwrap()),
            vec!["https://b.example.pl/o/1"]
        );
    }

    #[tokio::test]
    async fn every_candidate_lands_in_all_and_exactly_one_class() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let runner = CycleRunner::new(
            Arc::new(FakeTransport::new(&[(SITE_B, PAGE_B)])),
            storage.clone(),
            Arc::new(NoopSink),
        );
        let config = config(vec![SiteRule::with_selectors(SITE_B, ["a.t"])]);

        let report = runner
            .run_cycle(&config, &mut NotificationDedup::new())
            .await;
        assert_eq!((report.matched, report.unmatched), (1, 1));

        let all = storage.load(StoreId::All).await.unwrap();
        let matched = storage.load(StoreId::Matched).await.unwrap();
        let unmatched = storage.load(StoreId::Unmatched).await.unwrap();

        assert_eq!(
            links(&all),
            vec!["https://b.example.pl/o/1", "https://b.example.pl/o/2"]
        );
        for link in links(&all) {
            let in_matched = matched.iter().any(|r| r.link == link);
            let in_unmatched = unmatched.iter().any(|r| r.link == link);
            assert!(in_matched ^ in_unmatched, "{link} must be in exactly one class");
        }
        assert!(!links(&all).iter().any(|l| l.contains("Bez")));
    }

    #[tokio::test]
    async fn repeated_cycles_neither_duplicate_nor_renotify() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let (sink, mut rx) = ChannelSink::channel();
        let runner = CycleRunner::new(
            Arc::new(FakeTransport::new(&[(SITE_B, PAGE_B)])),
            storage.clone(),
            Arc::new(sink),
        );
        let config = config(vec![SiteRule::with_selectors(SITE_B, ["a.t"])]);
        let mut notifications = NotificationDedup::new();

        let first = runner.run_cycle(&config, &mut notifications).await;
        let second = runner.run_cycle(&config, &mut notifications).await;

        assert_eq!(first.new_matches, 1);
        assert_eq!(second.new_matches, 0);
        assert_eq!(storage.load(StoreId::All).await.unwrap().len(), 2);
        assert_eq!(storage.load(StoreId::Matched).await.unwrap().len(), 1);

        let mut matches = Vec::new();
        let mut cycles = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                WatchEvent::NewMatch(m) => matches.push(m),
                WatchEvent::CycleDone(_) => cycles += 1,
                _ => {}
            }
        }
        assert_eq!(cycles, 2);
        assert_eq!(
            matches,
            vec![NewMatch {
                title: "Budowa drogi powiatowej".into(),
                link: "https://b.example.pl/o/1".into(),
                keyword: "drogi".into(),
            }]
        );
    }

    #[tokio::test]
    async fn store_failure_is_counted_and_cycle_continues() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(BrokenMatched {
            inner: LocalStorage::new(tmp.path()),
        });
        let (sink, mut rx) = ChannelSink::channel();
        let runner = CycleRunner::new(
            Arc::new(FakeTransport::new(&[(SITE_B, PAGE_B)])),
            storage.clone(),
            Arc::new(sink),
        );
        let config = config(vec![SiteRule::with_selectors(SITE_B, ["a.t"])]);

        let report = runner
            .run_cycle(&config, &mut NotificationDedup::new())
            .await;

        assert_eq!(report.store_errors, 1);
        assert_eq!(storage.load(StoreId::All).await.unwrap().len(), 2);
        assert_eq!(storage.load(StoreId::Unmatched).await.unwrap().len(), 1);

        let notified = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|e| matches!(e, WatchEvent::NewMatch(_)));
        assert!(notified);
    }

    #[tokio::test]
    async fn bad_selector_only_skips_its_own_pass() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let runner = CycleRunner::new(
            Arc::new(FakeTransport::new(&[(SITE_B, PAGE_B)])),
            storage.clone(),
            Arc::new(NoopSink),
        );
        let config = config(vec![SiteRule::with_selectors(SITE_B, ["[[broken", "a.t"])]);

        let report = runner
            .run_cycle(&config, &mut NotificationDedup::new())
            .await;

        assert_eq!(report.fetches, 2);
        assert_eq!(report.extraction_errors, 1);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn notification_dedup_reports_first_sighting_only() {
        let mut dedup = NotificationDedup::new();
        assert!(dedup.is_empty());
        assert!(dedup.first_time("Budowa drogi"));
        assert!(!dedup.first_time("Budowa drogi"));
        assert!(dedup.first_time("Remont szkoły"));
        assert_eq!(dedup.len(), 2);
    }
}
