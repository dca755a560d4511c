// src/services/extractor.rs

//! Candidate extraction.
//!
//! Applies one CSS selector to one fetched page and turns the matching
//! elements into (title, absolute link) candidates.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractionError;
use crate::models::Candidate;
use crate::services::EventSink;
use crate::utils::{normalize_whitespace, resolve_url};

/// Upper bound on matched elements considered per page.
pub const MAX_CANDIDATES: usize = 20;

/// Text below these elements is not visible on the rendered page.
const HIDDEN_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts listing candidates from page content.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    max_candidates: usize,
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
        }
    }
}

impl CandidateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract candidates, reporting failures to `sink` instead of returning them.
    ///
    /// An invalid selector or base URL yields an empty sequence.
    pub fn extract(
        &self,
        content: &[u8],
        selector: &str,
        base_url: &str,
        sink: &dyn EventSink,
    ) -> Vec<Candidate> {
        match self.try_extract(content, selector, base_url, sink) {
            Ok(candidates) => candidates,
            Err(e) => {
                sink.warn(&format!("Extraction failed for {}: {}", base_url, e));
                Vec::new()
            }
        }
    }

    /// Extract candidates in document order.
    ///
    /// Only the first `MAX_CANDIDATES` matches are looked at; matches without
    /// an `href` are skipped afterwards, so the result may be shorter.
    pub fn try_extract(
        &self,
        content: &[u8],
        selector: &str,
        base_url: &str,
        sink: &dyn EventSink,
    ) -> Result<Vec<Candidate>, ExtractionError> {
        let selector = parse_selector(selector)?;
        let base = Url::parse(base_url).map_err(|e| ExtractionError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        let html = String::from_utf8_lossy(content);
        let document = Html::parse_document(&html);

        let matches: Vec<ElementRef<'_>> = document
            .select(&selector)
            .take(self.max_candidates)
            .collect();
        sink.info(&format!(
            "Found {} entries on {}",
            matches.len(),
            base_url
        ));

        let mut candidates = Vec::with_capacity(matches.len());
        for element in matches {
            let title = visible_text(element);

            let Some(href) = element
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|h| !h.is_empty())
            else {
                sink.debug(&format!("Skipped entry without link: {}", title));
                continue;
            };

            let Some(link) = resolve_url(&base, href) else {
                sink.debug(&format!("Skipped entry with unusable link '{}': {}", href, title));
                continue;
            };

            candidates.push(Candidate { title, link });
        }

        Ok(candidates)
    }
}

/// Parse a CSS selector, mapping the borrowed parser error into an owned one.
pub fn parse_selector(s: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(s).map_err(|e| ExtractionError::selector(s, format!("{e:?}")))
}

/// Concatenated visible text of an element, whitespace-normalized.
fn visible_text(element: ElementRef<'_>) -> String {
    let root_id = element.id();
    let mut text = String::new();

    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != root_id)
            .chain(std::iter::once(*element))
            .filter_map(|a| a.value().as_element())
            .any(|e| HIDDEN_TEXT_PARENTS.contains(&e.name()));
        if !hidden {
            text.push_str(fragment);
        }
    }

    normalize_whitespace(&text)
}
