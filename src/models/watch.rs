//! Watch list: the sites, selectors, keywords and loop time a cycle runs on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ExtractionError};
use crate::services::parse_selector;

/// Loop time used when the watch list is missing or unreadable.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// A monitored page and the CSS selectors that pick listing entries from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteRule {
    /// Absolute page URL, also the base for resolving relative links
    pub url: String,

    /// Selectors applied in order, one fetch each
    #[serde(default)]
    pub selectors: Vec<String>,
}

impl SiteRule {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selectors: Vec::new(),
        }
    }

    pub fn with_selectors<I, S>(url: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            url: url.into(),
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }
}

/// The persisted watch list.
///
/// Field names on disk follow the original `config.json` layout
/// (`urls`, `keywords`, `loop_time`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    #[serde(rename = "urls", default)]
    pub sites: Vec<SiteRule>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(rename = "loop_time", default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            keywords: Vec::new(),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl WatchConfig {
    /// Add a site with no selectors. The URL must be http(s) with a host.
    pub fn add_site(&mut self, url: &str) -> Result<(), ConfigError> {
        let url = url.trim();
        if !is_valid_site_url(url) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        if self.site(url).is_some() {
            return Err(ConfigError::DuplicateSite(url.to_string()));
        }
        self.sites.push(SiteRule::new(url));
        Ok(())
    }

    /// Remove a site together with its selectors.
    pub fn remove_site(&mut self, url: &str) -> Result<SiteRule, ConfigError> {
        let url = url.trim();
        let idx = self
            .sites
            .iter()
            .position(|s| s.url == url)
            .ok_or_else(|| ConfigError::UnknownSite(url.to_string()))?;
        Ok(self.sites.remove(idx))
    }

    /// Append a selector to an existing site.
    pub fn add_selector(&mut self, url: &str, selector: &str) -> Result<(), ConfigError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(ConfigError::EmptySelector);
        }
        parse_selector(selector).map_err(|e| match e {
            ExtractionError::InvalidSelector { selector, message } => {
                ConfigError::InvalidSelector { selector, message }
            }
            other => ConfigError::InvalidSelector {
                selector: selector.to_string(),
                message: other.to_string(),
            },
        })?;
        let site = self
            .site_mut(url.trim())
            .ok_or_else(|| ConfigError::UnknownSite(url.trim().to_string()))?;
        site.selectors.push(selector.to_string());
        Ok(())
    }

    /// Remove the first occurrence of a selector from a site.
    pub fn remove_selector(&mut self, url: &str, selector: &str) -> Result<(), ConfigError> {
        let url = url.trim();
        let selector = selector.trim();
        let site = self
            .site_mut(url)
            .ok_or_else(|| ConfigError::UnknownSite(url.to_string()))?;
        let idx = site
            .selectors
            .iter()
            .position(|s| s == selector)
            .ok_or_else(|| ConfigError::UnknownSelector {
                url: url.to_string(),
                selector: selector.to_string(),
            })?;
        site.selectors.remove(idx);
        Ok(())
    }

    /// Append a keyword. Order matters: the first matching keyword wins.
    pub fn add_keyword(&mut self, keyword: &str) -> Result<(), ConfigError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ConfigError::EmptyKeyword);
        }
        self.keywords.push(keyword.to_string());
        Ok(())
    }

    /// Remove every entry equal to `keyword`.
    pub fn remove_keyword(&mut self, keyword: &str) -> Result<(), ConfigError> {
        let keyword = keyword.trim();
        let before = self.keywords.len();
        self.keywords.retain(|k| k != keyword);
        if self.keywords.len() == before {
            return Err(ConfigError::UnknownKeyword(keyword.to_string()));
        }
        Ok(())
    }

    pub fn set_interval(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        self.interval_secs = secs;
        Ok(())
    }

    /// Pre-flight checks before the discovery loop may start.
    pub fn validate_for_run(&self) -> Result<(), String> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err("add at least one keyword".to_string());
        }
        if !self.sites.iter().any(|s| !s.selectors.is_empty()) {
            return Err("add at least one selector to a site".to_string());
        }
        if self.interval_secs == 0 {
            return Err("loop time must be greater than zero".to_string());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.sites.iter().find(|s| !seen.insert(s.url.as_str())) {
            return Err(format!("site {} is listed more than once", dup.url));
        }
        Ok(())
    }

    /// Total number of (site, selector) pairs, i.e. fetches per cycle.
    pub fn selector_count(&self) -> usize {
        self.sites.iter().map(|s| s.selectors.len()).sum()
    }

    pub fn site(&self, url: &str) -> Option<&SiteRule> {
        self.sites.iter().find(|s| s.url == url)
    }

    fn site_mut(&mut self, url: &str) -> Option<&mut SiteRule> {
        self.sites.iter_mut().find(|s| s.url == url)
    }
}

/// A site URL needs a scheme and a host.
pub fn is_valid_site_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
