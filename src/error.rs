// src/error.rs

//! Error types for the watcher.
//!
//! Each stage of the discovery loop has its own error enum so the cycle runner
//! can recover from it locally. `AppError` wraps them for the CLI and the
//! settings/config loaders.

use std::fmt;

use thiserror::Error;

/// Result type alias for application-level operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Watch list mutation rejected
    #[error(transparent)]
    WatchConfig(#[from] ConfigError),

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scheduler refused to start
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Page fetch failures. Recovered by skipping the site/selector pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl TransportError {
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// Extraction failures. Recovered with an empty candidate set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

impl ExtractionError {
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }
}

/// Record store failures. Recovered per record; earlier appends are kept.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store file {path} is unreadable: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is unwritable: {source}")]
    Unwritable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is malformed: {message}")]
    Malformed { path: String, message: String },
}

/// Rejected watch list mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'{0}' is not a valid http(s) URL")]
    InvalidUrl(String),

    #[error("site {0} is already on the list")]
    DuplicateSite(String),

    #[error("site {0} is not on the list")]
    UnknownSite(String),

    #[error("selector must not be empty")]
    EmptySelector,

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("selector '{selector}' is not configured for {url}")]
    UnknownSelector { url: String, selector: String },

    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("keyword '{0}' is not on the list")]
    UnknownKeyword(String),

    #[error("loop time must be a positive number of seconds")]
    InvalidInterval,
}

/// Synchronous failures of `Scheduler::start`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("the discovery loop is already running")]
    AlreadyRunning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
