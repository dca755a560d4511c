// src/lib.rs

//! tender-watch library
//!
//! Periodically scans public-procurement listing pages, extracts
//! `(title, link)` entries with CSS selectors, classifies them against a
//! keyword list, and records them in link-deduplicated stores.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
