//! Error types for Corrigo operations.
//!
//! This module defines the main error type [`CorrigoError`] which represents
//! everything that can go wrong while fetching a page, talking to the remote
//! speller, annotating text, or persisting the corpus.
//!
//! Most of these are per-article failures: the batch orchestrator records them
//! against the article and moves on. Only configuration errors stop a run.
//!
//! # Example
//!
//! ```rust
//! use corrigo_core::{CorrigoError, Result};
//!
//! fn require_locator(url: Option<&str>) -> Result<&str> {
//!     url.ok_or_else(|| CorrigoError::ConfigError("URL or feed must be specified".to_string()))
//! }
//! # assert!(require_locator(None).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Corrigo operations.
#[derive(Error, Debug)]
pub enum CorrigoError {
    /// HTTP request errors from reqwest.
    ///
    /// Network errors, DNS failures, connection issues and the like.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// The feed document could not be read as RSS or Atom.
    #[error("Failed to parse feed: {0}")]
    FeedError(String),

    /// The speller service answered with a non-success status.
    #[error("Remote check failed: {0}")]
    RemoteCheck(String),

    /// The speller answered, but the payload is unusable.
    ///
    /// Either the JSON does not decode, or the descriptors are not ascending
    /// and non-overlapping.
    #[error("Malformed speller response: {0}")]
    MalformedResponse(String),

    /// A descriptor points outside the text or overlaps the previous one.
    #[error("Invalid span at {offset}+{length} (text length {text_len})")]
    InvalidSpan { offset: usize, length: usize, text_len: usize },

    /// A target description such as `div[class=article__text]` could not be parsed.
    #[error("Invalid extraction target: {0}")]
    InvalidTarget(String),

    /// Corpus serialization errors.
    #[error("Corpus error: {0}")]
    CorpusError(#[from] serde_json::Error),

    /// Configuration errors.
    ///
    /// These are the only errors that abort a whole run.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CorrigoError {
    /// Returns true for failures that happened while retrieving a document.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            CorrigoError::HttpError(_)
                | CorrigoError::Timeout { .. }
                | CorrigoError::InvalidUrl(_)
                | CorrigoError::FileNotFound(_)
        )
    }
}

/// Result type alias for CorrigoError.
pub type Result<T> = std::result::Result<T, CorrigoError>;
