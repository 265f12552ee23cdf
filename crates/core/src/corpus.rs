//! Persisted collection of flagged articles.
//!
//! The corpus is stored as JSON Lines, one [`CorpusEntry`] per line. A run
//! loads the file once, adds entries in memory, and appends only what it added
//! at the end. Lines already on disk are never rewritten.
//!
//! Identifiers are compared as exact strings: `https://a/x` and `https://a/x/`
//! are two different articles.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// File name used inside the data directory.
pub const DEFAULT_CORPUS_FILE: &str = "corpus.jsonl";

/// One collected article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Source locator, used as the identity key.
    pub url: String,
    /// Extracted article text at the time it was flagged.
    pub article: String,
}

/// Deduplicated, append-only article collection.
#[derive(Debug, Clone, Default)]
pub struct ArticleCorpus {
    entries: Vec<CorpusEntry>,
    seen: HashSet<String>,
    persisted: usize,
}

impl ArticleCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a corpus file. A missing file is an empty corpus.
    ///
    /// Lines that do not decode are skipped with a warning; a torn final line
    /// from an interrupted run only loses that entry.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no corpus file yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut corpus = Self::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CorpusEntry>(line) {
                Ok(entry) => {
                    corpus.add(entry.url, entry.article);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), line = line_no + 1, error = %e, "skipping unreadable corpus line");
                }
            }
        }

        corpus.persisted = corpus.entries.len();
        tracing::debug!(path = %path.display(), entries = corpus.len(), "corpus loaded");

        Ok(corpus)
    }

    /// Adds an entry unless its identifier is already present.
    ///
    /// Returns `true` when the entry was added.
    pub fn add(&mut self, url: impl Into<String>, article: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }

        self.seen.insert(url.clone());
        self.entries.push(CorpusEntry { url, article: article.into() });
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Entries added since the corpus was loaded or last persisted.
    pub fn new_entries(&self) -> &[CorpusEntry] {
        &self.entries[self.persisted..]
    }

    /// Appends the new entries to `path`, creating the file if needed.
    ///
    /// Returns how many entries were written.
    pub fn persist_new_entries(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let pending = self.new_entries();
        if pending.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        let needs_newline = !ends_with_newline(&mut file)?;
        let mut writer = BufWriter::new(file);

        if needs_newline {
            writer.write_all(b"\n")?;
        }

        for entry in pending {
            let line = serde_json::to_string(entry)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        let written = pending.len();
        self.persisted = self.entries.len();
        tracing::info!(path = %path.display(), written, "corpus entries appended");

        Ok(written)
    }
}

/// True for an empty file or one whose last byte is a newline.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Default corpus location: `<data dir>/corrigo/corpus.jsonl`.
///
/// Falls back to the working directory when the platform has no data dir.
pub fn default_corpus_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("corrigo"))
        .unwrap_or_default()
        .join(DEFAULT_CORPUS_FILE)
}
