//! Run report.
//!
//! Every processed article gets a [`ReportEntry`], failed ones included, and
//! the whole [`Report`] renders to a single static HTML page.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::Result;
use crate::annotate::escape_html;
use crate::speller::ErrorDescriptor;

/// Default report file name.
pub const DEFAULT_REPORT_FILE: &str = "error.html";

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <title>Article errors</title>
</head>
<body>
"#;

const HTML_TAIL: &str = "</body>\n</html>\n";

/// How far an article got through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleStatus {
    /// Checked; descriptors (possibly none) are valid and annotated.
    Checked,
    /// Nothing matched the extraction targets.
    NoContent,
    /// The document or feed could not be retrieved.
    FetchFailed(String),
    /// The feed was retrieved but could not be enumerated.
    FeedFailed(String),
    /// The checker failed or returned unusable descriptors.
    CheckFailed(String),
    /// Descriptors could not be placed; text is shown unannotated.
    AnnotationFailed(String),
}

impl ArticleStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, ArticleStatus::Checked | ArticleStatus::NoContent)
    }

    fn note(&self) -> Option<String> {
        match self {
            ArticleStatus::Checked => None,
            ArticleStatus::NoContent => Some("No article text found".to_string()),
            ArticleStatus::FetchFailed(reason) => Some(format!("Fetch failed: {}", reason)),
            ArticleStatus::FeedFailed(reason) => Some(format!("Feed could not be read: {}", reason)),
            ArticleStatus::CheckFailed(reason) => Some(format!("Spell check failed: {}", reason)),
            ArticleStatus::AnnotationFailed(reason) => Some(format!("Could not mark errors: {}", reason)),
        }
    }
}

/// Result of processing one article.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// Locator the article was fetched from.
    pub source: String,
    /// Extracted text length in code points.
    pub extracted_len: usize,
    pub status: ArticleStatus,
    pub descriptors: Vec<ErrorDescriptor>,
    /// Extracted text as plain text.
    pub text: String,
    /// HTML-safe text with marked spans, when annotation succeeded.
    pub annotated: Option<String>,
}

impl ReportEntry {
    /// An entry for a unit of work that stopped before any text was extracted.
    pub fn failed(source: impl Into<String>, status: ArticleStatus) -> Self {
        Self {
            source: source.into(),
            extracted_len: 0,
            status,
            descriptors: Vec::new(),
            text: String::new(),
            annotated: None,
        }
    }

    fn render(&self, html: &mut String) {
        let source = escape_html(&self.source);
        let _ = writeln!(html, "<p>Link to the article: <a href='{0}'>{0}</a></p>", source);
        let _ = writeln!(html, "<p>Article length: {}</p>", self.extracted_len);

        if let Some(note) = self.status.note() {
            let _ = writeln!(html, "<p><strong>{}</strong></p>", escape_html(&note));
        }

        for descriptor in &self.descriptors {
            let _ = writeln!(
                html,
                "<p>Incorrect word: {}, pos: {}, len: {}, error: {}</p>",
                escape_html(&descriptor.word),
                descriptor.offset,
                descriptor.length,
                descriptor.code.description()
            );
        }

        match &self.annotated {
            Some(annotated) if !self.descriptors.is_empty() => {
                let _ = writeln!(html, "<p>{}</p>", annotated);
            }
            None if !self.text.is_empty() => {
                let _ = writeln!(html, "<p>{}</p>", escape_html(&self.text));
            }
            _ => {}
        }

        html.push_str("<br><br>\n");
    }
}

/// Everything a run produced, in processing order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    entries: Vec<ReportEntry>,
    total_length: usize,
    feed: Option<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// A report for a feed run; it ends with the total extracted length.
    pub fn for_feed(feed: impl Into<String>) -> Self {
        Self { feed: Some(feed.into()), ..Self::default() }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.total_length += entry.extracted_len;
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Sum of extracted lengths over all entries.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn feed(&self) -> Option<&str> {
        self.feed.as_deref()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_failure()).count()
    }

    /// Total number of flagged spans across all articles.
    pub fn descriptor_count(&self) -> usize {
        self.entries.iter().map(|e| e.descriptors.len()).sum()
    }

    pub fn render_html(&self) -> String {
        let mut html = String::from(HTML_HEAD);

        if let Some(feed) = &self.feed {
            let feed = escape_html(feed);
            let _ = writeln!(html, "<h1>Feed: <a href='{0}'>{0}</a></h1>", feed);
        }

        for entry in &self.entries {
            entry.render(&mut html);
        }

        if self.feed.is_some() {
            let _ = writeln!(html, "<p>Total article length: {}</p>", self.total_length);
        }

        html.push_str(HTML_TAIL);
        html
    }

    /// Renders the report and writes it to `path`, replacing any previous report.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render_html())?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "report written");
        Ok(())
    }
}
