//! Batch orchestration.
//!
//! Drives each article through fetch, extraction, checking and annotation,
//! one at a time. A failure in one article is written into its report entry
//! and the batch moves on; nothing here aborts a run.
//!
//! # Example
//!
//! ```rust,no_run
//! use corrigo_core::batch::{BatchConfig, BatchOrchestrator, BatchSource};
//! use corrigo_core::fetch::{FetchConfig, HttpFetcher};
//! use corrigo_core::speller::{CheckOptions, YandexSpeller};
//!
//! # async fn run() -> corrigo_core::Result<()> {
//! let fetcher = HttpFetcher::new(FetchConfig::default())?;
//! let speller = YandexSpeller::new(CheckOptions::default())?;
//! let mut batch = BatchOrchestrator::new(fetcher, speller, BatchConfig::default());
//!
//! let report = batch.run(&BatchSource::Feed("https://ria.ru/export/rss2/index.xml".into())).await;
//! report.write_to("error.html")?;
//! # Ok(())
//! # }
//! ```

use crate::annotate::{Markers, annotate_with, escape_html};
use crate::corpus::ArticleCorpus;
use crate::extract::{ExtractConfig, extract_article};
use crate::feed::parse_feed_links;
use crate::fetch::Fetcher;
use crate::report::{ArticleStatus, Report, ReportEntry};
use crate::speller::{DEFAULT_MAX_TEXT_CHARS, ErrorDescriptor, SpellChecker, check_text, validate_descriptors};

/// Where the articles of a batch come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// One article locator.
    Single(String),
    /// A feed whose item links are processed in order.
    Feed(String),
}

/// Settings for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub extract: ExtractConfig,
    /// Markers placed around flagged spans in the report.
    pub markers: Markers,
    /// Offer articles with repeated-word or case errors to the corpus.
    pub collect: bool,
    /// Longer texts are split and sent through `check_many`.
    pub max_text_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extract: ExtractConfig::default(),
            markers: Markers::default(),
            collect: false,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

/// Runs articles through the pipeline and owns the corpus for the run.
pub struct BatchOrchestrator<F, C> {
    fetcher: F,
    checker: C,
    config: BatchConfig,
    corpus: ArticleCorpus,
}

impl<F: Fetcher, C: SpellChecker> BatchOrchestrator<F, C> {
    pub fn new(fetcher: F, checker: C, config: BatchConfig) -> Self {
        Self { fetcher, checker, config, corpus: ArticleCorpus::new() }
    }

    /// Replaces the (empty) corpus with one loaded from storage.
    pub fn with_corpus(mut self, corpus: ArticleCorpus) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn corpus(&self) -> &ArticleCorpus {
        &self.corpus
    }

    pub fn corpus_mut(&mut self) -> &mut ArticleCorpus {
        &mut self.corpus
    }

    pub fn into_corpus(self) -> ArticleCorpus {
        self.corpus
    }

    /// Processes every article of `source` and returns the report.
    pub async fn run(&mut self, source: &BatchSource) -> Report {
        match source {
            BatchSource::Single(locator) => {
                let mut report = Report::new();
                report.push(self.process_article(locator).await);
                report
            }
            BatchSource::Feed(locator) => self.run_feed(locator).await,
        }
    }

    async fn run_feed(&mut self, feed: &str) -> Report {
        let mut report = Report::for_feed(feed);

        let document = match self.fetcher.fetch(feed).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(feed, error = %e, "could not fetch feed");
                report.push(ReportEntry::failed(feed, ArticleStatus::FetchFailed(e.to_string())));
                return report;
            }
        };

        let links = match parse_feed_links(&document) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(feed, error = %e, "could not enumerate feed");
                report.push(ReportEntry::failed(feed, ArticleStatus::FeedFailed(e.to_string())));
                return report;
            }
        };

        tracing::info!(feed, items = links.len(), "processing feed");

        for link in &links {
            report.push(self.process_article(link).await);
        }

        tracing::info!(
            feed,
            items = links.len(),
            failures = report.failure_count(),
            total_length = report.total_length(),
            "feed processed"
        );

        report
    }

    /// Runs one article through fetch, extract, check and annotate.
    pub async fn process_article(&mut self, locator: &str) -> ReportEntry {
        let document = match self.fetcher.fetch(locator).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(url = locator, error = %e, "fetch failed, skipping article");
                return ReportEntry::failed(locator, ArticleStatus::FetchFailed(e.to_string()));
            }
        };

        let text = extract_article(&document, &self.config.extract);
        let extracted_len = text.chars().count();
        tracing::debug!(url = locator, extracted_len, "article extracted");

        let mut entry = ReportEntry {
            source: locator.to_string(),
            extracted_len,
            status: ArticleStatus::Checked,
            descriptors: Vec::new(),
            text,
            annotated: None,
        };

        if entry.text.trim().is_empty() {
            tracing::warn!(url = locator, "no article text found");
            entry.status = ArticleStatus::NoContent;
            return entry;
        }

        let descriptors = match self.check(&entry.text, extracted_len).await {
            Ok(descriptors) => descriptors,
            Err(reason) => {
                entry.status = ArticleStatus::CheckFailed(reason);
                return entry;
            }
        };

        for descriptor in &descriptors {
            tracing::info!(
                url = locator,
                word = %descriptor.word,
                pos = descriptor.offset,
                len = descriptor.length,
                error = %descriptor.code,
                "incorrect word"
            );
        }

        match annotate_with(&entry.text, &descriptors, &self.config.markers, escape_html) {
            Ok(annotated) => entry.annotated = Some(annotated),
            Err(e) => {
                tracing::warn!(url = locator, error = %e, "annotation failed, reporting unannotated text");
                entry.status = ArticleStatus::AnnotationFailed(e.to_string());
            }
        }

        if self.config.collect && descriptors.iter().any(|d| d.code.is_interesting()) {
            if self.corpus.add(locator, entry.text.clone()) {
                tracing::info!(url = locator, "article added to corpus");
            } else {
                tracing::debug!(url = locator, "article already in corpus");
            }
        }

        entry.descriptors = descriptors;
        entry
    }

    /// Checks the text and validates what came back.
    ///
    /// Failures are logged here and returned as a reason string.
    async fn check(&self, text: &str, text_len: usize) -> std::result::Result<Vec<ErrorDescriptor>, String> {
        let descriptors = check_text(&self.checker, text, self.config.max_text_chars).await.map_err(|e| {
            tracing::warn!(error = %e, "spell check failed");
            e.to_string()
        })?;

        validate_descriptors(&descriptors, text_len).map_err(|e| {
            tracing::warn!(error = %e, descriptors = descriptors.len(), "discarding speller response");
            e.to_string()
        })?;

        Ok(descriptors)
    }
}
