pub mod annotate;
pub mod batch;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod report;
pub mod speller;

pub use annotate::{Markers, annotate, annotate_with, escape_html};
pub use batch::{BatchConfig, BatchOrchestrator, BatchSource};
pub use corpus::{ArticleCorpus, CorpusEntry, default_corpus_path};
pub use error::{CorrigoError, Result};
#[doc(hidden)]
pub use extract::{Scope, ScopedTextExtractor, Token};
pub use extract::{ExtractConfig, TagMatcher, extract, extract_all, extract_article};
pub use feed::parse_feed_links;
pub use fetch::{FetchConfig, Fetcher, HttpFetcher, fetch_file};
pub use report::{ArticleStatus, Report, ReportEntry};
pub use speller::{CheckOptions, ErrorCode, ErrorDescriptor, SpellChecker, TextFormat, YandexSpeller, check_text};
