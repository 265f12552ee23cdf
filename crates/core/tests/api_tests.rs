//! Library API integration tests
use std::collections::HashMap;
use std::sync::Mutex;

use corrigo_core::*;
use tempfile::TempDir;

const FEED: &str = "https://ria.ru/export/rss2/index.xml";

fn article_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>ignored</title></head>
<body>
  <div class="header"><div class="article__announce">not this one</div></div>
  <div class="article__title">{}</div>
  <div class="article__info">12:00</div>
  <div class="article__text"><p>{}</p></div>
  <div class="footer">footer text</div>
</body></html>"#,
        title, body
    )
}

fn rss(links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|link| format!("<item><title>t</title><link>{}</link></item>", link))
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><link>https://ria.ru</link>{}</channel></rss>"#, items)
}

/// Serves documents from memory and records what was asked for.
#[derive(Default)]
struct MemoryFetcher {
    documents: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn with(mut self, locator: &str, document: String) -> Self {
        self.documents.insert(locator.to_string(), document);
        self
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(locator.to_string());
        self.documents
            .get(locator)
            .map(|document| document.as_bytes().to_vec())
            .ok_or(CorrigoError::Timeout { timeout: 30 })
    }
}

/// Returns canned descriptors keyed by exact text.
#[derive(Default)]
struct CannedChecker {
    responses: HashMap<String, Vec<ErrorDescriptor>>,
    fail: bool,
}

impl CannedChecker {
    fn with(mut self, text: &str, descriptors: Vec<ErrorDescriptor>) -> Self {
        self.responses.insert(text.to_string(), descriptors);
        self
    }
}

impl SpellChecker for CannedChecker {
    async fn check(&self, text: &str) -> Result<Vec<ErrorDescriptor>> {
        if self.fail {
            return Err(CorrigoError::RemoteCheck("service unavailable".to_string()));
        }
        Ok(self.responses.get(text).cloned().unwrap_or_default())
    }

    async fn check_many(&self, texts: &[&str]) -> Result<Vec<Vec<ErrorDescriptor>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.check(text).await?);
        }
        Ok(results)
    }
}

fn block_on<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::runtime::Runtime::new().unwrap().block_on(future)
}

#[test]
fn test_extract_article_joins_title_and_text() {
    let page = article_page("Заголовок", "Текст &laquo;статьи&raquo;");
    let text = extract_article(page.as_bytes(), &ExtractConfig::default());
    assert_eq!(text, "Заголовок\nТекст «статьи»");
}

#[test]
fn test_extract_with_parsed_target() {
    let target: TagMatcher = "div[class=article__text]".parse().unwrap();
    let page = article_page("T", "body");
    assert_eq!(extract(page.as_bytes(), &target), "body");
}

#[test]
fn test_single_article_report() {
    let page = article_page("Новость", "Превед медвед");
    let text = "Новость\nПревед медвед";
    let fetcher = MemoryFetcher::default().with("https://ria.ru/a.html", page);
    let checker = CannedChecker::default().with(
        text,
        vec![ErrorDescriptor::new(ErrorCode::UnknownWord, 8, 6, "Превед")],
    );

    let mut batch = BatchOrchestrator::new(fetcher, checker, BatchConfig::default());
    let report = block_on(batch.run(&BatchSource::Single("https://ria.ru/a.html".to_string())));

    assert_eq!(report.entries().len(), 1);
    let entry = &report.entries()[0];
    assert_eq!(entry.status, ArticleStatus::Checked);
    assert_eq!(entry.extracted_len, text.chars().count());
    assert!(entry.annotated.as_deref().unwrap().ends_with("<mark>Превед</mark> медвед"));

    let html = report.render_html();
    assert!(html.contains("Incorrect word: Превед, pos: 8, len: 6"));
    assert!(!html.contains("Total article length"));
}

#[test]
fn test_feed_with_failing_item_continues() {
    let links = ["https://ria.ru/1.html", "https://ria.ru/2.html", "https://ria.ru/3.html"];
    let fetcher = MemoryFetcher::default()
        .with(FEED, rss(&links))
        .with(links[0], article_page("Один", "первый текст"))
        .with(links[2], article_page("Три", "третий текст"));

    let mut batch = BatchOrchestrator::new(fetcher, CannedChecker::default(), BatchConfig::default());
    let report = block_on(batch.run(&BatchSource::Feed(FEED.to_string())));

    let requested = batch.fetcher().requested.lock().unwrap().clone();
    assert_eq!(requested, vec![FEED, links[0], links[1], links[2]]);

    let entries = report.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].status, ArticleStatus::Checked);
    assert!(matches!(entries[1].status, ArticleStatus::FetchFailed(_)));
    assert_eq!(entries[2].status, ArticleStatus::Checked);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.total_length(), entries[0].extracted_len + entries[2].extracted_len);

    let html = report.render_html();
    let first = html.find("1.html").unwrap();
    let second = html.find("2.html").unwrap();
    let third = html.find("3.html").unwrap();
    assert!(first < second && second < third);
    assert!(html.contains("Fetch failed"));
    assert!(html.contains(&format!("Total article length: {}", report.total_length())));
}

#[test]
fn test_unreachable_feed_is_one_failure() {
    let mut batch = BatchOrchestrator::new(MemoryFetcher::default(), CannedChecker::default(), BatchConfig::default());
    let report = block_on(batch.run(&BatchSource::Feed(FEED.to_string())));

    assert_eq!(report.entries().len(), 1);
    assert!(matches!(report.entries()[0].status, ArticleStatus::FetchFailed(_)));
    assert_eq!(report.feed(), Some(FEED));
}

#[test]
fn test_malformed_feed_is_one_failure() {
    let fetcher = MemoryFetcher::default().with(FEED, "<rss><channel><item><link>x</item>".to_string());
    let mut batch = BatchOrchestrator::new(fetcher, CannedChecker::default(), BatchConfig::default());
    let report = block_on(batch.run(&BatchSource::Feed(FEED.to_string())));

    assert_eq!(report.entries().len(), 1);
    assert!(matches!(report.entries()[0].status, ArticleStatus::FeedFailed(_)));
}

#[test]
fn test_checker_failure_reports_zero_descriptors() {
    let fetcher = MemoryFetcher::default().with("a", article_page("T", "text"));
    let checker = CannedChecker { fail: true, ..Default::default() };
    let mut batch = BatchOrchestrator::new(fetcher, checker, BatchConfig::default());

    let entry = block_on(batch.process_article("a"));
    assert!(matches!(entry.status, ArticleStatus::CheckFailed(_)));
    assert!(entry.descriptors.is_empty());
    assert!(entry.extracted_len > 0);
}

#[test]
fn test_out_of_range_descriptors_are_discarded() {
    let page = article_page("T", "short");
    let text = "T\nshort";
    let fetcher = MemoryFetcher::default().with("a", page);
    let checker = CannedChecker::default().with(text, vec![ErrorDescriptor::new(ErrorCode::UnknownWord, 2, 10, "short")]);
    let mut batch = BatchOrchestrator::new(fetcher, checker, BatchConfig::default());

    let entry = block_on(batch.process_article("a"));
    assert!(matches!(entry.status, ArticleStatus::CheckFailed(_)));
    assert!(entry.descriptors.is_empty());
}

#[test]
fn test_collect_persists_interesting_articles() {
    let tmp = TempDir::new().unwrap();
    let corpus_path = tmp.path().join("corpus.jsonl");

    let links = ["https://ria.ru/1.html", "https://ria.ru/2.html"];
    let repeated = "Один\nв в тексте";
    let fetcher = MemoryFetcher::default()
        .with(FEED, rss(&links))
        .with(links[0], article_page("Один", "в в тексте"))
        .with(links[1], article_page("Два", "ошибко"));
    let checker = CannedChecker::default()
        .with(repeated, vec![ErrorDescriptor::new(ErrorCode::RepeatWord, 5, 3, "в в")])
        .with(
            "Два\nошибко",
            vec![ErrorDescriptor::new(ErrorCode::UnknownWord, 4, 6, "ошибко")],
        );

    let config = BatchConfig { collect: true, ..Default::default() };
    let corpus = ArticleCorpus::load(&corpus_path).unwrap();
    let mut batch = BatchOrchestrator::new(fetcher, checker, config).with_corpus(corpus);

    block_on(batch.run(&BatchSource::Feed(FEED.to_string())));

    let mut corpus = batch.into_corpus();
    assert_eq!(corpus.persist_new_entries(&corpus_path).unwrap(), 1);

    let reloaded = ArticleCorpus::load(&corpus_path).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.entries()[0], CorpusEntry { url: links[0].to_string(), article: repeated.to_string() });
}

#[test]
fn test_rerun_does_not_duplicate_corpus_entries() {
    let tmp = TempDir::new().unwrap();
    let corpus_path = tmp.path().join("corpus.jsonl");
    let text = "T\nМосква";

    for _ in 0..2 {
        let fetcher = MemoryFetcher::default().with("a", article_page("T", "Москва"));
        let checker =
            CannedChecker::default().with(text, vec![ErrorDescriptor::new(ErrorCode::Capitalization, 2, 6, "Москва")]);
        let config = BatchConfig { collect: true, ..Default::default() };
        let corpus = ArticleCorpus::load(&corpus_path).unwrap();
        let mut batch = BatchOrchestrator::new(fetcher, checker, config).with_corpus(corpus);

        block_on(batch.run(&BatchSource::Single("a".to_string())));
        batch.corpus_mut().persist_new_entries(&corpus_path).unwrap();
    }

    let content = std::fs::read_to_string(&corpus_path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_report_written_to_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("error.html");
    let fetcher = MemoryFetcher::default().with("a", article_page("T", "a &lt; b"));
    let mut batch = BatchOrchestrator::new(fetcher, CannedChecker::default(), BatchConfig::default());

    let report = block_on(batch.run(&BatchSource::Single("a".to_string())));
    report.write_to(&path).unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Article length: 7"));
}
