use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use corrigo_core::fetch::{DEFAULT_USER_AGENT, is_remote};
use corrigo_core::speller::{DEFAULT_SERVICE_URL, FIND_REPEAT_WORDS, IGNORE_DIGITS, IGNORE_URLS};
use corrigo_core::{
    ArticleCorpus, BatchConfig, BatchOrchestrator, BatchSource, CheckOptions, CorrigoError, ExtractConfig,
    FetchConfig, HttpFetcher, TagMatcher, TextFormat, YandexSpeller, default_corpus_path,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_OPTIONS: u32 = IGNORE_DIGITS | IGNORE_URLS | FIND_REPEAT_WORDS;

/// Check published articles for spelling errors and write an HTML report
#[derive(Parser, Debug)]
#[command(name = "corrigo")]
#[command(author = "Corrigo Contributors")]
#[command(version)]
#[command(about = "Spell-check articles from a page or an RSS feed", long_about = None)]
struct Args {
    /// Article URL or local HTML file
    #[arg(long, value_name = "URL", conflicts_with = "feed")]
    url: Option<String>,

    /// RSS or Atom feed whose items are checked one by one
    #[arg(long, visible_alias = "xml", value_name = "URL")]
    feed: Option<String>,

    /// Comma-separated checker languages
    #[arg(long, default_value = "ru,en", value_name = "LANGS")]
    lang: String,

    /// Checker option bitmask
    #[arg(long, default_value_t = DEFAULT_OPTIONS, value_name = "MASK")]
    options: u32,

    /// Text format sent to the checker (plain, html)
    #[arg(long, default_value = "plain", value_name = "FORMAT")]
    format: TextFormat,

    /// User-Agent for HTTP requests
    #[arg(long, visible_alias = "uagent", default_value = DEFAULT_USER_AGENT, value_name = "UA")]
    user_agent: String,

    /// Save articles with repeated-word or capitalization errors to the corpus
    #[arg(long)]
    collect: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Tag holding article text, as tag[attr=value]; repeat for several
    #[arg(long = "target", value_name = "TARGET")]
    targets: Vec<TagMatcher>,

    /// Report file
    #[arg(long, default_value = "error.html", value_name = "FILE")]
    report: PathBuf,

    /// Corpus file (default: <data dir>/corrigo/corpus.jsonl)
    #[arg(long, value_name = "FILE")]
    corpus: Option<PathBuf>,

    /// Base URL of the speller service
    #[arg(long, default_value = DEFAULT_SERVICE_URL, value_name = "URL")]
    speller_url: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn source(&self) -> anyhow::Result<BatchSource> {
        let source = match (&self.url, &self.feed) {
            (_, Some(feed)) => BatchSource::Feed(feed.clone()),
            (Some(url), None) => BatchSource::Single(url.clone()),
            (None, None) => {
                return Err(CorrigoError::ConfigError("either --url or --feed is required".to_string()).into());
            }
        };

        let locator = match &source {
            BatchSource::Single(locator) | BatchSource::Feed(locator) => locator,
        };
        if is_remote(locator) {
            Url::parse(locator).with_context(|| format!("Invalid URL: {}", locator))?;
        }

        Ok(source)
    }

    fn extract_config(&self) -> ExtractConfig {
        if self.targets.is_empty() {
            ExtractConfig::default()
        } else {
            ExtractConfig { targets: self.targets.clone(), ..Default::default() }
        }
    }

    fn check_options(&self) -> CheckOptions {
        CheckOptions {
            lang: self.lang.clone(),
            options: self.options,
            format: self.format,
            service_url: self.speller_url.clone(),
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let source = args.source()?;
    let check_options = args.check_options();

    if args.verbose {
        echo::print_banner();
        echo::print_info(&format!("Languages: {}, options: {}", check_options.lang, check_options.options));
        eprintln!();
    }

    let corpus_path = args.corpus.clone().unwrap_or_else(default_corpus_path);
    let corpus = if args.collect {
        if args.verbose {
            echo::print_step(1, 3, &format!("Loading corpus from {}", corpus_path.display().bright_white()));
        }
        ArticleCorpus::load(&corpus_path)
            .with_context(|| format!("Failed to load corpus: {}", corpus_path.display()))?
    } else {
        ArticleCorpus::new()
    };
    let known = corpus.len();

    let fetcher = HttpFetcher::new(FetchConfig { timeout: args.timeout, user_agent: args.user_agent.clone() })
        .context("Failed to build HTTP client")?;
    let speller = YandexSpeller::new(check_options).context("Failed to build speller client")?;

    let config = BatchConfig {
        extract: args.extract_config(),
        collect: args.collect,
        ..Default::default()
    };
    let mut batch = BatchOrchestrator::new(fetcher, speller, config).with_corpus(corpus);

    if args.verbose {
        let what = match &source {
            BatchSource::Single(url) => format!("Checking {}", url.bright_white().underline()),
            BatchSource::Feed(feed) => format!("Checking feed {}", feed.bright_white().underline()),
        };
        echo::print_step(2, 3, &what);
    }

    let report = batch.run(&source).await;

    if args.verbose {
        echo::print_step(3, 3, "Writing report");
    }

    report
        .write_to(&args.report)
        .with_context(|| format!("Failed to write report: {}", args.report.display()))?;

    let mut corpus = batch.into_corpus();
    let added = if args.collect {
        corpus
            .persist_new_entries(&corpus_path)
            .with_context(|| format!("Failed to save corpus: {}", corpus_path.display()))?
    } else {
        0
    };

    echo::print_summary(&report);
    if report.failure_count() > 0 {
        echo::print_warning(&format!("{} article(s) could not be fully checked", report.failure_count()));
    }
    if args.collect {
        echo::print_info(&format!("Corpus: {} new, {} total", added, known + added));
    }
    echo::print_success(&format!("Report written to {}", args.report.display().bright_white()));

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            echo::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
