//! Remote spell checking.
//!
//! The checker itself lives elsewhere (Yandex.Speller by default). This module
//! holds the shape of what comes back, an [`ErrorDescriptor`] per flagged
//! span, the [`SpellChecker`] seam, and the checks the rest of the pipeline
//! relies on before it touches any offsets.
//!
//! Offsets and lengths are code-point counts into the submitted text.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{CorrigoError, Result};

/// Default Yandex.Speller JSON endpoint (without the method name).
pub const DEFAULT_SERVICE_URL: &str = "https://speller.yandex.net/services/spellservice.json";

/// Texts longer than this many code points are split before checking.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 10_000;

/// Skip words containing digits.
pub const IGNORE_DIGITS: u32 = 2;
/// Skip URLs, e-mail addresses and file names.
pub const IGNORE_URLS: u32 = 4;
/// Report repeated words.
pub const FIND_REPEAT_WORDS: u32 = 8;
/// Do not report capitalization mistakes.
pub const IGNORE_CAPITALIZATION: u32 = 512;

/// Classification of a flagged span.
///
/// Codes the service may add later are kept as [`ErrorCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ErrorCode {
    /// 1: word not in the dictionary.
    UnknownWord,
    /// 2: the same word twice in a row.
    RepeatWord,
    /// 3: wrong use of upper/lower case.
    Capitalization,
    /// 4: the text has too many errors to be checked.
    TooManyErrors,
    Other(u32),
}

impl ErrorCode {
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::UnknownWord => "word is not in the dictionary",
            ErrorCode::RepeatWord => "repeated word",
            ErrorCode::Capitalization => "incorrect use of capital and lowercase letters",
            ErrorCode::TooManyErrors => "text contains too many errors",
            ErrorCode::Other(_) => "unknown error code",
        }
    }

    /// Repeated words and case misuse are the classes worth keeping in the corpus.
    pub fn is_interesting(self) -> bool {
        matches!(self, ErrorCode::RepeatWord | ErrorCode::Capitalization)
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            1 => ErrorCode::UnknownWord,
            2 => ErrorCode::RepeatWord,
            3 => ErrorCode::Capitalization,
            4 => ErrorCode::TooManyErrors,
            other => ErrorCode::Other(other),
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::UnknownWord => 1,
            ErrorCode::RepeatWord => 2,
            ErrorCode::Capitalization => 3,
            ErrorCode::TooManyErrors => 4,
            ErrorCode::Other(other) => other,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), u32::from(*self))
    }
}

/// One flagged span, as returned by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub code: ErrorCode,
    /// Code-point offset of the span.
    #[serde(rename = "pos")]
    pub offset: usize,
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub col: usize,
    /// Span length in code points.
    #[serde(rename = "len")]
    pub length: usize,
    /// The flagged text, for display only.
    #[serde(default)]
    pub word: String,
    #[serde(rename = "s", default)]
    pub suggestions: Vec<String>,
}

impl ErrorDescriptor {
    pub fn new(code: ErrorCode, offset: usize, length: usize, word: impl Into<String>) -> Self {
        Self { code, offset, row: 0, col: 0, length, word: word.into(), suggestions: Vec::new() }
    }

    /// Code-point offset one past the span, or `None` if `pos + len` overflows.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }
}

/// Format of the submitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

impl TextFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TextFormat::Plain => "plain",
            TextFormat::Html => "html",
        }
    }
}

impl FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            _ => Err(format!("Invalid format: {}. Valid options: plain, html", s)),
        }
    }
}

/// Parameters sent with every check request.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Comma-separated language tags.
    pub lang: String,
    /// Bitmask of `IGNORE_*` / `FIND_*` flags.
    pub options: u32,
    pub format: TextFormat,
    /// Base URL of the service; the method name is appended.
    pub service_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            lang: "ru,en".to_string(),
            options: IGNORE_DIGITS | IGNORE_URLS | FIND_REPEAT_WORDS,
            format: TextFormat::Plain,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: 30,
        }
    }
}

/// A remote spelling/grammar checker.
pub trait SpellChecker {
    /// Checks one text. Descriptors come back in ascending offset order.
    fn check(&self, text: &str) -> impl Future<Output = Result<Vec<ErrorDescriptor>>>;

    /// Checks several texts in one request; the outer vector lines up with `texts`.
    fn check_many(&self, texts: &[&str]) -> impl Future<Output = Result<Vec<Vec<ErrorDescriptor>>>>;
}

/// Client for the Yandex.Speller JSON interface.
#[derive(Debug, Clone)]
pub struct YandexSpeller {
    client: Client,
    options: CheckOptions,
}

impl YandexSpeller {
    pub fn new(options: CheckOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout))
            .build()
            .map_err(CorrigoError::HttpError)?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    fn form(&self, texts: &[&str]) -> Vec<(&'static str, String)> {
        let mut form: Vec<(&'static str, String)> = texts.iter().map(|t| ("text", t.to_string())).collect();
        form.push(("lang", self.options.lang.clone()));
        form.push(("options", self.options.options.to_string()));
        form.push(("format", self.options.format.as_str().to_string()));
        form
    }

    fn transport_error(&self, e: reqwest::Error) -> CorrigoError {
        if e.is_timeout() {
            CorrigoError::Timeout { timeout: self.options.timeout }
        } else {
            CorrigoError::HttpError(e)
        }
    }

    async fn post(&self, method: &str, form: &[(&'static str, String)]) -> Result<String> {
        let endpoint = format!("{}/{}", self.options.service_url.trim_end_matches('/'), method);

        let response = self
            .client
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(CorrigoError::RemoteCheck(format!("{} returned {}: {}", endpoint, status, snippet)));
        }

        Ok(body)
    }
}

impl SpellChecker for YandexSpeller {
    async fn check(&self, text: &str) -> Result<Vec<ErrorDescriptor>> {
        tracing::debug!(chars = text.chars().count(), "submitting text to speller");
        let body = self.post("checkText", &self.form(&[text])).await?;
        parse_check_response(&body)
    }

    async fn check_many(&self, texts: &[&str]) -> Result<Vec<Vec<ErrorDescriptor>>> {
        tracing::debug!(texts = texts.len(), "submitting text batch to speller");
        let body = self.post("checkTexts", &self.form(texts)).await?;
        parse_check_many_response(&body, texts.len())
    }
}

/// Decodes a `checkText` response body.
pub fn parse_check_response(body: &str) -> Result<Vec<ErrorDescriptor>> {
    serde_json::from_str(body).map_err(|e| CorrigoError::MalformedResponse(e.to_string()))
}

/// Decodes a `checkTexts` response body, which must hold one list per submitted text.
pub fn parse_check_many_response(body: &str, expected: usize) -> Result<Vec<Vec<ErrorDescriptor>>> {
    let results: Vec<Vec<ErrorDescriptor>> =
        serde_json::from_str(body).map_err(|e| CorrigoError::MalformedResponse(e.to_string()))?;

    if results.len() != expected {
        return Err(CorrigoError::MalformedResponse(format!(
            "expected results for {} texts, got {}",
            expected,
            results.len()
        )));
    }

    Ok(results)
}

/// Checks that descriptors are ascending, non-overlapping and inside a text of
/// `text_len` code points.
pub fn validate_descriptors(descriptors: &[ErrorDescriptor], text_len: usize) -> Result<()> {
    let mut cursor = 0;

    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.offset < cursor {
            return Err(CorrigoError::MalformedResponse(format!(
                "descriptor {} at {} overlaps or precedes the previous span ending at {}",
                index, descriptor.offset, cursor
            )));
        }
        let end = descriptor.end().filter(|&end| end <= text_len).ok_or_else(|| {
            CorrigoError::MalformedResponse(format!(
                "descriptor {} at {} with length {} runs past the text length {}",
                index, descriptor.offset, descriptor.length, text_len
            ))
        })?;
        cursor = end;
    }

    Ok(())
}

/// A slice of a longer text, with its code-point offset in the whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    pub offset: usize,
    pub text: &'a str,
}

/// Splits `text` into chunks of at most `max_chars` code points.
///
/// Cuts are made right after the last whitespace in the window when there is
/// one, so words stay whole.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<TextChunk<'_>> {
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = boundaries.len() - 1;
    let max_chars = max_chars.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + max_chars).min(total);

        if end < total
            && let Some(cut) = (start + 1..=end)
                .rev()
                .find(|&i| text[boundaries[i - 1]..].starts_with(char::is_whitespace))
        {
            end = cut;
        }

        chunks.push(TextChunk { offset: start, text: &text[boundaries[start]..boundaries[end]] });
        start = end;
    }

    chunks
}

/// Shifts per-chunk descriptors back into whole-text offsets.
///
/// Each chunk's descriptors are validated against that chunk first, so a span
/// can never leak across a chunk boundary.
pub fn merge_chunk_results(
    chunks: &[TextChunk<'_>], results: Vec<Vec<ErrorDescriptor>>,
) -> Result<Vec<ErrorDescriptor>> {
    let mut merged = Vec::new();

    for (index, (chunk, descriptors)) in chunks.iter().zip(results).enumerate() {
        if let Err(CorrigoError::MalformedResponse(reason)) =
            validate_descriptors(&descriptors, chunk.text.chars().count())
        {
            return Err(CorrigoError::MalformedResponse(format!("chunk {}: {}", index, reason)));
        }

        for mut descriptor in descriptors {
            descriptor.offset = descriptor.offset.checked_add(chunk.offset).ok_or_else(|| {
                CorrigoError::MalformedResponse(format!("chunk {} offset overflows", index))
            })?;
            merged.push(descriptor);
        }
    }

    Ok(merged)
}

/// Checks a text of any length, splitting it when it exceeds `max_chars`.
pub async fn check_text<C: SpellChecker>(checker: &C, text: &str, max_chars: usize) -> Result<Vec<ErrorDescriptor>> {
    if text.chars().count() <= max_chars {
        return checker.check(text).await;
    }

    let chunks = split_into_chunks(text, max_chars);
    tracing::debug!(chunks = chunks.len(), "text exceeds single request limit, splitting");

    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text).collect();
    let results = checker.check_many(&texts).await?;

    merge_chunk_results(&chunks, results)
}
