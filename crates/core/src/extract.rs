//! Scoped text extraction.
//!
//! Pulls the text found inside every occurrence of a tag that carries a given
//! attribute value, e.g. `<div class="article__text">`. Markup goes through the
//! html5ever tokenizer without building a tree, so start tags, end tags and
//! text arrive in document order exactly as written, misnested or not. They
//! are turned into [`Token`]s and fed to a [`ScopedTextExtractor`], a small
//! state machine that tracks nesting depth.
//!
//! # Example
//!
//! ```rust
//! use corrigo_core::extract::{TagMatcher, extract};
//!
//! let html = r#"<div class="a">X<div class="a">Y</div>Z</div>"#;
//! let matcher: TagMatcher = "div[class=a]".parse().unwrap();
//! assert_eq!(extract(html.as_bytes(), &matcher), "XYZ");
//! ```

use std::cell::{Cell, RefCell};
use std::str::FromStr;
use std::sync::LazyLock;

use html5ever::TokenizerResult;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, CharacterTokens, CommentToken, DoctypeToken, EOFToken, EndTag, NullCharacterToken, ParseError,
    StartTag, TagToken, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use regex::Regex;

use crate::{CorrigoError, Result};

static TARGET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([A-Za-z][A-Za-z0-9-]*)\[\s*([^\s=\]]+)\s*=\s*["']?([^"'\]]*)["']?\s*\]\s*$"#).unwrap()
});

/// Identifies the tag occurrences whose text should be captured.
///
/// Tag and attribute names are compared ASCII-case-insensitively, the
/// attribute value exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    /// Tag name, e.g. `div`.
    pub tag: String,
    /// Attribute that must be present, e.g. `class`.
    pub attribute: String,
    /// Required attribute value, e.g. `article__text`.
    pub value: String,
}

impl TagMatcher {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self { tag: tag.into(), attribute: attribute.into(), value: value.into() }
    }

    /// True if `name` is this matcher's tag, regardless of attributes.
    pub fn is_tag(&self, name: &str) -> bool {
        self.tag.eq_ignore_ascii_case(name)
    }

    /// True if a start tag with this name and these attributes opens a scope.
    pub fn opens(&self, name: &str, attributes: &[(String, String)]) -> bool {
        self.is_tag(name)
            && attributes
                .iter()
                .any(|(key, value)| key.eq_ignore_ascii_case(&self.attribute) && *value == self.value)
    }
}

impl FromStr for TagMatcher {
    type Err = CorrigoError;

    /// Parses `tag[attribute=value]`. The value may be quoted.
    fn from_str(s: &str) -> Result<Self> {
        let caps = TARGET_PATTERN.captures(s).ok_or_else(|| {
            CorrigoError::InvalidTarget(format!("'{}' (expected tag[attribute=value])", s))
        })?;

        Ok(Self::new(&caps[1], &caps[2], &caps[3]))
    }
}

impl std::fmt::Display for TagMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}={}]", self.tag, self.attribute, self.value)
    }
}

/// One markup token, as seen by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag { name: String, attributes: Vec<(String, String)> },
    EndTag { name: String },
    /// Content of one text node, with character references decoded except
    /// inside raw-text elements such as `<script>`.
    Text(String),
}

/// Whether the stream is currently inside a matching tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Outside,
    /// Depth is always at least 1.
    Inside(usize),
}

impl Scope {
    pub fn depth(self) -> usize {
        match self {
            Scope::Outside => 0,
            Scope::Inside(depth) => depth,
        }
    }
}

/// Depth-tracking state machine over a token stream.
///
/// Text seen while inside a scope is buffered and only moved to the result
/// when a matching-name end tag closes one level. Whatever is still buffered
/// when the stream stops is discarded.
#[derive(Debug, Clone)]
pub struct ScopedTextExtractor {
    matcher: TagMatcher,
    scope: Scope,
    pending: String,
    result: String,
}

impl ScopedTextExtractor {
    pub fn new(matcher: TagMatcher) -> Self {
        Self { matcher, scope: Scope::Outside, pending: String::new(), result: String::new() }
    }

    pub fn matcher(&self) -> &TagMatcher {
        &self.matcher
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Text flushed so far.
    pub fn flushed(&self) -> &str {
        &self.result
    }

    pub fn feed(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, attributes } => {
                if self.matcher.opens(name, attributes) {
                    self.scope = Scope::Inside(self.scope.depth() + 1);
                }
            }
            Token::Text(text) => {
                if let Scope::Inside(_) = self.scope {
                    self.pending.push_str(text);
                }
            }
            Token::EndTag { name } => {
                if let Scope::Inside(depth) = self.scope
                    && self.matcher.is_tag(name)
                {
                    self.scope = if depth > 1 { Scope::Inside(depth - 1) } else { Scope::Outside };
                    self.result.push_str(&self.pending);
                    self.pending.clear();
                }
            }
        }
    }

    /// Consumes the extractor, dropping any unflushed text.
    pub fn finish(self) -> String {
        if !self.pending.is_empty() {
            tracing::debug!(
                matcher = %self.matcher,
                discarded = self.pending.chars().count(),
                "scope still open at end of input"
            );
        }
        self.result
    }
}

/// Which tags make up an article and how their texts are joined.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Targets in output order.
    pub targets: Vec<TagMatcher>,
    /// Inserted between non-empty target texts.
    pub separator: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                TagMatcher::new("div", "class", "article__title"),
                TagMatcher::new("div", "class", "article__text"),
            ],
            separator: "\n".to_string(),
        }
    }
}

/// Extracts the text of a single target.
///
/// Returns an empty string when no scope is ever opened.
pub fn extract(document: &[u8], matcher: &TagMatcher) -> String {
    extract_all(document, std::slice::from_ref(matcher)).pop().unwrap_or_default()
}

/// Extracts the text of several targets in one pass over the document.
///
/// The result has one entry per matcher, in the same order. Input that is not
/// valid UTF-8 is malformed: tokenizing stops at the first bad byte sequence
/// and whatever was flushed by then is returned.
pub fn extract_all(document: &[u8], matchers: &[TagMatcher]) -> Vec<String> {
    let markup = match std::str::from_utf8(document) {
        Ok(markup) => markup,
        Err(e) => {
            tracing::warn!(error = %e, "malformed markup, extraction stopped early");
            // Cannot fail: the prefix was just validated.
            std::str::from_utf8(&document[..e.valid_up_to()]).unwrap_or_default()
        }
    };

    let sink = ExtractorSink::new(matchers);
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));

    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    while let TokenizerResult::Script(()) = tokenizer.feed(&input) {}
    tokenizer.end();

    let sink = tokenizer.sink;
    if sink.parse_errors.get() > 0 {
        tracing::debug!(errors = sink.parse_errors.get(), "markup had recoverable parse errors");
    }

    sink.extractors.into_inner().into_iter().map(ScopedTextExtractor::finish).collect()
}

/// Extracts every configured target and joins the non-empty ones.
pub fn extract_article(document: &[u8], config: &ExtractConfig) -> String {
    extract_all(document, &config.targets)
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(&config.separator)
}

/// Receives raw tokens from the html5ever tokenizer and hands them to the
/// extractors as they come, with no tree construction in between.
///
/// Character runs are coalesced so that one text node reaches the extractors
/// as one [`Token::Text`].
struct ExtractorSink {
    extractors: RefCell<Vec<ScopedTextExtractor>>,
    text: RefCell<String>,
    parse_errors: Cell<usize>,
}

impl ExtractorSink {
    fn new(matchers: &[TagMatcher]) -> Self {
        Self {
            extractors: RefCell::new(matchers.iter().cloned().map(ScopedTextExtractor::new).collect()),
            text: RefCell::new(String::new()),
            parse_errors: Cell::new(0),
        }
    }

    fn broadcast(&self, token: &Token) {
        for extractor in self.extractors.borrow_mut().iter_mut() {
            extractor.feed(token);
        }
    }

    fn flush_text(&self) {
        let text = std::mem::take(&mut *self.text.borrow_mut());
        if !text.is_empty() {
            self.broadcast(&Token::Text(text));
        }
    }

    fn wants(&self, name: &str) -> bool {
        self.extractors.borrow().iter().any(|ex| ex.matcher().is_tag(name))
    }
}

impl TokenSink for ExtractorSink {
    type Handle = ();

    fn process_token(&self, token: html5ever::tokenizer::Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            CharacterTokens(chunk) => self.text.borrow_mut().push_str(&chunk),
            NullCharacterToken => self.text.borrow_mut().push('\0'),
            TagToken(tag) => {
                self.flush_text();
                let name: &str = &tag.name;

                match tag.kind {
                    StartTag => {
                        // `<div/>` is a self-closing token, never a scope opener.
                        if tag.self_closing {
                            return TokenSinkResult::Continue;
                        }
                        if self.wants(name) {
                            let attributes = tag
                                .attrs
                                .iter()
                                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                                .collect();
                            self.broadcast(&Token::StartTag { name: name.to_string(), attributes });
                        }
                        return raw_text_state(name);
                    }
                    EndTag => {
                        if self.wants(name) {
                            self.broadcast(&Token::EndTag { name: name.to_string() });
                        }
                    }
                }
            }
            EOFToken => self.flush_text(),
            ParseError(reason) => {
                self.parse_errors.set(self.parse_errors.get() + 1);
                tracing::trace!(%reason, "parse error");
            }
            CommentToken(_) | DoctypeToken(_) => {}
        }

        TokenSinkResult::Continue
    }
}

/// Tokenizer state to switch to after a start tag whose content is not markup.
fn raw_text_state(name: &str) -> TokenSinkResult<()> {
    match name {
        "script" => TokenSinkResult::RawData(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
            TokenSinkResult::RawData(RawKind::Rawtext)
        }
        "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
        "plaintext" => TokenSinkResult::Plaintext,
        _ => TokenSinkResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn start(name: &str, attrs: &[(&str, &str)]) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn end(name: &str) -> Token {
        Token::EndTag { name: name.to_string() }
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn matcher_a() -> TagMatcher {
        TagMatcher::new("div", "class", "a")
    }

    #[test]
    fn test_nested_same_match_scopes() {
        let html = r#"<div class="a">X<div class="a">Y</div>Z</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "XYZ");
    }

    #[test]
    fn test_non_matching_attribute_never_opens() {
        let html = r#"<div class="b">skip</div><div id="a">skip</div><div class="a">keep</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "keep");
    }

    #[test]
    fn test_unrelated_nested_markup_contributes_text() {
        let html = r#"<div class="a">Hello, <b>bold</b> <a href="/x">link</a>!</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "Hello, bold link!");
    }

    #[test]
    fn test_no_scope_returns_empty() {
        let html = "<html><body><p>nothing to see</p></body></html>";
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "");
    }

    #[test]
    fn test_open_scope_at_end_is_not_flushed() {
        let html = r#"<div class="a">closed</div><div class="a">never closed"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "closed");
    }

    #[test]
    fn test_entities_are_decoded() {
        let html = r#"<div class="a">Tom &amp; Jerry &laquo;ok&raquo;</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "Tom & Jerry «ok»");
    }

    #[test]
    fn test_misnested_end_tags_follow_literal_order() {
        let html = r#"<section><div class="a">X</section>Y</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "XY");
    }

    #[test]
    fn test_stray_end_tag_closes_open_scope() {
        let html = r#"<div class="a">X<p>Y</div></p></div>Z"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "XY");
    }

    #[test]
    fn test_script_content_is_kept_raw() {
        let html = r#"<div class="a"><script>if (a<b && c) s="&amp;"</script>T</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), r#"if (a<b && c) s="&amp;"T"#);
    }

    #[test]
    fn test_title_and_textarea_decode_references_only() {
        let html = r#"<div class="a"><textarea><b>&lt;x&gt;</b></textarea></div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "<b><x></b>");
    }

    #[test]
    fn test_self_closing_tag_does_not_open_scope() {
        let html = r#"<div class="a"/>outside<div class="a">inside</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "inside");
    }

    #[test]
    fn test_invalid_utf8_stops_early() {
        let mut html = br#"<div class="a">kept</div><div class="a">lost "#.to_vec();
        html.extend_from_slice(&[0xff, 0xfe]);
        html.extend_from_slice(b"</div>");
        assert_eq!(extract(&html, &matcher_a()), "kept");
    }

    #[test]
    fn test_multibyte_text() {
        let html = r#"<div class="a">Кафе ошибка</div>"#;
        assert_eq!(extract(html.as_bytes(), &matcher_a()), "Кафе ошибка");
    }

    #[test]
    fn test_extract_all_single_pass() {
        let html = r#"<div class="t">Title</div><p>x</p><div class="b">Body</div>"#;
        let matchers = [TagMatcher::new("div", "class", "t"), TagMatcher::new("div", "class", "b")];
        assert_eq!(extract_all(html.as_bytes(), &matchers), vec!["Title", "Body"]);
    }

    #[test]
    fn test_extract_article_joins_targets() {
        let html = r#"<div class="article__title">Заголовок</div>
            <div class="article__text">Текст статьи.</div>"#;
        let text = extract_article(html.as_bytes(), &ExtractConfig::default());
        assert_eq!(text, "Заголовок\nТекст статьи.");
    }

    #[test]
    fn test_extract_article_skips_missing_targets() {
        let html = r#"<div class="article__text">Only body</div>"#;
        assert_eq!(extract_article(html.as_bytes(), &ExtractConfig::default()), "Only body");
    }

    #[test]
    fn test_state_machine_depth_never_negative() {
        let mut extractor = ScopedTextExtractor::new(matcher_a());
        extractor.feed(&end("div"));
        extractor.feed(&end("div"));
        assert_eq!(extractor.scope(), Scope::Outside);

        extractor.feed(&text("outside"));
        extractor.feed(&start("div", &[("class", "a")]));
        assert_eq!(extractor.scope(), Scope::Inside(1));
        extractor.feed(&text("in"));
        extractor.feed(&end("div"));
        extractor.feed(&end("div"));
        assert_eq!(extractor.scope().depth(), 0);
        assert_eq!(extractor.finish(), "in");
    }

    #[test]
    fn test_state_machine_nested_non_matching_same_name_closes_scope() {
        let mut extractor = ScopedTextExtractor::new(matcher_a());
        for token in [
            start("div", &[("class", "a")]),
            text("X"),
            start("div", &[("class", "b")]),
            text("Y"),
            end("div"),
            text("Z"),
            end("div"),
        ] {
            extractor.feed(&token);
        }
        assert_eq!(extractor.finish(), "XY");
    }

    #[test]
    fn test_state_machine_discards_pending_on_finish() {
        let mut extractor = ScopedTextExtractor::new(matcher_a());
        extractor.feed(&start("div", &[("class", "a")]));
        extractor.feed(&text("A"));
        extractor.feed(&end("div"));
        extractor.feed(&start("div", &[("class", "a")]));
        extractor.feed(&text("B"));
        assert_eq!(extractor.flushed(), "A");
        assert_eq!(extractor.finish(), "A");
    }

    #[rstest]
    #[case("div[class=article__text]", "div", "class", "article__text")]
    #[case("section[data-role='body']", "section", "data-role", "body")]
    #[case(r#" DIV[ id = "main" ] "#, "DIV", "id", "main")]
    fn test_tag_matcher_parse(#[case] input: &str, #[case] tag: &str, #[case] attr: &str, #[case] value: &str) {
        let matcher: TagMatcher = input.parse().unwrap();
        assert_eq!(matcher, TagMatcher::new(tag, attr, value));
    }

    #[rstest]
    #[case("div")]
    #[case("div[class]")]
    #[case("[class=a]")]
    #[case("div class=a")]
    fn test_tag_matcher_parse_invalid(#[case] input: &str) {
        assert!(matches!(input.parse::<TagMatcher>(), Err(CorrigoError::InvalidTarget(_))));
    }

    #[test]
    fn test_tag_matcher_case_insensitive_names() {
        let matcher = TagMatcher::new("DIV", "Class", "a");
        assert!(matcher.opens("div", &[("class".to_string(), "a".to_string())]));
        assert!(!matcher.opens("div", &[("class".to_string(), "A".to_string())]));
    }

    #[test]
    fn test_tag_matcher_display_round_trip() {
        let matcher = TagMatcher::new("div", "class", "article__text");
        assert_eq!(matcher.to_string().parse::<TagMatcher>().unwrap(), matcher);
    }
}
