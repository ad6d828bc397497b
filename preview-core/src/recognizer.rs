// ABOUTME: Recognizers that pull candidate image references out of a single line
// ABOUTME: Each variant applies one pattern and reports only its first match

use crate::host::DocumentContext;
use crate::location::RawReference;
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*(?:<([^>]+)>|([^)\s]+))(?:\s+["'][^)]*["'])?\s*\)"#)
        .expect("markdown link pattern is valid")
});

static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("css url pattern is valid")
});

static HTML_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("src attribute pattern is valid")
});

static QUOTED_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["'`]([^"'`]+\.[A-Za-z0-9]{3})["'`]"#).expect("quoted path pattern is valid")
});

pub trait Recognizer: Send {
    fn name(&self) -> &'static str;

    /// Extract one candidate string from `line`, or nothing.
    fn recognize(&self, ctx: &DocumentContext, line: &str) -> Option<RawReference>;
}

/// `[alt](target)` links, only inside markdown documents
pub struct MarkdownLinkRecognizer;

impl Recognizer for MarkdownLinkRecognizer {
    fn name(&self) -> &'static str {
        "markdown-link"
    }

    fn recognize(&self, ctx: &DocumentContext, line: &str) -> Option<RawReference> {
        if ctx.language_id != "markdown" {
            return None;
        }
        first_capture(&MARKDOWN_LINK, line)
    }
}

/// CSS `url(...)` arguments, quotes optional
pub struct CssUrlRecognizer;

impl Recognizer for CssUrlRecognizer {
    fn name(&self) -> &'static str {
        "css-url"
    }

    fn recognize(&self, _ctx: &DocumentContext, line: &str) -> Option<RawReference> {
        first_capture(&CSS_URL, line)
    }
}

/// HTML `src="..."` and `src='...'` attributes
pub struct HtmlSrcRecognizer;

impl Recognizer for HtmlSrcRecognizer {
    fn name(&self) -> &'static str {
        "html-src"
    }

    fn recognize(&self, _ctx: &DocumentContext, line: &str) -> Option<RawReference> {
        first_capture(&HTML_SRC, line)
    }
}

/// Fallback for string literals: any quoted token with a three letter extension
pub struct QuotedPathRecognizer;

impl Recognizer for QuotedPathRecognizer {
    fn name(&self) -> &'static str {
        "quoted-path"
    }

    fn recognize(&self, _ctx: &DocumentContext, line: &str) -> Option<RawReference> {
        first_capture(&QUOTED_PATH, line)
    }
}

/// First non-empty capture group of the first match
fn first_capture(pattern: &Regex, line: &str) -> Option<RawReference> {
    let captures = pattern.captures(line)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .map(|m| RawReference::new(m.as_str()))
        .find(|reference| !reference.is_empty())
}

/// The recognizers in the order their results are reported.
pub fn default_recognizers() -> Vec<Box<dyn Recognizer>> {
    vec![
        Box::new(MarkdownLinkRecognizer),
        Box::new(CssUrlRecognizer),
        Box::new(HtmlSrcRecognizer),
        Box::new(QuotedPathRecognizer),
    ]
}

/// Runs every recognizer over `line` and collects the non-empty hits in order.
pub fn recognize_line(
    recognizers: &[Box<dyn Recognizer>],
    ctx: &DocumentContext,
    line: &str,
) -> Vec<RawReference> {
    recognizers
        .iter()
        .filter_map(|recognizer| {
            let hit = recognizer.recognize(ctx, line);
            if let Some(ref reference) = hit {
                log::trace!("{} recognized {}", recognizer.name(), reference);
            }
            hit
        })
        .filter(|reference| !reference.is_empty())
        .collect()
}
