//! Interpolation Parser
//!
//! Splits a text run into static fragments and embedded expressions using
//! the configured delimiter pair. The raw (unescaped) form is the start
//! delimiter extended by its final character, `{{{ expr }}}` by default.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::TextToken;
use crate::parse_util::quote_str;

/// Result of splitting an interpolated text run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedText {
    /// Composed render expression, fragments joined with `+`.
    pub expression: String,
    pub tokens: Vec<TextToken>,
    pub raw: bool,
}

static DEFAULT_DELIMITERS: (&str, &str) = ("{{", "}}");

// Compiled per delimiter pair; templates within one application almost
// always share a single pair.
static PATTERN_CACHE: Lazy<Mutex<HashMap<(String, String), Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn interpolation_pattern(start: &str, end: &str) -> Regex {
    let mut cache = PATTERN_CACHE.lock().unwrap();
    cache
        .entry((start.to_string(), end.to_string()))
        .or_insert_with(|| {
            let raw_start = format!("{}{}", start, start.chars().last().unwrap_or('{'));
            let raw_end = format!("{}{}", end.chars().next().unwrap_or('}'), end);
            // Raw alternative first so the extended delimiter wins.
            let pattern = format!(
                "{}((?s).+?){}|{}((?s).+?){}",
                regex::escape(&raw_start),
                regex::escape(&raw_end),
                regex::escape(start),
                regex::escape(end),
            );
            Regex::new(&pattern).expect("delimiter pattern must compile")
        })
        .clone()
}

/// Split `text` on the configured delimiters.
///
/// Returns `None` when the text contains no interpolation at all, so the
/// caller can keep it as a plain text node.
pub fn parse_text(text: &str, delimiters: Option<&(String, String)>) -> Option<ParsedText> {
    let (start, end) = match delimiters {
        Some((s, e)) => (s.as_str(), e.as_str()),
        None => DEFAULT_DELIMITERS,
    };
    let pattern = interpolation_pattern(start, end);
    if !pattern.is_match(text) {
        return None;
    }

    let mut tokens = Vec::new();
    let mut pieces = Vec::new();
    let mut raw = false;
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if whole.start() > last {
            let chunk = &text[last..whole.start()];
            pieces.push(quote_str(chunk));
            tokens.push(TextToken::Static(chunk.to_string()));
        }
        let exp = match caps.get(1) {
            Some(m) => {
                raw = true;
                m.as_str().trim()
            }
            None => caps.get(2).unwrap().as_str().trim(),
        };
        pieces.push(format!("_s({})", exp));
        tokens.push(TextToken::Expr(exp.to_string()));
        last = whole.end();
    }
    if last < text.len() {
        let chunk = &text[last..];
        pieces.push(quote_str(chunk));
        tokens.push(TextToken::Static(chunk.to_string()));
    }

    Some(ParsedText {
        expression: pieces.join("+"),
        tokens,
        raw,
    })
}
