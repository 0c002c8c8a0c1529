//! Template Lexer
//!
//! Tokenizes template source into start-tag, end-tag, text and comment
//! tokens. Tokenization never fails: malformed input produces diagnostics
//! and a best-effort token stream for the tree builder to recover from.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tags::{is_raw_text_element, should_ignore_first_lf};
use crate::parse_util::{CompileDiagnostic, SourceSpan};

static START_TAG_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([a-zA-Z_][A-Za-z0-9\-\._]*)").unwrap());

static END_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</([a-zA-Z_][A-Za-z0-9\-\._]*)[^>]*>").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([^\s"'<>/=]+)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#)
        .unwrap()
});

static START_TAG_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(/?)>").unwrap());

static DOCTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^<!doctype[^>]*>").unwrap());

/// Raw attribute as written in the start tag, before directive resolution.
#[derive(Debug, Clone)]
pub struct RawAttribute {
    pub name: String,
    pub value: Option<String>,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct StartTagToken {
    pub name: String,
    pub attrs: Vec<RawAttribute>,
    pub self_closing: bool,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct EndTagToken {
    pub name: String,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub value: String,
    pub span: Option<SourceSpan>,
    /// Verbatim content of a raw-text element; exempt from interpolation.
    pub verbatim: bool,
}

#[derive(Debug, Clone)]
pub struct CommentChunk {
    pub value: String,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub enum Token {
    StartTag(StartTagToken),
    EndTag(EndTagToken),
    Text(TextChunk),
    Comment(CommentChunk),
}

#[derive(Debug, Clone, Default)]
pub struct TokenizeOptions {
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    pub output_source_range: bool,
}

#[derive(Debug)]
pub struct TokenizeResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<CompileDiagnostic>,
}

/// Decode the character entities browsers produce inside attribute values.
/// Newline/tab entities are only decoded when the host's serialization
/// rules require it.
pub fn decode_entities(value: &str, decode_newlines: bool) -> String {
    let mut out = value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    if decode_newlines {
        out = out.replace("&#10;", "\n").replace("&#9;", "\t");
    }
    out.replace("&amp;", "&")
}

/// Tokenize a template.
pub fn tokenize(source: &str, options: &TokenizeOptions) -> TokenizeResult {
    Lexer::new(source, options).run()
}

struct Lexer<'a> {
    source: &'a str,
    options: &'a TokenizeOptions,
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<CompileDiagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, options: &'a TokenizeOptions) -> Self {
        Lexer {
            source,
            options,
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn span(&self, start: usize, end: usize) -> Option<SourceSpan> {
        self.options
            .output_source_range
            .then(|| SourceSpan::new(start, end))
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn run(mut self) -> TokenizeResult {
        while self.pos < self.source.len() {
            let rest = self.rest();
            if rest.starts_with('<') {
                if rest.starts_with("<!--") {
                    self.consume_comment();
                    continue;
                }
                if rest.starts_with("<![") {
                    self.consume_conditional_comment();
                    continue;
                }
                if let Some(m) = DOCTYPE.find(rest) {
                    self.pos += m.end();
                    continue;
                }
                if let Some(caps) = END_TAG.captures(rest) {
                    let whole = caps.get(0).unwrap();
                    let span = self.span(self.pos, self.pos + whole.end());
                    self.tokens.push(Token::EndTag(EndTagToken {
                        name: caps[1].to_string(),
                        span,
                    }));
                    self.pos += whole.end();
                    continue;
                }
                if START_TAG_OPEN.is_match(rest) {
                    self.consume_start_tag();
                    continue;
                }
            }
            self.consume_text();
        }

        TokenizeResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn consume_comment(&mut self) {
        let start = self.pos;
        let body_start = start + 4;
        match self.source[body_start..].find("-->") {
            Some(idx) => {
                let value = self.source[body_start..body_start + idx].to_string();
                let end = body_start + idx + 3;
                let span = self.span(start, end);
                self.tokens.push(Token::Comment(CommentChunk { value, span }));
                self.pos = end;
            }
            None => {
                let span = self.span(start, self.source.len());
                self.errors
                    .push(CompileDiagnostic::error("unterminated comment", span));
                let value = self.source[body_start..].to_string();
                self.tokens.push(Token::Comment(CommentChunk { value, span }));
                self.pos = self.source.len();
            }
        }
    }

    fn consume_conditional_comment(&mut self) {
        match self.rest().find("]>") {
            Some(idx) => self.pos += idx + 2,
            None => self.pos = self.source.len(),
        }
    }

    fn consume_start_tag(&mut self) {
        let tag_start = self.pos;
        let caps = START_TAG_OPEN.captures(self.rest()).unwrap();
        let name = caps[1].to_string();
        let mut cursor = self.pos + caps.get(0).unwrap().end();

        let mut attrs = Vec::new();
        let self_closing;
        loop {
            let rest = &self.source[cursor..];
            if let Some(close) = START_TAG_CLOSE.captures(rest) {
                self_closing = !close[1].is_empty();
                cursor += close.get(0).unwrap().end();
                break;
            }
            match ATTRIBUTE.captures(rest) {
                Some(attr) => {
                    let whole = attr.get(0).unwrap();
                    let attr_name = attr[1].to_string();
                    let raw_value = attr
                        .get(3)
                        .or_else(|| attr.get(4))
                        .or_else(|| attr.get(5))
                        .map(|m| m.as_str());
                    let decode_newlines = if attr_name == "href" {
                        self.options.should_decode_newlines_for_href
                    } else {
                        self.options.should_decode_newlines
                    };
                    let value = match (raw_value, attr.get(2)) {
                        (Some(v), _) => Some(decode_entities(v, decode_newlines)),
                        // `name=` with no value parses as empty string.
                        (None, Some(_)) => Some(String::new()),
                        (None, None) => None,
                    };
                    let span = self.span(cursor + whole.start(), cursor + whole.end());
                    attrs.push(RawAttribute {
                        name: attr_name,
                        value,
                        span,
                    });
                    cursor += whole.end();
                }
                None => {
                    let span = self.span(tag_start, self.source.len());
                    self.errors.push(CompileDiagnostic::error(
                        format!("unexpected end of template inside tag <{}>", name),
                        span,
                    ));
                    self.pos = self.source.len();
                    return;
                }
            }
        }

        let span = self.span(tag_start, cursor);
        self.pos = cursor;
        if should_ignore_first_lf(&name) && self.rest().starts_with('\n') {
            self.pos += 1;
        }
        let is_raw = is_raw_text_element(&name) && !self_closing;
        self.tokens.push(Token::StartTag(StartTagToken {
            name: name.clone(),
            attrs,
            self_closing,
            span,
        }));
        if is_raw {
            self.consume_raw_text(&name);
        }
    }

    /// Content of `script`/`style`/`textarea` runs to the matching end tag
    /// without tag or interpolation tokenization.
    fn consume_raw_text(&mut self, tag: &str) {
        let start = self.pos;
        let close = format!("</{}", tag);
        let lower = self.source[start..].to_ascii_lowercase();
        match lower.find(&close.to_ascii_lowercase()) {
            Some(idx) => {
                if idx > 0 {
                    let span = self.span(start, start + idx);
                    self.tokens.push(Token::Text(TextChunk {
                        value: self.source[start..start + idx].to_string(),
                        span,
                        verbatim: true,
                    }));
                }
                self.pos = start + idx;
                // The end tag itself goes through the normal path.
            }
            None => {
                let span = self.span(start, self.source.len());
                if start < self.source.len() {
                    self.tokens.push(Token::Text(TextChunk {
                        value: self.source[start..].to_string(),
                        span,
                        verbatim: true,
                    }));
                }
                self.pos = self.source.len();
            }
        }
    }

    fn consume_text(&mut self) {
        let start = self.pos;
        // A lone `<` that opens no construct is literal text.
        let first_len = self.source[start..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        let mut search_from = start + first_len;
        let end = loop {
            match self.source[search_from.min(self.source.len())..].find('<') {
                Some(idx) => {
                    let candidate = search_from + idx;
                    let ahead = &self.source[candidate..];
                    if START_TAG_OPEN.is_match(ahead)
                        || END_TAG.is_match(ahead)
                        || ahead.starts_with("<!--")
                        || ahead.starts_with("<![")
                        || DOCTYPE.is_match(ahead)
                    {
                        break candidate;
                    }
                    search_from = candidate + 1;
                }
                None => break self.source.len(),
            }
        };
        let span = self.span(start, end);
        self.tokens.push(Token::Text(TextChunk {
            value: decode_entities(&self.source[start..end], false),
            span,
            verbatim: false,
        }));
        self.pos = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source, &TokenizeOptions::default()).tokens
    }

    #[test]
    fn test_start_and_end_tags() {
        let toks = tokens("<div class=\"a\">x</div>");
        assert_eq!(toks.len(), 3);
        match &toks[0] {
            Token::StartTag(t) => {
                assert_eq!(t.name, "div");
                assert_eq!(t.attrs[0].name, "class");
                assert_eq!(t.attrs[0].value.as_deref(), Some("a"));
                assert!(!t.self_closing);
            }
            other => panic!("expected start tag, got {:?}", other),
        }
        assert!(matches!(&toks[2], Token::EndTag(t) if t.name == "div"));
    }

    #[test]
    fn test_self_closing_and_unquoted_attrs() {
        let toks = tokens("<input type=text disabled/>");
        match &toks[0] {
            Token::StartTag(t) => {
                assert!(t.self_closing);
                assert_eq!(t.attrs[0].value.as_deref(), Some("text"));
                assert_eq!(t.attrs[1].name, "disabled");
                assert_eq!(t.attrs[1].value, None);
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_decoding_in_attrs() {
        let opts = TokenizeOptions {
            should_decode_newlines: true,
            ..Default::default()
        };
        let result = tokenize("<a title=\"a&amp;b&#10;c\"></a>", &opts);
        match &result.tokens[0] {
            Token::StartTag(t) => assert_eq!(t.attrs[0].value.as_deref(), Some("a&b\nc")),
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_token() {
        let toks = tokens("<!-- note -->");
        assert!(matches!(&toks[0], Token::Comment(c) if c.value == " note "));
    }

    #[test]
    fn test_unterminated_comment_reports_error() {
        let result = tokenize("<!-- oops", &TokenizeOptions::default());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].msg.contains("unterminated comment"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let toks = tokens("1 < 2");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::Text(t) if t.value == "1 < 2"));
    }

    #[test]
    fn test_raw_text_element_content() {
        let toks = tokens("<script>if (a < b) {}</script>");
        assert_eq!(toks.len(), 3);
        match &toks[1] {
            Token::Text(t) => {
                assert!(t.verbatim);
                assert_eq!(t.value, "if (a < b) {}");
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_textarea_ignores_first_lf() {
        let toks = tokens("<textarea>\nabc</textarea>");
        match &toks[1] {
            Token::Text(t) => assert_eq!(t.value, "abc"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_doctype_skipped() {
        let toks = tokens("<!DOCTYPE html><div></div>");
        assert!(matches!(&toks[0], Token::StartTag(t) if t.name == "div"));
    }
}
