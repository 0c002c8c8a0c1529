//! Parse Utilities
//!
//! Source spans, literal escaping and the diagnostic type shared by
//! every compile stage.
//! Diagnostics are accumulated on the compile result, never thrown: a
//! compile call always returns, possibly in a degraded state.

use serde::Serialize;

/// Byte-offset range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        SourceSpan { start, end }
    }
}

/// Severity of a compile diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Tip,
    Error,
}

/// A single parse/generate diagnostic.
///
/// The span is only attached when the compile was configured with
/// `output_source_range`, so offline tooling can opt into precise
/// locations without burdening the common path.
#[derive(Debug, Clone, Serialize)]
pub struct CompileDiagnostic {
    pub msg: String,
    pub span: Option<SourceSpan>,
    pub level: DiagnosticLevel,
}

impl CompileDiagnostic {
    pub fn error(msg: impl Into<String>, span: Option<SourceSpan>) -> Self {
        CompileDiagnostic {
            msg: msg.into(),
            span,
            level: DiagnosticLevel::Error,
        }
    }

    pub fn tip(msg: impl Into<String>, span: Option<SourceSpan>) -> Self {
        CompileDiagnostic {
            msg: msg.into(),
            span,
            level: DiagnosticLevel::Tip,
        }
    }
}

/// Escape a literal for embedding in generated source. The output parser
/// reverses this exactly; values round-trip bit-for-bit.
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_str_escapes() {
        assert_eq!(quote_str("plain"), "\"plain\"");
        assert_eq!(quote_str("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_str("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote_str("a\nb"), "\"a\\nb\"");
        assert_eq!(quote_str("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn test_diagnostic_levels() {
        let err = CompileDiagnostic::error("bad", None);
        assert_eq!(err.level, DiagnosticLevel::Error);
        let tip = CompileDiagnostic::tip("hint", Some(SourceSpan::new(1, 2)));
        assert_eq!(tip.level, DiagnosticLevel::Tip);
        assert_eq!(tip.span, Some(SourceSpan::new(1, 2)));
    }
}
