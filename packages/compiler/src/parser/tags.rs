//! Tag Tables
//!
//! Per-tag parsing rules: void elements, raw-text elements, tags that may
//! legally be left open, and tags whose leading newline is dropped.

use once_cell::sync::Lazy;
use std::collections::HashSet;

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
        "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

static CAN_BE_LEFT_OPEN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "colgroup", "dd", "dt", "li", "option", "p", "td", "tfoot", "th", "thead", "tr", "source",
    ]
    .into_iter()
    .collect()
});

static RAW_TEXT_ELEMENTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["script", "style", "textarea"].into_iter().collect());

static IGNORE_FIRST_LF: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["pre", "textarea"].into_iter().collect());

/// Elements that never have a closing tag.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(tag)
}

/// Elements whose unclosed state is legal by tag semantics, so reaching
/// end-of-input without a close tag is not reported.
pub fn can_be_left_open(tag: &str) -> bool {
    CAN_BE_LEFT_OPEN.contains(tag)
}

/// Elements whose content is consumed verbatim, without tag or
/// interpolation tokenization.
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(tag)
}

/// Elements that swallow a leading line feed in their content.
pub fn should_ignore_first_lf(tag: &str) -> bool {
    IGNORE_FIRST_LF.contains(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("img"));
        assert!(!is_void_element("div"));
    }

    #[test]
    fn test_can_be_left_open() {
        assert!(can_be_left_open("p"));
        assert!(can_be_left_open("li"));
        assert!(!can_be_left_open("span"));
    }

    #[test]
    fn test_raw_text_elements() {
        assert!(is_raw_text_element("script"));
        assert!(is_raw_text_element("textarea"));
        assert!(!is_raw_text_element("pre"));
    }

    #[test]
    fn test_ignore_first_lf() {
        assert!(should_ignore_first_lf("pre"));
        assert!(!should_ignore_first_lf("div"));
    }
}
