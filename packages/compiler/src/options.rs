//! Compiler Options
//!
//! Option records and the base-over-caller merge used by the facade.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::codegen::directives::DirectiveCodegen;
use crate::modules::ModuleTransform;

/// How whitespace-only text between tags is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WhitespaceMode {
    Preserve,
    Condense,
}

/// Full option set a compile runs with.
#[derive(Clone)]
pub struct CompilerOptions {
    /// Interpolation boundary markers; `None` means the default `{{`/`}}`.
    pub delimiters: Option<(String, String)>,
    /// Retain comment nodes in the AST and output.
    pub comments: bool,
    pub whitespace: WhitespaceMode,
    /// Attach source offsets to nodes and diagnostics.
    pub output_source_range: bool,
    /// Run the static optimizer. Tooling that only needs the raw AST
    /// turns this off.
    pub optimize: bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    /// Binding-syntax prefix for directives.
    pub directive_prefix: String,
    pub modules: Vec<Arc<dyn ModuleTransform>>,
    pub directives: IndexMap<String, Arc<dyn DirectiveCodegen>>,
    /// Attribute/data keys whose presence makes a node non-static.
    pub static_keys: Vec<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            delimiters: None,
            comments: false,
            whitespace: WhitespaceMode::Preserve,
            output_source_range: false,
            optimize: true,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
            directive_prefix: "v-".to_string(),
            modules: Vec::new(),
            directives: IndexMap::new(),
            static_keys: Vec::new(),
        }
    }
}

impl CompilerOptions {
    /// Canonical serialization of every option that affects generated
    /// output. Part of the compile-cache key: two compiles may share a
    /// cached result only if their signatures match.
    pub fn output_signature(&self) -> String {
        let module_names: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        let directive_names: Vec<&str> = self.directives.keys().map(String::as_str).collect();
        json!({
            "delimiters": self.delimiters,
            "comments": self.comments,
            "whitespace": self.whitespace,
            "outputSourceRange": self.output_source_range,
            "optimize": self.optimize,
            "shouldDecodeNewlines": self.should_decode_newlines,
            "shouldDecodeNewlinesForHref": self.should_decode_newlines_for_href,
            "directivePrefix": self.directive_prefix,
            "modules": module_names,
            "directives": directive_names,
            "staticKeys": self.static_keys,
        })
        .to_string()
    }
}

/// Caller-supplied overrides, merged over a compiler's base options.
/// Scalar fields win on conflict; list-valued fields concatenate.
#[derive(Clone, Default)]
pub struct CompilerOptionsOverride {
    pub delimiters: Option<(String, String)>,
    pub comments: Option<bool>,
    pub whitespace: Option<WhitespaceMode>,
    pub output_source_range: Option<bool>,
    pub optimize: Option<bool>,
    pub should_decode_newlines: Option<bool>,
    pub should_decode_newlines_for_href: Option<bool>,
    pub directive_prefix: Option<String>,
    pub modules: Vec<Arc<dyn ModuleTransform>>,
    pub directives: IndexMap<String, Arc<dyn DirectiveCodegen>>,
    pub static_keys: Vec<String>,
}

/// Merge caller options over base options.
pub fn merge_options(
    base: &CompilerOptions,
    overrides: &CompilerOptionsOverride,
) -> CompilerOptions {
    let mut merged = base.clone();
    if overrides.delimiters.is_some() {
        merged.delimiters = overrides.delimiters.clone();
    }
    if let Some(comments) = overrides.comments {
        merged.comments = comments;
    }
    if let Some(whitespace) = overrides.whitespace {
        merged.whitespace = whitespace;
    }
    if let Some(range) = overrides.output_source_range {
        merged.output_source_range = range;
    }
    if let Some(optimize) = overrides.optimize {
        merged.optimize = optimize;
    }
    if let Some(decode) = overrides.should_decode_newlines {
        merged.should_decode_newlines = decode;
    }
    if let Some(decode) = overrides.should_decode_newlines_for_href {
        merged.should_decode_newlines_for_href = decode;
    }
    if let Some(prefix) = &overrides.directive_prefix {
        merged.directive_prefix = prefix.clone();
    }
    merged.modules.extend(overrides.modules.iter().cloned());
    for (name, hook) in &overrides.directives {
        merged.directives.insert(name.clone(), hook.clone());
    }
    merged
        .static_keys
        .extend(overrides.static_keys.iter().cloned());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ClassModule;

    #[test]
    fn test_scalar_override_wins() {
        let base = CompilerOptions::default();
        let overrides = CompilerOptionsOverride {
            comments: Some(true),
            delimiters: Some(("[[".to_string(), "]]".to_string())),
            ..Default::default()
        };
        let merged = merge_options(&base, &overrides);
        assert!(merged.comments);
        assert_eq!(merged.delimiters, Some(("[[".to_string(), "]]".to_string())));
        // Untouched fields keep the base value.
        assert!(merged.optimize);
    }

    #[test]
    fn test_list_options_concatenate() {
        let mut base = CompilerOptions::default();
        base.static_keys.push("a".to_string());
        let overrides = CompilerOptionsOverride {
            static_keys: vec!["b".to_string()],
            modules: vec![Arc::new(ClassModule)],
            ..Default::default()
        };
        let merged = merge_options(&base, &overrides);
        assert_eq!(merged.static_keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(merged.modules.len(), 1);
    }

    #[test]
    fn test_output_signature_changes_with_options() {
        let base = CompilerOptions::default();
        let mut other = CompilerOptions::default();
        other.comments = true;
        assert_ne!(base.output_signature(), other.output_signature());
        // Span attachment changes the diagnostics baked into a cached
        // result, so it is part of the signature too.
        let mut spanned = CompilerOptions::default();
        spanned.output_source_range = true;
        assert_ne!(base.output_signature(), spanned.output_signature());
        assert_eq!(base.output_signature(), CompilerOptions::default().output_signature());
    }
}
