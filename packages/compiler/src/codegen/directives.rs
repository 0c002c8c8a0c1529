//! Directive Code Generation Hooks
//!
//! Custom directives either compile away into a data-object fragment here,
//! or stay behind as runtime directive metadata for the patching layer.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::parser::ast::{Directive, Element};

/// Outcome of a directive codegen hook.
pub enum DirectiveGenResult {
    /// Emit this fragment into the element's data object.
    Data(String),
    /// Fully consumed at compile time; nothing to emit.
    Handled,
    /// Not compiled away; forward as runtime directive metadata.
    Runtime,
    /// The directive is used incorrectly; degrade and report.
    Error(String),
}

pub trait DirectiveCodegen: Send + Sync {
    fn gen(&self, dir: &Directive, el: &Element) -> DirectiveGenResult;
}

/// `v-text="expr"` compiles to a textContent property patch.
pub struct TextDirective;

impl DirectiveCodegen for TextDirective {
    fn gen(&self, dir: &Directive, _el: &Element) -> DirectiveGenResult {
        match &dir.value {
            Some(value) => DirectiveGenResult::Data(format!(
                "domProps:{{\"textContent\":_s({})}}",
                value
            )),
            None => DirectiveGenResult::Error("v-text requires an expression".to_string()),
        }
    }
}

/// `v-html="expr"` compiles to an innerHTML property patch.
pub struct HtmlDirective;

impl DirectiveCodegen for HtmlDirective {
    fn gen(&self, dir: &Directive, _el: &Element) -> DirectiveGenResult {
        match &dir.value {
            Some(value) => DirectiveGenResult::Data(format!(
                "domProps:{{\"innerHTML\":_s({})}}",
                value
            )),
            None => DirectiveGenResult::Error("v-html requires an expression".to_string()),
        }
    }
}

/// `v-cloak` exists only in markup; it compiles to nothing.
pub struct CloakDirective;

impl DirectiveCodegen for CloakDirective {
    fn gen(&self, _dir: &Directive, _el: &Element) -> DirectiveGenResult {
        DirectiveGenResult::Handled
    }
}

/// Directive hooks registered on the default compiler.
pub fn base_directives() -> IndexMap<String, Arc<dyn DirectiveCodegen>> {
    let mut map: IndexMap<String, Arc<dyn DirectiveCodegen>> = IndexMap::new();
    map.insert("text".to_string(), Arc::new(TextDirective));
    map.insert("html".to_string(), Arc::new(HtmlDirective));
    map.insert("cloak".to_string(), Arc::new(CloakDirective));
    map
}
