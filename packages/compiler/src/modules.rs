//! Module Transforms
//!
//! Pluggable attribute transforms consumed by the parser and the code
//! generator. A module claims recognized attributes off the element during
//! parsing and later contributes a fragment of the generated data object.

use std::sync::Arc;

use crate::parse_util::quote_str;
use crate::parse_util::CompileDiagnostic;
use crate::parser::ast::Element;

/// A pluggable compile-time transform.
pub trait ModuleTransform: Send + Sync {
    fn name(&self) -> &str;

    /// Data keys this module may put on an otherwise-static element.
    /// Keys outside this list mark the element dynamic.
    fn static_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Consume recognized attributes into `module_data`. Runs once per
    /// element during parsing.
    fn transform_element(&self, _el: &mut Element, _diagnostics: &mut Vec<CompileDiagnostic>) {}
}

fn take_plain_attr(el: &mut Element, name: &str) -> Option<String> {
    let idx = el.attrs.iter().position(|a| a.name == name)?;
    Some(el.attrs.remove(idx).value)
}

fn take_bound_attr(el: &mut Element, name: &str) -> Option<String> {
    let idx = el.bound_attrs.iter().position(|a| a.name == name)?;
    Some(el.bound_attrs.remove(idx).expr)
}

/// `class` / `:class` handling: the static class is a plain string data
/// key, the bound class stays a live expression.
pub struct ClassModule;

impl ModuleTransform for ClassModule {
    fn name(&self) -> &str {
        "class"
    }

    fn static_keys(&self) -> &[&'static str] {
        &["staticClass"]
    }

    fn transform_element(&self, el: &mut Element, _diagnostics: &mut Vec<CompileDiagnostic>) {
        if let Some(value) = take_plain_attr(el, "class") {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                el.module_data
                    .insert("staticClass".to_string(), quote_str(&trimmed));
            }
        }
        if let Some(expr) = take_bound_attr(el, "class") {
            el.module_data.insert("class".to_string(), format!("({})", expr));
        }
    }
}

/// `style` / `:style` handling, same split as the class module.
pub struct StyleModule;

impl ModuleTransform for StyleModule {
    fn name(&self) -> &str {
        "style"
    }

    fn static_keys(&self) -> &[&'static str] {
        &["staticStyle"]
    }

    fn transform_element(&self, el: &mut Element, _diagnostics: &mut Vec<CompileDiagnostic>) {
        if let Some(value) = take_plain_attr(el, "style") {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                el.module_data
                    .insert("staticStyle".to_string(), quote_str(&trimmed));
            }
        }
        if let Some(expr) = take_bound_attr(el, "style") {
            el.module_data.insert("style".to_string(), format!("({})", expr));
        }
    }
}

/// The platform module list used by the default compiler.
pub fn base_modules() -> Vec<Arc<dyn ModuleTransform>> {
    vec![Arc::new(ClassModule), Arc::new(StyleModule)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Attribute, BoundAttribute};

    #[test]
    fn test_class_module_claims_static_class() {
        let mut el = Element::new("div", None);
        el.attrs.push(Attribute {
            name: "class".to_string(),
            value: "btn primary".to_string(),
            span: None,
        });
        ClassModule.transform_element(&mut el, &mut Vec::new());
        assert!(el.attrs.is_empty());
        assert_eq!(
            el.module_data.get("staticClass").map(String::as_str),
            Some("\"btn primary\"")
        );
    }

    #[test]
    fn test_class_module_claims_bound_class() {
        let mut el = Element::new("div", None);
        el.bound_attrs.push(BoundAttribute {
            name: "class".to_string(),
            expr: "activeClass".to_string(),
            span: None,
        });
        ClassModule.transform_element(&mut el, &mut Vec::new());
        assert!(el.bound_attrs.is_empty());
        assert_eq!(
            el.module_data.get("class").map(String::as_str),
            Some("(activeClass)")
        );
    }

    #[test]
    fn test_style_module_ignores_other_attrs() {
        let mut el = Element::new("div", None);
        el.attrs.push(Attribute {
            name: "id".to_string(),
            value: "app".to_string(),
            span: None,
        });
        StyleModule.transform_element(&mut el, &mut Vec::new());
        assert_eq!(el.attrs.len(), 1);
        assert!(el.module_data.is_empty());
    }
}
