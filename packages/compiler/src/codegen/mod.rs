//! Code Generator
//!
//! Walks the optimized AST and emits the primary render routine as source
//! text, plus one source string per hoisted static subtree. The emitted
//! language is the render DSL the function constructor reconstitutes:
//! `_c` create element, `_v` create text, `_r` raw markup, `_s` stringify,
//! `_e` empty/comment node, `_m` cached static tree by index, `_l` list
//! mapping, `_t` slot outlet.

pub mod directives;

use bitflags::bitflags;

use crate::options::CompilerOptions;
use crate::parse_util::{quote_str, CompileDiagnostic};
use crate::parser::ast::{Element, Node, NodeFlags};
use directives::DirectiveGenResult;

bitflags! {
    /// Structural aspects of the current element already compiled by an
    /// enclosing construct, so recursion must not re-enter them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Processed: u8 {
        const IF = 1 << 0;
        const FOR = 1 << 1;
        const STATIC = 1 << 2;
    }
}

/// Generated source for one template.
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub render: String,
    /// Hoisted static subtrees, in first-discovered document order. The
    /// primary render source references each by its index here; that
    /// pairing must survive to the runtime unchanged.
    pub static_render_fns: Vec<String>,
    pub errors: Vec<CompileDiagnostic>,
    pub tips: Vec<CompileDiagnostic>,
}

/// Generate render source for an optimized AST.
pub fn generate(root: Option<&Element>, options: &CompilerOptions) -> GeneratedCode {
    let mut state = CodegenState {
        options,
        static_render_fns: Vec::new(),
        errors: Vec::new(),
        tips: Vec::new(),
    };
    let render = match root {
        Some(el) => gen_element(el, &mut state, Processed::empty()),
        // A template with no usable root still yields a renderable tree.
        None => "_c(\"div\")".to_string(),
    };
    GeneratedCode {
        render,
        static_render_fns: state.static_render_fns,
        errors: state.errors,
        tips: state.tips,
    }
}

struct CodegenState<'a> {
    options: &'a CompilerOptions,
    static_render_fns: Vec<String>,
    errors: Vec<CompileDiagnostic>,
    tips: Vec<CompileDiagnostic>,
}

fn gen_element(el: &Element, state: &mut CodegenState, processed: Processed) -> String {
    if el.flags.contains(NodeFlags::STATIC_ROOT) && !processed.contains(Processed::STATIC) {
        return gen_static(el, state, processed);
    }
    if el.for_spec.is_some() && !processed.contains(Processed::FOR) {
        return gen_for(el, state, processed);
    }
    if el.if_expr.is_some() && !processed.contains(Processed::IF) {
        return gen_if(el, state, processed);
    }
    if el.tag == "slot" {
        return gen_slot(el, state);
    }
    gen_vnode_call(el, state)
}

/// Hoist a static subtree: emit it as a standalone routine and reference
/// it by index. The index is reserved before recursing so discovery order
/// matches document order.
fn gen_static(el: &Element, state: &mut CodegenState, processed: Processed) -> String {
    let index = state.static_render_fns.len();
    state.static_render_fns.push(String::new());
    let code = gen_element(el, state, processed | Processed::STATIC);
    state.static_render_fns[index] = code;
    format!("_m({})", index)
}

/// Conditional chains compile to ternary expressions ending in `_e()`.
fn gen_if(el: &Element, state: &mut CodegenState, processed: Processed) -> String {
    let mut branches: Vec<(Option<&str>, String)> = Vec::new();
    branches.push((
        el.if_expr.as_deref(),
        gen_element(el, state, processed | Processed::IF),
    ));
    for cond in &el.if_conditions {
        branches.push((
            cond.exp.as_deref(),
            gen_element(&cond.block, state, Processed::empty()),
        ));
    }

    let mut out = "_e()".to_string();
    for (exp, code) in branches.into_iter().rev() {
        out = match exp {
            Some(exp) => format!("({})?{}:{}", exp, code, out),
            // An unconditional else branch terminates the chain.
            None => code,
        };
    }
    out
}

/// List rendering compiles to a mapping over the iterable source.
fn gen_for(el: &Element, state: &mut CodegenState, processed: Processed) -> String {
    let Some(spec) = el.for_spec.as_ref() else {
        return gen_vnode_call(el, state);
    };
    if el.key.is_none() {
        // Unkeyed lists lose stable identity across reorders; forwarded
        // as a tip, not resolved here.
        state.tips.push(CompileDiagnostic::tip(
            format!(
                "<{} {}for>: list rendered without an explicit key; reorders will reuse nodes by position",
                el.tag, state.options.directive_prefix
            ),
            el.span,
        ));
    }
    let mut params = spec.alias.clone();
    if let Some(it1) = &spec.iterator1 {
        params.push(',');
        params.push_str(it1);
        if let Some(it2) = &spec.iterator2 {
            params.push(',');
            params.push_str(it2);
        }
    }
    format!(
        "_l(({}),function({}){{return {}}})",
        spec.iterable,
        params,
        gen_element(el, state, processed | Processed::FOR)
    )
}

/// Slot outlets compile to `_t(name, fallback?)`.
fn gen_slot(el: &Element, state: &mut CodegenState) -> String {
    let name = el
        .slot_name
        .clone()
        .unwrap_or_else(|| "\"default\"".to_string());
    match gen_children(el, state) {
        Some(children) => format!("_t({},{})", name, children),
        None => format!("_t({})", name),
    }
}

fn gen_vnode_call(el: &Element, state: &mut CodegenState) -> String {
    let data = gen_data(el, state);
    let children = gen_children(el, state);
    let tag = quote_str(&el.tag);
    match (data, children) {
        (Some(data), Some(children)) => format!("_c({},{},{})", tag, data, children),
        (Some(data), None) => format!("_c({},{})", tag, data),
        (None, Some(children)) => format!("_c({},{})", tag, children),
        (None, None) => format!("_c({})", tag),
    }
}

fn gen_data(el: &Element, state: &mut CodegenState) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(key) = &el.key {
        parts.push(format!("key:{}", key));
    }

    for (data_key, fragment) in &el.module_data {
        parts.push(format!("{}:{}", data_key, fragment));
    }

    let mut runtime_dirs = Vec::new();
    for dir in &el.directives {
        match state.options.directives.get(&dir.name) {
            Some(hook) => match hook.gen(dir, el) {
                DirectiveGenResult::Data(fragment) => parts.push(fragment),
                DirectiveGenResult::Handled => {}
                DirectiveGenResult::Runtime => runtime_dirs.push(dir),
                DirectiveGenResult::Error(msg) => {
                    // The offending directive degrades to nothing.
                    state.errors.push(CompileDiagnostic::error(msg, dir.span));
                }
            },
            None => runtime_dirs.push(dir),
        }
    }
    if !runtime_dirs.is_empty() {
        let entries: Vec<String> = runtime_dirs
            .iter()
            .map(|dir| {
                let mut fields = vec![
                    format!("name:{}", quote_str(&dir.name)),
                    format!("rawName:{}", quote_str(&dir.raw_name)),
                ];
                if let Some(value) = &dir.value {
                    fields.push(format!("value:({})", value));
                }
                if let Some(arg) = &dir.arg {
                    fields.push(format!("arg:{}", quote_str(arg)));
                }
                if !dir.modifiers.is_empty() {
                    let mods: Vec<String> = dir
                        .modifiers
                        .iter()
                        .map(|m| format!("{}:true", quote_str(m)))
                        .collect();
                    fields.push(format!("modifiers:{{{}}}", mods.join(",")));
                }
                format!("{{{}}}", fields.join(","))
            })
            .collect();
        parts.push(format!("directives:[{}]", entries.join(",")));
    }

    if !el.attrs.is_empty() || !el.bound_attrs.is_empty() {
        let mut entries: Vec<String> = Vec::new();
        for attr in &el.attrs {
            entries.push(format!("{}:{}", quote_str(&attr.name), quote_str(&attr.value)));
        }
        for bound in &el.bound_attrs {
            entries.push(format!("{}:({})", quote_str(&bound.name), bound.expr));
        }
        parts.push(format!("attrs:{{{}}}", entries.join(",")));
    }

    if !el.events.is_empty() {
        let entries: Vec<String> = el
            .events
            .iter()
            .map(|ev| {
                let key = event_key(ev);
                format!("{}:{}", quote_str(&key), quote_str(&ev.handler))
            })
            .collect();
        parts.push(format!("on:{{{}}}", entries.join(",")));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("{{{}}}", parts.join(",")))
    }
}

/// Event keys carry capture/once/passive as the runtime's marker prefixes
/// and remaining modifiers as dotted suffixes.
fn event_key(ev: &crate::parser::ast::EventHandler) -> String {
    let mut prefix = String::new();
    let mut suffix = Vec::new();
    for modifier in &ev.modifiers {
        match modifier.as_str() {
            "capture" => prefix.push('!'),
            "once" => prefix.push('~'),
            "passive" => prefix.push('&'),
            other => suffix.push(other),
        }
    }
    let mut key = format!("{}{}", prefix, ev.name);
    for m in suffix {
        key.push('.');
        key.push_str(m);
    }
    key
}

fn gen_children(el: &Element, state: &mut CodegenState) -> Option<String> {
    if el.children.is_empty() {
        return None;
    }
    let rendered: Vec<String> = el
        .children
        .iter()
        .map(|child| match child {
            Node::Element(child_el) => gen_element(child_el, state, Processed::empty()),
            Node::Text(t) => format!("_v({})", quote_str(&t.value)),
            Node::Interpolation(i) => {
                if i.raw {
                    format!("_r({})", i.expression)
                } else {
                    format!("_v({})", i.expression)
                }
            }
            Node::Comment(c) => format!("_e({})", quote_str(&c.value)),
        })
        .collect();
    Some(format!("[{}]", rendered.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_without_root() {
        let code = generate(None, &CompilerOptions::default());
        assert_eq!(code.render, "_c(\"div\")");
        assert!(code.static_render_fns.is_empty());
    }
}
