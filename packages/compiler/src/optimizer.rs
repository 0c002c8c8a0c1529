//! Static Optimizer
//!
//! Walks the parsed AST and annotates nodes that never change, so the
//! generator can hoist whole static subtrees into standalone render
//! routines and the patching layer can skip them entirely on re-render.
//!
//! Two passes, both mutating flags in place:
//! 1. bottom-up: mark every node that is provably static;
//! 2. top-down: pick the static roots worth hoisting.

use std::collections::HashSet;

use crate::options::CompilerOptions;
use crate::parser::ast::{Element, Node, NodeFlags};

/// Annotate `root` and its subtree with static flags.
pub fn optimize(root: &mut Element, options: &CompilerOptions) {
    let module_whitelist: HashSet<&str> = options
        .modules
        .iter()
        .flat_map(|m| m.static_keys().iter().copied())
        .collect();
    let ctx = StaticContext {
        module_whitelist,
        non_static_keys: &options.static_keys,
    };
    mark_static_element(root, &ctx);
    mark_static_roots_element(root, false);
}

struct StaticContext<'a> {
    /// Module data keys allowed on a static element.
    module_whitelist: HashSet<&'a str>,
    /// Attribute/data keys that force a node dynamic.
    non_static_keys: &'a [String],
}

fn mark_static(node: &mut Node, ctx: &StaticContext) -> bool {
    match node {
        Node::Element(el) => mark_static_element(el, ctx),
        Node::Text(t) => {
            t.flags.insert(NodeFlags::STATIC);
            true
        }
        // Expressions are re-evaluated on every render by definition.
        Node::Interpolation(_) => false,
        Node::Comment(c) => {
            c.flags.insert(NodeFlags::STATIC);
            true
        }
    }
}

fn mark_static_element(el: &mut Element, ctx: &StaticContext) -> bool {
    let mut is_static = element_is_locally_static(el, ctx);
    for child in &mut el.children {
        let child_static = mark_static(child, ctx);
        is_static = is_static && child_static;
    }
    // Conditional branches are independent subtrees; the owning element
    // is dynamic regardless, but their own flags still matter.
    for cond in &mut el.if_conditions {
        mark_static_element(&mut cond.block, ctx);
    }
    if is_static {
        el.flags.insert(NodeFlags::STATIC);
    }
    is_static
}

fn element_is_locally_static(el: &Element, ctx: &StaticContext) -> bool {
    if el.if_expr.is_some()
        || el.is_else_block()
        || el.for_spec.is_some()
        || el.key.is_some()
        || el.slot_name.is_some()
        || el.slot_target.is_some()
        || el.slot_scope.is_some()
        || el.tag == "slot"
    {
        return false;
    }
    if !el.bound_attrs.is_empty() || !el.events.is_empty() {
        return false;
    }
    // Any directive the core optimizer does not recognize is
    // conservatively dynamic, including custom ones.
    if !el.directives.is_empty() {
        return false;
    }
    if el
        .module_data
        .keys()
        .any(|key| !ctx.module_whitelist.contains(key.as_str()))
    {
        return false;
    }
    if el
        .attrs_map
        .keys()
        .any(|key| ctx.non_static_keys.iter().any(|k| k == key))
    {
        return false;
    }
    true
}

fn mark_static_roots(node: &mut Node, in_for: bool) {
    if let Node::Element(el) = node {
        mark_static_roots_element(el, in_for);
    }
}

fn mark_static_roots_element(el: &mut Element, in_for: bool) {
    let in_for = in_for || el.for_spec.is_some();

    if el.flags.contains(NodeFlags::STATIC) && in_for {
        // Loop bodies keep per-iteration identity; never hoist globally.
        el.flags.insert(NodeFlags::STATIC_IN_FOR);
    }

    // A childless element is cheaper to inline than to hoist; anything
    // static with content is worth a standalone routine.
    if el.flags.contains(NodeFlags::STATIC)
        && !el.flags.contains(NodeFlags::STATIC_IN_FOR)
        && !el.children.is_empty()
    {
        el.flags.insert(NodeFlags::STATIC_ROOT);
        // Everything below is hoisted wholesale; no deeper roots.
        return;
    }

    for child in &mut el.children {
        mark_static_roots(child, in_for);
    }
    for cond in &mut el.if_conditions {
        mark_static_roots_element(&mut cond.block, in_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Text;

    fn ctx_default() -> CompilerOptions {
        CompilerOptions::default()
    }

    fn element_with_child(tag: &str, child: Node) -> Element {
        let mut el = Element::new(tag, None);
        el.children.push(child);
        el
    }

    #[test]
    fn test_plain_tree_is_static_root() {
        let inner = element_with_child("span", Node::Text(Text::new("a", None)));
        let mut root = element_with_child("div", Node::Element(inner));
        optimize(&mut root, &ctx_default());
        assert!(root.flags.contains(NodeFlags::STATIC));
        assert!(root.flags.contains(NodeFlags::STATIC_ROOT));
    }

    #[test]
    fn test_childless_element_is_not_a_root() {
        let mut root = Element::new("hr", None);
        optimize(&mut root, &ctx_default());
        assert!(root.flags.contains(NodeFlags::STATIC));
        assert!(!root.flags.contains(NodeFlags::STATIC_ROOT));
    }

    #[test]
    fn test_static_keys_force_dynamic() {
        let mut root = element_with_child("div", Node::Text(Text::new("x", None)));
        root.attrs_map.insert("data-managed".to_string(), String::new());
        let mut options = ctx_default();
        options.static_keys.push("data-managed".to_string());
        optimize(&mut root, &options);
        assert!(!root.flags.contains(NodeFlags::STATIC));
    }
}
