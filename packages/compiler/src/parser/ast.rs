//! Template AST
//!
//! Node definitions produced by the parser and annotated by the optimizer.
//! The node kind is a closed tagged variant so the optimizer and generator
//! match exhaustively; a missing case is a build error, not a runtime one.

use bitflags::bitflags;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::parse_util::SourceSpan;

bitflags! {
    /// Optimizer-owned node annotations. Empty until `optimize` runs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Produces identical output on every render.
        const STATIC = 1 << 0;
        /// Static only within one loop iteration; never globally hoistable.
        const STATIC_IN_FOR = 1 << 1;
        /// Root of a hoistable static subtree.
        const STATIC_ROOT = 1 << 2;
    }
}

/// Node type union.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(Text),
    Interpolation(Interpolation),
    Comment(Comment),
}

impl Node {
    pub fn flags(&self) -> NodeFlags {
        match self {
            Node::Element(el) => el.flags,
            Node::Text(t) => t.flags,
            Node::Interpolation(i) => i.flags,
            Node::Comment(c) => c.flags,
        }
    }

    pub fn flags_mut(&mut self) -> &mut NodeFlags {
        match self {
            Node::Element(el) => &mut el.flags,
            Node::Text(t) => &mut t.flags,
            Node::Interpolation(i) => &mut i.flags,
            Node::Comment(c) => &mut c.flags,
        }
    }

    pub fn is_static(&self) -> bool {
        self.flags().contains(NodeFlags::STATIC)
    }
}

/// Plain attribute, copied through to the generated data object.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: Option<SourceSpan>,
}

/// Attribute whose value is a bound expression (`:name="expr"`).
#[derive(Debug, Clone)]
pub struct BoundAttribute {
    pub name: String,
    pub expr: String,
    pub span: Option<SourceSpan>,
}

/// Event binding (`@name="handler"`), with its modifier set.
#[derive(Debug, Clone)]
pub struct EventHandler {
    pub name: String,
    pub handler: String,
    pub modifiers: SmallVec<[String; 2]>,
    pub span: Option<SourceSpan>,
}

/// Custom directive binding.
#[derive(Debug, Clone)]
pub struct Directive {
    /// Name without prefix or argument, e.g. `focus` for `v-focus:arg.mod`.
    pub name: String,
    /// The attribute exactly as written.
    pub raw_name: String,
    pub value: Option<String>,
    pub arg: Option<String>,
    pub modifiers: SmallVec<[String; 2]>,
    pub span: Option<SourceSpan>,
}

/// Parsed list-rendering expression, e.g. `(item, i) in items`.
#[derive(Debug, Clone)]
pub struct ForSpec {
    pub iterable: String,
    pub alias: String,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,
}

/// One branch of a conditional chain. `exp` is `None` for the final
/// `v-else` branch.
#[derive(Debug, Clone)]
pub struct IfCondition {
    pub exp: Option<String>,
    pub block: Element,
}

/// Element node.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    /// Raw attribute view in document order, before directive processing.
    pub attrs_map: IndexMap<String, String>,
    pub bound_attrs: Vec<BoundAttribute>,
    pub events: Vec<EventHandler>,
    pub directives: Vec<Directive>,
    pub key: Option<String>,
    pub if_expr: Option<String>,
    pub else_if_expr: Option<String>,
    pub is_else: bool,
    /// `v-else-if`/`v-else` siblings folded into the owning `v-if` element.
    pub if_conditions: Vec<IfCondition>,
    pub for_spec: Option<ForSpec>,
    /// Name expression of a `<slot>` outlet element.
    pub slot_name: Option<String>,
    /// `slot="..."` target on slotted content.
    pub slot_target: Option<String>,
    /// `slot-scope="..."` binding on slotted content.
    pub slot_scope: Option<String>,
    /// Data-object fragments owned by module transforms, keyed by the data
    /// key they emit (e.g. `staticClass`). Values are render expressions.
    pub module_data: IndexMap<String, String>,
    pub children: Vec<Node>,
    pub flags: NodeFlags,
    pub span: Option<SourceSpan>,
}

impl Element {
    pub fn new(tag: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Element {
            tag: tag.into(),
            attrs: Vec::new(),
            attrs_map: IndexMap::new(),
            bound_attrs: Vec::new(),
            events: Vec::new(),
            directives: Vec::new(),
            key: None,
            if_expr: None,
            else_if_expr: None,
            is_else: false,
            if_conditions: Vec::new(),
            for_spec: None,
            slot_name: None,
            slot_target: None,
            slot_scope: None,
            module_data: IndexMap::new(),
            children: Vec::new(),
            flags: NodeFlags::empty(),
            span,
        }
    }

    /// True for `v-else-if`/`v-else` elements, which attach to the
    /// preceding `v-if` sibling instead of the child list.
    pub fn is_else_block(&self) -> bool {
        self.is_else || self.else_if_expr.is_some()
    }
}

/// Literal text node.
#[derive(Debug, Clone)]
pub struct Text {
    pub value: String,
    pub flags: NodeFlags,
    pub span: Option<SourceSpan>,
}

impl Text {
    pub fn new(value: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Text {
            value: value.into(),
            flags: NodeFlags::empty(),
            span,
        }
    }
}

/// One fragment of an interpolated text run.
#[derive(Debug, Clone, PartialEq)]
pub enum TextToken {
    Static(String),
    Expr(String),
}

/// Text with one or more embedded expressions.
#[derive(Debug, Clone)]
pub struct Interpolation {
    /// The composed render expression, e.g. `"a "+_s(msg)+"!"`.
    pub expression: String,
    pub tokens: Vec<TextToken>,
    /// Raw (unescaped) interpolation is a distinct node kind: its output
    /// is injected as markup rather than text.
    pub raw: bool,
    pub flags: NodeFlags,
    pub span: Option<SourceSpan>,
}

/// Comment node, preserved only when configured.
#[derive(Debug, Clone)]
pub struct Comment {
    pub value: String,
    pub flags: NodeFlags,
    pub span: Option<SourceSpan>,
}

impl Comment {
    pub fn new(value: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Comment {
            value: value.into(),
            flags: NodeFlags::empty(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_empty() {
        let el = Element::new("div", None);
        assert_eq!(el.flags, NodeFlags::empty());
        assert!(!Node::Element(el).is_static());
    }

    #[test]
    fn test_flags_mut_through_node() {
        let mut node = Node::Text(Text::new("a", None));
        node.flags_mut().insert(NodeFlags::STATIC);
        assert!(node.is_static());
    }

    #[test]
    fn test_is_else_block() {
        let mut el = Element::new("p", None);
        assert!(!el.is_else_block());
        el.else_if_expr = Some("cond".to_string());
        assert!(el.is_else_block());
    }
}
