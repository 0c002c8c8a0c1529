//! Template Parser
//!
//! Builds the template AST from the token stream with a stack-based
//! matching discipline. Parsing is never fatal: malformed input degrades
//! to diagnostics plus a best-effort partial tree, or `root: None` for
//! unrecoverable structural errors. The caller decides whether the
//! diagnostics are warnings or hard failures.

pub mod ast;
pub mod lexer;
pub mod tags;
pub mod text_parser;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::options::{CompilerOptions, WhitespaceMode};
use crate::parse_util::{CompileDiagnostic, SourceSpan};
use ast::*;
use lexer::{tokenize, RawAttribute, StartTagToken, Token, TokenizeOptions};
use tags::{can_be_left_open, is_void_element};

static FOR_ALIAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\s*(.*?)\s+(?:in|of)\s+(.*)$").unwrap());
static FOR_ITERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([^,\}\]]*)(?:,\s*([^,\}\]]*))?$").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Result of parsing one template.
#[derive(Debug)]
pub struct ParseResult {
    /// The root element, or `None` for unrecoverable structural errors
    /// (no root, ambiguous multiplicity, list rendering on the root).
    pub root: Option<Element>,
    pub errors: Vec<CompileDiagnostic>,
    pub tips: Vec<CompileDiagnostic>,
}

/// Parse a template into an AST.
pub fn parse(template: &str, options: &CompilerOptions) -> ParseResult {
    let tokenize_options = TokenizeOptions {
        should_decode_newlines: options.should_decode_newlines,
        should_decode_newlines_for_href: options.should_decode_newlines_for_href,
        output_source_range: options.output_source_range,
    };
    let lexed = tokenize(template, &tokenize_options);

    let mut builder = TreeBuilder {
        options,
        stack: Vec::new(),
        root: None,
        root_invalid: false,
        errors: lexed.errors,
        tips: Vec::new(),
    };
    builder.build(lexed.tokens);
    builder.finish()
}

struct TreeBuilder<'a> {
    options: &'a CompilerOptions,
    stack: Vec<Element>,
    root: Option<Element>,
    root_invalid: bool,
    errors: Vec<CompileDiagnostic>,
    tips: Vec<CompileDiagnostic>,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, tokens: Vec<Token>) {
        for token in tokens {
            match token {
                Token::StartTag(tag) => self.consume_start_tag(tag),
                Token::EndTag(tag) => self.consume_end_tag(&tag.name, tag.span),
                Token::Text(chunk) => self.consume_text(chunk.value, chunk.span, chunk.verbatim),
                Token::Comment(chunk) => {
                    if self.options.comments && !self.stack.is_empty() {
                        let parent = self.stack.last_mut().unwrap();
                        parent
                            .children
                            .push(Node::Comment(Comment::new(chunk.value, chunk.span)));
                    }
                }
            }
        }

        // Auto-close whatever is still open at end of input.
        while let Some(el) = self.stack.pop() {
            if !can_be_left_open(&el.tag) {
                self.errors.push(CompileDiagnostic::error(
                    format!("element <{}> has no matching end tag", el.tag),
                    el.span,
                ));
            }
            self.close_element(el);
        }
    }

    fn finish(mut self) -> ParseResult {
        if self.root.is_none() && !self.root_invalid {
            self.errors.push(CompileDiagnostic::error(
                "template must contain exactly one root element",
                None,
            ));
        }
        ParseResult {
            root: if self.root_invalid { None } else { self.root },
            errors: self.errors,
            tips: self.tips,
        }
    }

    fn consume_start_tag(&mut self, token: StartTagToken) {
        // A same-tag sibling implicitly closes a tag that may be left
        // open: <li>a<li>b is two list items, not a nested pair.
        let closes_previous = can_be_left_open(&token.name)
            && self
                .stack
                .last()
                .map_or(false, |open| open.tag.eq_ignore_ascii_case(&token.name));
        if closes_previous {
            if let Some(open) = self.stack.pop() {
                self.close_element(open);
            }
        }

        let closes_now = token.self_closing || is_void_element(&token.name);
        let el = self.create_element(token);
        if closes_now {
            self.close_element(el);
        } else {
            self.stack.push(el);
        }
    }

    fn consume_end_tag(&mut self, name: &str, span: Option<SourceSpan>) {
        let lowered = name.to_ascii_lowercase();
        let matched = self
            .stack
            .iter()
            .rposition(|el| el.tag.to_ascii_lowercase() == lowered);
        match matched {
            Some(idx) => {
                // Elements left open above the match are auto-closed.
                while self.stack.len() > idx + 1 {
                    let el = self.stack.pop().unwrap();
                    if !can_be_left_open(&el.tag) {
                        self.errors.push(CompileDiagnostic::error(
                            format!("element <{}> has no matching end tag", el.tag),
                            el.span,
                        ));
                    }
                    self.close_element(el);
                }
                let el = self.stack.pop().unwrap();
                self.close_element(el);
            }
            None => {
                self.errors.push(CompileDiagnostic::error(
                    format!("end tag </{}> has no matching start tag and is ignored", name),
                    span,
                ));
            }
        }
    }

    fn consume_text(&mut self, value: String, span: Option<SourceSpan>, verbatim: bool) {
        if self.stack.is_empty() {
            if !value.trim().is_empty() {
                self.tips.push(CompileDiagnostic::tip(
                    "text outside the root element will be ignored",
                    span,
                ));
            }
            return;
        }

        let text = if verbatim {
            value
        } else {
            match self.options.whitespace {
                WhitespaceMode::Preserve => value,
                WhitespaceMode::Condense => {
                    if value.trim().is_empty() {
                        // Whitespace containing a newline is formatting-only.
                        if value.contains('\n') {
                            return;
                        }
                        " ".to_string()
                    } else {
                        WHITESPACE_RUN.replace_all(&value, " ").into_owned()
                    }
                }
            }
        };
        if text.is_empty() {
            return;
        }

        let parent = self.stack.last_mut().unwrap();
        if !verbatim {
            if let Some(parsed) =
                text_parser::parse_text(&text, self.options.delimiters.as_ref())
            {
                parent.children.push(Node::Interpolation(Interpolation {
                    expression: parsed.expression,
                    tokens: parsed.tokens,
                    raw: parsed.raw,
                    flags: NodeFlags::empty(),
                    span,
                }));
                return;
            }
        }
        parent.children.push(Node::Text(Text::new(text, span)));
    }

    /// Attach a finished element to its parent, the conditional chain of
    /// its preceding sibling, or the root slot.
    fn close_element(&mut self, el: Element) {
        if el.is_else_block() {
            self.attach_else_block(el);
            return;
        }

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(el)),
            None => self.attach_root(el),
        }
    }

    fn attach_root(&mut self, el: Element) {
        if el.for_spec.is_some() {
            self.errors.push(CompileDiagnostic::error(
                "cannot use a list-rendering directive on the root element: it would render multiple roots",
                el.span,
            ));
            self.root = None;
            self.root_invalid = true;
            return;
        }
        if self.root_invalid {
            return;
        }
        if self.root.is_some() {
            self.errors.push(CompileDiagnostic::error(
                "template must contain exactly one root element; wrap siblings in a container or chain them with v-if/v-else",
                el.span,
            ));
            self.root = None;
            self.root_invalid = true;
            return;
        }
        self.root = Some(el);
    }

    fn attach_else_block(&mut self, el: Element) {
        let exp = el.else_if_expr.clone();
        let span = el.span;
        let prev = match self.stack.last_mut() {
            Some(parent) => last_element_child(&mut parent.children),
            None => self.root.as_mut(),
        };
        match prev {
            Some(prev) if prev.if_expr.is_some() => {
                prev.if_conditions.push(IfCondition { exp, block: el });
            }
            _ => {
                self.errors.push(CompileDiagnostic::error(
                    "v-else(-if) used on an element without a corresponding v-if",
                    span,
                ));
            }
        }
    }

    fn create_element(&mut self, token: StartTagToken) -> Element {
        let mut el = Element::new(token.name, token.span);
        for attr in &token.attrs {
            el.attrs_map.insert(
                attr.name.clone(),
                attr.value.clone().unwrap_or_default(),
            );
        }

        let prefix = self.options.directive_prefix.clone();
        let mut consumed: Vec<usize> = Vec::new();
        for (idx, attr) in token.attrs.iter().enumerate() {
            if self.process_structural_attr(&mut el, attr, &prefix) {
                consumed.push(idx);
            }
        }
        for (idx, attr) in token.attrs.into_iter().enumerate() {
            if consumed.contains(&idx) {
                continue;
            }
            self.process_attr(&mut el, attr, &prefix);
        }

        let mut diagnostics = Vec::new();
        for module in &self.options.modules {
            module.transform_element(&mut el, &mut diagnostics);
        }
        self.errors.extend(diagnostics);

        if el.tag == "slot" {
            // The outlet name may be plain or bound; default is supplied
            // by the generator.
            el.slot_name = el
                .bound_attrs
                .iter()
                .position(|a| a.name == "name")
                .map(|idx| el.bound_attrs.remove(idx).expr)
                .or_else(|| {
                    el.attrs
                        .iter()
                        .position(|a| a.name == "name")
                        .map(|idx| crate::parse_util::quote_str(&el.attrs.remove(idx).value))
                });
        }
        el
    }

    /// Structural directives are hoisted to dedicated AST fields because
    /// the optimizer and generator branch on them explicitly.
    fn process_structural_attr(
        &mut self,
        el: &mut Element,
        attr: &RawAttribute,
        prefix: &str,
    ) -> bool {
        let name = attr.name.as_str();
        let value = attr.value.clone().unwrap_or_default();
        let Some(dir_name) = name.strip_prefix(prefix) else {
            return match name {
                "slot" => {
                    el.slot_target = Some(value);
                    true
                }
                "slot-scope" => {
                    el.slot_scope = Some(value);
                    true
                }
                _ => false,
            };
        };
        match dir_name {
            "for" => {
                match parse_for(&value) {
                    Some(spec) => el.for_spec = Some(spec),
                    None => self.errors.push(CompileDiagnostic::error(
                        format!("invalid {}for expression: \"{}\"", prefix, value),
                        attr.span,
                    )),
                }
                true
            }
            "if" => {
                el.if_expr = Some(value);
                true
            }
            "else-if" => {
                el.else_if_expr = Some(value);
                true
            }
            "else" => {
                el.is_else = true;
                true
            }
            _ => false,
        }
    }

    fn process_attr(&mut self, el: &mut Element, attr: RawAttribute, prefix: &str) {
        let name = attr.name.clone();
        let span = attr.span;
        let value = attr.value.unwrap_or_default();

        if let Some(rest) = name.strip_prefix(prefix) {
            if let Some(rest) = rest.strip_prefix("bind:").or_else(|| {
                rest.strip_prefix("bind")
                    .filter(|r| r.is_empty() || r.starts_with('.'))
            }) {
                // `v-bind` without an argument binds a whole object; the
                // generator has no shape to emit for it.
                if rest.is_empty() || rest.starts_with('.') {
                    self.errors.push(CompileDiagnostic::error(
                        format!("{}bind requires an attribute argument", prefix),
                        span,
                    ));
                    return;
                }
                self.push_binding(el, rest, value, span);
                return;
            }
            if let Some(rest) = rest.strip_prefix("on:") {
                self.push_event(el, rest, value, span);
                return;
            }
            let (dir_name, arg, modifiers) = split_directive_name(rest);
            el.directives.push(Directive {
                name: dir_name,
                raw_name: name,
                value: if value.is_empty() { None } else { Some(value) },
                arg,
                modifiers,
                span,
            });
            return;
        }
        if let Some(rest) = name.strip_prefix(':') {
            self.push_binding(el, rest, value, span);
            return;
        }
        if let Some(rest) = name.strip_prefix('@') {
            self.push_event(el, rest, value, span);
            return;
        }
        el.attrs.push(Attribute { name, value, span });
    }

    fn push_binding(&mut self, el: &mut Element, raw: &str, expr: String, span: Option<SourceSpan>) {
        if expr.trim().is_empty() {
            self.errors.push(CompileDiagnostic::error(
                format!("binding :{} is missing an expression", raw),
                span,
            ));
            return;
        }
        let (name, _arg, modifiers) = split_directive_name(raw);
        let name = if modifiers.iter().any(|m| m == "camel") {
            camelize(&name)
        } else {
            name
        };
        if name == "key" {
            el.key = Some(expr);
        } else {
            el.bound_attrs.push(BoundAttribute { name, expr, span });
        }
    }

    fn push_event(&mut self, el: &mut Element, raw: &str, handler: String, span: Option<SourceSpan>) {
        if handler.trim().is_empty() {
            self.errors.push(CompileDiagnostic::error(
                format!("event binding @{} is missing a handler", raw),
                span,
            ));
            return;
        }
        let (name, _arg, modifiers) = split_directive_name(raw);
        el.events.push(EventHandler {
            name,
            handler,
            modifiers,
            span,
        });
    }
}

fn last_element_child(children: &mut [Node]) -> Option<&mut Element> {
    children.iter_mut().rev().find_map(|node| match node {
        Node::Element(el) => Some(el),
        _ => None,
    })
}

/// Split `name:arg.mod1.mod2` into its parts.
fn split_directive_name(raw: &str) -> (String, Option<String>, SmallVec<[String; 2]>) {
    let (head, arg) = match raw.split_once(':') {
        Some((head, arg)) => (head, Some(arg.to_string())),
        None => (raw, None),
    };
    let mut pieces = head.split('.');
    let name = pieces.next().unwrap_or_default().to_string();
    let modifiers: SmallVec<[String; 2]> = pieces.map(str::to_string).collect();
    // Modifiers may trail the argument as well (`v-on:click.stop`).
    match arg {
        Some(arg) if arg.contains('.') => {
            let mut arg_pieces = arg.split('.');
            let arg_name = arg_pieces.next().unwrap_or_default().to_string();
            let mut all = modifiers;
            all.extend(arg_pieces.map(str::to_string));
            (name, Some(arg_name), all)
        }
        other => (name, other, modifiers),
    }
}

fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse a list-rendering expression: `alias in items`,
/// `(alias, i) in items`, `(value, key, index) in object`.
fn parse_for(expr: &str) -> Option<ForSpec> {
    let caps = FOR_ALIAS.captures(expr)?;
    let iterable = caps[2].trim().to_string();
    let mut alias = caps[1].trim().to_string();
    if alias.starts_with('(') && alias.ends_with(')') {
        alias = alias[1..alias.len() - 1].trim().to_string();
    }
    let (alias, iterator1, iterator2) = match FOR_ITERATOR.captures(&alias) {
        Some(iters) => {
            let base = alias[..iters.get(0).unwrap().start()].trim().to_string();
            let it1 = iters.get(1).map(|m| m.as_str().trim().to_string());
            let it2 = iters.get(2).map(|m| m.as_str().trim().to_string());
            (base, it1.filter(|s| !s.is_empty()), it2.filter(|s| !s.is_empty()))
        }
        None => (alias, None, None),
    };
    if alias.is_empty() || iterable.is_empty() {
        return None;
    }
    Some(ForSpec {
        iterable,
        alias,
        iterator1,
        iterator2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_for_simple() {
        let spec = parse_for("item in items").unwrap();
        assert_eq!(spec.alias, "item");
        assert_eq!(spec.iterable, "items");
        assert_eq!(spec.iterator1, None);
    }

    #[test]
    fn test_parse_for_with_iterators() {
        let spec = parse_for("(value, key, index) in object").unwrap();
        assert_eq!(spec.alias, "value");
        assert_eq!(spec.iterator1.as_deref(), Some("key"));
        assert_eq!(spec.iterator2.as_deref(), Some("index"));
    }

    #[test]
    fn test_parse_for_of_form() {
        let spec = parse_for("(item, i) of list").unwrap();
        assert_eq!(spec.alias, "item");
        assert_eq!(spec.iterator1.as_deref(), Some("i"));
        assert_eq!(spec.iterable, "list");
    }

    #[test]
    fn test_parse_for_invalid() {
        assert!(parse_for("items").is_none());
        assert!(parse_for(" in items").is_none());
    }

    #[test]
    fn test_split_directive_name() {
        let (name, arg, mods) = split_directive_name("on:click.stop.prevent");
        assert_eq!(name, "on");
        assert_eq!(arg.as_deref(), Some("click"));
        assert_eq!(mods.as_slice(), ["stop", "prevent"]);
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("view-box"), "viewBox");
        assert_eq!(camelize("plain"), "plain");
    }
}
