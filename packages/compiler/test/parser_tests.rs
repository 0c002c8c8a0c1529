//! Template Parser Tests
//!
//! End-to-end parsing through the public API: tree shape, attribute
//! resolution, structural directives, root rules and diagnostics.

use trellis_compiler::base_options;
use trellis_compiler::options::{CompilerOptions, WhitespaceMode};
use trellis_compiler::parser::ast::{Element, Node, TextToken};
use trellis_compiler::parser::{parse, ParseResult};

fn parse_default(template: &str) -> ParseResult {
    parse(template, &base_options())
}

fn root_of(result: ParseResult) -> Element {
    result.root.expect("template should have a root")
}

fn child_element(el: &Element, index: usize) -> &Element {
    match &el.children[index] {
        Node::Element(child) => child,
        other => panic!("expected element child, got {:?}", other),
    }
}

#[test]
fn should_parse_a_plain_element_tree() {
    let result = parse_default("<div id=\"app\"><p>hi</p></div>");
    assert!(result.errors.is_empty());
    let root = root_of(result);
    assert_eq!(root.tag, "div");
    assert_eq!(root.attrs.len(), 1);
    assert_eq!(root.attrs[0].name, "id");
    assert_eq!(root.attrs[0].value, "app");

    let p = child_element(&root, 0);
    assert_eq!(p.tag, "p");
    match &p.children[0] {
        Node::Text(text) => assert_eq!(text.value, "hi"),
        other => panic!("expected text child, got {:?}", other),
    }
}

#[test]
fn should_parse_interpolation_into_tokens() {
    let root = root_of(parse_default("<p>count: {{ n }}</p>"));
    match &root.children[0] {
        Node::Interpolation(interp) => {
            assert_eq!(interp.expression, "\"count: \"+_s(n)");
            assert_eq!(
                interp.tokens,
                vec![
                    TextToken::Static("count: ".to_string()),
                    TextToken::Expr("n".to_string()),
                ]
            );
            assert!(!interp.raw);
        }
        other => panic!("expected interpolation, got {:?}", other),
    }
}

#[test]
fn should_mark_raw_interpolation_as_distinct() {
    let root = root_of(parse_default("<p>{{{html}}}</p>"));
    match &root.children[0] {
        Node::Interpolation(interp) => assert!(interp.raw),
        other => panic!("expected interpolation, got {:?}", other),
    }
}

#[test]
fn should_hoist_structural_directives_to_dedicated_fields() {
    let root = root_of(parse_default(
        "<ul><li v-for=\"(item, i) in items\" v-if=\"ok\">x</li></ul>",
    ));
    let li = child_element(&root, 0);
    let spec = li.for_spec.as_ref().expect("v-for should be parsed");
    assert_eq!(spec.alias, "item");
    assert_eq!(spec.iterator1.as_deref(), Some("i"));
    assert_eq!(spec.iterable, "items");
    assert_eq!(li.if_expr.as_deref(), Some("ok"));
    // Structural attributes never leak into the plain attribute list,
    // but the raw document-order view still records them.
    assert!(li.attrs.is_empty());
    assert!(li.attrs_map.contains_key("v-for"));
}

#[test]
fn should_fold_else_chain_into_the_if_owner() {
    let root = root_of(parse_default(
        "<div><p v-if=\"a\">A</p><p v-else-if=\"b\">B</p><p v-else>C</p></div>",
    ));
    assert_eq!(root.children.len(), 1);
    let owner = child_element(&root, 0);
    assert_eq!(owner.if_expr.as_deref(), Some("a"));
    assert_eq!(owner.if_conditions.len(), 2);
    assert_eq!(owner.if_conditions[0].exp.as_deref(), Some("b"));
    assert_eq!(owner.if_conditions[1].exp, None);
}

#[test]
fn should_report_else_without_a_matching_if() {
    let result = parse_default("<div><p v-else>x</p></div>");
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("without a corresponding v-if")));
}

#[test]
fn should_resolve_bindings_events_and_key() {
    let root = root_of(parse_default(
        "<li :key=\"id\" :href=\"url\" @click.stop=\"go\"></li>",
    ));
    assert_eq!(root.key.as_deref(), Some("id"));
    assert_eq!(root.bound_attrs.len(), 1);
    assert_eq!(root.bound_attrs[0].name, "href");
    assert_eq!(root.bound_attrs[0].expr, "url");
    assert_eq!(root.events.len(), 1);
    assert_eq!(root.events[0].name, "click");
    assert_eq!(root.events[0].handler, "go");
    assert_eq!(root.events[0].modifiers.as_slice(), ["stop"]);
}

#[test]
fn should_report_binding_without_expression() {
    let result = parse_default("<div :href=\"\"></div>");
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("missing an expression")));
}

#[test]
fn should_collect_custom_directives() {
    let root = root_of(parse_default("<input v-focus.lazy=\"cond\">"));
    assert_eq!(root.directives.len(), 1);
    let dir = &root.directives[0];
    assert_eq!(dir.name, "focus");
    assert_eq!(dir.raw_name, "v-focus.lazy");
    assert_eq!(dir.value.as_deref(), Some("cond"));
    assert_eq!(dir.modifiers.as_slice(), ["lazy"]);
}

#[test]
fn should_let_modules_claim_class_and_style() {
    let root = root_of(parse_default(
        "<div class=\"box\" :class=\"extra\" style=\"color: red\"></div>",
    ));
    assert!(root.attrs.is_empty());
    assert!(root.bound_attrs.is_empty());
    assert_eq!(
        root.module_data.get("staticClass").map(String::as_str),
        Some("\"box\"")
    );
    assert_eq!(
        root.module_data.get("class").map(String::as_str),
        Some("(extra)")
    );
    assert_eq!(
        root.module_data.get("staticStyle").map(String::as_str),
        Some("\"color: red\"")
    );
}

#[test]
fn should_reject_two_sibling_roots() {
    let result = parse_default("<div></div><p></p>");
    assert!(result.root.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("exactly one root element")));
}

#[test]
fn should_allow_an_else_chain_at_the_root() {
    let result = parse_default("<div v-if=\"a\">A</div><div v-else>B</div>");
    assert!(result.errors.is_empty());
    let root = root_of(result);
    assert_eq!(root.if_expr.as_deref(), Some("a"));
    assert_eq!(root.if_conditions.len(), 1);
}

#[test]
fn should_reject_list_rendering_on_the_root() {
    let result = parse_default("<div v-for=\"item in items\"></div>");
    assert!(result.root.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("list-rendering directive on the root")));
}

#[test]
fn should_ignore_unmatched_end_tag_without_breaking_siblings() {
    let result = parse_default("<div><span>a</span></span><b>c</b></div>");
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("</span> has no matching start tag")));
    let root = root_of(result);
    assert_eq!(root.children.len(), 2);
    assert_eq!(child_element(&root, 0).tag, "span");
    assert_eq!(child_element(&root, 1).tag, "b");
}

#[test]
fn should_report_elements_left_open_at_end_of_input() {
    let result = parse_default("<div><span>");
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("<span> has no matching end tag")));
    // The partial tree is still produced.
    let root = root_of(result);
    assert_eq!(child_element(&root, 0).tag, "span");
}

#[test]
fn should_close_left_open_tags_on_a_same_tag_sibling() {
    let result = parse_default("<ul><li>a<li>b</ul>");
    assert!(result.errors.is_empty());
    let root = root_of(result);
    assert_eq!(root.children.len(), 2);
    let first = child_element(&root, 0);
    let second = child_element(&root, 1);
    assert_eq!(first.tag, "li");
    assert_eq!(second.tag, "li");
    // The second item is a sibling of the first, never its child.
    assert_eq!(first.children.len(), 1);
    match &first.children[0] {
        Node::Text(text) => assert_eq!(text.value, "a"),
        other => panic!("expected text child, got {:?}", other),
    }
}

#[test]
fn should_close_void_elements_immediately() {
    let result = parse_default("<div><img src=\"a.png\"><br></div>");
    assert!(result.errors.is_empty());
    let root = root_of(result);
    assert_eq!(root.children.len(), 2);
    assert_eq!(child_element(&root, 0).tag, "img");
    assert_eq!(child_element(&root, 1).tag, "br");
}

#[test]
fn should_condense_whitespace_when_configured() {
    let template = "<div>\n  <span>a</span>\n  <span>b</span>\n</div>";

    let preserved = root_of(parse_default(template));
    assert_eq!(preserved.children.len(), 5);

    let options = CompilerOptions {
        whitespace: WhitespaceMode::Condense,
        ..base_options()
    };
    let condensed = root_of(parse(template, &options));
    assert_eq!(condensed.children.len(), 2);
}

#[test]
fn should_respect_custom_delimiters() {
    let options = CompilerOptions {
        delimiters: Some(("[[".to_string(), "]]".to_string())),
        ..base_options()
    };
    let root = root_of(parse("<p>[[msg]] and {{not}}</p>", &options));
    match &root.children[0] {
        Node::Interpolation(interp) => {
            assert_eq!(
                interp.tokens,
                vec![
                    TextToken::Expr("msg".to_string()),
                    TextToken::Static(" and {{not}}".to_string()),
                ]
            );
        }
        other => panic!("expected interpolation, got {:?}", other),
    }
}

#[test]
fn should_keep_comments_only_when_enabled() {
    let dropped = root_of(parse_default("<div><!-- note --></div>"));
    assert!(dropped.children.is_empty());

    let options = CompilerOptions {
        comments: true,
        ..base_options()
    };
    let kept = root_of(parse("<div><!-- note --></div>", &options));
    assert_eq!(kept.children.len(), 1);
    match &kept.children[0] {
        Node::Comment(comment) => assert_eq!(comment.value, " note "),
        other => panic!("expected comment, got {:?}", other),
    }
}

#[test]
fn should_extract_slot_outlet_names() {
    let root = root_of(parse_default("<div><slot name=\"header\"></slot></div>"));
    let named = child_element(&root, 0);
    assert_eq!(named.slot_name.as_deref(), Some("\"header\""));

    let root = root_of(parse_default("<div><slot :name=\"dynamic\"></slot></div>"));
    let bound = child_element(&root, 0);
    assert_eq!(bound.slot_name.as_deref(), Some("dynamic"));
}

#[test]
fn should_record_slot_target_and_scope_on_content() {
    let root = root_of(parse_default(
        "<div><p slot=\"header\" slot-scope=\"props\">x</p></div>",
    ));
    let content = child_element(&root, 0);
    assert_eq!(content.slot_target.as_deref(), Some("header"));
    assert_eq!(content.slot_scope.as_deref(), Some("props"));
}
