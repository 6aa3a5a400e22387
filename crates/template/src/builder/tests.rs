use super::*;
use crate::ast::{Param, PathExpr};
use crate::macros::MacroAction;
use markup::{Attribute, ValuePart};

fn tree(source: &str) -> Vec<Node> {
    preprocess(source, &MacroRegistry::new()).expect("template builds")
}

fn id(name: &str) -> Mustache {
    Mustache::new(PathExpr::simple(name))
}

fn text(value: &str) -> Node {
    Node::text(value)
}

fn attr(name: &str, parts: Vec<ValuePart<Mustache>>) -> Attribute<Mustache> {
    Attribute {
        name: name.to_string(),
        value: parts,
    }
}

fn lit(value: &str) -> ValuePart<Mustache> {
    ValuePart::Text(value.to_string())
}

#[test]
fn plain_text() {
    assert_eq!(tree("some content"), vec![text("some content")]);
}

#[test]
fn element_between_text() {
    assert_eq!(
        tree("some <div>content</div> done"),
        vec![
            text("some "),
            Node::Element(Element::new("div").with_children(vec![text("content")])),
            text(" done"),
        ]
    );
}

#[test]
fn nested_elements_with_static_attributes() {
    let nodes = tree("<div class=\"foo\"><p><span id=\"bar\" data-foo=\"bar\">hi!</span></p></div>");
    let span = Element::new("span")
        .with_attribute("id", "bar")
        .with_attribute("data-foo", "bar")
        .with_children(vec![text("hi!")]);
    let p = Element::new("p").with_children(vec![Node::Element(span)]);
    let div = Element::new("div")
        .with_attribute("class", "foo")
        .with_children(vec![Node::Element(p)]);
    assert_eq!(nodes, vec![Node::Element(div)]);
}

#[test]
fn mustache_in_content() {
    assert_eq!(
        tree("<div>{{title}}</div> after"),
        vec![
            Node::Element(Element::new("div").with_children(vec![Node::Mustache(id("title"))])),
            text(" after"),
        ]
    );
}

#[test]
fn mustache_between_text_flushes_pending_text() {
    assert_eq!(
        tree("a {{b}} c"),
        vec![text("a "), Node::Mustache(id("b")), text(" c")]
    );
}

#[test]
fn mustaches_inside_quoted_attribute() {
    let nodes = tree("<a href=\"http://{{link}}/\">x</a>");
    let Node::Element(a) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(
        a.attributes,
        vec![attr(
            "href",
            vec![lit("http://"), ValuePart::Embedded(id("link")), lit("/")]
        )]
    );
}

#[test]
fn mixed_class_attribute() {
    let nodes = tree("<div class=\"{{foo}} bar {{baz}}\" id=\"x\"></div>");
    let Node::Element(div) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(
        div.attributes,
        vec![
            attr(
                "class",
                vec![
                    ValuePart::Embedded(id("foo")),
                    lit(" bar "),
                    ValuePart::Embedded(id("baz")),
                ]
            ),
            attr("id", vec![lit("x")]),
        ]
    );
}

#[test]
fn mustache_right_after_equals_is_an_unquoted_value() {
    let nodes = tree("<div class={{foo}}>x</div>");
    let Node::Element(div) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(div.attributes, vec![attr("class", vec![ValuePart::Embedded(id("foo"))])]);
    assert_eq!(div.children, vec![text("x")]);
}

#[test]
fn element_level_helpers_attach_to_next_start_tag() {
    let nodes = tree("<div {{bind-attr class=\"active\"}} id=\"a\" {{action \"go\"}}>x</div>");
    let Node::Element(div) = &nodes[0] else {
        panic!("expected element");
    };
    assert_eq!(div.helpers.len(), 2);
    assert_eq!(div.helpers[0].path.original, "bind-attr");
    assert_eq!(
        div.helpers[0].hash,
        vec![("class".to_string(), Param::String("active".to_string()))]
    );
    assert_eq!(div.helpers[1].params, vec![Param::String("go".to_string())]);
    assert_eq!(div.static_attribute("id").as_deref(), Some("a"));
}

#[test]
fn blocks_build_nested_children() {
    let nodes = tree("a{{#if x}}<b>yes</b> {{y}}{{else}}no{{/if}}z");
    assert_eq!(nodes.len(), 3);
    let Node::Block(block) = &nodes[1] else {
        panic!("expected block");
    };
    assert_eq!(block.mustache.path.original, "if");
    assert_eq!(
        block.children,
        vec![
            Node::Element(Element::new("b").with_children(vec![text("yes")])),
            text(" "),
            Node::Mustache(id("y")),
        ]
    );
    assert_eq!(block.inverse, Some(vec![text("no")]));
}

#[test]
fn void_and_self_closing_elements_close_immediately() {
    assert_eq!(
        tree("<p>a<br>b<x-icon/>c</p>"),
        vec![Node::Element(Element::new("p").with_children(vec![
            text("a"),
            Node::Element(Element::new("br")),
            text("b"),
            Node::Element(Element::new("x-icon")),
            text("c"),
        ]))]
    );
}

#[test]
fn comments_become_raw_text_and_declarations_are_dropped() {
    assert_eq!(
        tree("<!doctype html><!-- note --><p>x</p>"),
        vec![
            text("<!-- note -->"),
            Node::Element(Element::new("p").with_children(vec![text("x")])),
        ]
    );
}

#[test]
fn mismatched_close_tag_is_an_error() {
    let err = preprocess("<div><span></div>", &MacroRegistry::new()).expect_err("mismatch");
    let CompileError::StructuralMismatch {
        expected, found, ..
    } = err
    else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(expected.as_deref(), Some("<span>"));
    assert_eq!(found, "</div>");

    let err = preprocess("</p>", &MacroRegistry::new()).expect_err("stray close");
    assert!(matches!(err, CompileError::StructuralMismatch { expected: None, .. }));
}

#[test]
fn close_tag_cannot_cross_a_block() {
    let err = preprocess("<div>{{#if a}}</div>{{/if}}", &MacroRegistry::new()).expect_err("cross");
    assert!(matches!(
        err,
        CompileError::StructuralMismatch { expected: Some(ref open), .. } if open == "{{#if}}"
    ));
}

#[test]
fn unclosed_elements_are_errors() {
    let err = preprocess("<div><p>x</p>", &MacroRegistry::new()).expect_err("unclosed");
    assert_eq!(err, CompileError::UnclosedElement { tag: "div".to_string() });

    let err = preprocess("{{#if a}}<div>{{/if}}", &MacroRegistry::new()).expect_err("unclosed");
    assert_eq!(err, CompileError::UnclosedElement { tag: "div".to_string() });
}

#[test]
fn unterminated_tag_is_a_markup_error() {
    let err = preprocess("<div class=\"a", &MacroRegistry::new()).expect_err("eof in tag");
    assert!(matches!(err, CompileError::Markup(_)));
}

#[test]
fn block_inside_a_tag_is_misplaced() {
    let err = preprocess("<div {{#if a}}x{{/if}}></div>", &MacroRegistry::new()).expect_err("misplaced");
    assert!(matches!(err, CompileError::MisplacedBlock { ref helper, .. } if helper == "if"));
}

#[test]
fn macros_run_when_elements_close() {
    let mut macros = MacroRegistry::new();
    macros.register(
        "noop",
        |el| el.tag == "noop",
        |_| MacroAction::Remove,
    );
    macros.register(
        "upper",
        |el| el.tag == "x-strong",
        |el| MacroAction::Replace(el.transclude("strong")),
    );
    let nodes = preprocess("a<noop><b>x</b></noop><x-strong id=\"s\">y</x-strong>", &macros)
        .expect("builds");
    assert_eq!(
        nodes,
        vec![
            text("a"),
            Node::Element(
                Element::new("strong")
                    .with_attribute("id", "s")
                    .with_children(vec![text("y")])
            ),
        ]
    );
}

#[test]
fn chunked_content_matches_single_chunk() {
    let split = Program::new(vec![
        Statement::Content("<di".to_string()),
        Statement::Content("v id=\"a".to_string()),
        Statement::Content("b\">x</d".to_string()),
        Statement::Content("iv>".to_string()),
    ]);
    let whole = Program::new(vec![Statement::Content("<div id=\"ab\">x</div>".to_string())]);
    let macros = MacroRegistry::new();
    assert_eq!(
        build(&split, &macros).expect("split"),
        build(&whole, &macros).expect("whole")
    );
}

#[test]
fn script_content_is_text_and_mustaches_stay_content() {
    assert_eq!(
        tree("<script>if (a<b) { go({{x}}); }</script>"),
        vec![Node::Element(Element::new("script").with_children(vec![
            text("if (a<b) { go("),
            Node::Mustache(id("x")),
            text("); }"),
        ]))]
    );
}
