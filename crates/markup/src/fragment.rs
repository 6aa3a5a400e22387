//! Lenient fragment parsing into owned nodes.
//!
//! This is the tree construction used by `TreeBackend::parse_fragment`
//! implementations. It never fails: stray end tags are ignored, void and
//! self-closing elements close immediately, and elements still open at the
//! end of input are closed implicitly. Text inside `script` and `style` is
//! kept verbatim.

use crate::entities::decode_entities;
use crate::token::{Token, ValuePart, is_raw_text_element, is_void_element};
use crate::tokenizer::tokenize;
use crate::types::Node;

/// Parse `markup` as the content of an element named `context`.
pub fn parse_fragment_in(context: Option<&str>, markup: &str) -> Vec<Node> {
    match context {
        Some(name) if is_raw_text_element(name) => {
            if markup.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(markup)]
            }
        }
        _ => parse_fragment_nodes(markup),
    }
}

pub fn parse_fragment_nodes(markup: &str) -> Vec<Node> {
    let (tokens, errors) = tokenize(markup);
    if !errors.is_empty() {
        log::debug!(target: "markup.fragment", "fragment parse recovered from {} error(s)", errors.len());
    }

    // Index 0 is the synthetic fragment root.
    let mut open: Vec<Node> = vec![Node::Fragment {
        children: Vec::new(),
    }];

    for token in tokens {
        match token {
            Token::Text(raw) => {
                let text = if open.last().is_some_and(is_raw_text_container) {
                    raw
                } else {
                    decode_entities(&raw)
                };
                if !text.is_empty() {
                    push_child(&mut open, Node::Text { text });
                }
            }
            Token::Comment(text) => push_child(&mut open, Node::Comment { text }),
            Token::Declaration(_) => {}
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let attributes = attributes
                    .into_iter()
                    .map(|attr| {
                        let value = attr
                            .value
                            .into_iter()
                            .map(|part| match part {
                                ValuePart::Text(text) => text,
                                ValuePart::Embedded(never) => match never {},
                            })
                            .collect::<String>();
                        (attr.name, value)
                    })
                    .collect();
                let void = self_closing || is_void_element(&name);
                let element = Node::Element {
                    name,
                    attributes,
                    children: Vec::new(),
                };
                if void {
                    push_child(&mut open, element);
                } else {
                    open.push(element);
                }
            }
            Token::EndTag { name } => {
                let Some(index) = open.iter().rposition(|node| is_named(node, &name)) else {
                    continue;
                };
                while open.len() > index {
                    close_top(&mut open);
                }
            }
        }
    }

    while open.len() > 1 {
        close_top(&mut open);
    }
    match open.pop() {
        Some(Node::Fragment { children }) => children,
        _ => Vec::new(),
    }
}

fn is_raw_text_container(node: &Node) -> bool {
    matches!(node, Node::Element { name, .. } if is_raw_text_element(name))
}

fn is_named(node: &Node, target: &str) -> bool {
    matches!(node, Node::Element { name, .. } if name == target)
}

fn push_child(open: &mut [Node], child: Node) {
    if let Some(children) = open.last_mut().and_then(Node::children_mut) {
        children.push(child);
    }
}

fn close_top(open: &mut Vec<Node>) {
    if open.len() <= 1 {
        return;
    }
    if let Some(node) = open.pop() {
        push_child(open, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_structure() {
        let nodes = parse_fragment_nodes("a<b class=x>bold <i>it</i></b>&amp;");
        assert_eq!(
            nodes,
            vec![
                Node::text("a"),
                Node::Element {
                    name: "b".to_string(),
                    attributes: vec![("class".to_string(), "x".to_string())],
                    children: vec![
                        Node::text("bold "),
                        Node::Element {
                            name: "i".to_string(),
                            attributes: Vec::new(),
                            children: vec![Node::text("it")],
                        },
                    ],
                },
                Node::text("&"),
            ]
        );
    }

    #[test]
    fn recovers_from_stray_and_missing_end_tags() {
        let nodes = parse_fragment_nodes("</p><div><span>x</div>y<br>z");
        assert_eq!(nodes.len(), 4);
        assert!(matches!(&nodes[0], Node::Element { name, children, .. }
            if name == "div" && children.len() == 1));
        assert_eq!(nodes[1], Node::text("y"));
        assert!(matches!(&nodes[2], Node::Element { name, children, .. }
            if name == "br" && children.is_empty()));
        assert_eq!(nodes[3], Node::text("z"));
    }

    #[test]
    fn raw_text_elements_keep_their_content_verbatim() {
        let nodes = parse_fragment_nodes("<script>a<b && c &amp; d</script>");
        assert_eq!(
            nodes,
            vec![Node::Element {
                name: "script".to_string(),
                attributes: Vec::new(),
                children: vec![Node::text("a<b && c &amp; d")],
            }]
        );
        assert_eq!(
            parse_fragment_in(Some("style"), "a > b { }"),
            vec![Node::text("a > b { }")]
        );
        assert!(parse_fragment_in(Some("script"), "").is_empty());
        assert_eq!(parse_fragment_in(Some("p"), "&lt;"), vec![Node::text("<")]);
    }
}
