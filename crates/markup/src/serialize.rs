use crate::entities::{escape_attribute, escape_text};
use crate::token::{is_raw_text_element, is_void_element};
use crate::types::Node;
use std::fmt::{self, Write};

/// Serialize a node tree as HTML. Fragments serialize as their children.
///
/// Attribute values are always double-quoted; void elements get no end tag;
/// text inside `script` and `style` is written unescaped.
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node, false);
    out
}

fn write_node(out: &mut String, node: &Node, raw_text: bool) {
    match node {
        Node::Fragment { children } => {
            for child in children {
                write_node(out, child, raw_text);
            }
        }
        Node::Element {
            name,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attributes {
                let _ = write!(out, " {attr}=\"{}\"", escape_attribute(value));
            }
            out.push('>');
            if is_void_element(name) && children.is_empty() {
                return;
            }
            let raw_text = is_raw_text_element(name);
            for child in children {
                write_node(out, child, raw_text);
            }
            let _ = write!(out, "</{name}>");
        }
        Node::Text { text } if raw_text => out.push_str(text),
        Node::Text { text } => out.push_str(&escape_text(text)),
        Node::Comment { text } => {
            let _ = write!(out, "<!--{text}-->");
        }
    }
}

/// Deterministic, indented one-node-per-line rendering for test comparisons.
/// Not a stable format.
#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: &Node) -> Self {
        let mut lines = Vec::new();
        walk_snapshot(root, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

fn walk_snapshot(node: &Node, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Fragment { children } => {
            lines.push(format!("{indent}#fragment"));
            for child in children {
                walk_snapshot(child, depth + 1, lines);
            }
        }
        Node::Element {
            name,
            attributes,
            children,
        } => {
            let mut line = format!("{indent}<{name}");
            for (attr, value) in attributes {
                let _ = write!(line, " {attr}={value:?}");
            }
            line.push('>');
            lines.push(line);
            for child in children {
                walk_snapshot(child, depth + 1, lines);
            }
        }
        Node::Text { text } => lines.push(format!("{indent}#text {text:?}")),
        Node::Comment { text } => lines.push(format!("{indent}#comment {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_have_no_end_tag() {
        let node = Node::Fragment {
            children: vec![Node::element("br"), Node::element("p")],
        };
        assert_eq!(to_html(&node), "<br><p></p>");
    }

    #[test]
    fn raw_text_is_written_unescaped() {
        let node = Node::Fragment {
            children: vec![
                Node::Element {
                    name: "script".to_string(),
                    attributes: Vec::new(),
                    children: vec![Node::text("a < b && c")],
                },
                Node::text("a < b"),
            ],
        };
        assert_eq!(to_html(&node), "<script>a < b && c</script>a &lt; b");
    }

    #[test]
    fn snapshot_is_indented() {
        let node = Node::Element {
            name: "div".to_string(),
            attributes: vec![("id".to_string(), "x".to_string())],
            children: vec![Node::text("hi")],
        };
        assert_eq!(
            DomSnapshot::new(&node).to_string(),
            "<div id=\"x\">\n  #text \"hi\""
        );
    }
}
