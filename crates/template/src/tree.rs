//! Mixed tree: markup structure with expressions in place.

use crate::ast::Mustache;
use markup::{Attribute, ValuePart};

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Raw markup text (comments included), inserted as content.
    Text(String),
    Mustache(Mustache),
    Element(Element),
    Block(BlockElement),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute<Mustache>>,
    pub children: Vec<Node>,
    /// Element-level expressions (`<div {{bind-attr}}>`), in source order.
    pub helpers: Vec<Mustache>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            helpers: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute<Mustache>> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Value of an attribute without expressions.
    pub fn static_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(Attribute::static_value)
    }

    /// Replace the value of `name` (keeping its position) or append it.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let parts = if value.is_empty() {
            Vec::new()
        } else {
            vec![ValuePart::Text(value.to_string())]
        };
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = parts,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: parts,
            }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute<Mustache>> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index))
    }

    /// Build a `tag` element that takes over this element's attributes,
    /// children and pending element-level expressions, leaving it empty.
    pub fn transclude(&mut self, tag: impl Into<String>) -> Element {
        Element {
            tag: tag.into(),
            attributes: std::mem::take(&mut self.attributes),
            children: std::mem::take(&mut self.children),
            helpers: std::mem::take(&mut self.helpers),
        }
    }
}

/// `{{#name}}...{{else}}...{{/name}}` with its bodies built as mixed trees.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockElement {
    pub mustache: Mustache,
    pub children: Vec<Node>,
    pub inverse: Option<Vec<Node>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PathExpr;

    #[test]
    fn set_attribute_keeps_position() {
        let mut el = Element::new("div")
            .with_attribute("id", "a")
            .with_attribute("class", "b");
        el.set_attribute("id", "c");
        assert_eq!(el.attributes[0].name, "id");
        assert_eq!(el.static_attribute("id").as_deref(), Some("c"));
        assert!(el.remove_attribute("class").is_some());
        assert!(el.attribute("class").is_none());
    }

    #[test]
    fn transclude_moves_everything() {
        let mut el = Element::new("x-card")
            .with_attribute("class", "card")
            .with_children(vec![Node::text("body")]);
        el.helpers.push(Mustache::new(PathExpr::simple("bind")));
        let replacement = el.transclude("section");
        assert_eq!(replacement.tag, "section");
        assert_eq!(replacement.static_attribute("class").as_deref(), Some("card"));
        assert_eq!(replacement.children, vec![Node::text("body")]);
        assert_eq!(replacement.helpers.len(), 1);
        assert!(el.attributes.is_empty() && el.children.is_empty() && el.helpers.is_empty());
    }
}
