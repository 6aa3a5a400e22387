//! Arena-backed document used as the default construction target.

use crate::backend::TreeBackend;
use crate::fragment::parse_fragment_in;
use crate::serialize::to_html;
use crate::types::{Node, NodeKey};

#[derive(Debug)]
enum ArenaNode {
    Fragment,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Slot {
    node: ArenaNode,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// Keys are `index + 1`, so `NodeKey::INVALID` never names a node.
#[derive(Debug, Default)]
pub struct Document {
    slots: Vec<Slot>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, key: NodeKey) -> Option<&Slot> {
        let index = (key.0 as usize).checked_sub(1)?;
        self.slots.get(index)
    }

    fn slot_mut(&mut self, key: NodeKey) -> Option<&mut Slot> {
        let index = (key.0 as usize).checked_sub(1)?;
        self.slots.get_mut(index)
    }

    fn push(&mut self, node: ArenaNode) -> NodeKey {
        self.slots.push(Slot {
            node,
            parent: None,
            children: Vec::new(),
        });
        NodeKey(self.slots.len() as u32)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.slot(key).and_then(|slot| slot.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.slot(key).map_or(&[], |slot| slot.children.as_slice())
    }

    /// Tag name of an element node.
    pub fn element_name(&self, key: NodeKey) -> Option<&str> {
        match &self.slot(key)?.node {
            ArenaNode::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        match &self.slot(key)?.node {
            ArenaNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Copy an owned node tree into the arena, detached.
    pub fn import(&mut self, node: &Node) -> NodeKey {
        match node {
            Node::Fragment { children } => {
                let key = self.push(ArenaNode::Fragment);
                self.import_children(key, children);
                key
            }
            Node::Element {
                name,
                attributes,
                children,
            } => {
                let key = self.push(ArenaNode::Element {
                    name: name.clone(),
                    attributes: attributes.clone(),
                });
                self.import_children(key, children);
                key
            }
            Node::Text { text } => self.push(ArenaNode::Text(text.clone())),
            Node::Comment { text } => self.push(ArenaNode::Comment(text.clone())),
        }
    }

    fn import_children(&mut self, parent: NodeKey, children: &[Node]) {
        for child in children {
            let key = self.import(child);
            self.append_child(parent, key);
        }
    }

    /// Snapshot the subtree rooted at `key` as an owned tree.
    pub fn to_node(&self, key: NodeKey) -> Option<Node> {
        let slot = self.slot(key)?;
        let children = || {
            slot.children
                .iter()
                .filter_map(|child| self.to_node(*child))
                .collect::<Vec<_>>()
        };
        Some(match &slot.node {
            ArenaNode::Fragment => Node::Fragment {
                children: children(),
            },
            ArenaNode::Element { name, attributes } => Node::Element {
                name: name.clone(),
                attributes: attributes.clone(),
                children: children(),
            },
            ArenaNode::Text(text) => Node::Text { text: text.clone() },
            ArenaNode::Comment(text) => Node::Comment { text: text.clone() },
        })
    }

    /// Serialize the subtree rooted at `key`. Fragments serialize as their
    /// children only.
    pub fn to_html(&self, key: NodeKey) -> String {
        self.to_node(key).map(|node| to_html(&node)).unwrap_or_default()
    }

    fn detach(&mut self, child: NodeKey) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|key| *key != child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = None;
        }
    }
}

impl TreeBackend for Document {
    fn create_fragment(&mut self) -> NodeKey {
        self.push(ArenaNode::Fragment)
    }

    fn create_element(&mut self, name: &str) -> NodeKey {
        self.push(ArenaNode::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    fn set_attribute(&mut self, element: NodeKey, name: &str, value: &str) {
        let Some(Slot {
            node: ArenaNode::Element { attributes, .. },
            ..
        }) = self.slot_mut(element)
        else {
            log::debug!(target: "markup.document", "set_attribute on non-element {element:?}");
            return;
        };
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn create_text(&mut self, text: &str) -> NodeKey {
        self.push(ArenaNode::Text(text.to_string()))
    }

    fn create_comment(&mut self, text: &str) -> NodeKey {
        self.push(ArenaNode::Comment(text.to_string()))
    }

    fn parse_fragment(&mut self, context: NodeKey, markup: &str) -> Vec<NodeKey> {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "markup.document", "parse_fragment in {context:?}: {markup:?}");
        let nodes = parse_fragment_in(self.element_name(context), markup);
        nodes
            .iter()
            .map(|node| self.import(node))
            .collect()
    }

    fn append_child(&mut self, parent: NodeKey, child: NodeKey) {
        if self.slot(parent).is_none() || self.slot(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.push(child);
        }
    }

    fn insert_before(&mut self, parent: NodeKey, child: NodeKey, before: NodeKey) {
        if self.slot(parent).is_none() || self.slot(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        if let Some(slot) = self.slot_mut(parent) {
            match slot.children.iter().position(|key| *key == before) {
                Some(index) => slot.children.insert(index, child),
                None => slot.children.push(child),
            }
        }
    }

    fn remove_node(&mut self, node: NodeKey) {
        self.detach(node);
    }
}
