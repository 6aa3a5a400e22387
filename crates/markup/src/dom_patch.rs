//! DOM patch protocol and a recording backend.
//!
//! `PatchRecorder` implements `TreeBackend` by emitting one `DomPatch` per
//! operation instead of building a tree, so construction programs can drive a
//! remote or retained tree.
//!
//! Invariants:
//! - Patches are applied in order.
//! - References must point to keys created earlier in the same stream.
//! - All keys are non-zero (`NodeKey::INVALID` never appears in a stream).
//! - Attribute order follows `SetAttribute` order; appliers must not dedupe.

use crate::backend::TreeBackend;
use crate::fragment::parse_fragment_in;
use crate::token::is_raw_text_element;
use crate::types::{Node, NodeKey};
use std::collections::BTreeMap;

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomPatch {
    CreateFragment { key: NodeKey },
    CreateElement { key: NodeKey, name: String },
    CreateText { key: NodeKey, text: String },
    CreateComment { key: NodeKey, text: String },
    SetAttribute {
        key: NodeKey,
        name: String,
        value: String,
    },
    /// Append a child to the end of a parent's children list.
    AppendChild { parent: NodeKey, child: NodeKey },
    /// Insert a child before an existing sibling.
    InsertBefore {
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    },
    /// Detach a node and its subtree.
    RemoveNode { key: NodeKey },
}

#[derive(Debug, Default)]
pub struct PatchRecorder {
    next_key: u32,
    patches: Vec<DomPatch>,
    /// Raw text elements created so far; fragments parsed into them stay text.
    raw_text: BTreeMap<NodeKey, String>,
}

impl PatchRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patches(&self) -> &[DomPatch] {
        &self.patches
    }

    pub fn take_patches(&mut self) -> Vec<DomPatch> {
        std::mem::take(&mut self.patches)
    }

    fn alloc(&mut self) -> NodeKey {
        self.next_key += 1;
        NodeKey(self.next_key)
    }

    fn replay(&mut self, node: &Node) -> NodeKey {
        match node {
            Node::Fragment { children } => {
                let key = self.create_fragment();
                self.replay_children(key, children);
                key
            }
            Node::Element {
                name,
                attributes,
                children,
            } => {
                let key = self.create_element(name);
                for (attr, value) in attributes {
                    self.set_attribute(key, attr, value);
                }
                self.replay_children(key, children);
                key
            }
            Node::Text { text } => self.create_text(text),
            Node::Comment { text } => self.create_comment(text),
        }
    }

    fn replay_children(&mut self, parent: NodeKey, children: &[Node]) {
        for child in children {
            let key = self.replay(child);
            self.append_child(parent, key);
        }
    }
}

impl TreeBackend for PatchRecorder {
    fn create_fragment(&mut self) -> NodeKey {
        let key = self.alloc();
        self.patches.push(DomPatch::CreateFragment { key });
        key
    }

    fn create_element(&mut self, name: &str) -> NodeKey {
        let key = self.alloc();
        if is_raw_text_element(name) {
            self.raw_text.insert(key, name.to_string());
        }
        self.patches.push(DomPatch::CreateElement {
            key,
            name: name.to_string(),
        });
        key
    }

    fn set_attribute(&mut self, element: NodeKey, name: &str, value: &str) {
        self.patches.push(DomPatch::SetAttribute {
            key: element,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn create_text(&mut self, text: &str) -> NodeKey {
        let key = self.alloc();
        self.patches.push(DomPatch::CreateText {
            key,
            text: text.to_string(),
        });
        key
    }

    fn create_comment(&mut self, text: &str) -> NodeKey {
        let key = self.alloc();
        self.patches.push(DomPatch::CreateComment {
            key,
            text: text.to_string(),
        });
        key
    }

    fn parse_fragment(&mut self, context: NodeKey, markup: &str) -> Vec<NodeKey> {
        let nodes = parse_fragment_in(self.raw_text.get(&context).map(String::as_str), markup);
        nodes
            .iter()
            .map(|node| self.replay(node))
            .collect()
    }

    fn append_child(&mut self, parent: NodeKey, child: NodeKey) {
        self.patches.push(DomPatch::AppendChild { parent, child });
    }

    fn insert_before(&mut self, parent: NodeKey, child: NodeKey, before: NodeKey) {
        self.patches.push(DomPatch::InsertBefore {
            parent,
            child,
            before,
        });
    }

    fn remove_node(&mut self, node: NodeKey) {
        self.patches.push(DomPatch::RemoveNode { key: node });
    }
}
