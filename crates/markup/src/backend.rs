//! Tree construction target.
//!
//! Construction programs never touch a concrete tree; they go through this
//! trait. Keys are issued by the backend and are only meaningful to the
//! backend that issued them.
//!
//! Invariants:
//! - A node has at most one parent; appending or inserting a node that already
//!   has a parent moves it.
//! - `parse_fragment` returns detached top-level nodes in source order.
//! - Keys stay valid after `remove_node`, but the removed subtree is detached.

use crate::types::NodeKey;

pub trait TreeBackend {
    /// Create a detached container that serves as a construction root.
    fn create_fragment(&mut self) -> NodeKey;

    fn create_element(&mut self, name: &str) -> NodeKey;

    fn set_attribute(&mut self, element: NodeKey, name: &str, value: &str);

    /// Create a text node; `text` is literal and is never parsed as markup.
    fn create_text(&mut self, text: &str) -> NodeKey;

    fn create_comment(&mut self, text: &str) -> NodeKey;

    /// Parse `markup` as it would be parsed inside `context` and return the
    /// resulting top-level nodes, detached.
    fn parse_fragment(&mut self, context: NodeKey, markup: &str) -> Vec<NodeKey>;

    fn append_child(&mut self, parent: NodeKey, child: NodeKey);

    fn insert_before(&mut self, parent: NodeKey, child: NodeKey, before: NodeKey);

    /// Detach a node (and its subtree) from its parent.
    fn remove_node(&mut self, node: NodeKey);
}
