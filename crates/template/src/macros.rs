//! Tag-rewriting macros applied as elements close.
//!
//! Entries are tried in registration order; the first whose test matches
//! decides the outcome:
//! - `Unchanged`: keep the element, including edits made in place. No re-run.
//! - `Remove`: drop the element and its subtree.
//! - `Replace(el)`: run the whole pass again on `el`.
//!
//! Re-runs are capped at `MAX_MACRO_PASSES`.

use crate::error::CompileError;
use crate::tree::Element;
use std::fmt;
use std::sync::Arc;

pub const MAX_MACRO_PASSES: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum MacroAction {
    Unchanged,
    Replace(Element),
    Remove,
}

type TestFn = Arc<dyn Fn(&Element) -> bool + Send + Sync>;
type MutateFn = Arc<dyn Fn(&mut Element) -> MacroAction + Send + Sync>;

#[derive(Clone)]
struct MacroEntry {
    name: String,
    test: TestFn,
    mutate: MutateFn,
}

#[derive(Clone, Default)]
pub struct MacroRegistry {
    entries: Vec<MacroEntry>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. Re-registering replaces the entry without moving it.
    pub fn register<T, M>(&mut self, name: impl Into<String>, test: T, mutate: M)
    where
        T: Fn(&Element) -> bool + Send + Sync + 'static,
        M: Fn(&mut Element) -> MacroAction + Send + Sync + 'static,
    {
        let entry = MacroEntry {
            name: name.into(),
            test: Arc::new(test),
            mutate: Arc::new(mutate),
        };
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the macro pass on a closed element. `Ok(None)` means removed.
    pub fn apply(&self, element: Element) -> Result<Option<Element>, CompileError> {
        let mut current = element;
        let mut passes = 0;
        loop {
            let Some(entry) = self.entries.iter().find(|e| (e.test)(&current)) else {
                return Ok(Some(current));
            };
            passes += 1;
            log::trace!(target: "template.macros", "macro {} matched <{}>", entry.name, current.tag);
            match (entry.mutate)(&mut current) {
                MacroAction::Unchanged => return Ok(Some(current)),
                MacroAction::Remove => {
                    log::debug!(target: "template.macros", "macro {} removed <{}>", entry.name, current.tag);
                    return Ok(None);
                }
                MacroAction::Replace(next) => {
                    if passes >= MAX_MACRO_PASSES {
                        return Err(CompileError::MacroNonTermination {
                            name: entry.name.clone(),
                            tag: next.tag,
                            passes,
                        });
                    }
                    current = next;
                }
            }
        }
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn sample() -> Element {
        Element::new("x-item")
            .with_attribute("id", "a")
            .with_children(vec![Node::text("body")])
    }

    #[test]
    fn empty_registry_is_identity() {
        let registry = MacroRegistry::new();
        assert_eq!(registry.apply(sample()).expect("apply"), Some(sample()));
    }

    #[test]
    fn unchanged_keeps_in_place_edits() {
        let mut registry = MacroRegistry::new();
        registry.register(
            "mark",
            |el| el.tag == "x-item",
            |el| {
                el.set_attribute("data-seen", "yes");
                MacroAction::Unchanged
            },
        );
        let out = registry.apply(sample()).expect("apply").expect("kept");
        assert_eq!(out.tag, "x-item");
        assert_eq!(out.static_attribute("data-seen").as_deref(), Some("yes"));
    }

    #[test]
    fn non_matching_macro_is_identity() {
        let mut registry = MacroRegistry::new();
        registry.register("other", |el| el.tag == "other", |_| MacroAction::Remove);
        assert_eq!(registry.apply(sample()).expect("apply"), Some(sample()));
    }

    #[test]
    fn remove_drops_subtree() {
        let mut registry = MacroRegistry::new();
        registry.register("drop", |el| el.tag == "x-item", |_| MacroAction::Remove);
        assert_eq!(registry.apply(sample()).expect("apply"), None);
    }

    #[test]
    fn replacement_is_reprocessed() {
        let mut registry = MacroRegistry::new();
        registry.register(
            "item",
            |el| el.tag == "x-item",
            |el| MacroAction::Replace(el.transclude("li")),
        );
        registry.register(
            "li",
            |el| el.tag == "li",
            |el| {
                el.set_attribute("class", "entry");
                MacroAction::Unchanged
            },
        );
        let out = registry.apply(sample()).expect("apply").expect("kept");
        assert_eq!(out.tag, "li");
        assert_eq!(out.static_attribute("id").as_deref(), Some("a"));
        assert_eq!(out.static_attribute("class").as_deref(), Some("entry"));
        assert_eq!(out.children, vec![Node::text("body")]);
    }

    #[test]
    fn first_registered_match_wins_and_reregistering_keeps_order() {
        let mut registry = MacroRegistry::new();
        registry.register("a", |_| true, |_| MacroAction::Remove);
        registry.register("b", |_| true, |_| MacroAction::Unchanged);
        registry.register("a", |_| false, |_| MacroAction::Remove);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(registry.apply(sample()).expect("apply").is_some());
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn endless_rewrite_is_reported() {
        let mut registry = MacroRegistry::new();
        registry.register(
            "loop",
            |el| el.tag == "x-item",
            |el| MacroAction::Replace(el.clone()),
        );
        let err = registry.apply(sample()).expect_err("non-termination");
        assert_eq!(
            err,
            CompileError::MacroNonTermination {
                name: "loop".to_string(),
                tag: "x-item".to_string(),
                passes: MAX_MACRO_PASSES,
            }
        );
    }
}
