//! Construction-program interpreter.

use super::{
    HelperRegistry, ambiguous_resolve, attribute_value, insert_value, invoke_helper, resolve,
};
use crate::codegen::{InsertMode, Instr, Operand, Program, ROOT_SLOT};
use crate::error::RuntimeError;
use markup::{NodeKey, TreeBackend};
use serde_json::Value;

/// Content insertion delimited by two comment markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundRange {
    pub id: usize,
    pub parent: NodeKey,
    pub start: NodeKey,
    pub end: NodeKey,
    /// Nodes currently between the markers.
    pub nodes: Vec<NodeKey>,
}

/// Result of running a program against a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    pub root: NodeKey,
    pub bindings: Vec<BoundRange>,
    pub(crate) elements: Vec<NodeKey>,
}

impl RenderOutput {
    pub fn binding(&self, id: usize) -> Option<&BoundRange> {
        self.bindings.iter().find(|range| range.id == id)
    }
}

struct Rebind {
    before: NodeKey,
    nodes: Vec<NodeKey>,
}

pub(crate) struct Machine<'a> {
    program: &'a Program,
    helpers: &'a HelperRegistry,
    context: &'a Value,
    backend: &'a mut dyn TreeBackend,
    elements: Vec<NodeKey>,
    values: Vec<Option<Value>>,
    bindings: Vec<BoundRange>,
    rebind: Option<Rebind>,
}

impl<'a> Machine<'a> {
    pub(crate) fn new(
        program: &'a Program,
        helpers: &'a HelperRegistry,
        context: &'a Value,
        backend: &'a mut dyn TreeBackend,
    ) -> Self {
        Self {
            program,
            helpers,
            context,
            backend,
            elements: Vec::new(),
            values: vec![None; program.value_slots],
            bindings: Vec::new(),
            rebind: None,
        }
    }

    pub(crate) fn render(mut self) -> Result<RenderOutput, RuntimeError> {
        let root = self.backend.create_fragment();
        self.elements = vec![NodeKey::INVALID; self.program.element_slots.max(1)];
        self.elements[ROOT_SLOT] = root;
        let program = self.program;
        for instr in &program.instrs {
            self.exec(instr)?;
        }
        log::debug!(
            target: "template.runtime",
            "rendered {} instruction(s), {} binding(s)",
            program.instrs.len(),
            self.bindings.len()
        );
        Ok(RenderOutput {
            root,
            bindings: self.bindings,
            elements: self.elements,
        })
    }

    /// Replace the nodes of binding `id` with a fresh evaluation.
    pub(crate) fn rerender(mut self, output: &mut RenderOutput, id: usize) -> Result<(), RuntimeError> {
        let program = self.program;
        let site = program
            .bindings
            .get(id)
            .ok_or(RuntimeError::UnknownBinding { id })?;
        let range = output
            .bindings
            .iter_mut()
            .find(|range| range.id == id)
            .ok_or(RuntimeError::UnknownBinding { id })?;

        for node in range.nodes.drain(..) {
            self.backend.remove_node(node);
        }
        self.elements = output.elements.clone();
        self.rebind = Some(Rebind {
            before: range.end,
            nodes: Vec::new(),
        });
        let instrs = program
            .instrs
            .get(site.instrs.clone())
            .ok_or(RuntimeError::UnknownBinding { id })?;
        for instr in instrs {
            self.exec(instr)?;
        }
        range.nodes = self.rebind.take().map(|r| r.nodes).unwrap_or_default();
        log::debug!(
            target: "template.runtime",
            "re-rendered binding #{id}: {} node(s)",
            range.nodes.len()
        );
        Ok(())
    }

    fn element(&self, slot: usize) -> NodeKey {
        self.elements.get(slot).copied().unwrap_or(NodeKey::INVALID)
    }

    fn operand(&self, operand: &Operand) -> Option<Value> {
        match operand {
            Operand::Literal(value) => Some(value.clone()),
            Operand::Slot(slot) => self.values.get(*slot).cloned().flatten(),
        }
    }

    fn store(&mut self, slot: usize, value: Option<Value>) {
        if slot >= self.values.len() {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = value;
    }

    fn exec(&mut self, instr: &Instr) -> Result<(), RuntimeError> {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "template.runtime", "exec {instr:?}");

        match instr {
            Instr::CreateElement { slot, tag } => {
                let key = self.backend.create_element(tag);
                if *slot >= self.elements.len() {
                    self.elements.resize(slot + 1, NodeKey::INVALID);
                }
                self.elements[*slot] = key;
            }
            Instr::SetAttribute {
                element,
                name,
                value,
            } => {
                let element = self.element(*element);
                self.backend.set_attribute(element, name, value);
            }
            Instr::SetDynamicAttribute {
                element,
                name,
                parts,
            } => {
                let values: Vec<Option<Value>> = parts.iter().map(|p| self.operand(p)).collect();
                let element = self.element(*element);
                self.backend.set_attribute(element, name, &attribute_value(&values));
            }
            Instr::AppendChild { parent, child } => {
                let (parent, child) = (self.element(*parent), self.element(*child));
                self.backend.append_child(parent, child);
            }
            Instr::AppendContent { parent, markup } => {
                let parent = self.element(*parent);
                for node in self.backend.parse_fragment(parent, markup) {
                    self.backend.append_child(parent, node);
                }
            }
            Instr::Resolve { dest, parts } => {
                let value = resolve(self.context, parts).cloned();
                self.store(*dest, value);
            }
            Instr::Ambiguous {
                dest,
                name,
                element,
                escaped,
            } => {
                let element = self.element(*element);
                let value = ambiguous_resolve(
                    self.helpers,
                    name,
                    self.context,
                    element,
                    *escaped,
                    &mut *self.backend,
                )?;
                self.store(*dest, value);
            }
            Instr::InvokeHelper {
                dest,
                element,
                call,
            } => {
                let args = call
                    .args
                    .iter()
                    .map(|op| self.operand(op).unwrap_or(Value::Null))
                    .collect();
                let hash = call
                    .hash
                    .iter()
                    .map(|(key, op, kind)| (key.clone(), self.operand(op).unwrap_or(Value::Null), *kind))
                    .collect();
                let element = self.element(*element);
                let value = invoke_helper(
                    self.helpers,
                    call,
                    args,
                    hash,
                    self.context,
                    element,
                    &mut *self.backend,
                )?;
                self.store(*dest, value);
            }
            Instr::Append {
                parent,
                value,
                mode,
                binding,
            } => self.append(*parent, value, *mode, *binding),
        }
        Ok(())
    }

    fn append(&mut self, parent: usize, value: &Operand, mode: InsertMode, binding: Option<usize>) {
        let parent = self.element(parent);
        let value = self.operand(value);
        match (binding, self.rebind.as_mut()) {
            (Some(_), Some(rebind)) => {
                let nodes = insert_value(&mut *self.backend, parent, Some(rebind.before), value.as_ref(), mode);
                rebind.nodes.extend(nodes);
            }
            (Some(id), None) => {
                let start = self.backend.create_comment("");
                self.backend.append_child(parent, start);
                let nodes = insert_value(&mut *self.backend, parent, None, value.as_ref(), mode);
                let end = self.backend.create_comment("");
                self.backend.append_child(parent, end);
                self.bindings.push(BoundRange {
                    id,
                    parent,
                    start,
                    end,
                    nodes,
                });
            }
            (None, _) => {
                insert_value(&mut *self.backend, parent, None, value.as_ref(), mode);
            }
        }
    }
}
