//! Pass 2: lower opcodes into a slot-addressed construction program.
//!
//! The element stack and the value stack are simulated here, so the emitted
//! instructions name concrete slots instead of manipulating stacks at run
//! time. Slot counters only grow; a slot is written once per execution.
//! Element slot 0 is the root fragment.

use crate::error::{CompileError, InternalError};
use crate::opcodes::{AttrSegment, Opcode};
use crate::options::CompileOptions;
use serde_json::Value;
use std::ops::Range;

pub const ROOT_SLOT: usize = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Literal(Value),
    Slot(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertMode {
    /// Escaped: inserted as a text node.
    Text,
    /// Raw: parsed as markup in the context of the parent.
    Fragment,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HelperCall {
    pub name: String,
    pub args: Vec<Operand>,
    pub types: Vec<&'static str>,
    pub hash: Vec<(String, Operand, &'static str)>,
    pub escaped: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    CreateElement {
        slot: usize,
        tag: String,
    },
    SetAttribute {
        element: usize,
        name: String,
        value: String,
    },
    SetDynamicAttribute {
        element: usize,
        name: String,
        parts: Vec<Operand>,
    },
    AppendChild {
        parent: usize,
        child: usize,
    },
    AppendContent {
        parent: usize,
        markup: String,
    },
    Resolve {
        dest: usize,
        parts: Vec<String>,
    },
    Ambiguous {
        dest: usize,
        name: String,
        element: usize,
        escaped: bool,
    },
    InvokeHelper {
        dest: usize,
        element: usize,
        call: HelperCall,
    },
    Append {
        parent: usize,
        value: Operand,
        mode: InsertMode,
        binding: Option<usize>,
    },
}

/// Instructions that recompute and reinsert one bound insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingSite {
    pub parent: usize,
    pub instrs: Range<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub instrs: Vec<Instr>,
    pub element_slots: usize,
    pub value_slots: usize,
    pub bindings: Vec<BindingSite>,
}

struct PendingValue {
    operand: Operand,
    /// Argument type tag for literal pushes.
    kind: Option<&'static str>,
    /// First instruction computing this value.
    first_instr: usize,
}

struct Generator {
    program: Program,
    elements: Vec<usize>,
    values: Vec<PendingValue>,
    bind_markers: bool,
}

pub fn generate(opcodes: &[Opcode], options: &CompileOptions) -> Result<Program, CompileError> {
    let mut generator = Generator {
        program: Program {
            element_slots: 1,
            ..Program::default()
        },
        elements: vec![ROOT_SLOT],
        values: Vec::new(),
        bind_markers: options.bind_markers,
    };
    for opcode in opcodes {
        generator.opcode(opcode)?;
    }
    generator.finish()
}

impl Generator {
    fn opcode(&mut self, opcode: &Opcode) -> Result<(), InternalError> {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "template.codegen", "opcode {opcode:?}");

        match opcode {
            Opcode::OpenElement { tag } => {
                let slot = self.program.element_slots;
                self.program.element_slots += 1;
                self.emit(Instr::CreateElement {
                    slot,
                    tag: tag.clone(),
                });
                self.elements.push(slot);
            }
            Opcode::Attribute { name, value } => self.attribute(name, value)?,
            Opcode::CloseElement => {
                if self.elements.len() <= 1 {
                    return Err(InternalError::ElementUnderflow {
                        opcode: "CloseElement",
                    });
                }
                let child = self.pop_element("CloseElement")?;
                let parent = self.current_element("CloseElement")?;
                self.emit(Instr::AppendChild { parent, child });
            }
            Opcode::Content(markup) => {
                let parent = self.current_element("Content")?;
                self.emit(Instr::AppendContent {
                    parent,
                    markup: markup.clone(),
                });
            }
            Opcode::PushId { path } => self.push_literal(Value::String(path.clone()), "id"),
            Opcode::PushString(s) => self.push_literal(Value::String(s.clone()), "string"),
            Opcode::PushLiteral(value) => {
                let kind = match value {
                    Value::Bool(_) => "boolean",
                    Value::Number(_) => "number",
                    Value::String(_) => "string",
                    _ => "literal",
                };
                self.push_literal(value.clone(), kind);
            }
            Opcode::Dynamic { parts } => {
                let dest = self.alloc_value();
                let first_instr = self.emit(Instr::Resolve {
                    dest,
                    parts: parts.clone(),
                });
                self.push_computed(dest, first_instr);
            }
            Opcode::Ambiguous { name, escaped } => {
                let element = self.current_element("Ambiguous")?;
                let dest = self.alloc_value();
                let first_instr = self.emit(Instr::Ambiguous {
                    dest,
                    name: name.clone(),
                    element,
                    escaped: *escaped,
                });
                self.push_computed(dest, first_instr);
            }
            Opcode::Helper {
                name,
                argc,
                hash_keys,
                escaped,
            } => self.helper(name, *argc, hash_keys, *escaped)?,
            Opcode::AppendText => self.append(InsertMode::Text, "AppendText")?,
            Opcode::AppendFragment => self.append(InsertMode::Fragment, "AppendFragment")?,
            Opcode::Discard => {
                self.pop_value("Discard")?;
            }
            Opcode::Block { name } => {
                log::debug!(target: "template.codegen", "skipping block {name}");
            }
        }
        Ok(())
    }

    fn emit(&mut self, instr: Instr) -> usize {
        self.program.instrs.push(instr);
        self.program.instrs.len() - 1
    }

    fn alloc_value(&mut self) -> usize {
        let slot = self.program.value_slots;
        self.program.value_slots += 1;
        slot
    }

    fn push_literal(&mut self, value: Value, kind: &'static str) {
        let first_instr = self.program.instrs.len();
        self.values.push(PendingValue {
            operand: Operand::Literal(value),
            kind: Some(kind),
            first_instr,
        });
    }

    fn push_computed(&mut self, dest: usize, first_instr: usize) {
        self.values.push(PendingValue {
            operand: Operand::Slot(dest),
            kind: None,
            first_instr,
        });
    }

    fn pop_value(&mut self, opcode: &'static str) -> Result<PendingValue, InternalError> {
        self.values
            .pop()
            .ok_or(InternalError::ValueUnderflow { opcode })
    }

    fn pop_element(&mut self, opcode: &'static str) -> Result<usize, InternalError> {
        self.elements
            .pop()
            .ok_or(InternalError::ElementUnderflow { opcode })
    }

    fn current_element(&self, opcode: &'static str) -> Result<usize, InternalError> {
        self.elements
            .last()
            .copied()
            .ok_or(InternalError::ElementUnderflow { opcode })
    }

    fn attribute(&mut self, name: &str, segments: &[AttrSegment]) -> Result<(), InternalError> {
        let element = self.current_element("Attribute")?;
        if segments.iter().all(|s| matches!(s, AttrSegment::Static(_))) {
            let value = segments
                .iter()
                .filter_map(|s| match s {
                    AttrSegment::Static(text) => Some(text.as_str()),
                    AttrSegment::Expr(_) => None,
                })
                .collect();
            self.emit(Instr::SetAttribute {
                element,
                name: name.to_string(),
                value,
            });
            return Ok(());
        }

        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                AttrSegment::Static(text) => parts.push(Operand::Literal(Value::String(text.clone()))),
                AttrSegment::Expr(ops) => {
                    let depth = self.values.len();
                    for op in ops {
                        self.opcode(op)?;
                    }
                    if self.values.len() != depth + 1 {
                        return Err(InternalError::UnbalancedValues {
                            pending: self.values.len().saturating_sub(depth),
                        });
                    }
                    parts.push(self.pop_value("Attribute")?.operand);
                }
            }
        }
        self.emit(Instr::SetDynamicAttribute {
            element,
            name: name.to_string(),
            parts,
        });
        Ok(())
    }

    fn helper(
        &mut self,
        name: &str,
        argc: usize,
        hash_keys: &[String],
        escaped: bool,
    ) -> Result<(), InternalError> {
        let total = argc + hash_keys.len();
        if self.values.len() < total {
            return Err(InternalError::ValueUnderflow { opcode: "Helper" });
        }
        // Popped in reverse; split_off restores source order.
        let popped = self.values.split_off(self.values.len() - total);
        let first_instr = popped
            .first()
            .map(|v| v.first_instr)
            .unwrap_or(self.program.instrs.len());

        let mut args = Vec::with_capacity(argc);
        let mut types = Vec::with_capacity(argc);
        let mut hash = Vec::with_capacity(hash_keys.len());
        for (index, value) in popped.into_iter().enumerate() {
            let Some(kind) = value.kind else {
                return Err(InternalError::ComputedArgument {
                    helper: name.to_string(),
                });
            };
            if index < argc {
                args.push(value.operand);
                types.push(kind);
            } else {
                hash.push((hash_keys[index - argc].clone(), value.operand, kind));
            }
        }

        let element = self.current_element("Helper")?;
        let dest = self.alloc_value();
        let at = self.emit(Instr::InvokeHelper {
            dest,
            element,
            call: HelperCall {
                name: name.to_string(),
                args,
                types,
                hash,
                escaped,
            },
        });
        self.push_computed(dest, first_instr.min(at));
        Ok(())
    }

    fn append(&mut self, mode: InsertMode, opcode: &'static str) -> Result<(), InternalError> {
        let value = self.pop_value(opcode)?;
        let parent = self.current_element(opcode)?;
        let binding = self.bind_markers.then_some(self.program.bindings.len());
        let at = self.emit(Instr::Append {
            parent,
            value: value.operand,
            mode,
            binding,
        });
        if binding.is_some() {
            self.program.bindings.push(BindingSite {
                parent,
                instrs: value.first_instr..at + 1,
            });
        }
        Ok(())
    }

    fn finish(self) -> Result<Program, CompileError> {
        if self.elements.len() != 1 {
            return Err(InternalError::UnbalancedElements {
                open: self.elements.len().saturating_sub(1),
            }
            .into());
        }
        if !self.values.is_empty() {
            return Err(InternalError::UnbalancedValues {
                pending: self.values.len(),
            }
            .into());
        }
        log::debug!(
            target: "template.codegen",
            "generated {} instruction(s), {} element slot(s), {} value slot(s), {} binding(s)",
            self.program.instrs.len(),
            self.program.element_slots,
            self.program.value_slots,
            self.program.bindings.len()
        );
        Ok(self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::preprocess;
    use crate::macros::MacroRegistry;
    use crate::opcodes;

    fn program(source: &str, options: &CompileOptions) -> Program {
        let nodes = preprocess(source, &MacroRegistry::new()).expect("builds");
        generate(&opcodes::compile(&nodes, options), options).expect("generates")
    }

    #[test]
    fn elements_get_fresh_slots_and_attach_on_close() {
        let p = program("<div><p>x</p></div>", &CompileOptions::default());
        assert_eq!(
            p.instrs,
            vec![
                Instr::CreateElement {
                    slot: 1,
                    tag: "div".to_string()
                },
                Instr::CreateElement {
                    slot: 2,
                    tag: "p".to_string()
                },
                Instr::AppendContent {
                    parent: 2,
                    markup: "x".to_string()
                },
                Instr::AppendChild { parent: 1, child: 2 },
                Instr::AppendChild {
                    parent: ROOT_SLOT,
                    child: 1
                },
            ]
        );
        assert_eq!(p.element_slots, 3);
        assert_eq!(p.value_slots, 0);
    }

    #[test]
    fn helper_arguments_stay_in_source_order() {
        let p = program("{{testing \"title\" other n=1}}", &CompileOptions::default());
        assert_eq!(
            p.instrs[0],
            Instr::InvokeHelper {
                dest: 0,
                element: ROOT_SLOT,
                call: HelperCall {
                    name: "testing".to_string(),
                    args: vec![
                        Operand::Literal(Value::from("title")),
                        Operand::Literal(Value::from("other")),
                    ],
                    types: vec!["string", "id"],
                    hash: vec![("n".to_string(), Operand::Literal(Value::from(1)), "number")],
                    escaped: true,
                },
            }
        );
        assert_eq!(
            p.instrs[1],
            Instr::Append {
                parent: ROOT_SLOT,
                value: Operand::Slot(0),
                mode: InsertMode::Text,
                binding: None,
            }
        );
    }

    #[test]
    fn dynamic_attribute_parts() {
        let p = program("<a href=\"/u/{{id}}\" title=\"t\"></a>", &CompileOptions::default());
        assert!(p.instrs.contains(&Instr::SetDynamicAttribute {
            element: 1,
            name: "href".to_string(),
            parts: vec![Operand::Literal(Value::from("/u/")), Operand::Slot(0)],
        }));
        assert!(p.instrs.contains(&Instr::SetAttribute {
            element: 1,
            name: "title".to_string(),
            value: "t".to_string(),
        }));
    }

    #[test]
    fn bind_markers_record_sites() {
        let options = CompileOptions::default().bind_markers(true);
        let p = program("<p>{{a}} and {{{b.c}}}</p>", &options);
        assert_eq!(p.bindings.len(), 2);
        for site in &p.bindings {
            assert_eq!(site.parent, 1);
            assert!(matches!(
                p.instrs[site.instrs.end - 1],
                Instr::Append { binding: Some(_), .. }
            ));
            assert!(matches!(
                p.instrs[site.instrs.start],
                Instr::Ambiguous { .. } | Instr::Resolve { .. }
            ));
        }
    }

    #[test]
    fn stack_imbalance_is_reported() {
        let options = CompileOptions::default();
        let err = generate(&[Opcode::CloseElement], &options).expect_err("underflow");
        assert!(matches!(
            err,
            CompileError::InternalStackImbalance(InternalError::ElementUnderflow { .. })
        ));
        let err = generate(
            &[Opcode::OpenElement {
                tag: "div".to_string(),
            }],
            &options,
        )
        .expect_err("unclosed");
        assert_eq!(
            err,
            CompileError::InternalStackImbalance(InternalError::UnbalancedElements { open: 1 })
        );
        let err = generate(&[Opcode::PushString("x".to_string())], &options).expect_err("leftover");
        assert_eq!(
            err,
            CompileError::InternalStackImbalance(InternalError::UnbalancedValues { pending: 1 })
        );
        let err = generate(&[Opcode::AppendText], &options).expect_err("underflow");
        assert!(matches!(
            err,
            CompileError::InternalStackImbalance(InternalError::ValueUnderflow { .. })
        ));
    }

    #[test]
    fn computed_helper_arguments_are_rejected() {
        let opcodes = [
            Opcode::Dynamic {
                parts: vec!["x".to_string()],
            },
            Opcode::Helper {
                name: "h".to_string(),
                argc: 1,
                hash_keys: Vec::new(),
                escaped: true,
            },
            Opcode::Discard,
        ];
        let err = generate(&opcodes, &CompileOptions::default()).expect_err("computed");
        assert_eq!(
            err,
            CompileError::InternalStackImbalance(InternalError::ComputedArgument {
                helper: "h".to_string()
            })
        );
    }
}
