//! Pass 1: linearize the mixed tree into opcodes.
//!
//! The sequence is a flat, stack-oriented program: element opcodes nest
//! through `OpenElement`/`CloseElement`, expression opcodes push exactly one
//! value, and `AppendText`/`AppendFragment`/`Discard` consume one.

use crate::ast::{Mustache, Param};
use crate::options::{CompileOptions, KnownHelpers};
use crate::tree::{Element, Node};
use markup::ValuePart;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
    OpenElement { tag: String },
    Attribute { name: String, value: Vec<AttrSegment> },
    CloseElement,
    /// Markup text appended to the current element.
    Content(String),
    /// Helper argument naming a path; passed as its spelling with type `id`.
    PushId { path: String },
    PushString(String),
    /// Number or boolean helper argument.
    PushLiteral(Value),
    /// Context lookup.
    Dynamic { parts: Vec<String> },
    /// Helper if one is registered at run time, otherwise a context lookup.
    Ambiguous { name: String, escaped: bool },
    /// Pops `argc + hash_keys.len()` arguments (params first, then hash
    /// values) and pushes the result.
    Helper {
        name: String,
        argc: usize,
        hash_keys: Vec<String>,
        escaped: bool,
    },
    AppendText,
    AppendFragment,
    Discard,
    /// Block statement; compiles to nothing.
    Block { name: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrSegment {
    Static(String),
    /// Expression opcodes that push exactly one value.
    Expr(Vec<Opcode>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Simple,
    Ambiguous,
    Helper,
}

/// Decide how a mustache is evaluated.
///
/// - arguments make it a helper call;
/// - anything but a single unscoped segment is a context lookup;
/// - known helpers are helper calls;
/// - with `known_helpers_only`, unknown ids are context lookups;
/// - otherwise the decision is deferred to run time.
pub fn classify(mustache: &Mustache, known: &KnownHelpers, known_helpers_only: bool) -> Classification {
    if mustache.has_arguments() {
        return Classification::Helper;
    }
    if !mustache.path.is_simple() {
        return Classification::Simple;
    }
    if known.contains(&mustache.path.original) {
        Classification::Helper
    } else if known_helpers_only {
        Classification::Simple
    } else {
        Classification::Ambiguous
    }
}

struct OpcodeCompiler {
    known: KnownHelpers,
    known_helpers_only: bool,
}

pub fn compile(nodes: &[Node], options: &CompileOptions) -> Vec<Opcode> {
    let compiler = OpcodeCompiler {
        known: options.known_helpers(),
        known_helpers_only: options.known_helpers_only,
    };
    let mut out = Vec::new();
    compiler.nodes(nodes, &mut out);
    log::debug!(target: "template.opcodes", "compiled {} opcode(s)", out.len());
    out
}

impl OpcodeCompiler {
    fn nodes(&self, nodes: &[Node], out: &mut Vec<Opcode>) {
        for node in nodes {
            self.node(node, out);
        }
    }

    fn node(&self, node: &Node, out: &mut Vec<Opcode>) {
        match node {
            Node::Text(text) => out.push(Opcode::Content(text.clone())),
            Node::Mustache(mustache) => {
                self.expression(mustache, out);
                out.push(if mustache.escaped {
                    Opcode::AppendText
                } else {
                    Opcode::AppendFragment
                });
            }
            Node::Element(element) => self.element(element, out),
            Node::Block(block) => {
                log::debug!(
                    target: "template.opcodes",
                    "block {{{{#{}}}}} compiled as placeholder",
                    block.mustache.path.original
                );
                out.push(Opcode::Block {
                    name: block.mustache.path.original.clone(),
                });
            }
        }
    }

    fn element(&self, element: &Element, out: &mut Vec<Opcode>) {
        out.push(Opcode::OpenElement {
            tag: element.tag.clone(),
        });
        for attr in &element.attributes {
            let value = attr
                .value
                .iter()
                .map(|part| match part {
                    ValuePart::Text(text) => AttrSegment::Static(text.clone()),
                    ValuePart::Embedded(mustache) => {
                        let mut ops = Vec::new();
                        self.expression(mustache, &mut ops);
                        AttrSegment::Expr(ops)
                    }
                })
                .collect();
            out.push(Opcode::Attribute {
                name: attr.name.clone(),
                value,
            });
        }
        for helper in &element.helpers {
            self.expression(helper, out);
            out.push(Opcode::Discard);
        }
        self.nodes(&element.children, out);
        out.push(Opcode::CloseElement);
    }

    fn expression(&self, mustache: &Mustache, out: &mut Vec<Opcode>) {
        let path = &mustache.path;
        match classify(mustache, &self.known, self.known_helpers_only) {
            Classification::Simple => out.push(Opcode::Dynamic {
                parts: path.parts.clone(),
            }),
            Classification::Ambiguous => out.push(Opcode::Ambiguous {
                name: path.original.clone(),
                escaped: mustache.escaped,
            }),
            Classification::Helper => {
                for param in &mustache.params {
                    out.push(push_param(param));
                }
                for (_, value) in &mustache.hash {
                    out.push(push_param(value));
                }
                out.push(Opcode::Helper {
                    name: path.original.clone(),
                    argc: mustache.params.len(),
                    hash_keys: mustache.hash.iter().map(|(key, _)| key.clone()).collect(),
                    escaped: mustache.escaped,
                });
            }
        }
    }
}

fn push_param(param: &Param) -> Opcode {
    match param {
        Param::Path(path) => Opcode::PushId {
            path: path.original.clone(),
        },
        Param::String(s) => Opcode::PushString(s.clone()),
        literal => Opcode::PushLiteral(literal.literal_value().unwrap_or(Value::Null)),
    }
}
