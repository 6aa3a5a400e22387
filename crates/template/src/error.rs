//! Compile-time and run-time errors.

use std::fmt;

/// Mustache syntax error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the template source.
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Pass 1 / Pass 2 contract violation. Never caused by template input alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    ElementUnderflow { opcode: &'static str },
    ValueUnderflow { opcode: &'static str },
    UnbalancedElements { open: usize },
    UnbalancedValues { pending: usize },
    ComputedArgument { helper: String },
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::ElementUnderflow { opcode } => {
                write!(f, "element stack underflow at {opcode}")
            }
            InternalError::ValueUnderflow { opcode } => {
                write!(f, "value stack underflow at {opcode}")
            }
            InternalError::UnbalancedElements { open } => {
                write!(f, "{open} element slot(s) still open at end of program")
            }
            InternalError::UnbalancedValues { pending } => {
                write!(f, "{pending} value(s) left on the value stack at end of program")
            }
            InternalError::ComputedArgument { helper } => {
                write!(f, "computed value passed as an argument to helper `{helper}`")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    Parse(ParseError),
    Markup(markup::ParseError),
    /// A close tag does not match the innermost open node.
    StructuralMismatch {
        /// Innermost open node (`div`, `{{#if}}`), or `None` at top level.
        expected: Option<String>,
        found: String,
        position: usize,
    },
    /// An element is still open at the end of the template or of a block.
    UnclosedElement { tag: String },
    /// A block statement appears inside a tag.
    MisplacedBlock { helper: String, position: usize },
    MacroNonTermination {
        name: String,
        tag: String,
        passes: usize,
    },
    InternalStackImbalance(InternalError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(err) => write!(f, "template syntax error: {err}"),
            CompileError::Markup(err) => write!(f, "markup error: {err}"),
            CompileError::StructuralMismatch {
                expected: Some(open),
                found,
                position,
            } => write!(
                f,
                "closing tag {found} did not match last open tag {open} (byte {position})"
            ),
            CompileError::StructuralMismatch {
                expected: None,
                found,
                position,
            } => write!(f, "closing tag {found} has no open element (byte {position})"),
            CompileError::UnclosedElement { tag } => write!(f, "unclosed element <{tag}>"),
            CompileError::MisplacedBlock { helper, position } => {
                write!(f, "block {{{{#{helper}}}}} inside a tag (byte {position})")
            }
            CompileError::MacroNonTermination { name, tag, passes } => write!(
                f,
                "macro `{name}` still rewriting <{tag}> after {passes} passes"
            ),
            CompileError::InternalStackImbalance(err) => {
                write!(f, "internal compiler error: {err}")
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Parse(err) => Some(err),
            CompileError::Markup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}

impl From<markup::ParseError> for CompileError {
    fn from(err: markup::ParseError) -> Self {
        CompileError::Markup(err)
    }
}

impl From<InternalError> for CompileError {
    fn from(err: InternalError) -> Self {
        CompileError::InternalStackImbalance(err)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    /// An explicit helper call names no registered helper.
    UnknownHelper { name: String },
    /// A helper reported a failure.
    Helper { name: String, message: String },
    /// A binding handle does not belong to the rendered output it was used with.
    UnknownBinding { id: usize },
}

impl RuntimeError {
    pub fn helper(name: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Helper {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownHelper { name } => write!(f, "missing helper: `{name}`"),
            RuntimeError::Helper { name, message } => write!(f, "helper `{name}` failed: {message}"),
            RuntimeError::UnknownBinding { id } => write!(f, "unknown binding #{id}"),
        }
    }
}

impl std::error::Error for RuntimeError {}
