//! Expression-language AST consumed by the builder.
//!
//! This is the contract with the expression parser: any parser that produces
//! a `Program` can feed the pipeline.

use serde_json::{Number, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Literal template text (markup included).
    Content(String),
    Mustache(Mustache),
    Block(Block),
}

/// A path such as `title`, `post.author.name` or `this.name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathExpr {
    /// Source spelling, used as the helper name and for id arguments.
    pub original: String,
    pub parts: Vec<String>,
    /// Explicitly anchored to the context (`this.x`, `./x`).
    pub scoped: bool,
}

impl PathExpr {
    /// Plain single-segment path; panics in debug builds if `name` contains a
    /// separator.
    pub fn simple(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.contains(['.', '/']));
        Self {
            parts: vec![name.clone()],
            original: name,
            scoped: false,
        }
    }

    /// A single unscoped segment: the only shape that may name a helper.
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1 && !self.scoped
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Path(PathExpr),
    String(String),
    Number(Number),
    Boolean(bool),
}

impl Param {
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Param::Path(_) => None,
            Param::String(s) => Some(Value::String(s.clone())),
            Param::Number(n) => Some(Value::Number(n.clone())),
            Param::Boolean(b) => Some(Value::Bool(*b)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mustache {
    pub path: PathExpr,
    pub params: Vec<Param>,
    pub hash: Vec<(String, Param)>,
    /// `{{x}}` is escaped, `{{{x}}}` / `{{& x}}` is not.
    pub escaped: bool,
}

impl Mustache {
    pub fn new(path: PathExpr) -> Self {
        Self {
            path,
            params: Vec::new(),
            hash: Vec::new(),
            escaped: true,
        }
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_hash(mut self, hash: Vec<(String, Param)>) -> Self {
        self.hash = hash;
        self
    }

    pub fn raw(mut self) -> Self {
        self.escaped = false;
        self
    }

    /// Syntactically a call: carries params or hash arguments.
    pub fn has_arguments(&self) -> bool {
        !self.params.is_empty() || !self.hash.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub mustache: Mustache,
    pub program: Program,
    pub inverse: Option<Program>,
}
