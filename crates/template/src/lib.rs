//! Markup template compiler.
//!
//! Pipeline:
//! - `parser`: mustache source to an expression `ast::Program`;
//! - `builder`: markup tokens merged with expressions into a mixed tree,
//!   with macros applied as elements close;
//! - `opcodes`: mixed tree to a flat opcode sequence;
//! - `codegen`: opcodes to a slot-addressed construction program;
//! - `runtime`: executes programs against a `markup::TreeBackend`.
//!
//! `Environment` ties the stages together:
//!
//! ```
//! use template::{CompileOptions, Environment};
//!
//! let env = Environment::new();
//! let template = env
//!     .compile("<p>{{greeting}}</p>", &CompileOptions::default())
//!     .unwrap();
//! let rendered = template
//!     .render(&serde_json::json!({"greeting": "hi"}))
//!     .unwrap();
//! assert_eq!(rendered.to_html(), "<p>hi</p>");
//! ```

pub mod ast;
pub mod builder;
pub mod codegen;
mod environment;
mod error;
pub mod macros;
pub mod opcodes;
mod options;
pub mod parser;
pub mod runtime;
pub mod tree;

pub use crate::builder::{build, preprocess};
pub use crate::environment::{Environment, Rendered, Template};
pub use crate::error::{CompileError, InternalError, ParseError, RuntimeError};
pub use crate::macros::{MAX_MACRO_PASSES, MacroAction, MacroRegistry};
pub use crate::options::{CompileOptions, KnownHelpers};
pub use crate::parser::{ExpressionParser, MustacheParser};
pub use crate::runtime::{BoundRange, HelperOptions, HelperRegistry, RenderOutput};
pub use crate::tree::{BlockElement, Element, Node};
