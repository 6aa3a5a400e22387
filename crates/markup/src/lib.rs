//! Markup tokenization and tree construction targets.
//!
//! - `Tokenizer`: streaming, resumable tokenizer whose attribute values can
//!   carry host payloads.
//! - `TreeBackend`: the minimal surface construction programs build through.
//! - `Document` / `PatchRecorder`: an arena DOM and a patch-stream recorder
//!   implementing that surface.

mod backend;
mod document;
mod dom_patch;
mod entities;
mod error;
mod fragment;
mod serialize;
mod token;
mod tokenizer;
mod types;

pub use crate::backend::TreeBackend;
pub use crate::document::Document;
pub use crate::dom_patch::{DomPatch, PatchRecorder};
pub use crate::entities::{escape_attribute, escape_text};
pub use crate::error::{ParseError, ParseErrorCode};
pub use crate::fragment::{parse_fragment_in, parse_fragment_nodes};
pub use crate::serialize::{DomSnapshot, to_html};
pub use crate::token::{Attribute, Token, ValuePart, is_raw_text_element, is_void_element};
pub use crate::tokenizer::{Tokenizer, TokenizerConfig, TokenizerState, TokenizerStats, tokenize};
pub use crate::types::{Node, NodeKey};
