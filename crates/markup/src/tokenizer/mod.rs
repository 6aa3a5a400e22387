//! Streaming markup tokenizer.
//!
//! Input is pushed as `&str` chunks and consumed one char at a time by an
//! explicit state machine, so the tokenizer is resumable at any chunk boundary.
//!
//! Invariants:
//! - Chunk-equivalence: feeding input in one chunk or many chunks yields the
//!   same token sequence.
//! - Text tokens carry raw source text; a text run is only emitted when a tag,
//!   comment or declaration starts, when the host flushes it, or at `finish()`.
//! - Attribute text parts are entity-decoded when the part is closed.
//!
//! - `script` and `style` content is raw text: it is emitted verbatim up to
//!   the matching end tag.
//!
//! Known limitations (intentional):
//! - No RCDATA handling for `textarea` or `title`.
//! - No HTML5 parse-error recovery beyond dropping an unterminated tag at EOF.

use crate::entities::decode_entities;
use crate::error::{ParseError, ParseErrorCode};
use crate::token::{Attribute, Token, is_raw_text_element};
use std::convert::Infallible;

mod states;


pub use states::TokenizerState;

/// Configuration for the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenizerConfig {
    /// ASCII-lowercase tag and attribute names.
    pub lowercase_names: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase_names: true,
        }
    }
}

/// Minimal tokenizer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
}

struct PendingTag<X> {
    name: String,
    is_end: bool,
    self_closing: bool,
    attributes: Vec<Attribute<X>>,
    current: Option<Attribute<X>>,
    raw_value: String,
}

impl<X> PendingTag<X> {
    fn new(is_end: bool) -> Self {
        Self {
            name: String::new(),
            is_end,
            self_closing: false,
            attributes: Vec::new(),
            current: None,
            raw_value: String::new(),
        }
    }

    fn flush_value_text(&mut self) {
        if self.raw_value.is_empty() {
            return;
        }
        let decoded = decode_entities(&self.raw_value);
        self.raw_value.clear();
        if let Some(attr) = self.current.as_mut() {
            attr.push_text(&decoded);
        }
    }

    fn finish_attribute(&mut self) {
        self.flush_value_text();
        let Some(attr) = self.current.take() else {
            return;
        };
        if self.attributes.iter().any(|existing| existing.name == attr.name) {
            return;
        }
        self.attributes.push(attr);
    }
}

/// Streaming tokenizer, generic over the payload type that hosts may embed in
/// attribute values. Plain markup uses `Tokenizer<Infallible>`.
pub struct Tokenizer<X> {
    config: TokenizerConfig,
    state: TokenizerState,
    cursor: usize,
    text: String,
    tag: Option<PendingTag<X>>,
    declaration: String,
    /// End tag name that closes the current raw text run.
    raw_end: Option<String>,
    tokens: Vec<Token<X>>,
    errors: Vec<ParseError>,
    finished: bool,
    stats: TokenizerStats,
}

impl<X> Tokenizer<X> {
    pub fn new(config: TokenizerConfig) -> Self {
        Self {
            config,
            state: TokenizerState::Data,
            cursor: 0,
            text: String::new(),
            tag: None,
            declaration: String::new(),
            raw_end: None,
            tokens: Vec::new(),
            errors: Vec::new(),
            finished: false,
            stats: TokenizerStats::default(),
        }
    }

    pub fn state(&self) -> TokenizerState {
        self.state
    }

    /// Byte offset of the next char to be consumed.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Return a copy of current instrumentation counters.
    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Consume a chunk of input. Tokens accumulate until `take_tokens()`.
    pub fn push_str(&mut self, chunk: &str) {
        assert!(
            !self.finished,
            "Tokenizer::push_str called after finish(); this violates end-of-stream contract"
        );
        for ch in chunk.chars() {
            self.stats.steps = self.stats.steps.saturating_add(1);
            self.step(ch);
            self.cursor += ch.len_utf8();
        }
    }

    /// Drain the tokens emitted so far.
    pub fn take_tokens(&mut self) -> Vec<Token<X>> {
        std::mem::take(&mut self.tokens)
    }

    /// Terminate an in-progress text run and return it as a token.
    ///
    /// Only content-level text is flushed; a dangling `<` that has not yet
    /// started a tag is treated as literal text.
    pub fn flush_text(&mut self) -> Option<Token<X>> {
        if self.state == TokenizerState::TagOpen {
            self.text.push('<');
            self.transition_to(TokenizerState::Data);
        }
        if !self.state.in_content() || self.text.is_empty() {
            return None;
        }
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
        Some(Token::Text(std::mem::take(&mut self.text)))
    }

    /// Splice a payload into the attribute value currently being tokenized.
    ///
    /// Valid only while `state().in_attribute_value()`; otherwise the payload
    /// is handed back. A payload right after `=` starts an unquoted value.
    pub fn embed_in_attribute_value(&mut self, payload: X) -> Result<(), X> {
        if !self.state.in_attribute_value() {
            return Err(payload);
        }
        let Some(tag) = self.tag.as_mut() else {
            return Err(payload);
        };
        let Some(_) = tag.current.as_ref() else {
            return Err(payload);
        };
        tag.flush_value_text();
        if let Some(attr) = tag.current.as_mut() {
            attr.push_embedded(payload);
        }
        if self.state == TokenizerState::BeforeAttributeValue {
            self.transition_to(TokenizerState::AttributeValueUnquoted);
        }
        Ok(())
    }

    /// Mark end-of-stream and flush trailing text.
    ///
    /// An unterminated tag, comment or declaration is dropped and recorded in
    /// `errors()`.
    pub fn finish(&mut self) -> Vec<Token<X>> {
        if self.finished {
            return self.take_tokens();
        }
        self.finished = true;
        match self.state {
            TokenizerState::Data | TokenizerState::TagOpen | TokenizerState::RawText => {
                if let Some(token) = self.flush_text() {
                    self.tokens.push(token);
                }
                self.raw_end = None;
            }
            TokenizerState::MarkupDeclarationOpen
            | TokenizerState::Comment
            | TokenizerState::Declaration => {
                self.emit_text();
                self.record_error(ParseErrorCode::EofInComment);
            }
            _ => {
                self.emit_text();
                self.tag = None;
                self.record_error(ParseErrorCode::EofInTag);
            }
        }
        self.transition_to(TokenizerState::Data);
        self.take_tokens()
    }

    fn record_error(&mut self, code: ParseErrorCode) {
        log::debug!(target: "markup.tokenizer", "parse error {code:?} @{}", self.cursor);
        self.errors.push(ParseError {
            code,
            position: self.cursor,
        });
    }

    fn transition_to(&mut self, next: TokenizerState) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "markup.tokenizer",
            "state {:?} -> {:?} @{}",
            self.state,
            next,
            self.cursor
        );
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    fn emit(&mut self, token: Token<X>) {
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
        self.tokens.push(token);
    }

    fn emit_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.emit(Token::Text(text));
        }
    }

    fn emit_tag(&mut self) {
        self.transition_to(TokenizerState::Data);
        let Some(mut tag) = self.tag.take() else {
            return;
        };
        if tag.is_end {
            self.emit(Token::EndTag { name: tag.name });
            return;
        }
        tag.finish_attribute();
        let raw_end = (!tag.self_closing && is_raw_text_element(&tag.name)).then(|| tag.name.clone());
        self.emit(Token::StartTag {
            name: tag.name,
            attributes: tag.attributes,
            self_closing: tag.self_closing,
        });
        if raw_end.is_some() {
            self.raw_end = raw_end;
            self.transition_to(TokenizerState::RawText);
        }
    }

    fn fold(&self, ch: char) -> char {
        if self.config.lowercase_names {
            ch.to_ascii_lowercase()
        } else {
            ch
        }
    }

    fn start_tag(&mut self, is_end: bool) {
        self.emit_text();
        self.tag = Some(PendingTag::new(is_end));
    }

    fn push_tag_name(&mut self, ch: char) {
        let ch = self.fold(ch);
        if let Some(tag) = self.tag.as_mut() {
            tag.name.push(ch);
        }
    }

    fn start_attribute(&mut self, ch: char) {
        let ch = self.fold(ch);
        if let Some(tag) = self.tag.as_mut() {
            tag.finish_attribute();
            let mut attr = Attribute::new(String::new());
            attr.name.push(ch);
            tag.current = Some(attr);
        }
        self.transition_to(TokenizerState::AttributeName);
    }

    fn push_attribute_name(&mut self, ch: char) {
        let ch = self.fold(ch);
        if let Some(attr) = self.tag.as_mut().and_then(|tag| tag.current.as_mut()) {
            attr.name.push(ch);
        }
    }

    fn push_value(&mut self, ch: char) {
        if let Some(tag) = self.tag.as_mut() {
            tag.raw_value.push(ch);
        }
    }

    fn close_value(&mut self) {
        if let Some(tag) = self.tag.as_mut() {
            tag.flush_value_text();
        }
    }

    fn set_self_closing(&mut self) {
        if let Some(tag) = self.tag.as_mut() {
            tag.self_closing = true;
        }
    }

    fn step(&mut self, ch: char) {
        match self.state {
            TokenizerState::Data => self.step_data(ch),
            TokenizerState::RawText => self.step_raw_text(ch),
            TokenizerState::TagOpen => self.step_tag_open(ch),
            TokenizerState::EndTagOpen => self.step_end_tag_open(ch),
            TokenizerState::TagName => self.step_tag_name(ch),
            TokenizerState::EndTagName => self.step_end_tag_name(ch),
            TokenizerState::AfterEndTagName => {
                if ch == '>' {
                    self.emit_tag();
                }
            }
            TokenizerState::BeforeAttributeName => self.step_before_attribute_name(ch),
            TokenizerState::AttributeName => self.step_attribute_name(ch),
            TokenizerState::AfterAttributeName => self.step_after_attribute_name(ch),
            TokenizerState::BeforeAttributeValue => self.step_before_attribute_value(ch),
            TokenizerState::AttributeValueDoubleQuoted => self.step_quoted_value(ch, '"'),
            TokenizerState::AttributeValueSingleQuoted => self.step_quoted_value(ch, '\''),
            TokenizerState::AttributeValueUnquoted => self.step_unquoted_value(ch),
            TokenizerState::AfterAttributeValueQuoted => self.step_after_quoted_value(ch),
            TokenizerState::SelfClosingStartTag => {
                if ch == '>' {
                    self.set_self_closing();
                    self.emit_tag();
                } else {
                    self.transition_to(TokenizerState::BeforeAttributeName);
                    self.step_before_attribute_name(ch);
                }
            }
            TokenizerState::MarkupDeclarationOpen => self.step_markup_declaration_open(ch),
            TokenizerState::Comment => self.step_comment(ch),
            TokenizerState::Declaration => {
                if ch == '>' {
                    let text = std::mem::take(&mut self.declaration);
                    self.emit(Token::Declaration(text));
                    self.transition_to(TokenizerState::Data);
                } else {
                    self.declaration.push(ch);
                }
            }
        }
    }

    fn step_data(&mut self, ch: char) {
        if ch == '<' {
            self.transition_to(TokenizerState::TagOpen);
        } else {
            self.text.push(ch);
        }
    }

    fn step_raw_text(&mut self, ch: char) {
        if ch == '>' || ch == '/' || is_whitespace(ch) {
            if let Some(end) = self.raw_end.take() {
                if ends_with_end_tag(&self.text, &end) {
                    self.text.truncate(self.text.len() - end.len() - 2);
                    self.start_tag(true);
                    for c in end.chars() {
                        self.push_tag_name(c);
                    }
                    if ch == '>' {
                        self.emit_tag();
                    } else {
                        self.transition_to(TokenizerState::AfterEndTagName);
                    }
                    return;
                }
                self.raw_end = Some(end);
            }
        }
        self.text.push(ch);
    }

    fn step_tag_open(&mut self, ch: char) {
        match ch {
            '!' => {
                self.emit_text();
                self.declaration.clear();
                self.transition_to(TokenizerState::MarkupDeclarationOpen);
            }
            '/' => {
                self.start_tag(true);
                self.transition_to(TokenizerState::EndTagOpen);
            }
            c if c.is_ascii_alphabetic() => {
                self.start_tag(false);
                self.push_tag_name(c);
                self.transition_to(TokenizerState::TagName);
            }
            '<' => {
                // `<<`: the first one was literal text.
                self.text.push('<');
            }
            c => {
                self.text.push('<');
                self.text.push(c);
                self.transition_to(TokenizerState::Data);
            }
        }
    }

    fn step_end_tag_open(&mut self, ch: char) {
        match ch {
            c if c.is_ascii_alphabetic() => {
                self.push_tag_name(c);
                self.transition_to(TokenizerState::EndTagName);
            }
            '>' => {
                // `</>` is dropped.
                self.tag = None;
                self.transition_to(TokenizerState::Data);
            }
            c => {
                self.tag = None;
                self.declaration.clear();
                self.declaration.push(c);
                self.transition_to(TokenizerState::Declaration);
            }
        }
    }

    fn step_tag_name(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => self.transition_to(TokenizerState::BeforeAttributeName),
            '/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            '>' => self.emit_tag(),
            c => self.push_tag_name(c),
        }
    }

    fn step_end_tag_name(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) || c == '/' => {
                self.transition_to(TokenizerState::AfterEndTagName)
            }
            '>' => self.emit_tag(),
            c => self.push_tag_name(c),
        }
    }

    fn step_before_attribute_name(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => {}
            '/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            '>' => self.emit_tag(),
            c => self.start_attribute(c),
        }
    }

    fn step_attribute_name(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => self.transition_to(TokenizerState::AfterAttributeName),
            '=' => self.transition_to(TokenizerState::BeforeAttributeValue),
            '/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            '>' => self.emit_tag(),
            c => self.push_attribute_name(c),
        }
    }

    fn step_after_attribute_name(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => {}
            '=' => self.transition_to(TokenizerState::BeforeAttributeValue),
            '/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            '>' => self.emit_tag(),
            c => self.start_attribute(c),
        }
    }

    fn step_before_attribute_value(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => {}
            '"' => self.transition_to(TokenizerState::AttributeValueDoubleQuoted),
            '\'' => self.transition_to(TokenizerState::AttributeValueSingleQuoted),
            '>' => self.emit_tag(),
            c => {
                self.push_value(c);
                self.transition_to(TokenizerState::AttributeValueUnquoted);
            }
        }
    }

    fn step_quoted_value(&mut self, ch: char, quote: char) {
        if ch == quote {
            self.close_value();
            self.transition_to(TokenizerState::AfterAttributeValueQuoted);
        } else {
            self.push_value(ch);
        }
    }

    fn step_unquoted_value(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => {
                self.close_value();
                self.transition_to(TokenizerState::BeforeAttributeName);
            }
            '>' => {
                self.close_value();
                self.emit_tag();
            }
            c => self.push_value(c),
        }
    }

    fn step_after_quoted_value(&mut self, ch: char) {
        match ch {
            c if is_whitespace(c) => self.transition_to(TokenizerState::BeforeAttributeName),
            '/' => self.transition_to(TokenizerState::SelfClosingStartTag),
            '>' => self.emit_tag(),
            c => {
                self.transition_to(TokenizerState::BeforeAttributeName);
                self.step_before_attribute_name(c);
            }
        }
    }

    fn step_markup_declaration_open(&mut self, ch: char) {
        self.declaration.push(ch);
        match self.declaration.as_str() {
            "--" => {
                self.declaration.clear();
                self.transition_to(TokenizerState::Comment);
            }
            "-" => {}
            _ if ch == '>' => {
                self.declaration.pop();
                let text = std::mem::take(&mut self.declaration);
                self.emit(Token::Declaration(text));
                self.transition_to(TokenizerState::Data);
            }
            _ => self.transition_to(TokenizerState::Declaration),
        }
    }

    fn step_comment(&mut self, ch: char) {
        if ch == '>' && self.declaration.ends_with("--") {
            let len = self.declaration.len() - 2;
            self.declaration.truncate(len);
            let text = std::mem::take(&mut self.declaration);
            self.emit(Token::Comment(text));
            self.transition_to(TokenizerState::Data);
        } else {
            self.declaration.push(ch);
        }
    }
}

impl<X> Default for Tokenizer<X> {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

/// `text` ends with `</name`, ASCII case-insensitively.
fn ends_with_end_tag(text: &str, name: &str) -> bool {
    let len = name.len() + 2;
    if text.len() < len {
        return false;
    }
    let tail = &text.as_bytes()[text.len() - len..];
    tail.starts_with(b"</") && tail[2..].eq_ignore_ascii_case(name.as_bytes())
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Tokenize a complete markup string without embedded payloads.
pub fn tokenize(input: &str) -> (Vec<Token<Infallible>>, Vec<ParseError>) {
    let mut tokenizer = Tokenizer::default();
    tokenizer.push_str(input);
    let mut tokens = tokenizer.take_tokens();
    tokens.extend(tokenizer.finish());
    let errors = tokenizer.errors().to_vec();
    (tokens, errors)
}
