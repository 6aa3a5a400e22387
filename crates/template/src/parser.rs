//! Mustache parser producing the expression program.
//!
//! Supported syntax:
//! - `{{path}}`, `{{{path}}}`, `{{& path}}`
//! - `{{helper arg "str" 1 true key=value}}`
//! - `{{#name args}}...{{else}}...{{/name}}`, `{{^name}}...{{/name}}`
//! - `{{! comment }}`, `{{!-- comment --}}`
//! - `\{{` for a literal `{{`
//!
//! Partials, sub-expressions, parent paths (`../`) and whitespace control
//! (`~`) are rejected with a `ParseError`.

use crate::ast::{Block, Mustache, Param, PathExpr, Program, Statement};
use crate::error::ParseError;
use serde_json::Number;

/// Source of expression programs. The builder only depends on the AST, so
/// an embedder can swap in a different front end.
pub trait ExpressionParser {
    fn parse(&self, source: &str) -> Result<Program, ParseError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MustacheParser;

impl ExpressionParser for MustacheParser {
    fn parse(&self, source: &str) -> Result<Program, ParseError> {
        parse(source)
    }
}

struct OpenBlock {
    mustache: Mustache,
    position: usize,
    program: Vec<Statement>,
    inverse: Option<Vec<Statement>>,
}

impl OpenBlock {
    fn statements(&mut self) -> &mut Vec<Statement> {
        match self.inverse.as_mut() {
            Some(inverse) => inverse,
            None => &mut self.program,
        }
    }
}

struct ProgramBuilder {
    root: Vec<Statement>,
    blocks: Vec<OpenBlock>,
    content: String,
}

impl ProgramBuilder {
    fn current(&mut self) -> &mut Vec<Statement> {
        match self.blocks.last_mut() {
            Some(block) => block.statements(),
            None => &mut self.root,
        }
    }

    fn flush_content(&mut self) {
        if self.content.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.content);
        self.current().push(Statement::Content(content));
    }

    fn push(&mut self, statement: Statement) {
        self.flush_content();
        self.current().push(statement);
    }
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut builder = ProgramBuilder {
        root: Vec::new(),
        blocks: Vec::new(),
        content: String::new(),
    };
    let mut pos = 0;

    while let Some(rel) = source[pos..].find("{{") {
        let open = pos + rel;
        if open > 0 && source.as_bytes()[open - 1] == b'\\' {
            builder.content.push_str(&source[pos..open - 1]);
            builder.content.push_str("{{");
            pos = open + 2;
            continue;
        }
        builder.content.push_str(&source[pos..open]);

        if source[open..].starts_with("{{!--") {
            let end = source[open..]
                .find("--}}")
                .ok_or_else(|| ParseError::new("unclosed comment", open))?;
            pos = open + end + 4;
            continue;
        }

        let triple = source[open..].starts_with("{{{");
        let (inner_start, closer) = if triple { (open + 3, "}}}") } else { (open + 2, "}}") };
        let inner_end = source[inner_start..]
            .find(closer)
            .map(|rel| inner_start + rel)
            .ok_or_else(|| ParseError::new("unclosed mustache", open))?;
        pos = inner_end + closer.len();
        let inner = &source[inner_start..inner_end];

        if triple {
            let mustache = parse_expression(inner, inner_start)?.raw();
            builder.push(Statement::Mustache(mustache));
            continue;
        }
        handle_tag(&mut builder, inner, inner_start, open)?;
    }
    builder.content.push_str(&source[pos..]);
    builder.flush_content();

    if let Some(block) = builder.blocks.last() {
        return Err(ParseError::new(
            format!("unclosed block {{{{#{}}}}}", block.mustache.path.original),
            block.position,
        ));
    }
    Ok(Program::new(builder.root))
}

fn handle_tag(
    builder: &mut ProgramBuilder,
    inner: &str,
    inner_start: usize,
    open: usize,
) -> Result<(), ParseError> {
    let trimmed = inner.trim();
    let lead = inner.len() - inner.trim_start().len();
    let body_start = inner_start + lead + 1;
    let Some(sigil) = trimmed.chars().next() else {
        return Err(ParseError::new("empty mustache", open));
    };

    match sigil {
        '!' => Ok(()),
        '~' => Err(ParseError::new("whitespace control is not supported", open)),
        '>' => Err(ParseError::new("partials are not supported", open)),
        '#' => {
            let mustache = parse_expression(&trimmed[1..], body_start)?;
            builder.flush_content();
            builder.blocks.push(OpenBlock {
                mustache,
                position: open,
                program: Vec::new(),
                inverse: None,
            });
            Ok(())
        }
        '^' if trimmed[1..].trim().is_empty() => start_inverse(builder, open),
        '^' => {
            let mustache = parse_expression(&trimmed[1..], body_start)?;
            builder.flush_content();
            builder.blocks.push(OpenBlock {
                mustache,
                position: open,
                program: Vec::new(),
                inverse: Some(Vec::new()),
            });
            Ok(())
        }
        '/' => {
            let name = trimmed[1..].trim();
            builder.flush_content();
            let Some(block) = builder.blocks.pop() else {
                return Err(ParseError::new(format!("unexpected {{{{/{name}}}}}"), open));
            };
            if block.mustache.path.original != name {
                return Err(ParseError::new(
                    format!(
                        "{} doesn't match {}",
                        block.mustache.path.original, name
                    ),
                    open,
                ));
            }
            let statement = Statement::Block(Block {
                mustache: block.mustache,
                program: Program::new(block.program),
                inverse: block.inverse.map(Program::new),
            });
            builder.current().push(statement);
            Ok(())
        }
        '&' => {
            let mustache = parse_expression(&trimmed[1..], body_start)?.raw();
            builder.push(Statement::Mustache(mustache));
            Ok(())
        }
        _ if trimmed == "else" => start_inverse(builder, open),
        _ => {
            let mustache = parse_expression(inner, inner_start)?;
            builder.push(Statement::Mustache(mustache));
            Ok(())
        }
    }
}

fn start_inverse(builder: &mut ProgramBuilder, open: usize) -> Result<(), ParseError> {
    builder.flush_content();
    match builder.blocks.last_mut() {
        Some(block) if block.inverse.is_none() => {
            block.inverse = Some(Vec::new());
            Ok(())
        }
        Some(_) => Err(ParseError::new("duplicate {{else}} in block", open)),
        None => Err(ParseError::new("{{else}} outside of a block", open)),
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.offset + self.pos)
    }

    /// Reads `key=` if the next word is a hash key.
    fn hash_key(&mut self) -> Option<String> {
        let rest = self.rest();
        let end = rest.find(|c: char| c.is_whitespace() || matches!(c, '=' | '"' | '\'' | '(' | ')'))?;
        if end == 0 || !rest[end..].starts_with('=') {
            return None;
        }
        self.pos += end + 1;
        Some(rest[..end].to_string())
    }

    fn word(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '='))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        self.pos = start;
        Err(self.error("unterminated string literal"))
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => self.string(quote).map(Param::String),
            Some('(') => Err(self.error("sub-expressions are not supported")),
            Some(_) => {
                let at = self.pos;
                let word = self.word();
                if word.is_empty() {
                    return Err(self.error("expected an argument"));
                }
                literal_or_path(word).map_err(|message| ParseError::new(message, self.offset + at))
            }
            None => Err(self.error("expected an argument")),
        }
    }
}

fn literal_or_path(word: &str) -> Result<Param, String> {
    match word {
        "true" => return Ok(Param::Boolean(true)),
        "false" => return Ok(Param::Boolean(false)),
        _ => {}
    }
    if let Some(number) = parse_number(word) {
        return Ok(Param::Number(number));
    }
    parse_path(word).map(Param::Path)
}

fn parse_number(word: &str) -> Option<Number> {
    let digits = word.strip_prefix('-').unwrap_or(word);
    if digits.is_empty() || !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if let Ok(int) = word.parse::<i64>() {
        return Some(Number::from(int));
    }
    word.parse::<f64>().ok().and_then(Number::from_f64)
}

pub(crate) fn parse_path(word: &str) -> Result<PathExpr, String> {
    if word == "this" || word == "." {
        return Ok(PathExpr {
            original: word.to_string(),
            parts: Vec::new(),
            scoped: true,
        });
    }
    let (scoped, rest) = if let Some(rest) = word.strip_prefix("this.").or_else(|| word.strip_prefix("this/")) {
        (true, rest)
    } else if let Some(rest) = word.strip_prefix("./") {
        (true, rest)
    } else {
        (false, word)
    };
    let mut parts = Vec::new();
    for segment in rest.split(['.', '/']) {
        match segment {
            "" => return Err(format!("invalid path `{word}`")),
            ".." => return Err(format!("parent paths are not supported: `{word}`")),
            "this" => return Err(format!("`this` must lead a path: `{word}`")),
            _ => parts.push(segment.to_string()),
        }
    }
    Ok(PathExpr {
        original: word.to_string(),
        parts,
        scoped,
    })
}

/// Parse the inside of a mustache (`helper arg key=value`).
fn parse_expression(src: &str, offset: usize) -> Result<Mustache, ParseError> {
    let mut cursor = Cursor {
        src,
        pos: 0,
        offset,
    };
    cursor.skip_whitespace();
    let head = match cursor.param()? {
        Param::Path(path) => path,
        _ => return Err(ParseError::new("expected a path or helper name", offset)),
    };

    let mut params = Vec::new();
    let mut hash = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.at_end() {
            break;
        }
        if let Some(key) = cursor.hash_key() {
            let value = cursor.param()?;
            hash.push((key, value));
            continue;
        }
        if !hash.is_empty() {
            return Err(cursor.error("positional arguments must precede hash arguments"));
        }
        params.push(cursor.param()?);
    }

    Ok(Mustache::new(head).with_params(params).with_hash(hash))
}
