//! Mixed-tree builder.
//!
//! Content statements are streamed through the markup tokenizer while
//! mustaches and blocks are placed according to the tokenizer's state at the
//! moment they occur:
//! - inside an attribute value: spliced into that value;
//! - between attributes: pending element-level expression for the next
//!   start tag;
//! - in content: child of the innermost open node.
//!
//! Elements pass through the macro engine when they close.

#[cfg(test)]
mod tests;

use crate::ast::{Block, Mustache, Program, Statement};
use crate::error::CompileError;
use crate::macros::MacroRegistry;
use crate::parser;
use crate::tree::{BlockElement, Element, Node};
use markup::{Token, Tokenizer, TokenizerConfig, is_void_element};

enum OpenNode {
    Element(Element),
    Block {
        mustache: Mustache,
        children: Vec<Node>,
        inverse: Option<Vec<Node>>,
    },
}

impl OpenNode {
    fn describe(&self) -> String {
        match self {
            OpenNode::Element(el) => format!("<{}>", el.tag),
            OpenNode::Block { mustache, .. } => format!("{{{{#{}}}}}", mustache.path.original),
        }
    }
}

struct TreeBuilder<'a> {
    tokenizer: Tokenizer<Mustache>,
    root: Vec<Node>,
    stack: Vec<OpenNode>,
    pending_helpers: Vec<Mustache>,
    macros: &'a MacroRegistry,
}

/// Build the mixed tree for an expression program.
pub fn build(program: &Program, macros: &MacroRegistry) -> Result<Vec<Node>, CompileError> {
    let mut builder = TreeBuilder {
        tokenizer: Tokenizer::new(TokenizerConfig::default()),
        root: Vec::new(),
        stack: Vec::new(),
        pending_helpers: Vec::new(),
        macros,
    };
    builder.statements(&program.statements)?;
    builder.finish()
}

/// Parse and build in one step.
pub fn preprocess(source: &str, macros: &MacroRegistry) -> Result<Vec<Node>, CompileError> {
    let program = parser::parse(source)?;
    build(&program, macros)
}

impl TreeBuilder<'_> {
    fn statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            match statement {
                Statement::Content(content) => {
                    self.tokenizer.push_str(content);
                    self.drain()?;
                }
                Statement::Mustache(mustache) => self.mustache(mustache.clone())?,
                Statement::Block(block) => self.block(block)?,
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), CompileError> {
        for token in self.tokenizer.take_tokens() {
            self.token(token)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CompileError> {
        self.drain()?;
        if let Some(token) = self.tokenizer.flush_text() {
            self.token(token)?;
        }
        Ok(())
    }

    fn mustache(&mut self, mustache: Mustache) -> Result<(), CompileError> {
        self.flush()?;
        let state = self.tokenizer.state();
        if state.in_attribute_value() {
            if let Err(mustache) = self.tokenizer.embed_in_attribute_value(mustache) {
                self.pending_helpers.push(mustache);
            }
        } else if state.in_tag() {
            self.pending_helpers.push(mustache);
        } else if state.in_content() {
            self.append(Node::Mustache(mustache));
        } else {
            log::debug!(
                target: "template.builder",
                "dropping {{{{{}}}}} inside {state:?}",
                mustache.path.original
            );
        }
        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.flush()?;
        self.expect_content_state(&block.mustache)?;
        self.stack.push(OpenNode::Block {
            mustache: block.mustache.clone(),
            children: Vec::new(),
            inverse: None,
        });

        self.statements(&block.program.statements)?;
        self.end_block_body(&block.mustache)?;
        if let Some(inverse) = &block.inverse {
            if let Some(OpenNode::Block { inverse: slot, .. }) = self.stack.last_mut() {
                *slot = Some(Vec::new());
            }
            self.statements(&inverse.statements)?;
            self.end_block_body(&block.mustache)?;
        }

        match self.stack.pop() {
            Some(OpenNode::Block {
                mustache,
                children,
                inverse,
            }) => {
                self.append(Node::Block(BlockElement {
                    mustache,
                    children,
                    inverse,
                }));
                Ok(())
            }
            Some(OpenNode::Element(el)) => Err(CompileError::UnclosedElement { tag: el.tag }),
            None => Err(CompileError::StructuralMismatch {
                expected: None,
                found: format!("{{{{/{}}}}}", block.mustache.path.original),
                position: self.tokenizer.position(),
            }),
        }
    }

    fn end_block_body(&mut self, mustache: &Mustache) -> Result<(), CompileError> {
        self.flush()?;
        self.expect_content_state(mustache)?;
        match self.stack.last() {
            Some(OpenNode::Block { .. }) => Ok(()),
            Some(OpenNode::Element(el)) => Err(CompileError::UnclosedElement { tag: el.tag.clone() }),
            None => Err(CompileError::StructuralMismatch {
                expected: None,
                found: format!("{{{{/{}}}}}", mustache.path.original),
                position: self.tokenizer.position(),
            }),
        }
    }

    fn expect_content_state(&self, mustache: &Mustache) -> Result<(), CompileError> {
        if self.tokenizer.state().in_content() {
            return Ok(());
        }
        Err(CompileError::MisplacedBlock {
            helper: mustache.path.original.clone(),
            position: self.tokenizer.position(),
        })
    }

    fn token(&mut self, token: Token<Mustache>) -> Result<(), CompileError> {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "template.builder", "token {token:?}");

        match token {
            Token::Text(text) => {
                if !text.is_empty() {
                    self.append(Node::Text(text));
                }
            }
            Token::Comment(text) => self.append(Node::Text(format!("<!--{text}-->"))),
            Token::Declaration(text) => {
                log::debug!(target: "template.builder", "dropping declaration <!{text}>");
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = Element {
                    attributes,
                    children: Vec::new(),
                    helpers: std::mem::take(&mut self.pending_helpers),
                    tag: name,
                };
                if self_closing || is_void_element(&element.tag) {
                    self.close(element)?;
                } else {
                    self.stack.push(OpenNode::Element(element));
                }
            }
            Token::EndTag { name } => {
                if is_void_element(&name) {
                    log::debug!(target: "template.builder", "ignoring end tag for void </{name}>");
                    return Ok(());
                }
                match self.stack.last() {
                    Some(OpenNode::Element(el)) if el.tag == name => {
                        if let Some(OpenNode::Element(el)) = self.stack.pop() {
                            self.close(el)?;
                        }
                    }
                    open => {
                        return Err(CompileError::StructuralMismatch {
                            expected: open.map(OpenNode::describe),
                            found: format!("</{name}>"),
                            position: self.tokenizer.position(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, element: Element) -> Result<(), CompileError> {
        if let Some(element) = self.macros.apply(element)? {
            self.append(Node::Element(element));
        }
        Ok(())
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(OpenNode::Element(el)) => el.children.push(node),
            Some(OpenNode::Block {
                inverse: Some(inverse),
                ..
            }) => inverse.push(node),
            Some(OpenNode::Block { children, .. }) => children.push(node),
            None => self.root.push(node),
        }
    }

    fn finish(mut self) -> Result<Vec<Node>, CompileError> {
        self.drain()?;
        for token in self.tokenizer.finish() {
            self.token(token)?;
        }
        if let Some(err) = self.tokenizer.errors().first() {
            return Err(CompileError::Markup(err.clone()));
        }
        if let Some(open) = self.stack.pop() {
            return Err(match open {
                OpenNode::Element(el) => CompileError::UnclosedElement { tag: el.tag },
                OpenNode::Block { mustache, .. } => CompileError::UnclosedElement {
                    tag: format!("{{{{#{}}}}}", mustache.path.original),
                },
            });
        }
        log::debug!(
            target: "template.builder",
            "built {} top-level node(s) in {} tokenizer steps",
            self.root.len(),
            self.tokenizer.stats().steps
        );
        Ok(self.root)
    }
}
