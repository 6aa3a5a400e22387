//! Tokenizer parse errors.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// Input ended inside a start or end tag.
    EofInTag,
    /// Input ended inside a comment or declaration.
    EofInComment,
    /// An embedded payload arrived outside of an attribute value.
    MisplacedEmbed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub code: ParseErrorCode,
    /// Byte offset into the concatenated input.
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.code {
            ParseErrorCode::EofInTag => "unexpected end of input inside a tag",
            ParseErrorCode::EofInComment => "unexpected end of input inside a comment",
            ParseErrorCode::MisplacedEmbed => "embedded value outside of an attribute value",
        };
        write!(f, "{what} at byte {}", self.position)
    }
}

impl std::error::Error for ParseError {}
