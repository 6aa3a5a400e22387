//! Tokenizer state machine definitions.
//!
//! The state is public so that hosts interleaving foreign payloads with the
//! character stream can decide where a payload belongs (content, tag body, or
//! attribute value).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenizerState {
    Data,
    /// Content of `script` or `style`, up to the matching end tag.
    RawText,
    TagOpen,
    EndTagOpen,
    TagName,
    EndTagName,
    AfterEndTagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    MarkupDeclarationOpen,
    Comment,
    Declaration,
}

impl TokenizerState {
    /// True while an attribute value may still receive parts.
    pub fn in_attribute_value(self) -> bool {
        matches!(
            self,
            TokenizerState::BeforeAttributeValue
                | TokenizerState::AttributeValueDoubleQuoted
                | TokenizerState::AttributeValueSingleQuoted
                | TokenizerState::AttributeValueUnquoted
        )
    }

    /// True between attributes of a start tag, where the next thing would be
    /// an attribute name.
    pub fn before_attribute_name(self) -> bool {
        matches!(
            self,
            TokenizerState::BeforeAttributeName | TokenizerState::AfterAttributeName
        )
    }

    /// True where text and host payloads become element content.
    pub fn in_content(self) -> bool {
        matches!(self, TokenizerState::Data | TokenizerState::RawText)
    }

    /// True anywhere inside `<...>`.
    pub fn in_tag(self) -> bool {
        !matches!(
            self,
            TokenizerState::Data
                | TokenizerState::RawText
                | TokenizerState::TagOpen
                | TokenizerState::MarkupDeclarationOpen
                | TokenizerState::Comment
                | TokenizerState::Declaration
        )
    }
}
