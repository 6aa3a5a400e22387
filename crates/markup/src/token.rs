//! Markup token model.

/// One piece of an attribute value.
///
/// Attribute values are sequences so that a host (the template builder) can
/// splice embedded payloads between literal text runs while the tag is still
/// being tokenized.
#[derive(Clone, Debug, PartialEq)]
pub enum ValuePart<X> {
    /// Literal text, entity-decoded.
    Text(String),
    /// Payload handed to the tokenizer through `Tokenizer::embed_in_attribute_value`.
    Embedded(X),
}

impl<X> ValuePart<X> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValuePart::Text(text) => Some(text),
            ValuePart::Embedded(_) => None,
        }
    }
}

/// Attribute with a lowercase name and an ordered value.
///
/// Determinism contract:
/// - Attributes on a `StartTag` are stored in encounter order.
/// - Duplicate attribute names in one tag keep the first occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute<X> {
    pub name: String,
    pub value: Vec<ValuePart<X>>,
}

impl<X> Attribute<X> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Vec::new(),
        }
    }

    /// Returns the value when it contains no embedded parts.
    pub fn static_value(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.value {
            out.push_str(part.as_text()?);
        }
        Some(out)
    }

    /// Appends literal text, merging with a trailing text part.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ValuePart::Text(last)) = self.value.last_mut() {
            last.push_str(text);
        } else {
            self.value.push(ValuePart::Text(text.to_string()));
        }
    }

    pub fn push_embedded(&mut self, payload: X) {
        self.value.push(ValuePart::Embedded(payload));
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token<X> {
    /// Raw character data, exactly as written in the source.
    Text(String),
    StartTag {
        name: String,
        attributes: Vec<Attribute<X>>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// `<!-- ... -->` body.
    Comment(String),
    /// `<!...>` that is not a comment (doctype and friends).
    Declaration(String),
}

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
/// Elements whose content is raw text rather than markup.
pub fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}
