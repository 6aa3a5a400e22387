//! Character references and escaping.
//!
//! Decoding is deliberately narrow: the named references `&amp;`, `&lt;`,
//! `&gt;`, `&quot;`, `&apos;`, `&nbsp;` and semicolon-terminated numeric
//! references (`&#123;`, `&#x1F4A9;`). Anything else passes through unchanged.

use memchr::{memchr, memchr3};

const MAX_HEX_DIGITS: usize = 6;
const MAX_DEC_DIGITS: usize = 7;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
];

pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;
    while i < bytes.len() {
        let Some(rel) = memchr(b'&', &bytes[i..]) else {
            out.push_str(&s[i..]);
            break;
        };
        let amp = i + rel;
        out.push_str(&s[i..amp]);
        match decode_reference(s, amp) {
            Some((ch, next)) => {
                out.push(ch);
                i = next;
            }
            None => {
                out.push('&');
                i = amp + 1;
            }
        }
    }
    out
}

/// Decode the reference starting at `amp` (which indexes a `&`). Returns the
/// decoded char and the index just past the terminating `;`.
fn decode_reference(s: &str, amp: usize) -> Option<(char, usize)> {
    let rest = &s[amp + 1..];
    let semi = rest.find(';')?;
    let body = &rest[..semi];
    let next = amp + 1 + semi + 1;
    if let Some(numeric) = body.strip_prefix('#') {
        let (digits, radix, max) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, MAX_HEX_DIGITS),
            None => (numeric, 10, MAX_DEC_DIGITS),
        };
        if digits.is_empty()
            || digits.len() > max
            || !digits.chars().all(|c| c.is_digit(radix))
        {
            return None;
        }
        let value = u32::from_str_radix(digits, radix).ok()?;
        return char::from_u32(value).map(|ch| (ch, next));
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, ch)| (*ch, next))
}

/// Escape text content for serialization (`&`, `<`, `>`).
pub fn escape_text(s: &str) -> String {
    escape_with(s, |b| memchr3(b'&', b'<', b'>', b))
}

/// Escape a double-quoted attribute value (`&`, `"`).
pub fn escape_attribute(s: &str) -> String {
    escape_with(s, |b| memchr::memchr2(b'&', b'"', b))
}

fn escape_with(s: &str, find: impl Fn(&[u8]) -> Option<usize>) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while let Some(rel) = find(&bytes[i..]) {
        let pos = i + rel;
        out.push_str(&s[i..pos]);
        out.push_str(match bytes[pos] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            _ => "&quot;",
        });
        i = pos + 1;
    }
    out.push_str(&s[i..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&nbsp;"), "\u{00A0}");
    }

    #[test]
    fn malformed_references_pass_through() {
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("&#1234567890;"), "&#1234567890;");
        assert_eq!(decode_entities("&amp"), "&amp");
    }

    #[test]
    fn escapes_for_text_and_attributes() {
        assert_eq!(escape_text("<b>x & \"y\"</b>"), "&lt;b&gt;x &amp; \"y\"&lt;/b&gt;");
        assert_eq!(escape_attribute("a \"b\" & <c>"), "a &quot;b&quot; &amp; <c>");
    }
}
