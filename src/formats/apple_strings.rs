//! Support for the Apple `.strings` localization format.
//!
//! The grammar is a sequence of `"key" = "value";` pairs with optional
//! `//` and `/* ... */` comments attached to the next pair. Parsing is a
//! hand-written tokenizer rather than a generic parser: the format's
//! escape rules (`\n \r \t \" \\` and `\Uxxxx` UTF-16 escapes) and
//! comment attachment do not map onto any off-the-shelf grammar.

use std::{fs::File, io::Read, iter::Peekable, path::Path, str::Chars};

use crate::{
    error::Error,
    traits::Parser,
    types::{Entry, normalize_comment},
};

/// An Apple `.strings` document: ordered pairs with optional comments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub pairs: Vec<Pair>,
}

/// A single key-value pair, possibly with an associated comment.
///
/// Comments are stored without their `//` or `/* */` markers. Only
/// comments immediately preceding a pair attach to it; blank lines in
/// between are insignificant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

impl Parser for Document {
    fn from_reader<R: std::io::BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let pairs = tokenize(&content)?;
        Ok(Document { pairs })
    }

    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut out = String::new();
        for pair in &self.pairs {
            if let Some(comment) = &pair.comment {
                out.push_str("/* ");
                out.push_str(comment);
                out.push_str(" */\n");
            }
            out.push('"');
            out.push_str(&escape(&pair.key));
            out.push_str("\" = \"");
            out.push_str(&escape(&pair.value));
            out.push_str("\";\n\n");
        }
        writer.write_all(out.as_bytes()).map_err(Error::Io)
    }

    /// BOM-aware file reading: Apple tooling frequently emits UTF-16
    /// `.strings` files.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(path.display())
            } else {
                Error::Io(e)
            }
        })?;
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;
        Self::from_str(&decoded)
    }
}

impl Document {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        Document {
            pairs: entries
                .into_iter()
                .map(|entry| Pair {
                    key: entry.key.clone(),
                    value: entry.flat_value().to_string(),
                    comment: entry.comment.clone(),
                })
                .collect(),
        }
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.pairs
            .into_iter()
            .map(|pair| Entry::singular(pair.key, pair.value).with_comment(pair.comment))
            .collect()
    }
}

fn tokenize(content: &str) -> Result<Vec<Pair>, Error> {
    let mut chars = content.chars().peekable();
    let mut pairs = Vec::new();
    let mut pending_comment: Option<String> = None;

    loop {
        skip_whitespace(&mut chars);
        match chars.peek() {
            None => break,
            Some('/') => {
                let comment = read_comment(&mut chars)?;
                // Consecutive line comments form one logical block.
                match &mut pending_comment {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(&comment);
                    }
                    None => pending_comment = Some(comment),
                }
            }
            Some('"') => {
                chars.next();
                let key = read_quoted(&mut chars)?;
                skip_whitespace(&mut chars);
                expect(&mut chars, '=')?;
                skip_whitespace(&mut chars);
                expect(&mut chars, '"')?;
                let value = read_quoted(&mut chars)?;
                skip_whitespace(&mut chars);
                expect(&mut chars, ';')?;
                pairs.push(Pair {
                    key,
                    value,
                    comment: normalize_comment(pending_comment.take()),
                });
            }
            Some(other) => {
                return Err(Error::MalformedInput(format!(
                    "unexpected character `{}` outside of a key-value pair",
                    other
                )));
            }
        }
    }
    Ok(pairs)
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn expect(chars: &mut Peekable<Chars>, expected: char) -> Result<(), Error> {
    match chars.next() {
        Some(c) if c == expected => Ok(()),
        Some(c) => Err(Error::MalformedInput(format!(
            "expected `{}`, found `{}`",
            expected, c
        ))),
        None => Err(Error::MalformedInput(format!(
            "expected `{}`, found end of file",
            expected
        ))),
    }
}

/// Reads a `//` or `/* */` comment, returning its text without markers.
fn read_comment(chars: &mut Peekable<Chars>) -> Result<String, Error> {
    chars.next(); // leading '/'
    match chars.next() {
        Some('/') => {
            let mut text = String::new();
            for c in chars.by_ref() {
                if c == '\n' {
                    break;
                }
                text.push(c);
            }
            Ok(text.trim().to_string())
        }
        Some('*') => {
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('*') if chars.peek() == Some(&'/') => {
                        chars.next();
                        return Ok(text.trim().to_string());
                    }
                    Some(c) => text.push(c),
                    None => {
                        return Err(Error::MalformedInput(
                            "unterminated block comment".to_string(),
                        ));
                    }
                }
            }
        }
        _ => Err(Error::MalformedInput(
            "stray `/` outside of a comment".to_string(),
        )),
    }
}

/// Reads a quoted string body; the opening quote is already consumed.
fn read_quoted(chars: &mut Peekable<Chars>) -> Result<String, Error> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some('"') => return Ok(text),
            Some('\\') => text.push(read_escape(chars)?),
            Some(c) => text.push(c),
            None => return Err(Error::MalformedInput("unterminated string".to_string())),
        }
    }
}

fn read_escape(chars: &mut Peekable<Chars>) -> Result<char, Error> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('"') => Ok('"'),
        Some('\\') => Ok('\\'),
        Some('U') | Some('u') => read_unicode_escape(chars),
        // Unknown escapes collapse to the escaped character itself.
        Some(c) => Ok(c),
        None => Err(Error::MalformedInput(
            "unterminated escape sequence".to_string(),
        )),
    }
}

/// `\Uxxxx` escapes are UTF-16 code units; high/low surrogate pairs span
/// two consecutive escapes.
fn read_unicode_escape(chars: &mut Peekable<Chars>) -> Result<char, Error> {
    let first = read_hex4(chars)?;
    if (0xD800..0xDC00).contains(&first) {
        // High surrogate: require an immediately following \Uxxxx low half.
        if chars.next() != Some('\\') || !matches!(chars.next(), Some('U') | Some('u')) {
            return Err(Error::MalformedInput(
                "high surrogate escape without a low surrogate".to_string(),
            ));
        }
        let second = read_hex4(chars)?;
        if !(0xDC00..0xE000).contains(&second) {
            return Err(Error::MalformedInput(
                "invalid low surrogate in escape sequence".to_string(),
            ));
        }
        let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
        char::from_u32(combined)
            .ok_or_else(|| Error::MalformedInput("invalid unicode escape".to_string()))
    } else {
        char::from_u32(first)
            .ok_or_else(|| Error::MalformedInput("invalid unicode escape".to_string()))
    }
}

fn read_hex4(chars: &mut Peekable<Chars>) -> Result<u32, Error> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| Error::MalformedInput("invalid \\U escape digits".to_string()))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_parse_basic_pair_with_comment() {
        let content = indoc! {r#"
            /* Greeting for the user */
            "hello" = "Hello, world!";
        "#};
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 1);
        let pair = &parsed.pairs[0];
        assert_eq!(pair.key, "hello");
        assert_eq!(pair.value, "Hello, world!");
        assert_eq!(pair.comment.as_deref(), Some("Greeting for the user"));
    }

    #[test]
    fn test_line_comments_attach_to_next_pair() {
        let content = indoc! {r#"
            // Comment for A
            "A" = "a";

            // First line
            // Second line
            "B" = "b";
            "C" = "c";
        "#};
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 3);
        assert_eq!(parsed.pairs[0].comment.as_deref(), Some("Comment for A"));
        assert_eq!(
            parsed.pairs[1].comment.as_deref(),
            Some("First line\nSecond line")
        );
        assert_eq!(parsed.pairs[2].comment, None);
    }

    #[test]
    fn test_escape_sequences() {
        let content = r#""multi" = "line one\nline two\t\"quoted\" \\ back";"#;
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(
            parsed.pairs[0].value,
            "line one\nline two\t\"quoted\" \\ back"
        );
    }

    #[test]
    fn test_unicode_escapes() {
        let content = r#""u" = "caf\U00e9";"#;
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.pairs[0].value, "café");
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let content = r#""emoji" = "\Ud83d\Ude00";"#;
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.pairs[0].value, "😀");
    }

    #[test]
    fn test_unterminated_string_is_malformed() {
        let result = Document::from_str(r#""key" = "no end"#);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_missing_semicolon_is_malformed() {
        let result = Document::from_str(r#""key" = "value""#);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_write_round_trip() {
        let document = Document {
            pairs: vec![
                Pair {
                    key: "hello".to_string(),
                    value: "Hello \"there\"\nsecond line".to_string(),
                    comment: Some("Greeting".to_string()),
                },
                Pair {
                    key: "bye".to_string(),
                    value: String::new(),
                    comment: None,
                },
            ],
        };
        let mut out = Vec::new();
        document.to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("/* Greeting */"));

        let reparsed = Document::from_str(&text).unwrap();
        assert_eq!(reparsed, document);
    }

    #[test]
    fn test_blank_lines_insignificant() {
        let content = "\n\n\"a\" = \"1\";\n\n\n\"b\" = \"2\";\n";
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 2);
    }

    #[test]
    fn test_entry_conversion() {
        let content = r#""hello" = "Bonjour";"#;
        let entries = Document::from_str(content).unwrap().into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "hello");
        assert_eq!(entries[0].flat_value(), "Bonjour");
        assert!(!entries[0].is_plural());
    }
}
