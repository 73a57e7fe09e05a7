//! Support for the Apple `.stringsdict` plural format.
//!
//! A `.stringsdict` is a property-list XML document, but this parser does
//! not use generic plist deserialization: only the narrow subset produced
//! by localization tooling is handled, by walking `<dict>` children as
//! alternating `<key>`/value pairs. Malformed top-level entries (missing
//! format key, no variable name, zero categories) are skipped, not fatal:
//! parse failures are entry-scoped, while a missing plist root is still
//! file-scoped.

use std::{
    collections::BTreeMap,
    io::{BufRead, Write},
};

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    name::QName,
};
use tracing::debug;

use crate::{
    error::Error,
    traits::Parser,
    types::{Entry, Plural, PluralCategory, Translation},
};

const FORMAT_KEY: &str = "NSStringLocalizedFormatKey";
const SPEC_TYPE_KEY: &str = "NSStringFormatSpecTypeKey";
const VALUE_TYPE_KEY: &str = "NSStringFormatValueTypeKey";
const PLURAL_RULE_TYPE: &str = "NSStringPluralRuleType";

/// An Apple `.stringsdict` document: plural entries only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub entries: Vec<PluralEntry>,
}

/// One plural key with its format variable and CLDR forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralEntry {
    pub key: String,
    /// Format variable name from `%#@name@` in the format key.
    pub variable: String,
    /// printf value type for the plural count: `d`, `f`, `s`, or `@`.
    pub value_type: String,
    pub forms: BTreeMap<PluralCategory, String>,
}

/// Minimal plist value tree covering what localization tooling emits.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlistValue {
    String(String),
    Dict(Vec<(String, PlistValue)>),
    /// Anything else (arrays, numbers, dates); preserved only as a marker.
    Other,
}

impl Parser for Document {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let root = parse_plist_root(reader)?;
        let mut entries = Vec::new();
        for (key, value) in root {
            match plural_entry_from_dict(&key, &value) {
                Some(entry) => entries.push(entry),
                None => debug!(key = %key, "skipping malformed stringsdict entry"),
            }
        }
        Ok(Document { entries })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml = Writer::new_with_indent(&mut writer, b' ', 4);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.write_event(Event::DocType(BytesText::from_escaped(
            r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#,
        )))?;

        let mut plist = BytesStart::new("plist");
        plist.push_attribute(("version", "1.0"));
        xml.write_event(Event::Start(plist))?;
        xml.write_event(Event::Start(BytesStart::new("dict")))?;

        for entry in &self.entries {
            write_string_element(&mut xml, "key", &entry.key)?;
            xml.write_event(Event::Start(BytesStart::new("dict")))?;

            write_string_element(&mut xml, "key", FORMAT_KEY)?;
            write_string_element(&mut xml, "string", &format!("%#@{}@", entry.variable))?;

            write_string_element(&mut xml, "key", &entry.variable)?;
            xml.write_event(Event::Start(BytesStart::new("dict")))?;
            write_string_element(&mut xml, "key", SPEC_TYPE_KEY)?;
            write_string_element(&mut xml, "string", PLURAL_RULE_TYPE)?;
            write_string_element(&mut xml, "key", VALUE_TYPE_KEY)?;
            write_string_element(&mut xml, "string", &entry.value_type)?;
            for (category, text) in &entry.forms {
                write_string_element(&mut xml, "key", category.as_str())?;
                write_string_element(&mut xml, "string", text)?;
            }
            xml.write_event(Event::End(BytesEnd::new("dict")))?;

            xml.write_event(Event::End(BytesEnd::new("dict")))?;
        }

        xml.write_event(Event::End(BytesEnd::new("dict")))?;
        xml.write_event(Event::End(BytesEnd::new("plist")))?;
        writer.write_all(b"\n").map_err(Error::Io)
    }
}

impl Document {
    /// Builds a document from the plural subset of `entries`. Singular
    /// entries are ignored; the caller routes them to `.strings`.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|entry| match &entry.value {
                Translation::Plural(plural) => Some(PluralEntry {
                    key: entry.key.clone(),
                    variable: "count".to_string(),
                    value_type: infer_value_type(&plural.forms),
                    forms: plural.forms.clone(),
                }),
                Translation::Singular(_) => None,
            })
            .collect();
        Document { entries }
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
            .into_iter()
            .filter_map(|entry| Plural::new(entry.forms).map(|plural| Entry::plural(entry.key, plural)))
            .collect()
    }
}

/// Scans CLDR form strings for an embedded printf specifier to pick the
/// plural count's value type; integer `d` is the default.
pub fn infer_value_type(forms: &BTreeMap<PluralCategory, String>) -> String {
    for text in forms.values() {
        if text.contains("%@") {
            return "@".to_string();
        }
        if text.contains("%f") || text.contains("%F") {
            return "f".to_string();
        }
        if text.contains("%s") {
            return "s".to_string();
        }
    }
    "d".to_string()
}

/// Extracts the format variable name from a `%#@name@` template: the text
/// between the two `@` delimiters. Returns `None` when the template has
/// fewer than two `@` or the name is empty.
pub fn format_variable_name(format_key: &str) -> Option<&str> {
    let first = format_key.find('@')?;
    let rest = &format_key[first + 1..];
    let second = rest.find('@')?;
    let name = &rest[..second];
    if name.is_empty() { None } else { Some(name) }
}

fn plural_entry_from_dict(key: &str, value: &PlistValue) -> Option<PluralEntry> {
    let PlistValue::Dict(pairs) = value else {
        return None;
    };
    let format_key = pairs.iter().find_map(|(k, v)| match v {
        PlistValue::String(s) if k == FORMAT_KEY => Some(s.as_str()),
        _ => None,
    })?;
    let variable = format_variable_name(format_key)?;

    let variable_dict = pairs.iter().find_map(|(k, v)| match v {
        PlistValue::Dict(inner) if k == variable => Some(inner),
        _ => None,
    })?;

    let mut value_type = "d".to_string();
    let mut forms = BTreeMap::new();
    for (k, v) in variable_dict {
        let PlistValue::String(text) = v else { continue };
        if k == VALUE_TYPE_KEY {
            value_type = text.clone();
        } else if let Ok(category) = k.parse::<PluralCategory>() {
            forms.insert(category, text.clone());
        }
    }
    if forms.is_empty() {
        return None;
    }

    Some(PluralEntry {
        key: key.to_string(),
        variable: variable.to_string(),
        value_type,
        forms,
    })
}

/// Parses the top-level `<plist><dict>` into key/value pairs.
fn parse_plist_root<R: BufRead>(reader: R) -> Result<Vec<(String, PlistValue)>, Error> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"dict" => {
                return parse_dict(&mut xml);
            }
            Ok(Event::Start(_)) | Ok(Event::Decl(_)) | Ok(Event::DocType(_)) | Ok(Event::Text(_))
            | Ok(Event::Comment(_)) => {}
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"dict" => {
                return Ok(Vec::new());
            }
            Ok(Event::Eof) => {
                return Err(Error::MalformedInput(
                    "missing plist root <dict> element".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(e.to_string())),
        }
        buf.clear();
    }
}

/// Parses `<dict>` children as alternating `<key>`/value pairs. A value
/// without a preceding key (or vice versa) is tolerated by dropping the
/// orphan.
fn parse_dict<R: BufRead>(xml: &mut Reader<R>) -> Result<Vec<(String, PlistValue)>, Error> {
    let mut pairs = Vec::new();
    let mut pending_key: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"key" => pending_key = Some(read_element_text(xml, &name)?),
                    b"dict" => {
                        let value = PlistValue::Dict(parse_dict(xml)?);
                        if let Some(key) = pending_key.take() {
                            pairs.push((key, value));
                        }
                    }
                    b"string" => {
                        let value = PlistValue::String(read_element_text(xml, &name)?);
                        if let Some(key) = pending_key.take() {
                            pairs.push((key, value));
                        }
                    }
                    _ => {
                        // Arrays, numbers, dates: skip the subtree.
                        let mut skip = Vec::new();
                        xml.read_to_end_into(QName(&name), &mut skip)?;
                        if let Some(key) = pending_key.take() {
                            pairs.push((key, PlistValue::Other));
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let value = match e.name().as_ref() {
                    b"string" => PlistValue::String(String::new()),
                    b"dict" => PlistValue::Dict(Vec::new()),
                    _ => PlistValue::Other,
                };
                if let Some(key) = pending_key.take() {
                    pairs.push((key, value));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"dict" => return Ok(pairs),
            Ok(Event::Eof) => {
                return Err(Error::MalformedInput(
                    "unterminated <dict> element".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(e.to_string())),
        }
        buf.clear();
    }
}

/// Reads the text content of the element just opened, up to its end tag.
fn read_element_text<R: BufRead>(xml: &mut Reader<R>, name: &[u8]) -> Result<String, Error> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => text.push_str(&e.unescape().map_err(|e| Error::MalformedInput(e.to_string()))?),
            Ok(Event::End(ref e)) if e.name().as_ref() == name => return Ok(text),
            Ok(Event::Eof) => {
                return Err(Error::MalformedInput(format!(
                    "unterminated <{}> element",
                    String::from_utf8_lossy(name)
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(e.to_string())),
        }
        buf.clear();
    }
}

fn write_string_element<W: Write>(
    xml: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Error> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
        <plist version="1.0">
        <dict>
            <key>items.count</key>
            <dict>
                <key>NSStringLocalizedFormatKey</key>
                <string>%#@count@</string>
                <key>count</key>
                <dict>
                    <key>NSStringFormatSpecTypeKey</key>
                    <string>NSStringPluralRuleType</string>
                    <key>NSStringFormatValueTypeKey</key>
                    <string>d</string>
                    <key>one</key>
                    <string>1 item</string>
                    <key>other</key>
                    <string>%d items</string>
                </dict>
            </dict>
        </dict>
        </plist>
    "#};

    #[test]
    fn test_parse_sample() {
        let parsed = Document::from_str(SAMPLE).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        let entry = &parsed.entries[0];
        assert_eq!(entry.key, "items.count");
        assert_eq!(entry.variable, "count");
        assert_eq!(entry.value_type, "d");
        assert_eq!(entry.forms.get(&PluralCategory::One).unwrap(), "1 item");
        assert_eq!(entry.forms.get(&PluralCategory::Other).unwrap(), "%d items");
    }

    #[test]
    fn test_format_variable_name() {
        assert_eq!(format_variable_name("%#@count@"), Some("count"));
        assert_eq!(format_variable_name("%#@items@"), Some("items"));
        assert_eq!(format_variable_name("You have %#@files@ left"), Some("files"));
        assert_eq!(format_variable_name("no delimiters"), None);
        assert_eq!(format_variable_name("%#@unterminated"), None);
        assert_eq!(format_variable_name("%#@@"), None);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let content = indoc! {r#"
            <plist version="1.0">
            <dict>
                <key>no.format.key</key>
                <dict>
                    <key>count</key>
                    <dict>
                        <key>one</key>
                        <string>1 item</string>
                    </dict>
                </dict>
                <key>good</key>
                <dict>
                    <key>NSStringLocalizedFormatKey</key>
                    <string>%#@n@</string>
                    <key>n</key>
                    <dict>
                        <key>other</key>
                        <string>%d things</string>
                    </dict>
                </dict>
            </dict>
            </plist>
        "#};
        let parsed = Document::from_str(content).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].key, "good");
    }

    #[test]
    fn test_missing_root_is_malformed() {
        let result = Document::from_str("<notaplist/>");
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_round_trip() {
        let parsed = Document::from_str(SAMPLE).unwrap();
        let mut out = Vec::new();
        parsed.to_writer(&mut out).unwrap();
        let reparsed = Document::from_str(&String::from_utf8(out).unwrap()).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_infer_value_type() {
        let forms = |text: &str| {
            let mut m = BTreeMap::new();
            m.insert(PluralCategory::Other, text.to_string());
            m
        };
        assert_eq!(infer_value_type(&forms("%d items")), "d");
        assert_eq!(infer_value_type(&forms("%@ items")), "@");
        assert_eq!(infer_value_type(&forms("%f liters")), "f");
        assert_eq!(infer_value_type(&forms("%s things")), "s");
        assert_eq!(infer_value_type(&forms("no specifier")), "d");
    }

    #[test]
    fn test_entry_conversion_round_trip() {
        let entries = Document::from_str(SAMPLE).unwrap().into_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_plural());

        let rebuilt = Document::from_entries(&entries);
        assert_eq!(rebuilt.entries[0].key, "items.count");
        assert_eq!(rebuilt.entries[0].value_type, "d");
    }
}
