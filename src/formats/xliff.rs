//! Support for XLIFF 1.2 and 2.0 localization interchange files.
//!
//! Both versions share one document model and one code path; the detected
//! [`XliffVersion`] selects the element vocabulary (`trans-unit`/`group`
//! for 1.2, `unit`/`segment` for 2.0). Parsing goes through a small
//! element tree because version detection and plural groups need
//! lookahead a streaming pass cannot give.
//!
//! XML safety: quick-xml performs no DTD processing and never resolves
//! external entities, so XXE payloads cannot expand; an undefined entity
//! reference fails the parse instead.

use std::{
    collections::BTreeMap,
    fmt::Display,
    io::{BufRead, Write},
};

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use tracing::warn;

use crate::{
    culture,
    error::Error,
    traits::Parser,
    types::{Entry, Plural, PluralCategory, Translation},
};

const NS_12: &str = "urn:oasis:names:tc:xliff:document:1.2";
const NS_20: &str = "urn:oasis:names:tc:xliff:document:2.0";
const PLURAL_RESTYPE: &str = "x-gettext-plurals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XliffVersion {
    V12,
    V20,
}

impl Display for XliffVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XliffVersion::V12 => write!(f, "1.2"),
            XliffVersion::V20 => write!(f, "2.0"),
        }
    }
}

/// One translation segment: source text plus optional target text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub source: String,
    pub target: Option<String>,
}

impl Segment {
    /// Resolves this segment to a value. The default language reads
    /// `source`; any other language reads `target`, falling back to
    /// `source` when the target is absent or empty.
    pub fn resolve(&self, as_default: bool) -> &str {
        if as_default {
            &self.source
        } else {
            match &self.target {
                Some(target) if !target.is_empty() => target,
                _ => &self.source,
            }
        }
    }
}

/// A translation unit: one key, singular or plural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub key: String,
    pub value: UnitValue,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitValue {
    Singular(Segment),
    Plural(BTreeMap<PluralCategory, Segment>),
}

/// An XLIFF document of either version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub version: XliffVersion,
    pub source_language: String,
    pub target_language: Option<String>,
    /// The `original` attribute of the first `<file>` element.
    pub original: Option<String>,
    pub units: Vec<Unit>,
}

impl Parser for Document {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let root = parse_tree(reader)?;
        if root.name != "xliff" {
            return Err(Error::MalformedInput(format!(
                "expected <xliff> root element, found <{}>",
                root.name
            )));
        }
        let version = detect_version(&root);
        match version {
            XliffVersion::V12 => parse_v12(&root),
            XliffVersion::V20 => parse_v20(&root),
        }
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml = Writer::new_with_indent(&mut writer, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        match self.version {
            XliffVersion::V12 => self.write_v12(&mut xml),
            XliffVersion::V20 => self.write_v20(&mut xml),
        }
    }
}

/// Version detection, in priority order: namespace URI, `version`
/// attribute prefix, language-attribute style, then the 1.2 default.
/// The namespace outranks the `version` attribute because some producers
/// emit a mismatched `version` with a correct namespace.
pub fn detect_version(root: &Element) -> XliffVersion {
    let namespaces: Vec<&str> = root
        .attributes
        .iter()
        .filter(|(name, _)| name == "xmlns" || name.starts_with("xmlns:"))
        .map(|(_, value)| value.as_str())
        .collect();
    if namespaces.iter().any(|ns| ns.contains("2.0")) {
        return XliffVersion::V20;
    }
    if namespaces.iter().any(|ns| ns.contains("1.2")) {
        return XliffVersion::V12;
    }

    if let Some(version) = root.attr("version") {
        if version.starts_with('2') {
            return XliffVersion::V20;
        }
        if version.starts_with('1') {
            return XliffVersion::V12;
        }
    }

    if root.attr("srcLang").is_some() {
        return XliffVersion::V20;
    }
    let has_source_language = root.attr("source-language").is_some()
        || root
            .children_named("file")
            .any(|file| file.attr("source-language").is_some());
    if has_source_language {
        return XliffVersion::V12;
    }
    if root
        .children_named("file")
        .any(|file| file.attr("srcLang").is_some())
    {
        return XliffVersion::V20;
    }

    XliffVersion::V12
}

fn parse_v12(root: &Element) -> Result<Document, Error> {
    let mut source_language = String::new();
    let mut target_language = None;
    let mut original = None;
    let mut units = Vec::new();

    for file in root.children_named("file") {
        if source_language.is_empty() {
            if let Some(lang) = file.attr("source-language") {
                source_language = culture::from_xliff_attribute(lang);
            }
        }
        if target_language.is_none() {
            target_language = file
                .attr("target-language")
                .map(culture::from_xliff_attribute)
                .filter(|l| !l.is_empty());
        }
        if original.is_none() {
            original = file.attr("original").map(str::to_string);
        }
        if let Some(body) = file.first_child("body") {
            collect_v12_units(body, &mut units);
        }
    }

    Ok(Document {
        version: XliffVersion::V12,
        source_language,
        target_language,
        original,
        units,
    })
}

fn collect_v12_units(parent: &Element, units: &mut Vec<Unit>) {
    for child in parent.child_elements() {
        match child.name.as_str() {
            "trans-unit" => {
                let Some(key) = child.attr("id").or_else(|| child.attr("resname")) else {
                    warn!("skipping <trans-unit> without id or resname");
                    continue;
                };
                units.push(Unit {
                    key: key.to_string(),
                    value: UnitValue::Singular(segment_of(child)),
                    note: note_of(child),
                });
            }
            "group" if child.attr("restype") == Some(PLURAL_RESTYPE) => {
                match parse_plural_group(child) {
                    Ok(unit) => units.push(unit),
                    Err(e) => warn!(error = %e, "dropping unparseable plural group"),
                }
            }
            // Plain groups only organize; their trans-units count as if
            // they were direct body children.
            "group" => collect_v12_units(child, units),
            _ => {}
        }
    }
}

/// A `<group restype="x-gettext-plurals">`: the group id/resname is the
/// entry key; each child `<trans-unit>` id encodes a plural category as
/// either a `key[one]` bracket suffix or a `key_one` underscore suffix.
fn parse_plural_group(group: &Element) -> Result<Unit, Error> {
    let key = group
        .attr("id")
        .or_else(|| group.attr("resname"))
        .ok_or_else(|| {
            Error::UnsupportedStructure("plural group without id or resname".to_string())
        })?;

    let mut forms = BTreeMap::new();
    for trans_unit in group.children_named("trans-unit") {
        let Some(id) = trans_unit.attr("id").or_else(|| trans_unit.attr("resname")) else {
            continue;
        };
        let Some(category) = plural_suffix_category(id) else {
            continue;
        };
        forms.insert(category, segment_of(trans_unit));
    }

    if forms.is_empty() {
        return Err(Error::UnsupportedStructure(format!(
            "plural group `{}` has zero parseable forms",
            key
        )));
    }

    Ok(Unit {
        key: key.to_string(),
        value: UnitValue::Plural(forms),
        note: note_of(group),
    })
}

/// Extracts the plural category from a trans-unit id: `key[one]` or
/// `key_one`.
fn plural_suffix_category(id: &str) -> Option<PluralCategory> {
    if let Some(stripped) = id.strip_suffix(']') {
        if let Some(start) = stripped.rfind('[') {
            return stripped[start + 1..].parse().ok();
        }
    }
    let (_, suffix) = id.rsplit_once('_')?;
    suffix.parse().ok()
}

fn parse_v20(root: &Element) -> Result<Document, Error> {
    let source_language = root
        .attr("srcLang")
        .map(culture::from_xliff_attribute)
        .unwrap_or_default();
    let target_language = root
        .attr("trgLang")
        .map(culture::from_xliff_attribute)
        .filter(|l| !l.is_empty());
    let mut original = None;
    let mut units = Vec::new();

    for file in root.children_named("file") {
        if original.is_none() {
            original = file.attr("original").map(str::to_string);
        }
        collect_v20_units(file, &mut units);
    }

    Ok(Document {
        version: XliffVersion::V20,
        source_language,
        target_language,
        original,
        units,
    })
}

fn collect_v20_units(parent: &Element, units: &mut Vec<Unit>) {
    for child in parent.child_elements() {
        match child.name.as_str() {
            "unit" => {
                if let Some(unit) = parse_v20_unit(child) {
                    units.push(unit);
                }
            }
            "group" => collect_v20_units(child, units),
            _ => {}
        }
    }
}

fn parse_v20_unit(element: &Element) -> Option<Unit> {
    let key = element.attr("id").or_else(|| element.attr("name"))?;
    let note = element
        .first_child("notes")
        .and_then(|notes| notes.first_child("note"))
        .or_else(|| element.first_child("note"))
        .map(Element::text)
        .filter(|t| !t.is_empty());

    let segments: Vec<&Element> = element.children_named("segment").collect();
    if segments.is_empty() {
        return None;
    }

    // A unit is plural when every segment id is a CLDR category name.
    // Otherwise a multi-segment unit still yields one entry by
    // concatenating its segments in order.
    let categories: Vec<Option<PluralCategory>> = segments
        .iter()
        .map(|s| s.attr("id").and_then(|id| id.parse().ok()))
        .collect();

    let value = if categories.iter().all(Option::is_some) {
        let forms = categories
            .into_iter()
            .flatten()
            .zip(segments.iter().map(|s| segment_of(s)))
            .collect();
        UnitValue::Plural(forms)
    } else {
        let mut source = String::new();
        let mut target = String::new();
        let mut has_target = false;
        for segment in &segments {
            let s = segment_of(segment);
            source.push_str(&s.source);
            if let Some(t) = s.target {
                target.push_str(&t);
                has_target = true;
            }
        }
        UnitValue::Singular(Segment {
            source,
            target: has_target.then_some(target),
        })
    };

    Some(Unit {
        key: key.to_string(),
        value,
        note,
    })
}

/// Source/target texts of a `<trans-unit>` or `<segment>`.
fn segment_of(element: &Element) -> Segment {
    Segment {
        source: element
            .first_child("source")
            .map(Element::text)
            .unwrap_or_default(),
        target: element.first_child("target").map(Element::text),
    }
}

fn note_of(element: &Element) -> Option<String> {
    element
        .first_child("note")
        .map(Element::text)
        .filter(|t| !t.is_empty())
}

impl Document {
    /// Converts units to model entries, reading each segment according to
    /// the bilingual rule (see [`Segment::resolve`]). Plural units whose
    /// forms all fail to resolve are dropped.
    pub fn entries_as(&self, as_default: bool) -> Vec<Entry> {
        let mut entries = Vec::new();
        for unit in &self.units {
            let entry = match &unit.value {
                UnitValue::Singular(segment) => {
                    Entry::singular(unit.key.clone(), segment.resolve(as_default))
                }
                UnitValue::Plural(forms) => {
                    let resolved = forms
                        .iter()
                        .map(|(category, segment)| {
                            (*category, segment.resolve(as_default).to_string())
                        })
                        .collect::<Vec<_>>();
                    match Plural::new(resolved) {
                        Some(plural) => Entry::plural(unit.key.clone(), plural),
                        None => {
                            warn!(key = %unit.key, "dropping plural unit with no forms");
                            continue;
                        }
                    }
                }
            };
            entries.push(entry.with_comment(unit.note.clone()));
        }
        entries
    }

    /// Builds a document from model entries.
    ///
    /// For the default language the value goes into `<source>`. For any
    /// other language with `bilingual` set, `<source>` carries the key
    /// itself and `<target>` the value, so an empty target still marks an
    /// entry as untranslated. With `bilingual` unset the export is
    /// source-only: the value goes into `<source>` with no target.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a Entry>,
        version: XliffVersion,
        source_language: &str,
        target_language: Option<&str>,
        original: Option<&str>,
        bilingual: bool,
    ) -> Self {
        let write_pair = |key: &str, value: &str| -> Segment {
            if target_language.is_none() || !bilingual {
                Segment {
                    source: value.to_string(),
                    target: None,
                }
            } else {
                Segment {
                    source: key.to_string(),
                    target: Some(value.to_string()),
                }
            }
        };

        let units = entries
            .into_iter()
            .map(|entry| {
                let value = match &entry.value {
                    Translation::Singular(value) => {
                        UnitValue::Singular(write_pair(&entry.key, value))
                    }
                    Translation::Plural(plural) => UnitValue::Plural(
                        plural
                            .forms
                            .iter()
                            .map(|(category, value)| (*category, write_pair(&entry.key, value)))
                            .collect(),
                    ),
                };
                Unit {
                    key: entry.key.clone(),
                    value,
                    note: entry.comment.clone(),
                }
            })
            .collect();

        Document {
            version,
            source_language: source_language.to_string(),
            target_language: target_language.map(str::to_string),
            original: original.map(str::to_string),
            units,
        }
    }

    fn write_v12<W: Write>(&self, xml: &mut Writer<W>) -> Result<(), Error> {
        let mut root = BytesStart::new("xliff");
        root.push_attribute(("xmlns", NS_12));
        root.push_attribute(("version", "1.2"));
        xml.write_event(Event::Start(root))?;

        let mut file = BytesStart::new("file");
        file.push_attribute(("original", self.original.as_deref().unwrap_or("strings")));
        file.push_attribute(("datatype", "plaintext"));
        file.push_attribute(("source-language", self.source_language.as_str()));
        if let Some(target) = &self.target_language {
            file.push_attribute(("target-language", target.as_str()));
        }
        xml.write_event(Event::Start(file))?;
        xml.write_event(Event::Start(BytesStart::new("body")))?;

        for unit in &self.units {
            match &unit.value {
                UnitValue::Singular(segment) => {
                    let mut start = BytesStart::new("trans-unit");
                    start.push_attribute(("id", unit.key.as_str()));
                    xml.write_event(Event::Start(start))?;
                    write_segment(xml, segment)?;
                    if let Some(note) = &unit.note {
                        write_text_element(xml, "note", note)?;
                    }
                    xml.write_event(Event::End(BytesEnd::new("trans-unit")))?;
                }
                UnitValue::Plural(forms) => {
                    let mut group = BytesStart::new("group");
                    group.push_attribute(("id", unit.key.as_str()));
                    group.push_attribute(("restype", PLURAL_RESTYPE));
                    xml.write_event(Event::Start(group))?;
                    if let Some(note) = &unit.note {
                        write_text_element(xml, "note", note)?;
                    }
                    for (category, segment) in forms {
                        let id = format!("{}[{}]", unit.key, category);
                        let mut start = BytesStart::new("trans-unit");
                        start.push_attribute(("id", id.as_str()));
                        xml.write_event(Event::Start(start))?;
                        write_segment(xml, segment)?;
                        xml.write_event(Event::End(BytesEnd::new("trans-unit")))?;
                    }
                    xml.write_event(Event::End(BytesEnd::new("group")))?;
                }
            }
        }

        xml.write_event(Event::End(BytesEnd::new("body")))?;
        xml.write_event(Event::End(BytesEnd::new("file")))?;
        xml.write_event(Event::End(BytesEnd::new("xliff")))?;
        Ok(())
    }

    fn write_v20<W: Write>(&self, xml: &mut Writer<W>) -> Result<(), Error> {
        let mut root = BytesStart::new("xliff");
        root.push_attribute(("xmlns", NS_20));
        root.push_attribute(("version", "2.0"));
        root.push_attribute(("srcLang", self.source_language.as_str()));
        if let Some(target) = &self.target_language {
            root.push_attribute(("trgLang", target.as_str()));
        }
        xml.write_event(Event::Start(root))?;

        let mut file = BytesStart::new("file");
        file.push_attribute(("id", "f1"));
        if let Some(original) = &self.original {
            file.push_attribute(("original", original.as_str()));
        }
        xml.write_event(Event::Start(file))?;

        for unit in &self.units {
            let mut start = BytesStart::new("unit");
            start.push_attribute(("id", unit.key.as_str()));
            xml.write_event(Event::Start(start))?;
            if let Some(note) = &unit.note {
                xml.write_event(Event::Start(BytesStart::new("notes")))?;
                write_text_element(xml, "note", note)?;
                xml.write_event(Event::End(BytesEnd::new("notes")))?;
            }
            match &unit.value {
                UnitValue::Singular(segment) => {
                    xml.write_event(Event::Start(BytesStart::new("segment")))?;
                    write_segment(xml, segment)?;
                    xml.write_event(Event::End(BytesEnd::new("segment")))?;
                }
                UnitValue::Plural(forms) => {
                    for (category, segment) in forms {
                        let mut seg = BytesStart::new("segment");
                        seg.push_attribute(("id", category.as_str()));
                        xml.write_event(Event::Start(seg))?;
                        write_segment(xml, segment)?;
                        xml.write_event(Event::End(BytesEnd::new("segment")))?;
                    }
                }
            }
            xml.write_event(Event::End(BytesEnd::new("unit")))?;
        }

        xml.write_event(Event::End(BytesEnd::new("file")))?;
        xml.write_event(Event::End(BytesEnd::new("xliff")))?;
        Ok(())
    }
}

fn write_segment<W: Write>(xml: &mut Writer<W>, segment: &Segment) -> Result<(), Error> {
    write_text_element(xml, "source", &segment.source)?;
    if let Some(target) = &segment.target {
        write_text_element(xml, "target", target)?;
    }
    Ok(())
}

fn write_text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<(), Error> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// A parsed XML element: local name, attributes, ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.child_elements().filter(move |e| e.name == name)
    }

    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.children_named(name).next()
    }

    /// Concatenated text of this element and its descendants, in document
    /// order. Inline markup inside `<source>`/`<target>` flattens to its
    /// text content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

/// Builds an element tree from XML. DTDs are ignored as opaque events and
/// entity definitions are never applied.
fn parse_tree<R: BufRead>(reader: R) -> Result<Element, Error> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let element = element_from_start(e)?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from_start(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => return Ok(element),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(parent) = stack.last_mut() {
                    // Undefined entity references (XXE payloads included)
                    // fail here instead of expanding.
                    let text = e
                        .unescape()
                        .map_err(|e| Error::MalformedInput(e.to_string()))?;
                    parent.children.push(Node::Text(text.to_string()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    parent.children.push(Node::Text(text));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    Error::MalformedInput("unbalanced closing tag".to_string())
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => return Ok(element),
                }
            }
            Ok(Event::Eof) => {
                return Err(Error::MalformedInput(if stack.is_empty() {
                    "missing root element".to_string()
                } else {
                    "unterminated document".to_string()
                }));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(e.to_string())),
        }
        buf.clear();
    }
}

fn element_from_start(e: &BytesStart) -> Result<Element, Error> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::MalformedInput(e.to_string()))?;
        let attr_name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::MalformedInput(e.to_string()))?
            .to_string();
        attributes.push((attr_name, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}
