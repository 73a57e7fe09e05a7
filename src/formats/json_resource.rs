//! Support for JSON language files in two co-existing encodings.
//!
//! Standard mode keeps one `<base>.json` per language with optionally
//! dot-nested keys; plural entries become objects with a `_plural`
//! marker, and preserved comments wrap the leaf as
//! `{"_value": ..., "_comment": ...}`. i18next mode keeps flat keys,
//! expands plurals to `key_one`-style siblings, and stores comments in
//! synthetic `_{key}_comment` siblings.
//!
//! An optional `_meta` header object is emitted on write and never read
//! back as a resource entry. Key order follows entry order in both
//! directions (`serde_json` with `preserve_order`).

use std::{
    collections::HashMap,
    io::{BufRead, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::{
    error::Error,
    options::{JsonMode, JsonOptions},
    traits::Parser,
    types::{Entry, Plural, PluralCategory, Translation},
};

const META_KEY: &str = "_meta";
const PLURAL_KEY: &str = "_plural";
const VALUE_KEY: &str = "_value";
const COMMENT_KEY: &str = "_comment";

/// The `_meta` header object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub version: u32,
    pub generator: String,
    /// UTC timestamp in ISO-8601 form.
    pub generated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub culture: Option<String>,
    /// Only meaningful in i18next mode, where the file name alone cannot
    /// mark the default language.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl Meta {
    pub fn new(culture: Option<String>, is_default: Option<bool>) -> Self {
        Meta {
            version: 1,
            generator: concat!("polyloc ", env!("CARGO_PKG_VERSION")).to_string(),
            generated: utc_timestamp(),
            culture,
            is_default,
        }
    }
}

/// A raw JSON language document: the top-level object as read/written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub root: Map<String, Value>,
}

impl Parser for Document {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_reader(reader).map_err(|e| Error::MalformedInput(e.to_string()))?;
        match value {
            Value::Object(root) => Ok(Document { root }),
            _ => Err(Error::MalformedInput(
                "top-level JSON value is not an object".to_string(),
            )),
        }
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut writer, &self.root)?;
        writer.write_all(b"\n").map_err(Error::Io)
    }
}

impl Document {
    /// The `_meta` header, when present and well-formed.
    pub fn meta(&self) -> Option<Meta> {
        let value = self.root.get(META_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Decodes the document into model entries according to `options`.
    pub fn entries(&self, options: &JsonOptions) -> Vec<Entry> {
        match options.mode {
            JsonMode::Standard => {
                let mut entries = Vec::new();
                read_standard(&self.root, options, "", &mut entries);
                entries
            }
            JsonMode::I18next => read_i18next(&self.root),
        }
    }

    /// Encodes model entries according to `options`, prepending `meta`
    /// when given.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a Entry>,
        options: &JsonOptions,
        meta: Option<Meta>,
    ) -> Self {
        let mut root = Map::new();
        if let Some(meta) = meta {
            root.insert(
                META_KEY.to_string(),
                serde_json::to_value(meta).unwrap_or(Value::Null),
            );
        }
        match options.mode {
            JsonMode::Standard => {
                for entry in entries {
                    let leaf = standard_leaf(entry, options);
                    if options.nested {
                        insert_nested(&mut root, &entry.key, leaf);
                    } else {
                        root.insert(entry.key.clone(), leaf);
                    }
                }
            }
            JsonMode::I18next => {
                for entry in entries {
                    match &entry.value {
                        Translation::Singular(value) => {
                            root.insert(entry.key.clone(), Value::String(value.clone()));
                        }
                        Translation::Plural(plural) => {
                            for (category, text) in &plural.forms {
                                root.insert(
                                    format!("{}_{}", entry.key, category),
                                    Value::String(text.clone()),
                                );
                            }
                        }
                    }
                    if options.preserve_comments {
                        if let Some(comment) = &entry.comment {
                            root.insert(
                                format!("_{}_comment", entry.key),
                                Value::String(comment.clone()),
                            );
                        }
                    }
                }
            }
        }
        Document { root }
    }
}

fn standard_leaf(entry: &Entry, options: &JsonOptions) -> Value {
    match &entry.value {
        Translation::Plural(plural) => {
            let mut object = Map::new();
            object.insert(PLURAL_KEY.to_string(), Value::Bool(true));
            for (category, text) in &plural.forms {
                object.insert(category.to_string(), Value::String(text.clone()));
            }
            if options.preserve_comments {
                if let Some(comment) = &entry.comment {
                    object.insert(COMMENT_KEY.to_string(), Value::String(comment.clone()));
                }
            }
            Value::Object(object)
        }
        Translation::Singular(value) => match (&entry.comment, options.preserve_comments) {
            (Some(comment), true) => json!({
                VALUE_KEY: value,
                COMMENT_KEY: comment,
            }),
            _ => Value::String(value.clone()),
        },
    }
}

fn insert_nested(root: &mut Map<String, Value>, key: &str, leaf: Value) {
    let mut segments = key.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), leaf);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut().expect("slot was just made an object");
    }
}

fn read_standard(map: &Map<String, Value>, options: &JsonOptions, prefix: &str, out: &mut Vec<Entry>) {
    for (key, value) in map {
        if prefix.is_empty() && key == META_KEY {
            continue;
        }
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::String(text) => out.push(Entry::singular(full_key, text.clone())),
            Value::Object(object) => {
                if object.get(PLURAL_KEY).and_then(Value::as_bool) == Some(true) {
                    if let Some(entry) = plural_from_object(&full_key, object) {
                        out.push(entry);
                    } else {
                        warn!(key = %full_key, "skipping plural object with no forms");
                    }
                } else if let Some(Value::String(text)) = object.get(VALUE_KEY) {
                    let comment = object
                        .get(COMMENT_KEY)
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    out.push(Entry::singular(full_key, text.clone()).with_comment(comment));
                } else if options.nested {
                    read_standard(object, options, &full_key, out);
                } else {
                    warn!(key = %full_key, "skipping unexpected object value (nesting disabled)");
                }
            }
            _ => warn!(key = %full_key, "skipping non-string JSON value"),
        }
    }
}

fn plural_from_object(key: &str, object: &Map<String, Value>) -> Option<Entry> {
    let forms = object.iter().filter_map(|(name, value)| {
        let category: PluralCategory = name.parse().ok()?;
        Some((category, value.as_str()?.to_string()))
    });
    let plural = Plural::new(forms)?;
    let comment = object
        .get(COMMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(Entry::plural(key, plural).with_comment(comment))
}

fn read_i18next(map: &Map<String, Value>) -> Vec<Entry> {
    // First pass: group values by base key, keeping first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut singulars: HashMap<String, String> = HashMap::new();
    let mut plurals: HashMap<String, Vec<(PluralCategory, String)>> = HashMap::new();
    let mut comments: HashMap<String, String> = HashMap::new();

    for (key, value) in map {
        if key == META_KEY {
            continue;
        }
        if let Some(target) = key
            .strip_prefix('_')
            .and_then(|rest| rest.strip_suffix("_comment"))
        {
            if let Some(text) = value.as_str() {
                comments.insert(target.to_string(), text.to_string());
            }
            continue;
        }
        let Some(text) = value.as_str() else {
            warn!(key = %key, "skipping non-string JSON value");
            continue;
        };
        if let Some((base, suffix)) = key.rsplit_once('_') {
            if let Ok(category) = suffix.parse::<PluralCategory>() {
                if !plurals.contains_key(base) && !singulars.contains_key(base) {
                    order.push(base.to_string());
                }
                plurals
                    .entry(base.to_string())
                    .or_default()
                    .push((category, text.to_string()));
                continue;
            }
        }
        if !singulars.contains_key(key) && !plurals.contains_key(key) {
            order.push(key.clone());
        }
        singulars.insert(key.clone(), text.to_string());
    }

    // Second pass: materialize entries in first-seen order.
    order
        .into_iter()
        .filter_map(|key| {
            let comment = comments.remove(&key);
            if let Some(forms) = plurals.remove(&key) {
                Plural::new(forms).map(|plural| Entry::plural(&key, plural).with_comment(comment))
            } else {
                singulars
                    .remove(&key)
                    .map(|value| Entry::singular(&key, value).with_comment(comment))
            }
        })
        .collect()
}

/// ISO-8601 UTC timestamp without an external time dependency.
fn utc_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format_utc_timestamp(secs)
}

fn format_utc_timestamp(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (hour, minute, second) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    // Civil-from-days (Howard Hinnant's algorithm), valid for the era we
    // care about.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hour, minute, second
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<Entry> {
        vec![
            Entry::singular("greeting", "Hello").with_comment(Some("Shown on launch".to_string())),
            Entry::plural(
                "items",
                Plural::new(vec![
                    (PluralCategory::One, "1 item".to_string()),
                    (PluralCategory::Other, "{0} items".to_string()),
                ])
                .unwrap(),
            ),
            Entry::singular("farewell", "Goodbye"),
        ]
    }

    #[test]
    fn test_standard_mode_shapes() {
        let options = JsonOptions::default();
        let document = Document::from_entries(&sample_entries(), &options, None);

        // Comment-preserving wrapper
        let greeting = document.root.get("greeting").unwrap();
        assert_eq!(greeting["_value"], "Hello");
        assert_eq!(greeting["_comment"], "Shown on launch");

        // Plural object with marker
        let items = document.root.get("items").unwrap();
        assert_eq!(items["_plural"], true);
        assert_eq!(items["one"], "1 item");
        assert_eq!(items["other"], "{0} items");

        // Plain string leaf
        assert_eq!(document.root.get("farewell").unwrap(), "Goodbye");

        let round = document.entries(&options);
        assert_eq!(round, sample_entries());
    }

    #[test]
    fn test_standard_mode_without_comment_preservation() {
        let options = JsonOptions {
            preserve_comments: false,
            ..JsonOptions::default()
        };
        let document = Document::from_entries(&sample_entries(), &options, None);
        assert_eq!(document.root.get("greeting").unwrap(), "Hello");
    }

    #[test]
    fn test_standard_nested_keys() {
        let options = JsonOptions {
            nested: true,
            ..JsonOptions::default()
        };
        let entries = vec![
            Entry::singular("Errors.NotFound", "Not found"),
            Entry::singular("Errors.Denied", "Denied"),
            Entry::singular("Title", "App"),
        ];
        let document = Document::from_entries(&entries, &options, None);
        assert_eq!(
            document.root.get("Errors").unwrap()["NotFound"],
            "Not found"
        );

        let round = document.entries(&options);
        assert_eq!(round, entries);
    }

    #[test]
    fn test_i18next_mode_shapes() {
        let options = JsonOptions {
            mode: JsonMode::I18next,
            ..JsonOptions::default()
        };
        let document = Document::from_entries(&sample_entries(), &options, None);

        assert_eq!(document.root.get("items_one").unwrap(), "1 item");
        assert_eq!(document.root.get("items_other").unwrap(), "{0} items");
        assert_eq!(
            document.root.get("_greeting_comment").unwrap(),
            "Shown on launch"
        );

        let round = document.entries(&options);
        assert_eq!(round, sample_entries());
    }

    #[test]
    fn test_meta_not_read_as_entry() {
        let options = JsonOptions {
            emit_meta: true,
            ..JsonOptions::default()
        };
        let meta = Meta::new(Some("fr".to_string()), None);
        let document = Document::from_entries(&sample_entries(), &options, Some(meta.clone()));

        assert!(document.root.contains_key("_meta"));
        assert_eq!(document.meta().unwrap().culture.as_deref(), Some("fr"));

        let entries = document.entries(&options);
        assert!(entries.iter().all(|e| e.key != "_meta"));
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_i18next_meta_is_default_flag() {
        let options = JsonOptions {
            mode: JsonMode::I18next,
            emit_meta: true,
            ..JsonOptions::default()
        };
        let meta = Meta::new(Some("en".to_string()), Some(true));
        let document = Document::from_entries(&sample_entries(), &options, Some(meta));
        assert_eq!(document.meta().unwrap().is_default, Some(true));
    }

    #[test]
    fn test_key_order_preserved() {
        let options = JsonOptions::default();
        let document = Document::from_entries(&sample_entries(), &options, None);
        let keys: Vec<&String> = document.root.keys().collect();
        assert_eq!(keys, ["greeting", "items", "farewell"]);
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        assert!(matches!(
            Document::from_str("[1, 2, 3]"),
            Err(Error::MalformedInput(_))
        ));
        assert!(Document::from_str("{ not json").is_err());
    }

    #[test]
    fn test_format_utc_timestamp() {
        assert_eq!(format_utc_timestamp(0), "1970-01-01T00:00:00Z");
        // 2024-03-01 12:30:45 UTC
        assert_eq!(format_utc_timestamp(1_709_296_245), "2024-03-01T12:30:45Z");
    }
}
