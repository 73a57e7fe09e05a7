//! Core, format-agnostic types for polyloc.
//! Format codecs decode into these; encoders serialize these back out.

use std::{collections::BTreeMap, fmt::Display, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::culture;

/// Identifies one language's resource file within a discovered set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Language {
    /// Culture identifier (e.g. "fr", "pt-BR"). Empty string denotes the
    /// default/invariant language.
    pub code: String,

    /// Logical resource-family name shared across all languages of one
    /// family (e.g. "strings").
    pub base_name: String,

    /// Human-readable label derived from `code`.
    pub display_name: String,

    /// True for exactly one language per discovered family: the
    /// source/development language.
    pub is_default: bool,

    /// Absolute path to the backing file. For Apple resources this is the
    /// `.strings` path even when only a `.stringsdict` sibling exists.
    pub file_path: PathBuf,
}

impl Language {
    /// Creates a descriptor, deriving the display name from the code.
    pub fn new(
        code: impl Into<String>,
        base_name: impl Into<String>,
        is_default: bool,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        let code = code.into();
        let display_name = culture::display_name(&code);
        Language {
            code,
            base_name: base_name.into(),
            display_name,
            is_default,
            file_path: file_path.into(),
        }
    }

    /// Whether this descriptor's code starts with an English subtag.
    pub fn is_english(&self) -> bool {
        let lowered = self.code.to_ascii_lowercase();
        lowered == "en" || lowered.starts_with("en-") || lowered.starts_with("en_")
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.code.is_empty() {
            write!(f, "{} (default)", self.display_name)
        } else {
            write!(f, "{} [{}]", self.display_name, self.code)
        }
    }
}

/// Standard CLDR plural categories.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            _ => Err(format!("unknown plural category: {}", s)),
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All plural forms for a single entry. Non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Plural {
    /// Map from CLDR category to the localized string for that category.
    pub forms: BTreeMap<PluralCategory, String>,
}

impl Plural {
    /// Builds a plural from category/value pairs. Returns `None` when the
    /// iterator yields no forms.
    pub fn new(forms: impl IntoIterator<Item = (PluralCategory, String)>) -> Option<Self> {
        let forms: BTreeMap<PluralCategory, String> = forms.into_iter().collect();
        if forms.is_empty() {
            None
        } else {
            Some(Plural { forms })
        }
    }

    /// The `other` form when present, else the first available form.
    pub fn flat_value(&self) -> &str {
        self.forms
            .get(&PluralCategory::Other)
            .or_else(|| self.forms.values().next())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// The value of one entry: a plain string or a set of plural forms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Translation {
    Singular(String),
    Plural(Plural),
}

impl Translation {
    /// The flat string projection of this value. For plural entries this is
    /// the `other` category (or the first available form), so the entry
    /// stays usable by non-plural-aware consumers.
    pub fn flat_value(&self) -> &str {
        match self {
            Translation::Singular(value) => value,
            Translation::Plural(plural) => plural.flat_value(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Translation::Singular(value) => value.is_empty(),
            Translation::Plural(plural) => plural.forms.values().all(String::is_empty),
        }
    }
}

impl Display for Translation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flat_value())
    }
}

/// One key's content in one language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    /// Unique key within a resource file. Uniqueness semantics are decided
    /// by the caller through [`KeyComparison`], not hard-coded here.
    pub key: String,

    /// The entry's value.
    pub value: Translation,

    /// Optional annotation, round-tripped where the format supports it.
    /// Never `Some("")`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl Entry {
    pub fn singular(key: impl Into<String>, value: impl Into<String>) -> Self {
        Entry {
            key: key.into(),
            value: Translation::Singular(value.into()),
            comment: None,
        }
    }

    pub fn plural(key: impl Into<String>, plural: Plural) -> Self {
        Entry {
            key: key.into(),
            value: Translation::Plural(plural),
            comment: None,
        }
    }

    /// Attaches a comment, normalizing empty strings to `None`.
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = normalize_comment(comment);
        self
    }

    pub fn is_plural(&self) -> bool {
        matches!(self.value, Translation::Plural(_))
    }

    /// The flat string form of the value (see [`Translation::flat_value`]).
    pub fn flat_value(&self) -> &str {
        self.value.flat_value()
    }

    pub fn plural_forms(&self) -> Option<&BTreeMap<PluralCategory, String>> {
        match &self.value {
            Translation::Plural(plural) => Some(&plural.forms),
            Translation::Singular(_) => None,
        }
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// Collapses empty comments to `None`.
pub(crate) fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment.filter(|c| !c.trim().is_empty())
}

/// One language descriptor plus its ordered entries.
///
/// Constructed fresh on every read; the codec never caches or shares
/// instances. Entry order is preserved on write where the format allows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceFile {
    pub language: Language,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl ResourceFile {
    pub fn new(language: Language) -> Self {
        ResourceFile {
            language,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn find_entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn find_entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }
}

/// How entry keys compare for uniqueness.
///
/// Code-scanning consumers compare case-sensitively while the generic
/// validator compares case-insensitively; both behaviors are inherited
/// from upstream consumers, so the comparer stays configurable rather
/// than picking one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyComparison {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl KeyComparison {
    /// Folds a key into its canonical comparison form.
    pub fn fold(self, key: &str) -> String {
        match self {
            KeyComparison::CaseSensitive => key.to_string(),
            KeyComparison::CaseInsensitive => key.to_lowercase(),
        }
    }

    pub fn eq(self, a: &str, b: &str) -> bool {
        match self {
            KeyComparison::CaseSensitive => a == b,
            KeyComparison::CaseInsensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_display_name_derived() {
        let lang = Language::new("fr", "strings", false, "/tmp/strings.fr.json");
        assert_eq!(lang.display_name, "French");
        assert!(!lang.is_default);
    }

    #[test]
    fn test_language_default_display() {
        let lang = Language::new("", "strings", true, "/tmp/strings.json");
        assert!(format!("{}", lang).contains("default"));
    }

    #[test]
    fn test_language_is_english() {
        assert!(Language::new("en", "s", false, "/x").is_english());
        assert!(Language::new("en-GB", "s", false, "/x").is_english());
        assert!(!Language::new("es", "s", false, "/x").is_english());
    }

    #[test]
    fn test_plural_category_round_trip() {
        for category in PluralCategory::ALL {
            assert_eq!(
                category.as_str().parse::<PluralCategory>().unwrap(),
                category
            );
        }
        assert!("invalid".parse::<PluralCategory>().is_err());
    }

    #[test]
    fn test_plural_new_empty() {
        assert!(Plural::new(Vec::new()).is_none());
    }

    #[test]
    fn test_plural_flat_value_prefers_other() {
        let plural = Plural::new(vec![
            (PluralCategory::One, "1 item".to_string()),
            (PluralCategory::Other, "{0} items".to_string()),
        ])
        .unwrap();
        assert_eq!(plural.flat_value(), "{0} items");
    }

    #[test]
    fn test_plural_flat_value_falls_back_to_first() {
        let plural = Plural::new(vec![(PluralCategory::One, "1 item".to_string())]).unwrap();
        assert_eq!(plural.flat_value(), "1 item");
    }

    #[test]
    fn test_entry_with_comment_normalizes_empty() {
        let entry = Entry::singular("hello", "Hello").with_comment(Some("  ".to_string()));
        assert_eq!(entry.comment, None);

        let entry = Entry::singular("hello", "Hello").with_comment(Some("Greeting".to_string()));
        assert_eq!(entry.comment.as_deref(), Some("Greeting"));
    }

    #[test]
    fn test_entry_flat_value_for_plural() {
        let entry = Entry::plural(
            "items",
            Plural::new(vec![
                (PluralCategory::One, "1 item".to_string()),
                (PluralCategory::Other, "{0} items".to_string()),
            ])
            .unwrap(),
        );
        assert!(entry.is_plural());
        assert_eq!(entry.flat_value(), "{0} items");
    }

    #[test]
    fn test_resource_file_find_entry() {
        let mut file = ResourceFile::new(Language::new("de", "strings", false, "/x"));
        file.add_entry(Entry::singular("hello", "Hallo"));
        assert!(file.find_entry("hello").is_some());
        assert!(file.find_entry("missing").is_none());
    }

    #[test]
    fn test_key_comparison_fold() {
        assert_eq!(KeyComparison::CaseSensitive.fold("Hello"), "Hello");
        assert_eq!(KeyComparison::CaseInsensitive.fold("Hello"), "hello");
        assert!(KeyComparison::CaseInsensitive.eq("Hello", "HELLO"));
        assert!(!KeyComparison::CaseSensitive.eq("Hello", "HELLO"));
    }
}
