//! Generic cross-language validation.
//!
//! Operates purely on parsed [`ResourceFile`]s: per non-default language,
//! missing keys (present in the default, absent here), extra keys
//! (present here, absent in the default), and empty-valued keys; per
//! file, duplicate keys. A pure set computation with no format
//! knowledge; every backend delegates to it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{KeyComparison, ResourceFile};

/// Validation findings for one language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LanguageValidation {
    pub code: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub empty_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub duplicate_keys: Vec<String>,
}

impl LanguageValidation {
    pub fn is_clean(&self) -> bool {
        self.missing_keys.is_empty()
            && self.extra_keys.is_empty()
            && self.empty_keys.is_empty()
            && self.duplicate_keys.is_empty()
    }
}

/// Findings for a whole language set, default language first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ValidationReport {
    pub languages: Vec<LanguageValidation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.languages.iter().all(LanguageValidation::is_clean)
    }

    pub fn for_language(&self, code: &str) -> Option<&LanguageValidation> {
        self.languages.iter().find(|l| l.code == code)
    }
}

/// Validates a set of parsed resource files against its default language.
///
/// `comparison` decides key-uniqueness semantics; callers pass the
/// comparer their consumers expect rather than relying on a built-in
/// default.
pub fn validate_resources(files: &[ResourceFile], comparison: KeyComparison) -> ValidationReport {
    let default_keys: BTreeSet<String> = files
        .iter()
        .find(|f| f.language.is_default)
        .map(|f| {
            f.entries
                .iter()
                .map(|e| comparison.fold(&e.key))
                .collect()
        })
        .unwrap_or_default();

    let mut languages = Vec::new();
    for file in files {
        let mut seen = BTreeSet::new();
        let mut duplicate_keys = Vec::new();
        let mut empty_keys = Vec::new();
        let mut keys = BTreeSet::new();
        for entry in &file.entries {
            let folded = comparison.fold(&entry.key);
            if !seen.insert(folded.clone()) && !duplicate_keys.contains(&entry.key) {
                duplicate_keys.push(entry.key.clone());
            }
            if entry.value.is_empty() {
                empty_keys.push(entry.key.clone());
            }
            keys.insert(folded);
        }

        let (missing_keys, extra_keys) = if file.language.is_default {
            (Vec::new(), Vec::new())
        } else {
            (
                default_keys.difference(&keys).cloned().collect(),
                keys.difference(&default_keys).cloned().collect(),
            )
        };

        languages.push(LanguageValidation {
            code: file.language.code.clone(),
            is_default: file.language.is_default,
            missing_keys,
            extra_keys,
            empty_keys,
            duplicate_keys,
        });
    }

    // Default-first, then code order, matching discovery ordering.
    languages.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.code.cmp(&b.code)));
    ValidationReport { languages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entry, Language};

    fn file(code: &str, is_default: bool, keys: &[(&str, &str)]) -> ResourceFile {
        let mut file = ResourceFile::new(Language::new(code, "strings", is_default, "/x"));
        for (key, value) in keys {
            file.add_entry(Entry::singular(*key, *value));
        }
        file
    }

    #[test]
    fn test_missing_and_extra_keys() {
        let files = vec![
            file("", true, &[("a", "1"), ("b", "2")]),
            file("fr", false, &[("a", "un"), ("c", "trois")]),
        ];
        let report = validate_resources(&files, KeyComparison::CaseSensitive);
        let fr = report.for_language("fr").unwrap();
        assert_eq!(fr.missing_keys, vec!["b"]);
        assert_eq!(fr.extra_keys, vec!["c"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_empty_and_duplicate_keys() {
        let files = vec![
            file("", true, &[("a", "1")]),
            file("de", false, &[("a", ""), ("a", "x")]),
        ];
        let report = validate_resources(&files, KeyComparison::CaseSensitive);
        let de = report.for_language("de").unwrap();
        assert_eq!(de.empty_keys, vec!["a"]);
        assert_eq!(de.duplicate_keys, vec!["a"]);
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let files = vec![
            file("", true, &[("Hello", "1")]),
            file("fr", false, &[("hello", "salut")]),
        ];
        let sensitive = validate_resources(&files, KeyComparison::CaseSensitive);
        assert_eq!(
            sensitive.for_language("fr").unwrap().missing_keys,
            vec!["Hello"]
        );

        let insensitive = validate_resources(&files, KeyComparison::CaseInsensitive);
        assert!(insensitive.is_clean());
    }

    #[test]
    fn test_default_language_first_in_report() {
        let files = vec![
            file("fr", false, &[("a", "un")]),
            file("", true, &[("a", "1")]),
        ];
        let report = validate_resources(&files, KeyComparison::CaseSensitive);
        assert!(report.languages[0].is_default);
    }
}
