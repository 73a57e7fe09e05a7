//! XLIFF backend: discovery over `.xliff`/`.xlf` files plus the four
//! uniform operations.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::{
    backend::{Backend, finalize_languages, is_reserved_path},
    culture,
    error::Error,
    formats::FormatKind,
    formats::xliff::{Document, XliffVersion},
    options::XliffOptions,
    traits::Parser,
    types::{Entry, Language, ResourceFile, Translation},
};

pub struct XliffBackend {
    base_name: String,
    options: XliffOptions,
}

impl XliffBackend {
    pub fn new(base_name: impl Into<String>, options: XliffOptions) -> Self {
        XliffBackend {
            base_name: base_name.into(),
            options,
        }
    }

    fn is_xliff_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xliff") || e.eq_ignore_ascii_case("xlf"))
    }

    /// Splits a file stem into base name and trailing culture suffix
    /// (`strings.fr` → base `strings`, code `fr`).
    fn stem_language(stem: &str) -> Option<String> {
        culture::split_json_stem(stem).map(|(_, code)| code.to_string())
    }

    fn language_file_name(&self, code: &str) -> String {
        if code.is_empty() {
            format!("{}.xliff", self.base_name)
        } else {
            format!("{}.{}.xliff", self.base_name, code)
        }
    }

    /// Descriptors contributed by a single file: the source language
    /// (marked default) and, for bilingual files, the target language.
    fn languages_of_file(&self, path: &Path) -> Result<Vec<Language>, Error> {
        let document = Document::read_from(path)?;
        let mut languages = Vec::new();

        let source_code = if document.source_language.is_empty() {
            // Filename heuristic when the file carries no language attrs.
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(Self::stem_language)
                .unwrap_or_default()
        } else {
            document.source_language.clone()
        };
        languages.push(Language::new(
            source_code,
            self.base_name.clone(),
            true,
            path,
        ));

        if let Some(target) = &document.target_language {
            languages.push(Language::new(
                target.clone(),
                self.base_name.clone(),
                false,
                path,
            ));
        }
        Ok(languages)
    }

    /// Existing-file attributes reused on write so a write-then-read
    /// cycle keeps version and source language stable.
    fn write_context(&self, path: &Path) -> (XliffVersion, String) {
        match Document::read_from(path) {
            Ok(document) => {
                let source = if document.source_language.is_empty() {
                    self.fallback_source_language()
                } else {
                    document.source_language
                };
                (document.version, source)
            }
            Err(_) => (XliffVersion::V12, self.fallback_source_language()),
        }
    }

    fn fallback_source_language(&self) -> String {
        self.options
            .development_language
            .clone()
            .unwrap_or_else(|| "en".to_string())
    }
}

impl Default for XliffBackend {
    fn default() -> Self {
        XliffBackend::new("strings", XliffOptions::default())
    }
}

impl Backend for XliffBackend {
    fn name(&self) -> &'static str {
        "xliff"
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Xliff
    }

    fn discover_languages(&self, root: &Path) -> Result<Vec<Language>, Error> {
        let mut languages = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_reserved_path(e.path()))
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_xliff_file(path) {
                continue;
            }
            match self.languages_of_file(path) {
                Ok(mut found) => languages.append(&mut found),
                // One corrupt file never blocks the rest of the set.
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable XLIFF file"),
            }
        }
        Ok(finalize_languages(languages, false))
    }

    fn read(&self, language: &Language) -> Result<ResourceFile, Error> {
        let document = Document::read_from(&language.file_path)?;
        Ok(ResourceFile {
            language: language.clone(),
            entries: document.entries_as(language.is_default),
        })
    }

    fn write(&self, file: &ResourceFile) -> Result<(), Error> {
        if file.language.file_path.as_os_str().is_empty() {
            return Err(Error::InvalidTarget(
                "language descriptor has no file path".to_string(),
            ));
        }
        let (version, source_language) = self.write_context(&file.language.file_path);
        let source_language = if file.language.is_default && !file.language.code.is_empty() {
            file.language.code.clone()
        } else {
            source_language
        };
        let target_language = (!file.language.is_default).then_some(file.language.code.as_str());

        let document = Document::from_entries(
            &file.entries,
            version,
            &source_language,
            target_language,
            Some(&file.language.base_name),
            self.options.bilingual,
        );
        document.write_to(&file.language.file_path)
    }

    fn create_language_file(
        &self,
        root: &Path,
        code: &str,
        copy_from: Option<&Language>,
    ) -> Result<Language, Error> {
        let path: PathBuf = root.join(self.language_file_name(code));
        let language = Language::new(code, self.base_name.clone(), code.is_empty(), &path);

        let entries = match copy_from {
            Some(source) => blank_entries(&self.read(source)?.entries),
            None => Vec::new(),
        };
        self.write(&ResourceFile {
            language: language.clone(),
            entries,
        })?;
        Ok(language)
    }

    fn delete_language_file(&self, language: &Language) -> Result<(), Error> {
        match std::fs::remove_file(&language.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(language.file_path.display()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn can_handle(&self, root: &Path) -> bool {
        WalkDir::new(root)
            .max_depth(3)
            .into_iter()
            .filter_entry(|e| !is_reserved_path(e.path()))
            .filter_map(Result::ok)
            .any(|e| e.file_type().is_file() && Self::is_xliff_file(e.path()))
    }
}

/// Copies entries with all values blanked, for scaffolding a new target
/// language.
pub(crate) fn blank_entries(entries: &[Entry]) -> Vec<Entry> {
    entries
        .iter()
        .map(|entry| {
            let value = match &entry.value {
                Translation::Singular(_) => Translation::Singular(String::new()),
                Translation::Plural(plural) => {
                    let blanked = plural
                        .forms
                        .keys()
                        .map(|category| (*category, String::new()));
                    match crate::types::Plural::new(blanked) {
                        Some(plural) => Translation::Plural(plural),
                        None => Translation::Singular(String::new()),
                    }
                }
            };
            Entry {
                key: entry.key.clone(),
                value,
                comment: entry.comment.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plural, PluralCategory};

    #[test]
    fn test_stem_language() {
        assert_eq!(
            XliffBackend::stem_language("strings.fr").as_deref(),
            Some("fr")
        );
        assert_eq!(XliffBackend::stem_language("strings"), None);
    }

    #[test]
    fn test_language_file_name() {
        let backend = XliffBackend::default();
        assert_eq!(backend.language_file_name(""), "strings.xliff");
        assert_eq!(backend.language_file_name("fr"), "strings.fr.xliff");
    }

    #[test]
    fn test_blank_entries() {
        let entries = vec![
            Entry::singular("a", "value"),
            Entry::plural(
                "b",
                Plural::new(vec![
                    (PluralCategory::One, "one".to_string()),
                    (PluralCategory::Other, "more".to_string()),
                ])
                .unwrap(),
            ),
        ];
        let blanked = blank_entries(&entries);
        assert_eq!(blanked[0].flat_value(), "");
        let forms = blanked[1].plural_forms().unwrap();
        assert_eq!(forms.len(), 2);
        assert!(forms.values().all(String::is_empty));
    }

    #[test]
    fn test_write_without_path_is_invalid_target() {
        let backend = XliffBackend::default();
        let file = ResourceFile::new(Language::new("fr", "strings", false, ""));
        assert!(matches!(
            backend.write(&file),
            Err(Error::InvalidTarget(_))
        ));
    }
}
