//! The format-agnostic backend contract and registry.
//!
//! Every format implements [`Backend`] once; callers select a backend by
//! name or through [`BackendRegistry::detect`] and never inspect format
//! internals directly.

use std::path::Path;

use crate::{
    error::Error,
    formats::FormatKind,
    types::{KeyComparison, Language, ResourceFile},
    validate::{ValidationReport, validate_resources},
};

/// Reserved hidden subdirectory for tool metadata and backups; excluded
/// from every discovery scan.
pub const RESERVED_DIR: &str = ".polyloc";

/// Whether any path component names the reserved metadata directory,
/// matching either path-separator style.
pub fn is_reserved_path(path: &Path) -> bool {
    path.to_string_lossy()
        .split(['/', '\\'])
        .any(|part| part == RESERVED_DIR)
}

/// One localization format behind four uniform operations.
///
/// Discovery post-conditions shared by all implementations: the reserved
/// metadata directory is excluded, results are sorted default-first then
/// lexicographically by code, and exactly one descriptor is default.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// The format family this backend implements.
    fn kind(&self) -> FormatKind;

    /// File extensions this backend claims, without the leading dot.
    fn supported_extensions(&self) -> &'static [&'static str] {
        self.kind().extensions()
    }

    /// Enumerates all language variants of the resource family under
    /// `root`. Failures on single candidate files are skipped, never
    /// fatal to the batch.
    fn discover_languages(&self, root: &Path) -> Result<Vec<Language>, Error>;

    /// Reads one language's resource file. Fails with [`Error::NotFound`]
    /// when the backing file is absent and [`Error::MalformedInput`] when
    /// it cannot be parsed.
    fn read(&self, language: &Language) -> Result<ResourceFile, Error>;

    /// Writes a resource file back to disk, creating parent directories
    /// and replacing each physical file atomically. Fails with
    /// [`Error::InvalidTarget`] when no file path is set.
    fn write(&self, file: &ResourceFile) -> Result<(), Error>;

    /// Reads all languages under `root` and runs the generic
    /// cross-language validator over them.
    fn validate(&self, root: &Path, comparison: KeyComparison) -> Result<ValidationReport, Error> {
        let languages = self.discover_languages(root)?;
        let mut files = Vec::with_capacity(languages.len());
        for language in &languages {
            files.push(self.read(language)?);
        }
        Ok(validate_resources(&files, comparison))
    }

    /// Scaffolds one new language variant, optionally copying keys from
    /// `copy_from` with values blanked.
    fn create_language_file(
        &self,
        root: &Path,
        code: &str,
        copy_from: Option<&Language>,
    ) -> Result<Language, Error>;

    /// Removes one language variant's on-disk files.
    fn delete_language_file(&self, language: &Language) -> Result<(), Error>;

    /// Directory-sniffing predicate used for format auto-detection.
    fn can_handle(&self, root: &Path) -> bool;
}

/// Registry of available backends, selected by name or capability probe.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        BackendRegistry {
            backends: Vec::new(),
        }
    }

    /// All three format backends with default options.
    pub fn with_defaults() -> Self {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(crate::backends::XliffBackend::default()));
        registry.register(Box::new(crate::backends::AppleBackend::default()));
        registry.register(Box::new(crate::backends::JsonBackend::default()));
        registry
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
            .map(Box::as_ref)
    }

    pub fn by_kind(&self, kind: FormatKind) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .map(Box::as_ref)
    }

    /// The first backend whose capability probe accepts `root`.
    pub fn detect(&self, root: &Path) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.can_handle(root))
            .map(Box::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Backend> {
        self.backends.iter().map(Box::as_ref)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        BackendRegistry::with_defaults()
    }
}

/// Deduplicates by code, guarantees exactly one default, and sorts
/// default-first then by code.
///
/// When no descriptor is default, the first English-prefixed one (or the
/// first overall, in pre-sort order) is promoted exactly once;
/// `clear_promoted_code` additionally resets the promoted code to the
/// invariant empty string, which the Apple backend requires.
pub(crate) fn finalize_languages(
    languages: Vec<Language>,
    clear_promoted_code: bool,
) -> Vec<Language> {
    let mut kept: Vec<Language> = Vec::new();
    for language in languages {
        match kept.iter_mut().find(|l| l.code == language.code) {
            // On code collisions, prefer the descriptor marked default.
            Some(existing) => {
                if language.is_default && !existing.is_default {
                    *existing = language;
                }
            }
            None => kept.push(language),
        }
    }

    // Exactly one default: demote extras, promote when there is none.
    let mut seen_default = false;
    for language in &mut kept {
        if language.is_default {
            if seen_default {
                language.is_default = false;
            }
            seen_default = true;
        }
    }
    if !seen_default && !kept.is_empty() {
        let index = kept
            .iter()
            .position(Language::is_english)
            .unwrap_or(0);
        kept[index].is_default = true;
        if clear_promoted_code {
            kept[index].code = String::new();
            kept[index].display_name = crate::culture::display_name("");
        }
    }

    kept.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.code.cmp(&b.code)));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str, is_default: bool) -> Language {
        Language::new(code, "strings", is_default, format!("/tmp/{}.json", code))
    }

    #[test]
    fn test_is_reserved_path() {
        assert!(is_reserved_path(Path::new("/project/.polyloc/backup")));
        assert!(is_reserved_path(Path::new("C:\\project\\.polyloc\\backup")));
        assert!(!is_reserved_path(Path::new("/project/fr.lproj")));
        assert!(!is_reserved_path(Path::new("/project/polyloc")));
    }

    #[test]
    fn test_finalize_dedup_prefers_default() {
        let result = finalize_languages(vec![lang("fr", false), lang("fr", true)], false);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_default);
    }

    #[test]
    fn test_finalize_promotes_english_first() {
        let result = finalize_languages(
            vec![lang("fr", false), lang("en-GB", false), lang("de", false)],
            false,
        );
        let default = result.iter().find(|l| l.is_default).unwrap();
        assert_eq!(default.code, "en-GB");
    }

    #[test]
    fn test_finalize_promotes_first_and_clears_code() {
        // No Base.lproj, no en-prefixed language: the first descriptor in
        // pre-sort order wins and its code becomes the invariant.
        let result = finalize_languages(vec![lang("fr", false), lang("de", false)], true);
        let default = result.iter().find(|l| l.is_default).unwrap();
        assert_eq!(default.code, "");
        assert_eq!(result.iter().filter(|l| l.is_default).count(), 1);
        // The promoted descriptor was fr; de keeps its code.
        assert!(result.iter().any(|l| l.code == "de" && !l.is_default));
    }

    #[test]
    fn test_finalize_demotes_second_default() {
        let result = finalize_languages(vec![lang("en", true), lang("fr", true)], false);
        assert_eq!(result.iter().filter(|l| l.is_default).count(), 1);
        assert!(result.iter().find(|l| l.code == "en").unwrap().is_default);
    }

    #[test]
    fn test_finalize_sort_order() {
        let result = finalize_languages(
            vec![lang("fr", false), lang("de", false), lang("en", true)],
            false,
        );
        let codes: Vec<&str> = result.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, ["en", "de", "fr"]);
    }
}
