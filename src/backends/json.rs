//! JSON backend: discovery over `<base>.json`/`<base>.<code>.json`
//! (standard mode) or `<code>.json` (i18next mode) files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{
    backend::{Backend, finalize_languages, is_reserved_path},
    culture,
    error::Error,
    formats::FormatKind,
    formats::json_resource::{Document, Meta},
    options::{JsonMode, JsonOptions},
    traits::Parser,
    types::{Language, ResourceFile},
};

pub struct JsonBackend {
    base_name: String,
    options: JsonOptions,
}

impl JsonBackend {
    pub fn new(base_name: impl Into<String>, options: JsonOptions) -> Self {
        JsonBackend {
            base_name: base_name.into(),
            options,
        }
    }

    /// Maps a candidate file to a descriptor, or `None` when the name
    /// does not belong to this resource family.
    fn language_of_file(&self, path: &Path) -> Option<Language> {
        let stem = path.file_stem()?.to_str()?;
        match self.options.mode {
            JsonMode::Standard => {
                if stem == self.base_name {
                    return Some(Language::new("", self.base_name.clone(), true, path));
                }
                let (base, code) = culture::split_json_stem(stem)?;
                if base != self.base_name {
                    return None;
                }
                Some(Language::new(code, self.base_name.clone(), false, path))
            }
            JsonMode::I18next => {
                if !culture::is_plausible_code(stem) || stem.is_empty() {
                    return None;
                }
                // The file name alone cannot mark the default language;
                // a `_meta.isDefault` header can.
                let is_default = Document::read_from(path)
                    .ok()
                    .and_then(|d| d.meta())
                    .and_then(|m| m.is_default)
                    .unwrap_or(false);
                Some(Language::new(stem, self.base_name.clone(), is_default, path))
            }
        }
    }

    fn language_file_name(&self, code: &str) -> String {
        match self.options.mode {
            JsonMode::Standard => {
                if code.is_empty() {
                    format!("{}.json", self.base_name)
                } else {
                    format!("{}.{}.json", self.base_name, code)
                }
            }
            JsonMode::I18next => format!("{}.json", code),
        }
    }
}

impl Default for JsonBackend {
    fn default() -> Self {
        JsonBackend::new("strings", JsonOptions::default())
    }
}

impl Backend for JsonBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Json
    }

    fn discover_languages(&self, root: &Path) -> Result<Vec<Language>, Error> {
        let mut languages = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_reserved_path(e.path()))
            .filter_map(Result::ok)
        {
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if !entry.file_type().is_file() || !is_json {
                continue;
            }
            if let Some(language) = self.language_of_file(path) {
                languages.push(language);
            }
        }
        Ok(finalize_languages(languages, false))
    }

    fn read(&self, language: &Language) -> Result<ResourceFile, Error> {
        let document = Document::read_from(&language.file_path)?;
        Ok(ResourceFile {
            language: language.clone(),
            entries: document.entries(&self.options),
        })
    }

    fn write(&self, file: &ResourceFile) -> Result<(), Error> {
        if file.language.file_path.as_os_str().is_empty() {
            return Err(Error::InvalidTarget(
                "language descriptor has no file path".to_string(),
            ));
        }
        let meta = self.options.emit_meta.then(|| {
            let culture = (!file.language.code.is_empty()).then(|| file.language.code.clone());
            let is_default = matches!(self.options.mode, JsonMode::I18next)
                .then_some(file.language.is_default);
            Meta::new(culture, is_default)
        });
        let document = Document::from_entries(&file.entries, &self.options, meta);
        document.write_to(&file.language.file_path)
    }

    fn create_language_file(
        &self,
        root: &Path,
        code: &str,
        copy_from: Option<&Language>,
    ) -> Result<Language, Error> {
        let path: PathBuf = root.join(self.language_file_name(code));
        let is_default = match self.options.mode {
            JsonMode::Standard => code.is_empty(),
            JsonMode::I18next => false,
        };
        let language = Language::new(code, self.base_name.clone(), is_default, &path);

        let entries = match copy_from {
            Some(source) => super::xliff::blank_entries(&self.read(source)?.entries),
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
            .any(|e| {
                e.file_type().is_file()
                    && e.path()
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .zip(e.path().extension().and_then(|x| x.to_str()))
                        .is_some_and(|(stem, ext)| {
                            ext.eq_ignore_ascii_case("json")
                                && match self.options.mode {
                                    JsonMode::Standard => {
                                        stem == self.base_name
                                            || culture::split_json_stem(stem)
                                                .is_some_and(|(base, _)| base == self.base_name)
                                    }
                                    JsonMode::I18next => culture::is_plausible_code(stem),
                                }
                        })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of_file_standard_mode() {
        let backend = JsonBackend::default();
        let default = backend
            .language_of_file(Path::new("/p/strings.json"))
            .unwrap();
        assert!(default.is_default);
        assert_eq!(default.code, "");

        let french = backend
            .language_of_file(Path::new("/p/strings.fr.json"))
            .unwrap();
        assert!(!french.is_default);
        assert_eq!(french.code, "fr");

        assert!(backend.language_of_file(Path::new("/p/other.json")).is_none());
        assert!(
            backend
                .language_of_file(Path::new("/p/other.fr.json"))
                .is_none()
        );
    }

    #[test]
    fn test_language_file_name() {
        let standard = JsonBackend::default();
        assert_eq!(standard.language_file_name(""), "strings.json");
        assert_eq!(standard.language_file_name("de"), "strings.de.json");

        let i18next = JsonBackend::new(
            "strings",
            JsonOptions {
                mode: JsonMode::I18next,
                ..JsonOptions::default()
            },
        );
        assert_eq!(i18next.language_file_name("de"), "de.json");
    }

    #[test]
    fn test_write_without_path_is_invalid_target() {
        let backend = JsonBackend::default();
        let file = ResourceFile::new(Language::new("fr", "strings", false, ""));
        assert!(matches!(
            backend.write(&file),
            Err(Error::InvalidTarget(_))
        ));
    }
}
