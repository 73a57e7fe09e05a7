//! Apple backend: `*.lproj` discovery plus split `.strings` /
//! `.stringsdict` reading and writing.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    backend::{Backend, finalize_languages, is_reserved_path},
    culture,
    error::Error,
    formats::{FormatKind, apple_strings, stringsdict},
    options::AppleOptions,
    traits::Parser,
    types::{Entry, Language, ResourceFile},
};

pub struct AppleBackend {
    options: AppleOptions,
}

impl AppleBackend {
    pub fn new(options: AppleOptions) -> Self {
        AppleBackend { options }
    }

    /// `.lproj` folders live directly under the search path or under a
    /// `Resources`/`Sources` subfolder.
    fn candidate_roots(root: &Path) -> Vec<PathBuf> {
        let mut roots = vec![root.to_path_buf()];
        for sub in ["Resources", "Sources"] {
            let candidate = root.join(sub);
            if candidate.is_dir() {
                roots.push(candidate);
            }
        }
        roots
    }

    fn lproj_folders(root: &Path) -> Vec<PathBuf> {
        let mut folders = Vec::new();
        for dir in Self::candidate_roots(root) {
            let Ok(read) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in read.filter_map(Result::ok) {
                let path = entry.path();
                if !path.is_dir() || is_reserved_path(&path) {
                    continue;
                }
                let is_lproj = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".lproj"));
                if is_lproj {
                    folders.push(path);
                }
            }
        }
        folders
    }

    fn strings_path(&self, folder: &Path) -> PathBuf {
        folder.join(format!("{}.strings", self.options.strings_file_name))
    }

    fn dict_path(&self, folder: &Path) -> PathBuf {
        folder.join(format!("{}.stringsdict", self.options.strings_file_name))
    }

    fn folder_has_resources(&self, folder: &Path) -> bool {
        self.strings_path(folder).exists() || self.dict_path(folder).exists()
    }

    /// The development language: explicit configuration first, else the
    /// code of an `en`-prefixed folder found in the scan.
    fn development_language(&self, folders: &[PathBuf]) -> Option<String> {
        if let Some(configured) = &self.options.development_language {
            return Some(configured.clone());
        }
        folders
            .iter()
            .filter_map(|f| f.file_name().and_then(|n| n.to_str()))
            .filter_map(culture::code_from_lproj)
            .find(|code| {
                let lowered = code.to_ascii_lowercase();
                lowered == "en" || lowered.starts_with("en-") || lowered.starts_with("en_")
            })
    }
}

impl Default for AppleBackend {
    fn default() -> Self {
        AppleBackend::new(AppleOptions::default())
    }
}

impl Backend for AppleBackend {
    fn name(&self) -> &'static str {
        "apple"
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Apple
    }

    fn discover_languages(&self, root: &Path) -> Result<Vec<Language>, Error> {
        let folders = Self::lproj_folders(root);
        let development = self.development_language(&folders);

        let mut languages = Vec::new();
        for folder in &folders {
            if !self.folder_has_resources(folder) {
                continue;
            }
            let Some(folder_name) = folder.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // The descriptor anchors on the .strings path even when only
            // the .stringsdict sibling exists.
            let anchor = self.strings_path(folder);

            let (code, is_default) = match culture::code_from_lproj(folder_name) {
                // Base.lproj maps to the development language, or stays
                // unresolved as the invariant code.
                None => (development.clone().unwrap_or_default(), true),
                Some(code) => {
                    let is_default = development.as_deref() == Some(code.as_str());
                    (code, is_default)
                }
            };
            languages.push(Language::new(
                code,
                self.options.strings_file_name.clone(),
                is_default,
                anchor,
            ));
        }

        // Promotion clears the promoted code: the default language is the
        // invariant one for downstream consumers.
        Ok(finalize_languages(languages, true))
    }

    fn read(&self, language: &Language) -> Result<ResourceFile, Error> {
        let strings_path = &language.file_path;
        let dict_path = strings_path.with_extension("stringsdict");

        if !strings_path.exists() && !dict_path.exists() {
            return Err(Error::not_found(strings_path.display()));
        }

        let mut entries = Vec::new();
        if strings_path.exists() {
            entries.extend(apple_strings::Document::read_from(strings_path)?.into_entries());
        }
        if dict_path.exists() {
            entries.extend(stringsdict::Document::read_from(&dict_path)?.into_entries());
        }

        Ok(ResourceFile {
            language: language.clone(),
            entries,
        })
    }

    fn write(&self, file: &ResourceFile) -> Result<(), Error> {
        if file.language.file_path.as_os_str().is_empty() {
            return Err(Error::InvalidTarget(
                "language descriptor has no file path".to_string(),
            ));
        }
        let strings_path = &file.language.file_path;
        let dict_path = strings_path.with_extension("stringsdict");

        let (plural, singular): (Vec<&Entry>, Vec<&Entry>) =
            file.entries.iter().partition(|e| e.is_plural());

        // The .strings file is written even when empty so the language
        // folder is never silently incomplete.
        apple_strings::Document::from_entries(singular.iter().copied()).write_to(strings_path)?;

        if plural.is_empty() {
            if dict_path.exists() {
                fs::remove_file(&dict_path)?;
            }
        } else {
            stringsdict::Document::from_entries(plural.iter().copied()).write_to(&dict_path)?;
        }
        Ok(())
    }

    fn create_language_file(
        &self,
        root: &Path,
        code: &str,
        copy_from: Option<&Language>,
    ) -> Result<Language, Error> {
        let folder = root.join(culture::lproj_folder(code));
        let language = Language::new(
            code,
            self.options.strings_file_name.clone(),
            code.is_empty(),
            self.strings_path(&folder),
        );

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
        let strings_path = &language.file_path;
        let dict_path = strings_path.with_extension("stringsdict");

        if !strings_path.exists() && !dict_path.exists() {
            return Err(Error::not_found(strings_path.display()));
        }
        for path in [strings_path.as_path(), dict_path.as_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        // Drop the folder itself once it holds nothing else.
        if let Some(folder) = strings_path.parent() {
            match fs::read_dir(folder) {
                Ok(mut read) => {
                    if read.next().is_none() {
                        if let Err(e) = fs::remove_dir(folder) {
                            warn!(folder = %folder.display(), error = %e, "could not remove empty .lproj folder");
                        }
                    }
                }
                Err(e) => warn!(folder = %folder.display(), error = %e, "could not inspect .lproj folder"),
            }
        }
        Ok(())
    }

    fn can_handle(&self, root: &Path) -> bool {
        Self::lproj_folders(root)
            .iter()
            .any(|folder| self.folder_has_resources(folder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_language_prefers_configuration() {
        let backend = AppleBackend::new(AppleOptions {
            development_language: Some("de".to_string()),
            ..AppleOptions::default()
        });
        let folders = vec![PathBuf::from("/p/en.lproj")];
        assert_eq!(backend.development_language(&folders).as_deref(), Some("de"));
    }

    #[test]
    fn test_development_language_inferred_from_english_folder() {
        let backend = AppleBackend::default();
        let folders = vec![
            PathBuf::from("/p/fr.lproj"),
            PathBuf::from("/p/en-GB.lproj"),
        ];
        assert_eq!(
            backend.development_language(&folders).as_deref(),
            Some("en-GB")
        );
    }

    #[test]
    fn test_development_language_unresolved() {
        let backend = AppleBackend::default();
        let folders = vec![PathBuf::from("/p/fr.lproj")];
        assert_eq!(backend.development_language(&folders), None);
    }

    #[test]
    fn test_write_without_path_is_invalid_target() {
        let backend = AppleBackend::default();
        let file = ResourceFile::new(Language::new("fr", "Localizable", false, ""));
        assert!(matches!(
            backend.write(&file),
            Err(Error::InvalidTarget(_))
        ));
    }
}
