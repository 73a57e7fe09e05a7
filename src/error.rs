//! All error types for the polyloc crate.
//!
//! These are returned from all fallible operations (discovery, parsing,
//! serialization, writing).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An expected file or language is absent. Recoverable: callers may
    /// treat this as "new language".
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Content is present but fails the format's minimal grammar.
    /// Recoverable per-file; never aborts a whole discovery batch.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A write was attempted without a resolvable file path.
    #[error("invalid write target: {0}")]
    InvalidTarget(String),

    /// A recognized but unhandled variant, e.g. a plural group with zero
    /// parseable forms. The affected entry is dropped, not the file.
    #[error("unsupported structure: {0}")]
    UnsupportedStructure(String),

    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a `MalformedInput` error for a given file and reason.
    pub fn malformed(path: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Error::MalformedInput(format!("{}: {}", path, message))
    }

    /// Creates a `NotFound` error for a path.
    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Error::NotFound(path.to_string())
    }

    /// Whether a caller may continue a multi-file batch after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::MalformedInput(_) | Error::UnsupportedStructure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_not_found_display() {
        let error = Error::not_found("fr.lproj/Main.strings");
        assert_eq!(
            error.to_string(),
            "resource not found: fr.lproj/Main.strings"
        );
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_malformed_display() {
        let error = Error::malformed("strings.fr.xliff", "missing root element");
        assert_eq!(
            error.to_string(),
            "malformed input: strings.fr.xliff: missing root element"
        );
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_invalid_target_not_recoverable() {
        let error = Error::InvalidTarget("no file path set".to_string());
        assert!(error.to_string().contains("invalid write target"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_io_error_wrapped() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_unsupported_structure_recoverable() {
        let error = Error::UnsupportedStructure("plural group with no forms".to_string());
        assert!(error.is_recoverable());
    }
}
