#![forbid(unsafe_code)]
//! Multi-format localization resource codec for Rust.
//!
//! Discovers language files in a project tree, parses them into one
//! in-memory model, and serializes the model back to each format without
//! losing keys, values, comments, plural forms, or culture identity.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use polyloc::{BackendRegistry, KeyComparison};
//! use std::path::Path;
//!
//! let registry = BackendRegistry::with_defaults();
//! let backend = registry.detect(Path::new("./Locales")).expect("no known format");
//!
//! for language in backend.discover_languages(Path::new("./Locales"))? {
//!     let resource = backend.read(&language)?;
//!     println!("{}: {} entries", language, resource.entries.len());
//! }
//!
//! let report = backend.validate(Path::new("./Locales"), KeyComparison::CaseInsensitive)?;
//! assert!(report.is_clean());
//! # Ok::<(), polyloc::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **XLIFF 1.2 / 2.0** (`.xliff`, `.xlf`): version auto-detection,
//!   bilingual source/target handling, gettext-style plural groups
//! - **Apple `.strings` / `.stringsdict`**: `.lproj` folder discovery,
//!   `Base.lproj` development-language mapping, plural splitting
//! - **JSON**: standard (`<base>.<code>.json`, nested keys, `_plural`
//!   objects) and i18next (`<code>.json`, `key_one` suffixes) layouts
//!
//! All codec operations are synchronous, file-local, and stateless;
//! writes are atomic per physical file (temp file plus rename). Callers
//! own any cross-thread or cross-process coordination.

pub mod atomic;
pub mod backend;
pub mod backends;
pub mod culture;
pub mod error;
pub mod formats;
pub mod options;
pub mod traits;
pub mod types;
pub mod validate;

// Re-export most used types for easy consumption
pub use crate::{
    backend::{Backend, BackendRegistry, RESERVED_DIR},
    backends::{AppleBackend, JsonBackend, XliffBackend},
    error::Error,
    formats::FormatKind,
    options::{AppleOptions, JsonMode, JsonOptions, XliffOptions},
    types::{Entry, KeyComparison, Language, Plural, PluralCategory, ResourceFile, Translation},
    validate::{LanguageValidation, ValidationReport},
};
