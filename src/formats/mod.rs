//! All supported localization file formats.
//!
//! Each submodule owns one on-disk grammar and converts between raw
//! bytes/text and the model types in [`crate::types`]. The
//! [`FormatKind`] enum names the formats for registry lookups and
//! diagnostics.

pub mod apple_strings;
pub mod json_resource;
pub mod stringsdict;
pub mod xliff;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::Error;

/// Names the supported format families for generic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// XLIFF 1.2/2.0 (`.xliff`, `.xlf`).
    Xliff,
    /// Apple `.strings` plus `.stringsdict` siblings in `.lproj` folders.
    Apple,
    /// JSON language files (standard or i18next layout).
    Json,
}

impl FormatKind {
    /// File extensions claimed by this format, without the leading dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FormatKind::Xliff => &["xliff", "xlf"],
            FormatKind::Apple => &["strings", "stringsdict"],
            FormatKind::Json => &["json"],
        }
    }
}

impl Display for FormatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Xliff => write!(f, "xliff"),
            FormatKind::Apple => write!(f, "apple"),
            FormatKind::Json => write!(f, "json"),
        }
    }
}

impl FromStr for FormatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xliff" | "xlf" => Ok(FormatKind::Xliff),
            "apple" | "strings" | "ios" => Ok(FormatKind::Apple),
            "json" | "i18next" => Ok(FormatKind::Json),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}
