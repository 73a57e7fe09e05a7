//! Codec-level options consumed at the interface boundary.
//!
//! Loading and precedence of configuration files belong to the caller;
//! these structs only describe the knobs the codecs honor. All of them
//! are serde-deserializable so an external configuration layer can bind
//! them directly.

use serde::{Deserialize, Serialize};

/// Options for the XLIFF backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XliffOptions {
    /// When true (the default), non-default languages are written
    /// asymmetrically: `<source>` carries the key and `<target>` the
    /// value, so untranslated entries stay distinguishable. When false,
    /// files are exported source-only: `<source>` carries the real value
    /// and no `<target>` is emitted.
    pub bilingual: bool,

    /// Source language written to fresh files (`srcLang` /
    /// `source-language`). Existing files keep their own value.
    pub development_language: Option<String>,
}

impl Default for XliffOptions {
    fn default() -> Self {
        XliffOptions {
            bilingual: true,
            development_language: None,
        }
    }
}

/// Options for the Apple `.strings`/`.stringsdict` backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppleOptions {
    /// File name inside each `.lproj` folder, without extension
    /// (e.g. "Localizable").
    pub strings_file_name: String,

    /// Culture code `Base.lproj` resolves to. When unset, discovery
    /// infers it from an `en`-prefixed folder if one exists.
    pub development_language: Option<String>,
}

impl Default for AppleOptions {
    fn default() -> Self {
        AppleOptions {
            strings_file_name: "Localizable".to_string(),
            development_language: None,
        }
    }
}

/// JSON encoding flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMode {
    /// `<base>.json` / `<base>.<code>.json` files; dot-nested keys and
    /// `_plural` objects.
    #[default]
    Standard,
    /// `<code>.json` files; flat keys, `key_one`-style plural suffixes.
    I18next,
}

/// Options for the JSON backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonOptions {
    pub mode: JsonMode,

    /// Standard mode only: expand dotted keys into nested objects on
    /// write and flatten them back on read.
    pub nested: bool,

    /// Round-trip comments (`_value`/`_comment` wrappers in standard
    /// mode, `_{key}_comment` siblings in i18next mode).
    pub preserve_comments: bool,

    /// Emit a `_meta` header object on write. Never read back as an
    /// entry.
    pub emit_meta: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            mode: JsonMode::Standard,
            nested: false,
            preserve_comments: true,
            emit_meta: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(XliffOptions::default().bilingual);
        assert_eq!(AppleOptions::default().strings_file_name, "Localizable");
        let json = JsonOptions::default();
        assert_eq!(json.mode, JsonMode::Standard);
        assert!(!json.nested);
        assert!(json.preserve_comments);
    }

    #[test]
    fn test_deserialize_from_config_shape() {
        let options: JsonOptions =
            serde_json::from_str(r#"{"mode":"i18next","nested":false,"emitMeta":true}"#).unwrap();
        assert_eq!(options.mode, JsonMode::I18next);
        assert!(options.emit_meta);
        // Unspecified fields keep their defaults
        assert!(options.preserve_comments);
    }
}
