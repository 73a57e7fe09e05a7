//! Culture-code mapping between the model and format naming conventions:
//! ISO-style culture tags, Apple `.lproj` folder names, and i18next file
//! name suffixes.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use unic_langid::LanguageIdentifier;

lazy_static! {
    static ref TWO_LETTER: Regex = Regex::new(r"^[a-z]{2,3}$").unwrap();
    static ref TWO_LETTER_REGION: Regex = Regex::new(r"^[a-z]{2,3}[-_][A-Za-z]{2}$").unwrap();

    /// Curated language names for display labels. Region variants fall back
    /// to the base language name plus the region tag.
    static ref LANGUAGE_NAMES: BTreeMap<&'static str, &'static str> = {
        let mut m = BTreeMap::new();
        for (code, name) in [
            ("ar", "Arabic"), ("cs", "Czech"), ("da", "Danish"), ("de", "German"),
            ("el", "Greek"), ("en", "English"), ("es", "Spanish"), ("fi", "Finnish"),
            ("fr", "French"), ("he", "Hebrew"), ("hi", "Hindi"), ("hu", "Hungarian"),
            ("id", "Indonesian"), ("it", "Italian"), ("ja", "Japanese"), ("ko", "Korean"),
            ("nb", "Norwegian"), ("nl", "Dutch"), ("no", "Norwegian"), ("pl", "Polish"),
            ("pt", "Portuguese"), ("ro", "Romanian"), ("ru", "Russian"), ("sk", "Slovak"),
            ("sv", "Swedish"), ("th", "Thai"), ("tr", "Turkish"), ("uk", "Ukrainian"),
            ("vi", "Vietnamese"), ("zh", "Chinese"),
        ] {
            m.insert(code, name);
        }
        m
    };
}

/// Apple's development-language folder name.
pub const BASE_LPROJ: &str = "Base.lproj";

/// Normalizes a culture code to hyphenated form ("pt_BR" → "pt-BR").
pub fn normalize(code: &str) -> String {
    code.replace('_', "-")
}

/// Whether `code` looks like a real culture identifier.
///
/// Tries a `unic-langid` parse first; when that rejects, falls back to the
/// two-letter and two-letter-plus-region shapes. The empty string is the
/// invariant culture and always plausible.
pub fn is_plausible_code(code: &str) -> bool {
    if code.is_empty() {
        return true;
    }
    let normalized = normalize(code);
    if let Ok(id) = normalized.parse::<LanguageIdentifier>() {
        // BCP 47 lets registered 5-8 letter subtags parse; real culture
        // tags in localization trees use the 2-3 letter ISO codes.
        if id.language.as_str() != "und" && id.language.as_str().len() <= 3 {
            return true;
        }
    }
    let lowered = code.to_ascii_lowercase();
    TWO_LETTER.is_match(&lowered) || TWO_LETTER_REGION.is_match(code)
}

/// Human-readable label for a culture code. Empty code means the
/// default/invariant language.
pub fn display_name(code: &str) -> String {
    if code.is_empty() {
        return "Default".to_string();
    }
    let normalized = normalize(code);
    let mut parts = normalized.splitn(2, '-');
    let base = parts.next().unwrap_or_default().to_ascii_lowercase();
    let region = parts.next();

    match (LANGUAGE_NAMES.get(base.as_str()), region) {
        (Some(name), Some(region)) => format!("{} ({})", name, region.to_ascii_uppercase()),
        (Some(name), None) => (*name).to_string(),
        (None, _) => code.to_string(),
    }
}

/// Apple `.lproj` folder name for a culture code.
pub fn lproj_folder(code: &str) -> String {
    if code.is_empty() {
        BASE_LPROJ.to_string()
    } else {
        format!("{}.lproj", code)
    }
}

/// Culture code encoded in an `.lproj` folder name. `Base.lproj` yields
/// `None`: its code is the development language and resolved by discovery.
pub fn code_from_lproj(folder_name: &str) -> Option<String> {
    let stem = folder_name.strip_suffix(".lproj")?;
    if stem.eq_ignore_ascii_case("Base") {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Splits a standard-mode JSON file stem `<base>.<code>` into its parts.
/// Returns `None` when the stem has no plausible culture suffix.
pub fn split_json_stem(stem: &str) -> Option<(&str, &str)> {
    let (base, code) = stem.rsplit_once('.')?;
    if !base.is_empty() && is_plausible_code(code) {
        Some((base, code))
    } else {
        None
    }
}

/// XLIFF language attributes (`srcLang`/`trgLang`, `source-language`/
/// `target-language`) carry culture tags directly; normalization is the
/// only mapping needed.
pub fn from_xliff_attribute(value: &str) -> String {
    normalize(value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_underscores() {
        assert_eq!(normalize("pt_BR"), "pt-BR");
        assert_eq!(normalize("fr"), "fr");
    }

    #[test]
    fn test_plausible_codes() {
        assert!(is_plausible_code(""));
        assert!(is_plausible_code("en"));
        assert!(is_plausible_code("pt-BR"));
        assert!(is_plausible_code("pt_BR"));
        assert!(is_plausible_code("fil"));
        assert!(!is_plausible_code("strings"));
        assert!(!is_plausible_code("not a code"));
    }

    #[test]
    fn test_display_name_known_language() {
        assert_eq!(display_name("fr"), "French");
        assert_eq!(display_name("pt-BR"), "Portuguese (BR)");
        assert_eq!(display_name("pt_br"), "Portuguese (BR)");
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(""), "Default");
        assert_eq!(display_name("tlh"), "tlh");
    }

    #[test]
    fn test_lproj_round_trip() {
        assert_eq!(lproj_folder("fr"), "fr.lproj");
        assert_eq!(lproj_folder(""), "Base.lproj");
        assert_eq!(code_from_lproj("fr.lproj").as_deref(), Some("fr"));
        assert_eq!(code_from_lproj("Base.lproj"), None);
        assert_eq!(code_from_lproj("NotAFolder"), None);
    }

    #[test]
    fn test_split_json_stem() {
        assert_eq!(split_json_stem("strings.fr"), Some(("strings", "fr")));
        assert_eq!(
            split_json_stem("app.strings.pt-BR"),
            Some(("app.strings", "pt-BR"))
        );
        assert_eq!(split_json_stem("strings"), None);
        assert_eq!(split_json_stem("strings.backup"), None);
    }

    #[test]
    fn test_from_xliff_attribute() {
        assert_eq!(from_xliff_attribute(" en_US "), "en-US");
    }
}
