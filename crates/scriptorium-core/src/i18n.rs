//! Translation catalogs.
//!
//! A [`TranslationCatalog`] holds the messages for one language. Source
//! catalogs are JSON files maintained by translators; the `compilemessages`
//! command parses, validates and normalizes them into compiled catalogs the
//! serving stack loads at startup.
//!
//! ## JSON Format
//!
//! ```json
//! {
//!   "messages": {
//!     "Hello": "Hola",
//!     "Goodbye": "Adiós"
//!   },
//!   "plurals": {
//!     "document": { "singular": "documento", "plural": "documentos" }
//!   },
//!   "contexts": {
//!     "month\u0004May": "Mayo",
//!     "verb\u0004May": "Puede"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScriptoriumError;

/// The separator between context and msgid in context translation keys.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// A plural translation pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralEntry {
    /// The translated singular form.
    pub singular: String,
    /// The translated plural form.
    pub plural: String,
}

/// A translation catalog for a single language.
///
/// Maps are ordered so that compiled catalogs are byte-stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCatalog {
    /// Simple message translations: msgid -> translated string.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
    /// Plural translations: singular msgid -> forms.
    #[serde(default)]
    pub plurals: BTreeMap<String, PluralEntry>,
    /// Context translations: `"context\u{4}msgid"` -> translated string.
    #[serde(default)]
    pub contexts: BTreeMap<String, String>,
}

impl TranslationCatalog {
    /// Parses a catalog from its JSON source form.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON is malformed.
    pub fn parse(source: &str) -> Result<Self, ScriptoriumError> {
        serde_json::from_str(source)
            .map_err(|e| ScriptoriumError::SerializationError(format!("Invalid catalog: {e}")))
    }

    /// Validates the catalog entries.
    ///
    /// Empty msgids and context keys without the context separator are
    /// rejected; they indicate a broken source file rather than an untranslated
    /// string (untranslated strings are simply absent).
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first offending entry.
    pub fn validate(&self) -> Result<(), ScriptoriumError> {
        for msgid in self.messages.keys().chain(self.plurals.keys()) {
            if msgid.is_empty() {
                return Err(ScriptoriumError::ValidationError(
                    "Empty msgid in catalog".to_string(),
                ));
            }
        }
        for key in self.contexts.keys() {
            if !key.contains(CONTEXT_SEPARATOR) {
                return Err(ScriptoriumError::ValidationError(format!(
                    "Context key '{key}' is missing the context separator"
                )));
            }
        }
        Ok(())
    }

    /// Merges another catalog into this one, overwriting duplicates.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        self.plurals.extend(other.plurals);
        self.contexts.extend(other.contexts);
    }

    /// Serializes the catalog into its compiled form.
    ///
    /// The compiled form is pretty-printed JSON with keys in sorted order,
    /// suitable for committing or shipping alongside the sources.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the catalog cannot be encoded.
    pub fn to_compiled(&self) -> Result<String, ScriptoriumError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ScriptoriumError::SerializationError(e.to_string()))
    }

    /// Returns the total number of translation entries.
    pub fn len(&self) -> usize {
        self.messages.len() + self.plurals.len() + self.contexts.len()
    }

    /// Returns `true` if the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.plurals.is_empty() && self.contexts.is_empty()
    }

    /// Looks up the translation for a msgid, falling back to the msgid.
    pub fn translate<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.messages.get(msgid).map_or(msgid, String::as_str)
    }

    /// Looks up a plural translation, falling back to the given forms.
    pub fn translate_plural<'a>(
        &'a self,
        singular: &'a str,
        plural: &'a str,
        count: u64,
    ) -> &'a str {
        match self.plurals.get(singular) {
            Some(entry) if count == 1 => &entry.singular,
            Some(entry) => &entry.plural,
            None if count == 1 => singular,
            None => plural,
        }
    }

    /// Looks up a translation within a context, falling back to the msgid.
    pub fn translate_with_context<'a>(&'a self, context: &str, msgid: &'a str) -> &'a str {
        let key = format!("{context}{CONTEXT_SEPARATOR}{msgid}");
        self.contexts.get(&key).map_or(msgid, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TranslationCatalog {
        TranslationCatalog::parse(
            r#"{
                "messages": {"Hello": "Hola"},
                "plurals": {"document": {"singular": "documento", "plural": "documentos"}},
                "contexts": {"month\u0004May": "Mayo"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_and_lookup() {
        let catalog = sample();
        assert_eq!(catalog.translate("Hello"), "Hola");
        assert_eq!(catalog.translate("Missing"), "Missing");
        assert_eq!(catalog.translate_plural("document", "documents", 1), "documento");
        assert_eq!(catalog.translate_plural("document", "documents", 3), "documentos");
        assert_eq!(catalog.translate_with_context("month", "May"), "Mayo");
        assert_eq!(catalog.translate_with_context("verb", "May"), "May");
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_msgid() {
        let catalog = TranslationCatalog::parse(r#"{"messages": {"": "x"}}"#).unwrap();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_validate_bad_context_key() {
        let catalog = TranslationCatalog::parse(r#"{"contexts": {"no-separator": "x"}}"#).unwrap();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut catalog = sample();
        let other = TranslationCatalog::parse(r#"{"messages": {"Hello": "Buenos días"}}"#).unwrap();
        catalog.merge(other);
        assert_eq!(catalog.translate("Hello"), "Buenos días");
    }

    #[test]
    fn test_compiled_is_stable() {
        let catalog = sample();
        assert_eq!(catalog.to_compiled().unwrap(), catalog.to_compiled().unwrap());
        // Compiled output round-trips
        let reparsed = TranslationCatalog::parse(&catalog.to_compiled().unwrap()).unwrap();
        assert_eq!(reparsed, catalog);
    }

    #[test]
    fn test_len_and_empty() {
        assert!(TranslationCatalog::default().is_empty());
        assert_eq!(sample().len(), 3);
    }
}
