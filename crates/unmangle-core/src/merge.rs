//! Suggestion merging.
//!
//! Flattens per-chunk suggestion lists into one rename map. Overlapping
//! chunks routinely suggest different names for the same identifier; the
//! highest confidence wins, with ties broken by first-seen order, so the
//! result is deterministic for a given chunk order.

use crate::provider::RenameSuggestion;
use std::collections::{BTreeMap, HashMap};

/// Suffix appended to a suggested name that collides with a reserved word,
/// keeping it a valid identifier while preserving intent (`class` →
/// `class$`).
pub const ESCAPE_SUFFIX: &str = "$";

/// ECMAScript reserved words, including strict-mode reservations and the
/// literal keywords. A suggested name equal to any of these cannot be used
/// bare as an identifier.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` is an ECMAScript reserved word.
#[must_use]
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.binary_search(&name).is_ok()
}

/// Whether `name` is a syntactically valid (ASCII) JavaScript identifier,
/// ignoring reservedness.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Final deduplicated rename mapping, applied in one rewrite pass.
///
/// Keys are original identifier names; every value is a syntactically
/// valid, non-reserved identifier. Iteration order is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: BTreeMap<String, String>,
}

impl RenameMap {
    /// The final name for `original`, if any.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(original, final)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for RenameMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Merge per-chunk suggestion lists into one rename map.
///
/// - No-op suggestions (`suggested == original`) are dropped.
/// - Suggestions whose names are not valid identifiers are dropped.
/// - For duplicates, the highest confidence wins; ties keep the
///   first-seen suggestion, so the merge is stable for a given chunk order.
/// - Reserved suggested names are escaped with [`ESCAPE_SUFFIX`] rather
///   than dropped.
#[must_use]
pub fn merge(suggestion_lists: &[Vec<RenameSuggestion>]) -> RenameMap {
    // original name -> winning suggested name, keyed for conflict checks.
    let mut winners: HashMap<&str, (&str, f64)> = HashMap::new();
    let mut dropped = 0usize;

    for suggestion in suggestion_lists.iter().flatten() {
        if suggestion.suggested_name == suggestion.original_name {
            continue;
        }
        if !is_valid_identifier(&suggestion.original_name)
            || !is_valid_identifier(&suggestion.suggested_name)
        {
            tracing::debug!(
                original = %suggestion.original_name,
                suggested = %suggestion.suggested_name,
                "dropped suggestion with invalid identifier"
            );
            dropped += 1;
            continue;
        }

        match winners.get(suggestion.original_name.as_str()) {
            // Strictly greater: ties keep the first-seen winner.
            Some(&(_, confidence)) if suggestion.confidence <= confidence => {}
            _ => {
                winners.insert(
                    &suggestion.original_name,
                    (&suggestion.suggested_name, suggestion.confidence),
                );
            }
        }
    }

    let entries: BTreeMap<String, String> = winners
        .into_iter()
        .map(|(original, (suggested, _))| {
            let final_name = if is_reserved_word(suggested) {
                format!("{suggested}{ESCAPE_SUFFIX}")
            } else {
                suggested.to_string()
            };
            (original.to_string(), final_name)
        })
        .collect();

    if dropped > 0 {
        tracing::debug!(dropped, "dropped invalid suggestions during merge");
    }
    RenameMap { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SuggestionKind;

    fn s(original: &str, suggested: &str, confidence: f64) -> RenameSuggestion {
        RenameSuggestion::new(original, suggested, confidence, SuggestionKind::Variable)
    }

    #[test]
    fn test_reserved_word_list_is_sorted() {
        // binary_search in is_reserved_word depends on this.
        let mut sorted = RESERVED_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_WORDS);
    }

    #[test]
    fn test_identifier_validity() {
        assert!(is_valid_identifier("increment"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("$el"));
        assert!(is_valid_identifier("a1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1a"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("dash-case"));
    }

    #[test]
    fn test_highest_confidence_wins() {
        let map = merge(&[
            vec![s("a", "alpha", 0.5)],
            vec![s("a", "accumulator", 0.9)],
            vec![s("a", "arr", 0.3)],
        ]);
        assert_eq!(map.get("a"), Some("accumulator"));
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let map = merge(&[vec![s("a", "first", 0.7)], vec![s("a", "second", 0.7)]]);
        assert_eq!(map.get("a"), Some("first"));
    }

    #[test]
    fn test_noop_suggestions_dropped() {
        let map = merge(&[vec![s("a", "a", 0.9), s("b", "bound", 0.4)]]);
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get("b"), Some("bound"));
    }

    #[test]
    fn test_reserved_suggestion_escaped() {
        let map = merge(&[vec![s("c", "class", 0.8), s("n", "new", 0.8)]]);
        assert_eq!(map.get("c"), Some("class$"));
        assert_eq!(map.get("n"), Some("new$"));
    }

    #[test]
    fn test_invalid_names_dropped() {
        let map = merge(&[vec![
            s("a", "two words", 0.9),
            s("b", "1starts_with_digit", 0.9),
            s("ok", "fine", 0.9),
        ]]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ok"), Some("fine"));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let lists = vec![
            vec![s("a", "alpha", 0.5), s("b", "beta", 0.6)],
            vec![s("a", "accumulator", 0.9), s("c", "class", 0.4)],
        ];
        let first = merge(&lists);
        for _ in 0..10 {
            assert_eq!(merge(&lists), first);
        }
    }

    #[test]
    fn test_every_value_is_usable_identifier() {
        let map = merge(&[vec![
            s("a", "class", 0.9),
            s("b", "beta", 0.8),
            s("c", "yield", 0.7),
        ]]);
        for (_, value) in map.iter() {
            assert!(is_valid_identifier(value), "invalid value {value}");
            assert!(!is_reserved_word(value), "reserved value {value}");
        }
    }
}
