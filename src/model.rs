//! Domain model: custom results, match terms, collected identities.

use serde::{Deserialize, Serialize};

/// How a term matches incoming search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "Broad Match")]
    Broad,
    #[serde(rename = "Exact Match")]
    Exact,
    #[serde(rename = "Phrase Match")]
    Phrase,
}

impl MatchType {
    /// Resolve a match type from a CSS-class-like marker string.
    ///
    /// Case-insensitive substring match; anything unrecognized (including
    /// an empty marker) resolves to Broad.
    pub fn from_marker(marker: &str) -> Self {
        let marker = marker.to_lowercase();
        if marker.contains("exact") {
            MatchType::Exact
        } else if marker.contains("phrase") {
            MatchType::Phrase
        } else {
            MatchType::Broad
        }
    }

    /// The label the admin UI shows for this match type.
    pub fn option_label(&self) -> &'static str {
        match self {
            MatchType::Broad => "Broad Match",
            MatchType::Exact => "Exact Match",
            MatchType::Phrase => "Phrase Match",
        }
    }
}

impl Default for MatchType {
    fn default() -> Self {
        MatchType::Broad
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.option_label())
    }
}

/// A single matching term of a custom result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub label: String,
    #[serde(rename = "match")]
    pub match_type: MatchType,
}

impl Term {
    pub fn new(label: impl Into<String>, match_type: MatchType) -> Self {
        Self {
            label: label.into(),
            match_type,
        }
    }
}

/// A named custom result: ordered terms plus ordered included products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomResult {
    pub name: String,
    pub terms: Vec<Term>,
    pub products: Vec<String>,
}

impl CustomResult {
    /// Case-folded name used for existence checks across stores.
    ///
    /// Name equality is case-insensitive; the record otherwise carries
    /// no normalization.
    pub fn dedup_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Records without a name are never compared or created.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Identity of a result captured from a source listing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResultIdentity {
    /// Display name shown in the listing row.
    pub name: String,
    /// Location of the detail view.
    pub href: String,
}

/// Fold a destination name into its dedup form.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_resolution_is_substring_and_case_insensitive() {
        assert_eq!(MatchType::from_marker("search-term term--exact"), MatchType::Exact);
        assert_eq!(MatchType::from_marker("TERM--PHRASE badge"), MatchType::Phrase);
        assert_eq!(MatchType::from_marker("term--broad"), MatchType::Broad);
        assert_eq!(MatchType::from_marker("something-else"), MatchType::Broad);
        assert_eq!(MatchType::from_marker(""), MatchType::Broad);
    }

    #[test]
    fn dedup_key_folds_case_and_whitespace() {
        let cr = CustomResult {
            name: "  Summer Sale ".to_string(),
            terms: vec![],
            products: vec![],
        };
        assert_eq!(cr.dedup_key(), "summer sale");
        assert!(cr.has_name());
    }

    #[test]
    fn blank_name_is_invalid() {
        let cr = CustomResult {
            name: "   ".to_string(),
            terms: vec![],
            products: vec![],
        };
        assert!(!cr.has_name());
    }

    #[test]
    fn term_serializes_with_ui_labels() {
        let term = Term::new("shoes", MatchType::Exact);
        let json = serde_json::to_value(&term).unwrap();
        assert_eq!(json["label"], "shoes");
        assert_eq!(json["match"], "Exact Match");
    }
}
