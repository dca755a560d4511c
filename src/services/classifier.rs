//! Keyword classification of listing titles.

use crate::models::Classification;

/// Case-insensitive substring matcher over an ordered keyword list.
///
/// Keywords are lowercased once up front; the first keyword in configured
/// order that occurs in the title wins.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<(String, String)>,
}

impl KeywordClassifier {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(AsRef::as_ref)
            .filter(|k| !k.trim().is_empty())
            .map(|k| (k.to_string(), k.to_lowercase()))
            .collect();
        Self { keywords }
    }

    pub fn classify(&self, title: &str) -> Classification {
        let title = title.to_lowercase();
        self.keywords
            .iter()
            .find(|(_, lowered)| title.contains(lowered.as_str()))
            .map_or(Classification::Unmatched, |(keyword, _)| {
                Classification::Matched {
                    keyword: keyword.clone(),
                }
            })
    }
}

/// One-shot classification without building a classifier.
pub fn classify<S: AsRef<str>>(title: &str, keywords: &[S]) -> Classification {
    KeywordClassifier::new(keywords).classify(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(keyword: &str) -> Classification {
        Classification::Matched {
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn first_configured_keyword_wins() {
        assert_eq!(
            classify("Budowa drogi ekspresowej", &["drogi", "budowa"]),
            matched("drogi")
        );
        assert_eq!(
            classify("Budowa drogi ekspresowej", &["budowa", "drogi"]),
            matched("budowa")
        );
    }

    #[test]
    fn matching_ignores_case_including_diacritics() {
        assert_eq!(
            classify("PRZETARG na USŁUGI", &["usługi"]),
            matched("usługi")
        );
        assert_eq!(classify("remont ŻŁOBKA", &["Żłobka"]), matched("Żłobka"));
    }

    #[test]
    fn reports_the_keyword_as_configured() {
        assert_eq!(classify("dostawa węgla", &["DOSTAWA"]), matched("DOSTAWA"));
    }

    #[test]
    fn unmatched_when_nothing_fits() {
        assert_eq!(
            classify("Sprzedaż nieruchomości", &["drogi", "budowa"]),
            Classification::Unmatched
        );
    }

    #[test]
    fn empty_and_blank_keywords_never_match() {
        let none: [&str; 0] = [];
        assert_eq!(classify("Anything", &none), Classification::Unmatched);
        assert_eq!(classify("Anything", &["", "  "]), Classification::Unmatched);
    }

    #[test]
    fn substring_inside_a_word_matches() {
        assert_eq!(classify("Przebudowa mostu", &["budowa"]), matched("budowa"));
    }
}
