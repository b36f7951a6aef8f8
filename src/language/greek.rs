use tracing::debug;

use super::lexicon::{
    has_polytonic,
    PaddedText,
    ANCIENT_GREEK_WORDS,
    MODERN_GREEK_MARKERS,
};
use crate::core::models::Language;

/// Splits a Greek-script verdict into Ancient or Modern Greek.
///
/// Any polytonic mark in the original-case text settles it; otherwise Ancient Greek
/// wins only when more of its function words are present than Modern ones.
pub fn disambiguate_greek(text: &str) -> Language {
    if has_polytonic(text) {
        debug!("Polytonic marks present, classifying as Ancient Greek");
        return Language::AncientGreek;
    }

    let padded = PaddedText::new(text);
    let ancient = padded.count_present(ANCIENT_GREEK_WORDS);
    let modern = padded.count_present(MODERN_GREEK_MARKERS);
    debug!("Greek disambiguation: {} ancient markers, {} modern markers", ancient, modern);

    if ancient > modern {
        Language::AncientGreek
    } else {
        Language::ModernGreek
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polytonic_text_is_ancient() {
        assert_eq!(disambiguate_greek("ὁ ἄνθρωπος και το σπίτι"), Language::AncientGreek);
    }

    #[test]
    fn test_modern_markers_keep_modern() {
        let text = "Το σπίτι είναι μεγάλο και η αυλή έχει δέντρα για τα παιδιά";
        assert_eq!(disambiguate_greek(text), Language::ModernGreek);
    }

    #[test]
    fn test_ancient_function_words_without_breathing_marks() {
        // Grave-accented particles but none of the breathing marks
        let text = "λόγος γὰρ μετὰ πρὸς διὰ τοῦ";
        assert_eq!(disambiguate_greek(text), Language::AncientGreek);
    }

    #[test]
    fn test_tie_stays_modern() {
        assert_eq!(disambiguate_greek("λόγος"), Language::ModernGreek);
    }
}
