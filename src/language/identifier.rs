use tracing::{
    debug,
    warn,
};

use super::{
    classifier::{
        default_classifier,
        LanguageClassifier,
        LanguageGuess,
    },
    greek::disambiguate_greek,
    lexicon::{
        has_polytonic,
        PaddedText,
        ANCIENT_GREEK_WORDS,
        ENGLISH_WORDS,
        FRENCH_WORDS,
        GERMAN_WORDS,
        ITALIAN_WORDS,
        MODERN_GREEK_WORDS,
        SPANISH_WORDS,
    },
};
use crate::core::{
    models::Language,
    settings::AnalyzerSettings,
    TalosError,
};

const ANCIENT_GREEK_MIN_PCT: f64 = 1.0;
const ENGLISH_MIN_PCT: f64 = 2.0;
const ENGLISH_MIN_HITS: usize = 5;

/// Two-tier language identification: a probabilistic classifier when one is
/// available, a closed-class word heuristic otherwise.
pub struct LanguageIdentifier {
    classifier: Option<Box<dyn LanguageClassifier>>,
    prefix_chars: usize,
    english_bias: f64,
}

impl LanguageIdentifier {
    pub fn new(classifier: Option<Box<dyn LanguageClassifier>>, settings: &AnalyzerSettings) -> Self {
        Self {
            classifier,
            prefix_chars: settings.classifier_prefix_chars,
            english_bias: settings.english_bias_probability,
        }
    }

    /// Identifier backed by whatever classifier this build ships with.
    pub fn from_settings(settings: &AnalyzerSettings) -> Self {
        Self::new(default_classifier(), settings)
    }

    pub fn heuristic_only() -> Self {
        Self::new(None, &AnalyzerSettings::default())
    }

    pub fn classifier_name(&self) -> Option<&str> {
        self.classifier.as_ref().map(|c| c.name())
    }

    /// Never fails: every path ends in a concrete language, English by default.
    pub fn identify(&self, sample: &str) -> Language {
        let language = match &self.classifier {
            Some(classifier) => match self.primary_tier(classifier.as_ref(), sample) {
                Ok(language) => language,
                Err(e) => {
                    warn!("Language classifier failed ({}), using lexical heuristic", e);
                    fallback_tier(sample)
                }
            },
            None => fallback_tier(sample),
        };

        if language == Language::ModernGreek {
            disambiguate_greek(sample)
        } else {
            language
        }
    }

    fn primary_tier(
        &self,
        classifier: &dyn LanguageClassifier,
        sample: &str,
    ) -> Result<Language, TalosError> {
        let prefix: String = sample.chars().take(self.prefix_chars).collect();
        let guesses = classifier.classify(&prefix)?;
        Ok(decide_from_guesses(&guesses, self.english_bias))
    }
}

/// English anywhere in the ranking above the bias threshold beats the top guess.
pub fn decide_from_guesses(guesses: &[LanguageGuess], english_bias: f64) -> Language {
    if guesses.iter().any(|g| g.code == "en" && g.probability > english_bias) {
        return Language::English;
    }

    guesses.first().and_then(|g| Language::from_code(&g.code)).unwrap_or(Language::English)
}

/// Raw hit counts and their share of the sample's word count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalScores {
    pub total_words: usize,
    pub english_hits: usize,
    pub english: f64,
    pub french: f64,
    pub spanish: f64,
    pub german: f64,
    pub italian: f64,
    pub modern_greek: f64,
    pub ancient_greek: f64,
}

impl LexicalScores {
    pub fn from_text(text: &str) -> Self {
        let padded = PaddedText::new(text);
        let total_words = padded.word_count();
        if total_words == 0 {
            return LexicalScores::default();
        }

        let pct = |hits: usize| hits as f64 / total_words as f64 * 100.0;
        let english_hits = padded.count_present(ENGLISH_WORDS);

        LexicalScores {
            total_words,
            english_hits,
            english: pct(english_hits),
            french: pct(padded.count_present(FRENCH_WORDS)),
            spanish: pct(padded.count_present(SPANISH_WORDS)),
            german: pct(padded.count_present(GERMAN_WORDS)),
            italian: pct(padded.count_present(ITALIAN_WORDS)),
            modern_greek: pct(padded.count_present(MODERN_GREEK_WORDS)),
            ancient_greek: pct(padded.count_present(ANCIENT_GREEK_WORDS)),
        }
    }
}

fn fallback_tier(sample: &str) -> Language {
    let scores = LexicalScores::from_text(sample);
    debug!("Lexical scores: {:?}", scores);
    decide_from_scores(&scores, has_polytonic(sample))
}

/// Decision rule of the lexical heuristic. Ties on the maximum resolve in the order
/// Modern Greek, Italian, French, Spanish, German, English.
pub fn decide_from_scores(scores: &LexicalScores, polytonic: bool) -> Language {
    if polytonic || scores.ancient_greek > ANCIENT_GREEK_MIN_PCT {
        return Language::AncientGreek;
    }

    if scores.total_words == 0 {
        return Language::English;
    }

    if scores.english >= ENGLISH_MIN_PCT || scores.english_hits >= ENGLISH_MIN_HITS {
        return Language::English;
    }

    let candidates = [
        (Language::ModernGreek, scores.modern_greek),
        (Language::Italian, scores.italian),
        (Language::French, scores.french),
        (Language::Spanish, scores.spanish),
        (Language::German, scores.german),
        (Language::English, scores.english),
    ];

    let max_pct = candidates.iter().map(|(_, pct)| *pct).fold(0.0_f64, f64::max);
    if max_pct == 0.0 {
        return Language::English;
    }

    candidates
        .iter()
        .find(|(_, pct)| *pct == max_pct)
        .map(|(lang, _)| *lang)
        .unwrap_or(Language::English)
}
