use crate::core::TalosError;

/// One entry of a classifier's ranked output.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    /// ISO 639-1 code, `zh-cn` for Mandarin.
    pub code: String,
    pub probability: f64,
}

impl LanguageGuess {
    pub fn new(code: impl Into<String>, probability: f64) -> Self {
        Self { code: code.into(), probability }
    }
}

/// Probabilistic language classifier used by the primary detection tier.
pub trait LanguageClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked guesses, most probable first.
    fn classify(&self, sample: &str) -> Result<Vec<LanguageGuess>, TalosError>;
}

/// Classifier compiled into this build, if any.
pub fn default_classifier() -> Option<Box<dyn LanguageClassifier>> {
    #[cfg(feature = "whatlang")]
    {
        Some(Box::new(WhatlangClassifier))
    }
    #[cfg(not(feature = "whatlang"))]
    {
        None
    }
}

/// Classifier backed by `whatlang` trigram scores.
///
/// `whatlang` reports only its winner, so English is scored again head to head
/// against that winner. The pairwise confidence `c` splits as `(1 + c) / 2` for the
/// pairwise winner and `(1 - c) / 2` for the loser. Both guesses then carry
/// probabilities on the same scale, and English has one even when another
/// language ranks first.
#[cfg(feature = "whatlang")]
pub struct WhatlangClassifier;

#[cfg(feature = "whatlang")]
impl LanguageClassifier for WhatlangClassifier {
    fn name(&self) -> &str {
        "whatlang"
    }

    fn classify(&self, sample: &str) -> Result<Vec<LanguageGuess>, TalosError> {
        use whatlang::{
            Detector,
            Lang,
            Script,
        };

        let info = whatlang::detect(sample)
            .ok_or_else(|| TalosError::Custom("whatlang could not determine a language".into()))?;
        let top = LanguageGuess::new(lang_code(info.lang()), info.confidence());

        // English trigrams only compete on Latin script
        if info.lang() == Lang::Eng || info.script() != Script::Latin {
            return Ok(vec![top]);
        }

        let head_to_head = Detector::with_allowlist(vec![info.lang(), Lang::Eng])
            .detect(sample)
            .map(|pair| (pair.lang() == Lang::Eng, pair.confidence()));

        Ok(rank_with_english(top, head_to_head))
    }
}

#[cfg(feature = "whatlang")]
fn lang_code(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;

    match lang {
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Cmn => "zh-cn",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Ara => "ar",
        Lang::Ell => "el",
        // Unmapped languages keep their ISO 639-3 code and resolve to English downstream
        other => other.code(),
    }
}

/// Splits a non-English top guess and English by a head-to-head result
/// `(english_won, confidence)`, most probable first.
pub fn rank_with_english(
    top: LanguageGuess,
    head_to_head: Option<(bool, f64)>,
) -> Vec<LanguageGuess> {
    let Some((english_won, confidence)) = head_to_head else {
        return vec![top];
    };

    let confidence = confidence.clamp(0.0, 1.0);
    let english = if english_won { (1.0 + confidence) / 2.0 } else { (1.0 - confidence) / 2.0 };

    let mut guesses =
        vec![LanguageGuess::new(top.code, 1.0 - english), LanguageGuess::new("en", english)];
    guesses.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    guesses
}


#[cfg(all(test, feature = "whatlang"))]
mod tests {
    use super::*;

    #[test]
    fn test_whatlang_maps_to_short_codes() {
        let classifier = WhatlangClassifier;
        let guesses = classifier
            .classify("Der schnelle braune Fuchs springt über den faulen Hund und die Katze schläft.")
            .unwrap();
        assert_eq!(guesses[0].code, "de");
    }

    #[test]
    fn test_mostly_french_text_still_scores_english() {
        let guesses = WhatlangClassifier
            .classify(
                "Le chat noir dort tranquillement sur la table de la cuisine pendant que toute \
                 la famille prépare le dîner dans la maison, and the dog waits outside.",
            )
            .unwrap();

        assert_eq!(guesses.len(), 2);
        assert_eq!(guesses[0].code, "fr");
        let english = guesses.iter().find(|g| g.code == "en").unwrap();
        assert!(english.probability <= 0.5);
        assert!(guesses[0].probability >= english.probability);
    }

    #[test]
    fn test_greek_script_has_no_english_guess() {
        let guesses = WhatlangClassifier
            .classify("Η γάτα κοιμάται πάνω στο τραπέζι της κουζίνας και ο σκύλος περιμένει έξω.")
            .unwrap();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].code, "el");
    }

    #[test]
    fn test_whatlang_rejects_letterless_input() {
        assert!(WhatlangClassifier.classify("1234 5678 !!").is_err());
    }
}
