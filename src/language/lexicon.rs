//! Closed-class word lists used by the lexical fallback and the Greek disambiguator.

/// Breathing/accent combinations that never occur in monotonic Modern Greek.
pub const POLYTONIC_MARKS: &[char] =
    &['ἀ', 'ἁ', 'ἂ', 'ἃ', 'ἄ', 'ἅ', 'ἆ', 'ἇ', 'ὁ', 'ὃ'];

pub const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "is", "are", "was", "were", "have", "has", "will", "would", "this", "that",
    "with", "from", "they", "been", "their", "said", "each", "which", "she", "do", "how", "if",
    "up", "out", "many", "time", "very", "when", "much", "can", "there", "use", "your", "way",
    "about", "could", "just",
];

pub const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "de", "du", "des", "et", "est", "sont", "avec", "dans", "pour", "sur", "ce",
    "qui", "une", "tout", "nous", "vous", "ils",
];

pub const SPANISH_WORDS: &[&str] = &[
    "el", "la", "los", "las", "de", "del", "y", "es", "son", "con", "en", "por", "para", "que",
    "un", "una", "todo", "pero", "más", "como",
];

pub const GERMAN_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "sind", "mit", "von", "zu", "haben", "auf", "für", "ein",
    "eine", "nicht", "sich", "auch", "werden", "bei", "noch",
];

pub const ITALIAN_WORDS: &[&str] = &[
    "il", "la", "le", "di", "e", "che", "un", "una", "con", "per", "in", "da", "del", "della",
    "dei", "delle", "sono", "è", "hanno", "sia",
];

/// Modern Greek function words scored by the fallback heuristic.
pub const MODERN_GREEK_WORDS: &[&str] = &[
    "το", "η", "και", "του", "της", "στην", "στον", "με", "για", "από", "όλα", "αυτό", "που", "θα",
    "είναι", "έχει", "μια", "στα", "ένα", "όμως",
];

/// Modern Greek function words weighed against `ANCIENT_GREEK_WORDS` when disambiguating.
pub const MODERN_GREEK_MARKERS: &[&str] = &[
    "και", "το", "της", "του", "τα", "με", "σε", "για", "από", "που", "θα", "είναι", "έχει",
    "έχουν", "ήταν", "αυτό", "αυτή", "αυτά", "αυτός", "αυτήν", "αυτούς",
];

pub const ANCIENT_GREEK_WORDS: &[&str] = &[
    "καὶ", "τὸ", "τίν", "τοῦ", "ἐν", "τῆς", "εἰς", "τῶν", "τὰς", "ὃ", "ἡ", "τόν", "αὐτὸν",
    "αὐτοῦ", "ἐστι", "γὰρ", "δὲ", "οὐ", "μὴ", "ἀλλὰ", "ἄν", "ἔστι", "ὅτι", "ὡς", "μετὰ", "πρὸς",
    "διὰ", "παρὰ", "ἀπὸ", "ἐπὶ", "ὑπὸ", "περὶ", "σὺν", "ἄνευ", "ἕνεκα", "χάριν", "ἕως", "μέχρι",
    "πρίν", "ἐάν", "ἵνα", "ὅπως", "ὅταν", "ἐπεὶ",
];

/// Checks the original-case text; lower-casing would not remove these marks but the
/// check is defined on the raw input.
pub fn has_polytonic(text: &str) -> bool {
    text.chars().any(|c| POLYTONIC_MARKS.contains(&c))
}

/// Lower-cased text with whitespace runs collapsed to single spaces and one space of
/// padding on each side, so a list entry is a whole word iff `" entry "` occurs in it.
pub struct PaddedText {
    padded: String,
    word_count: usize,
}

impl PaddedText {
    pub fn new(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let word_count = words.len();
        PaddedText { padded: format!(" {} ", words.join(" ")), word_count }
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Number of list entries present at least once as a whole word.
    pub fn count_present(&self, entries: &[&str]) -> usize {
        entries.iter().filter(|entry| self.padded.contains(&format!(" {} ", entry))).count()
    }
}
