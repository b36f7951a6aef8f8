// Coarse tags follow the Universal Dependencies UPOS set. CONJ is the pre-v2 name
// some models still emit alongside CCONJ.

use std::{
    fmt,
    str::FromStr,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    annotation::models::{
        ClassicalWord,
        FlatToken,
        RawEntity,
    },
    core::TalosError,
};

#[derive(PartialEq, Clone, Debug, Hash, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PosTag {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Conj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    X,
    Space,
    Other(String),
}

impl PosTag {
    /// Tags offered when composing a custom pattern.
    pub const SELECTABLE: [PosTag; 10] = [
        PosTag::Adj,
        PosTag::Noun,
        PosTag::Verb,
        PosTag::Det,
        PosTag::Adp,
        PosTag::Adv,
        PosTag::Pron,
        PosTag::Num,
        PosTag::Conj,
        PosTag::Part,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PosTag::Adj => "ADJ",
            PosTag::Adp => "ADP",
            PosTag::Adv => "ADV",
            PosTag::Aux => "AUX",
            PosTag::Cconj => "CCONJ",
            PosTag::Conj => "CONJ",
            PosTag::Det => "DET",
            PosTag::Intj => "INTJ",
            PosTag::Noun => "NOUN",
            PosTag::Num => "NUM",
            PosTag::Part => "PART",
            PosTag::Pron => "PRON",
            PosTag::Propn => "PROPN",
            PosTag::Punct => "PUNCT",
            PosTag::Sconj => "SCONJ",
            PosTag::Sym => "SYM",
            PosTag::Verb => "VERB",
            PosTag::X => "X",
            PosTag::Space => "SPACE",
            PosTag::Other(tag) => tag,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PosTag::Adj => "Adjective (big, beautiful)",
            PosTag::Noun => "Noun (house, car)",
            PosTag::Verb => "Verb (run, eat)",
            PosTag::Det => "Determiner (the, a, an)",
            PosTag::Adp => "Preposition (of, in, on)",
            PosTag::Adv => "Adverb (quickly, very)",
            PosTag::Pron => "Pronoun (he, she, it)",
            PosTag::Num => "Number (one, first)",
            PosTag::Conj | PosTag::Cconj => "Conjunction (and, or)",
            PosTag::Part => "Particle (to, not)",
            PosTag::Propn => "Proper noun (Athens, Homer)",
            _ => "",
        }
    }

    /// Lenient mapping used for backend output: unknown tags are preserved verbatim.
    pub fn from_tag(tag: &str) -> PosTag {
        let upper = tag.trim().to_uppercase();
        match upper.as_str() {
            "ADJ" => PosTag::Adj,
            "ADP" => PosTag::Adp,
            "ADV" => PosTag::Adv,
            "AUX" => PosTag::Aux,
            "CCONJ" => PosTag::Cconj,
            "CONJ" => PosTag::Conj,
            "DET" => PosTag::Det,
            "INTJ" => PosTag::Intj,
            "NOUN" => PosTag::Noun,
            "NUM" => PosTag::Num,
            "PART" => PosTag::Part,
            "PRON" => PosTag::Pron,
            "PROPN" => PosTag::Propn,
            "PUNCT" => PosTag::Punct,
            "SCONJ" => PosTag::Sconj,
            "SYM" => PosTag::Sym,
            "VERB" => PosTag::Verb,
            "X" => PosTag::X,
            "SPACE" => PosTag::Space,
            _ => PosTag::Other(upper),
        }
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strict parsing for user input: only known UPOS tags are accepted.
impl FromStr for PosTag {
    type Err = TalosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PosTag::from_tag(s) {
            PosTag::Other(tag) => Err(TalosError::UnknownPosTag(tag)),
            tag => Ok(tag),
        }
    }
}

impl From<String> for PosTag {
    fn from(value: String) -> Self {
        PosTag::from_tag(&value)
    }
}

impl From<PosTag> for String {
    fn from(value: PosTag) -> Self {
        value.as_str().to_string()
    }
}

/// Normalized token shared by every aggregator and the pattern engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedToken {
    pub text: String,
    pub pos: PosTag,
    pub lemma: String,
    pub is_alpha: bool,
    pub is_stop: bool,
    pub sentence: usize,
}

impl AnnotatedToken {
    pub fn is_whitespace(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn starts_uppercase(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }
}

/// Non-empty and made only of alphabetic characters.
pub fn is_alphabetic(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}

impl From<(FlatToken, usize)> for AnnotatedToken {
    fn from((raw, sentence): (FlatToken, usize)) -> Self {
        let is_alpha = raw.is_alpha.unwrap_or_else(|| is_alphabetic(&raw.text));
        let lemma = if raw.lemma.is_empty() { raw.text.clone() } else { raw.lemma };
        AnnotatedToken {
            text: raw.text,
            pos: PosTag::from_tag(&raw.pos),
            lemma,
            is_alpha,
            is_stop: raw.is_stop,
            sentence,
        }
    }
}

// Classical output carries no alphabetic or stop-word flags; the stop flag is always false.
impl From<(ClassicalWord, usize)> for AnnotatedToken {
    fn from((raw, sentence): (ClassicalWord, usize)) -> Self {
        let is_alpha = is_alphabetic(&raw.text);
        let lemma = raw.lemma.filter(|l| !l.is_empty()).unwrap_or_else(|| raw.text.clone());
        AnnotatedToken {
            text: raw.text,
            pos: PosTag::from_tag(&raw.upos),
            lemma,
            is_alpha,
            is_stop: false,
            sentence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl From<RawEntity> for EntitySpan {
    fn from(raw: RawEntity) -> Self {
        EntitySpan {
            text: raw.text,
            label: raw.label.trim().to_uppercase(),
            start_char: raw.start_char,
            end_char: raw.end_char,
        }
    }
}
