use std::fmt;

use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};

use super::counts::FindingCounts;
use crate::{
    core::{
        models::Language,
        TalosError,
    },
    segmentation::{
        token_models::{
            AnnotatedToken,
            PosTag,
        },
        TokenStream,
    },
};

/// Latin letters with Latin-1 accents, basic Greek, tonal Greek and the Greek Extended block.
pub const WORD_PATTERN: &str = r"\b[a-zA-ZÀ-ÿα-ωΑ-Ωά-ώ\x{1F00}-\x{1FFF}]+\b";

const MIN_CHARS: usize = 3;

/// Word frequencies straight from the raw text, no annotation needed.
pub fn count_words(text: &str) -> Result<FindingCounts, TalosError> {
    let re = Regex::new(WORD_PATTERN)?;

    Ok(re
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| word.chars().count() >= MIN_CHARS)
        .map(str::to_lowercase)
        .collect())
}

pub fn count_nouns(stream: &TokenStream) -> FindingCounts {
    stream
        .tokens
        .iter()
        .filter(|t| t.pos == PosTag::Noun && t.is_alpha && t.char_len() >= MIN_CHARS)
        .map(|t| t.text.to_lowercase())
        .collect()
}

/// Lemma frequencies. Ancient Greek keeps only tokens whose lemma differs from the
/// surface form; other languages keep every alphabetic non-stopword.
pub fn count_lemmas(stream: &TokenStream, language: Language) -> FindingCounts {
    let classical = language == Language::AncientGreek;

    stream
        .tokens
        .iter()
        .filter(|t| t.is_alpha && !t.is_stop && t.char_len() >= MIN_CHARS && !t.lemma.is_empty())
        .filter(|t| !classical || t.lemma.to_lowercase() != t.text.to_lowercase())
        .map(|t| t.lemma.to_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Location,
}

impl EntityKind {
    /// Entity labels accepted for this kind; models for languages other than
    /// English emit the short forms.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Person => &["PERSON", "PER"],
            EntityKind::Location => &["GPE", "LOC"],
        }
    }

    pub fn accepts(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => write!(f, "persons"),
            EntityKind::Location => write!(f, "locations"),
        }
    }
}

/// Entity frequencies keyed by exact-case surface form.
///
/// Without native spans (the classical backend) the candidates are synthesized by
/// `synthesized_entities`, so both kinds yield the same list.
pub fn count_entities(stream: &TokenStream, kind: EntityKind) -> FindingCounts {
    match &stream.entities {
        Some(spans) => spans
            .iter()
            .filter(|span| kind.accepts(&span.label))
            .map(|span| span.text.trim())
            .filter(|text| !text.is_empty())
            .collect(),
        None => synthesized_entities(&stream.tokens).map(|t| t.text.clone()).collect(),
    }
}

/// Capitalized nouns and proper nouns of three or more characters.
///
/// This approximates named-entity recognition from capitalization and POS alone; it
/// picks up sentence-initial common nouns and cannot tell persons from places.
pub fn synthesized_entities(
    tokens: &[AnnotatedToken],
) -> impl Iterator<Item = &AnnotatedToken> + '_ {
    tokens.iter().filter(|t| {
        matches!(t.pos, PosTag::Propn | PosTag::Noun)
            && t.starts_uppercase()
            && t.char_len() >= MIN_CHARS
    })
}
