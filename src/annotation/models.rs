use serde::{
    Deserialize,
    Serialize,
};

/// Output of an annotation backend, in one of the two shapes the supported
/// annotators produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AnnotationResult {
    /// Document-level token list with parallel entity spans (modern languages).
    Flat {
        tokens: Vec<FlatToken>,
        #[serde(default)]
        entities: Vec<RawEntity>,
    },
    /// Sentence-grouped words without entity spans (Ancient Greek).
    Sentences { sentences: Vec<ClassicalSentence> },
}

impl AnnotationResult {
    pub fn token_count(&self) -> usize {
        match self {
            AnnotationResult::Flat { tokens, .. } => tokens.len(),
            AnnotationResult::Sentences { sentences } => {
                sentences.iter().map(|s| s.words.len()).sum()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatToken {
    pub text: String,
    pub pos: String,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub is_alpha: Option<bool>,
    #[serde(default)]
    pub is_stop: bool,
    #[serde(default)]
    pub is_sent_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    #[serde(default)]
    pub text: String,
    pub label: String,
    pub start_char: usize,
    pub end_char: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalSentence {
    #[serde(default)]
    pub text: String,
    pub words: Vec<ClassicalWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalWord {
    pub text: String,
    pub upos: String,
    #[serde(default)]
    pub lemma: Option<String>,
}
