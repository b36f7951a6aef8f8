use std::vec;

use tracing::{
    debug,
    warn,
};

use super::token_models::{
    AnnotatedToken,
    EntitySpan,
};
use crate::{
    annotation::models::{
        AnnotationResult,
        ClassicalSentence,
        ClassicalWord,
        FlatToken,
        RawEntity,
    },
    core::models::{
        BackendFamily,
        Document,
    },
};

/// Uniform view over one annotation result, whatever shape the backend produced.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<AnnotatedToken>;

    /// True when the token last returned by `next_token` opened a sentence.
    fn sentence_boundary(&self) -> bool;

    /// Native entity spans, `None` for backends without an entity recognizer.
    fn entity_spans(&self) -> Option<Vec<EntitySpan>>;
}

/// Document-level token list with parallel entity spans.
pub struct FlatSource {
    tokens: vec::IntoIter<FlatToken>,
    entities: Vec<RawEntity>,
    sentence: usize,
    started: bool,
    opened: bool,
}

impl FlatSource {
    pub fn new(tokens: Vec<FlatToken>, entities: Vec<RawEntity>) -> Self {
        Self { tokens: tokens.into_iter(), entities, sentence: 0, started: false, opened: false }
    }
}

impl TokenSource for FlatSource {
    fn next_token(&mut self) -> Option<AnnotatedToken> {
        let raw = self.tokens.next()?;

        self.opened = !self.started || raw.is_sent_start;
        if self.started && raw.is_sent_start {
            self.sentence += 1;
        }
        self.started = true;

        Some((raw, self.sentence).into())
    }

    fn sentence_boundary(&self) -> bool {
        self.opened
    }

    fn entity_spans(&self) -> Option<Vec<EntitySpan>> {
        Some(self.entities.iter().cloned().map(EntitySpan::from).collect())
    }
}

/// Sentence-grouped word lists, flattened in order.
pub struct SentenceSource {
    sentences: vec::IntoIter<ClassicalSentence>,
    words: vec::IntoIter<ClassicalWord>,
    next_sentence: usize,
    pending_open: bool,
    opened: bool,
}

impl SentenceSource {
    pub fn new(sentences: Vec<ClassicalSentence>) -> Self {
        Self {
            sentences: sentences.into_iter(),
            words: Vec::new().into_iter(),
            next_sentence: 0,
            pending_open: false,
            opened: false,
        }
    }
}

impl TokenSource for SentenceSource {
    fn next_token(&mut self) -> Option<AnnotatedToken> {
        loop {
            if let Some(word) = self.words.next() {
                self.opened = self.pending_open;
                self.pending_open = false;
                // next_sentence was advanced when this sentence was entered
                return Some((word, self.next_sentence - 1).into());
            }

            // Sentences without words are skipped and do not take an index
            let sentence = self.sentences.by_ref().find(|s| !s.words.is_empty())?;
            self.words = sentence.words.into_iter();
            self.next_sentence += 1;
            self.pending_open = true;
        }
    }

    fn sentence_boundary(&self) -> bool {
        self.opened
    }

    fn entity_spans(&self) -> Option<Vec<EntitySpan>> {
        None
    }
}

/// Normalized output of one annotation pass, owned by a single analysis invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    pub tokens: Vec<AnnotatedToken>,
    pub entities: Option<Vec<EntitySpan>>,
    pub sentence_count: usize,
}

impl TokenStream {
    /// Stream built directly from tokens, counting sentences from their indices.
    pub fn from_tokens(tokens: Vec<AnnotatedToken>) -> Self {
        let sentence_count = tokens.last().map(|t| t.sentence + 1).unwrap_or(0);
        Self { tokens, entities: None, sentence_count }
    }

    pub fn drain(source: &mut dyn TokenSource) -> Self {
        let mut tokens = Vec::new();
        let mut sentence_count = 0;

        while let Some(token) = source.next_token() {
            if source.sentence_boundary() {
                sentence_count += 1;
            }
            tokens.push(token);
        }

        Self { tokens, entities: source.entity_spans(), sentence_count }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn has_native_entities(&self) -> bool {
        self.entities.is_some()
    }
}

/// Flattens a backend result into one ordered token stream. No filtering happens here.
pub fn extract(document: &Document, result: AnnotationResult) -> TokenStream {
    let expected = document.language().family();

    let mut source: Box<dyn TokenSource> = match result {
        AnnotationResult::Flat { tokens, entities } => {
            if expected == BackendFamily::Classical {
                warn!("Flat annotation received for {}", document.language());
            }
            Box::new(FlatSource::new(tokens, entities))
        }
        AnnotationResult::Sentences { sentences } => {
            if expected == BackendFamily::Modern {
                warn!("Sentence-grouped annotation received for {}", document.language());
            }
            Box::new(SentenceSource::new(sentences))
        }
    };

    let mut stream = TokenStream::drain(source.as_mut());

    if let Some(entities) = stream.entities.as_mut() {
        for entity in entities.iter_mut().filter(|e| e.text.is_empty()) {
            entity.text = char_slice(document.text(), entity.start_char, entity.end_char);
        }
    }

    debug!(
        "Extracted {} tokens in {} sentences ({} entity spans)",
        stream.len(),
        stream.sentence_count,
        stream.entities.as_ref().map_or(0, Vec::len)
    );

    stream
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
