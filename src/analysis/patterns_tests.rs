use std::sync::{
    atomic::AtomicBool,
    Arc,
    Mutex,
};

use super::{
    patterns::*,
    progress::ProgressReporter,
};
use crate::{
    core::TalosError,
    segmentation::token_models::{
        is_alphabetic,
        AnnotatedToken,
        PosTag,
    },
};

fn tok(text: &str, pos: PosTag) -> AnnotatedToken {
    AnnotatedToken {
        text: text.to_string(),
        pos,
        lemma: text.to_lowercase(),
        is_alpha: is_alphabetic(text),
        is_stop: false,
        sentence: 0,
    }
}

fn template(text: &str) -> PatternTemplate {
    PatternTemplate::parse(text).unwrap()
}

fn sample_stream() -> Vec<AnnotatedToken> {
    vec![
        tok("the", PosTag::Det),
        tok("red", PosTag::Adj),
        tok("car", PosTag::Noun),
        tok("is", PosTag::Verb),
        tok("fast", PosTag::Adj),
    ]
}

#[test]
fn test_fixed_template_single_match() {
    let counts = match_template(&sample_stream(), &template("DET, ADJ, NOUN"));
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get("[DET_ADJ_NOUN]: the red car"), 1);
}

#[test]
fn test_wildcard_takes_observed_tag() {
    let tokens = vec![tok("big", PosTag::Adj), tok("house", PosTag::Noun)];
    let counts = match_template(&tokens, &template("*, NOUN"));
    assert_eq!(counts.get("[ADJ_NOUN]: big house"), 1);
    assert!(counts.iter().all(|(key, _)| !key.contains(WILDCARD)));
}

#[test]
fn test_all_wildcards_match_every_window() {
    let counts = match_template(&sample_stream(), &template("* *"));
    assert_eq!(counts.len(), 4);
    assert_eq!(counts.get("[VERB_ADJ]: is fast"), 1);
}

#[test]
fn test_template_longer_than_stream_is_empty() {
    let tokens = vec![tok("big", PosTag::Adj), tok("house", PosTag::Noun)];
    let counts = match_template(&tokens, &template("DET ADJ NOUN"));
    assert!(counts.is_empty());

    let counts = match_template(&[], &template("NOUN"));
    assert!(counts.is_empty());
}

#[test]
fn test_matching_is_idempotent() {
    let tokens = sample_stream();
    let pattern = template("ADJ *");
    assert_eq!(match_template(&tokens, &pattern), match_template(&tokens, &pattern));
}

#[test]
fn test_punctuation_does_not_break_windows() {
    let tokens = vec![
        tok("old", PosTag::Adj),
        tok(",", PosTag::Punct),
        tok(" ", PosTag::Space),
        tok("house", PosTag::Noun),
        tok("42", PosTag::Num),
    ];
    let counts = match_template(&tokens, &template("ADJ NOUN"));
    assert_eq!(counts.get("[ADJ_NOUN]: old house"), 1);

    // Numbers are not alphabetic and never take a window position
    let counts = match_template(&tokens, &template("NUM"));
    assert!(counts.is_empty());
}

#[test]
fn test_keys_are_lowercased_and_counted() {
    let tokens = vec![
        tok("Blue", PosTag::Adj),
        tok("Sky", PosTag::Noun),
        tok("blue", PosTag::Adj),
        tok("sky", PosTag::Noun),
    ];
    let counts = match_template(&tokens, &template("ADJ NOUN"));
    assert_eq!(counts.get("[ADJ_NOUN]: blue sky"), 2);
}

#[test]
fn test_template_validation() {
    assert!(matches!(PatternTemplate::parse(""), Err(TalosError::InvalidPattern(_))));
    assert!(matches!(PatternTemplate::new(Vec::new()), Err(TalosError::InvalidPattern(_))));
    assert!(matches!(
        PatternTemplate::parse("ADJ NOUN VERB ADV DET NOUN"),
        Err(TalosError::InvalidPattern(_))
    ));
    assert!(matches!(PatternTemplate::parse("ADJ FOO"), Err(TalosError::UnknownPosTag(_))));

    let five = template("adj, *, noun, verb, adv");
    assert_eq!(five.len(), 5);
    assert!(five.has_wildcard());
    assert_eq!(five.to_string(), "[ADJ, *, NOUN, VERB, ADV]");
}

#[test]
fn test_builtin_templates_in_order() {
    let builtin: Vec<String> = PatternTemplate::builtin().iter().map(|t| t.to_string()).collect();
    assert_eq!(
        builtin,
        vec![
            "[ADJ, NOUN]",
            "[NOUN, NOUN]",
            "[VERB, NOUN]",
            "[ADJ, ADJ, NOUN]",
            "[NOUN, ADP, NOUN]",
            "[DET, ADJ, NOUN]",
            "[DET, ADJ, ADJ, NOUN]",
            "[NOUN, ADP, DET, NOUN]",
        ]
    );
}

#[test]
fn test_builtin_merges_all_templates() {
    let tokens = vec![
        tok("the", PosTag::Det),
        tok("old", PosTag::Adj),
        tok("stone", PosTag::Noun),
        tok("house", PosTag::Noun),
        tok("of", PosTag::Adp),
        tok("the", PosTag::Det),
        tok("king", PosTag::Noun),
    ];
    let counts = match_builtin(&tokens, &ProgressReporter::new(), 100).unwrap();

    assert_eq!(counts.get("[ADJ_NOUN]: old stone"), 1);
    assert_eq!(counts.get("[NOUN_NOUN]: stone house"), 1);
    assert_eq!(counts.get("[DET_ADJ_NOUN]: the old stone"), 1);
    assert_eq!(counts.get("[NOUN_ADP_DET_NOUN]: house of the king"), 1);
    assert_eq!(counts.len(), 4);

    // Merged in template order
    let first: Vec<&str> = counts.iter().map(|(key, _)| key).take(2).collect();
    assert_eq!(first, vec!["[ADJ_NOUN]: old stone", "[NOUN_NOUN]: stone house"]);
}

#[test]
fn test_builtin_progress_is_monotonic_and_complete() {
    let tokens: Vec<AnnotatedToken> = (0..1000)
        .map(|i| if i % 2 == 0 { tok("green", PosTag::Adj) } else { tok("field", PosTag::Noun) })
        .collect();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reporter = ProgressReporter::new().on_progress(move |f| sink.lock().unwrap().push(f));

    let counts = match_builtin(&tokens, &reporter, 100).unwrap();
    assert_eq!(counts.get("[ADJ_NOUN]: green field"), 500);

    let seen = seen.lock().unwrap();
    assert!(seen.len() > 10);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last().copied(), Some(1.0));
}

#[test]
fn test_cancelled_scan_discards_results() {
    let tokens = sample_stream();
    let flag = Arc::new(AtomicBool::new(true));
    let reporter = ProgressReporter::with_cancel_flag(flag);
    let result = match_builtin(&tokens, &reporter, 1);
    assert!(matches!(result, Err(TalosError::Cancelled)));
}

#[test]
fn test_pattern_key_round_trip() {
    let key = PatternKey::parse("[DET_ADJ_NOUN]: the red car").unwrap();
    assert_eq!(key.tags, vec!["DET", "ADJ", "NOUN"]);
    assert_eq!(key.words, vec!["the", "red", "car"]);
    assert_eq!(key.pattern(), "DET_ADJ_NOUN");
    assert_eq!(key.example(), "the red car");

    assert!(PatternKey::parse("no brackets here").is_none());
    assert!(PatternKey::parse("[]: nothing").is_none());
}
