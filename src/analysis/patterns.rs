use std::{
    fmt,
    sync::atomic::{
        AtomicUsize,
        Ordering,
    },
};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::{
    counts::FindingCounts,
    progress::ProgressReporter,
};
use crate::{
    core::TalosError,
    segmentation::token_models::{
        AnnotatedToken,
        PosTag,
    },
};

pub const WILDCARD: &str = "*";
pub const MAX_TEMPLATE_LEN: usize = 5;

/// One template position: a concrete tag or the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PosSlot {
    Any,
    Tag(PosTag),
}

impl PosSlot {
    pub fn matches(&self, tag: &PosTag) -> bool {
        match self {
            PosSlot::Any => true,
            PosSlot::Tag(expected) => expected == tag,
        }
    }
}

impl std::str::FromStr for PosSlot {
    type Err = TalosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == WILDCARD {
            Ok(PosSlot::Any)
        } else {
            Ok(PosSlot::Tag(s.parse()?))
        }
    }
}

impl fmt::Display for PosSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PosSlot::Any => write!(f, "{}", WILDCARD),
            PosSlot::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

impl From<PosTag> for PosSlot {
    fn from(tag: PosTag) -> Self {
        PosSlot::Tag(tag)
    }
}

/// Ordered sequence of 1 to 5 slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PatternTemplate {
    slots: Vec<PosSlot>,
}

impl PatternTemplate {
    pub fn new(slots: Vec<PosSlot>) -> Result<Self, TalosError> {
        if slots.is_empty() {
            return Err(TalosError::InvalidPattern("select at least one position".into()));
        }
        if slots.len() > MAX_TEMPLATE_LEN {
            return Err(TalosError::InvalidPattern(format!(
                "{} positions given, at most {} allowed",
                slots.len(),
                MAX_TEMPLATE_LEN
            )));
        }
        Ok(Self { slots })
    }

    /// Parses `"ADJ, *, NOUN"` or `"adj * noun"`.
    pub fn parse(text: &str) -> Result<Self, TalosError> {
        let slots = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<PosSlot>, _>>()?;
        Self::new(slots)
    }

    /// Templates tried, in this order, when the user supplies none.
    pub fn builtin() -> Vec<PatternTemplate> {
        use PosTag::*;

        let fixed = |tags: &[PosTag]| PatternTemplate {
            slots: tags.iter().cloned().map(PosSlot::Tag).collect(),
        };

        vec![
            fixed(&[Adj, Noun]),
            fixed(&[Noun, Noun]),
            fixed(&[Verb, Noun]),
            fixed(&[Adj, Adj, Noun]),
            fixed(&[Noun, Adp, Noun]),
            fixed(&[Det, Adj, Noun]),
            fixed(&[Det, Adj, Adj, Noun]),
            fixed(&[Noun, Adp, Det, Noun]),
        ]
    }

    pub fn slots(&self) -> &[PosSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.slots.contains(&PosSlot::Any)
    }

    /// `pattern_ADJ_ANY_NOUN`: slots joined by `_`, the wildcard spelled `ANY` so the
    /// name stays a valid file name everywhere.
    pub fn export_name(&self) -> String {
        let slots: Vec<String> = self
            .slots
            .iter()
            .map(|slot| match slot {
                PosSlot::Any => "ANY".to_string(),
                PosSlot::Tag(tag) => tag.to_string(),
            })
            .collect();
        format!("pattern_{}", slots.join("_"))
    }

    /// Key of a matching window, `None` when any position disagrees. Wildcard
    /// positions take the observed tag, so keys never contain the wildcard.
    fn match_window(&self, window: &[&AnnotatedToken]) -> Option<String> {
        if window.len() != self.slots.len()
            || !self.slots.iter().zip(window).all(|(slot, token)| slot.matches(&token.pos))
        {
            return None;
        }

        let tags: Vec<&str> = window.iter().map(|t| t.pos.as_str()).collect();
        let words: Vec<String> = window.iter().map(|t| t.text.to_lowercase()).collect();
        Some(format!("[{}]: {}", tags.join("_"), words.join(" ")))
    }
}

impl fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self.slots.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", slots.join(", "))
    }
}

/// Alphabetic, non-whitespace tokens in stream order: the sliding-window input.
pub fn scan_view(tokens: &[AnnotatedToken]) -> Vec<&AnnotatedToken> {
    tokens.iter().filter(|t| t.is_alpha && !t.is_whitespace()).collect()
}

/// Matches one template with no progress reporting.
pub fn match_template(tokens: &[AnnotatedToken], template: &PatternTemplate) -> FindingCounts {
    scan_template(&scan_view(tokens), template, None)
}

/// Matches every template over the same view and merges the results in template order.
///
/// Progress is the share of view tokens scanned over `view.len() * templates.len()`,
/// reported every `cadence` windows. Templates run in parallel; a raised cancel flag
/// stops the scan and discards the partial counts.
pub fn match_templates(
    tokens: &[AnnotatedToken],
    templates: &[PatternTemplate],
    reporter: &ProgressReporter,
    cadence: usize,
) -> Result<FindingCounts, TalosError> {
    let view = scan_view(tokens);
    let progress = ScanProgress {
        reporter,
        scanned: AtomicUsize::new(0),
        total: view.len() * templates.len(),
        cadence: cadence.max(1),
    };

    debug!("Matching {} templates over {} tokens", templates.len(), view.len());

    let per_template: Vec<FindingCounts> = templates
        .par_iter()
        .map(|template| scan_template(&view, template, Some(&progress)))
        .collect();

    reporter.check_cancelled()?;

    let mut merged = FindingCounts::new();
    for counts in per_template {
        merged.merge(counts);
    }
    reporter.report_fraction(1.0);

    Ok(merged)
}

pub fn match_builtin(
    tokens: &[AnnotatedToken],
    reporter: &ProgressReporter,
    cadence: usize,
) -> Result<FindingCounts, TalosError> {
    match_templates(tokens, &PatternTemplate::builtin(), reporter, cadence)
}

struct ScanProgress<'a> {
    reporter: &'a ProgressReporter,
    scanned: AtomicUsize,
    total: usize,
    cadence: usize,
}

impl ScanProgress<'_> {
    /// Returns false once the scan should stop.
    fn advance(&self, tokens: usize) -> bool {
        let done = self.scanned.fetch_add(tokens, Ordering::Relaxed) + tokens;
        self.reporter.report(done, self.total);
        !self.reporter.is_cancelled()
    }
}

fn scan_template(
    view: &[&AnnotatedToken],
    template: &PatternTemplate,
    progress: Option<&ScanProgress>,
) -> FindingCounts {
    let mut counts = FindingCounts::new();
    let width = template.len();

    if width == 0 || view.len() < width {
        if let Some(progress) = progress {
            progress.advance(view.len());
        }
        return counts;
    }

    let mut pending = 0;
    for window in view.windows(width) {
        if let Some(key) = template.match_window(window) {
            counts.add(key);
        }

        if let Some(progress) = progress {
            pending += 1;
            if pending == progress.cadence {
                pending = 0;
                if !progress.advance(progress.cadence) {
                    return counts;
                }
            }
        }
    }

    // The last width - 1 tokens never start a window but still count as scanned
    if let Some(progress) = progress {
        progress.advance(pending + width - 1);
    }

    counts
}

/// A pattern key split back into its parts: `[ADJ_NOUN]: big house`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternKey {
    pub tags: Vec<String>,
    pub words: Vec<String>,
}

impl PatternKey {
    pub fn parse(key: &str) -> Option<PatternKey> {
        let (tags, words) = key.split_once("]:")?;
        let tags = tags.strip_prefix('[')?;
        if tags.is_empty() {
            return None;
        }

        Some(PatternKey {
            tags: tags.split('_').map(str::to_string).collect(),
            words: words.split_whitespace().map(str::to_string).collect(),
        })
    }

    /// `ADJ_NOUN`
    pub fn pattern(&self) -> String {
        self.tags.join("_")
    }

    /// `big house`
    pub fn example(&self) -> String {
        self.words.join(" ")
    }
}
