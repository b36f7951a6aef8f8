use std::{
    slice,
    sync::Arc,
    time::Instant,
};

use tracing::info;

use super::{
    models::{
        Document,
        Language,
    },
    settings::AnalyzerSettings,
    tasks::{
        AnalysisTask,
        TaskRunner,
    },
    TalosError,
};
use crate::{
    analysis::{
        aggregators::{
            count_entities,
            count_lemmas,
            count_nouns,
            count_words,
            EntityKind,
        },
        export::{
            ExportReport,
            ExportShape,
        },
        patterns::{
            match_builtin,
            match_templates,
            PatternTemplate,
        },
        progress::ProgressReporter,
        ranking::rank,
        Finding,
        FindingCounts,
    },
    annotation::BackendRegistry,
    segmentation::{
        extract,
        TokenStream,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    Words,
    Nouns,
    Persons,
    Locations,
    Lemmas,
    /// Built-in templates when `None`.
    Patterns(Option<PatternTemplate>),
}

impl AnalysisKind {
    pub fn export_name(&self) -> String {
        match self {
            AnalysisKind::Words => "words".to_string(),
            AnalysisKind::Nouns => "nouns".to_string(),
            AnalysisKind::Persons => "persons".to_string(),
            AnalysisKind::Locations => "locations".to_string(),
            AnalysisKind::Lemmas => "lemmas".to_string(),
            AnalysisKind::Patterns(None) => "patterns".to_string(),
            AnalysisKind::Patterns(Some(template)) => template.export_name(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            AnalysisKind::Words => "Word frequencies".to_string(),
            AnalysisKind::Nouns => "Noun frequencies".to_string(),
            AnalysisKind::Persons => "Proper names (persons)".to_string(),
            AnalysisKind::Locations => "Proper names (locations)".to_string(),
            AnalysisKind::Lemmas => "Lemma frequencies".to_string(),
            AnalysisKind::Patterns(None) => "Lexical-syntactic patterns".to_string(),
            AnalysisKind::Patterns(Some(template)) => format!("Custom pattern {}", template),
        }
    }

    /// Word counts come straight from the text; everything else needs a backend.
    pub fn needs_annotation(&self) -> bool {
        !matches!(self, AnalysisKind::Words)
    }

    pub fn export_shape(&self) -> ExportShape {
        match self {
            AnalysisKind::Patterns(_) => ExportShape::Patterns,
            _ => ExportShape::Scalar,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document: Arc<Document>,
    pub kind: AnalysisKind,
}

impl AnalysisRequest {
    pub fn new(document: Arc<Document>, kind: AnalysisKind) -> Self {
        Self { document, kind }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub kind: AnalysisKind,
    pub findings: FindingCounts,
    pub language: Language,
    /// Engine credited in summaries.
    pub engine: String,
    /// Model that annotated the text, `None` for word counts.
    pub model: Option<String>,
    /// Model the language asked for when `model` is the English fallback.
    pub fell_back_from: Option<String>,
}

impl AnalysisOutcome {
    pub fn ranked(&self) -> Vec<Finding> {
        rank(&self.findings)
    }

    pub fn export_report(&self) -> ExportReport {
        ExportReport::new(&self.findings, self.kind.export_shape(), self.language, &self.engine)
    }
}

/// Runs one analysis to completion on the calling thread.
pub fn run_analysis(
    request: &AnalysisRequest,
    registry: &BackendRegistry,
    settings: &AnalyzerSettings,
    reporter: &ProgressReporter,
) -> Result<AnalysisOutcome, TalosError> {
    let document = request.document.as_ref();
    let language = document.language();
    let started = Instant::now();

    if document.is_empty() {
        return Err(TalosError::EmptyDocument);
    }

    info!("{} of {} ({})", request.kind.title(), document.file_name(), language);
    reporter.check_cancelled()?;

    let (findings, engine, model, fell_back_from) = if request.kind.needs_annotation() {
        let handle = registry.acquire(language)?;
        reporter.check_cancelled()?;

        let annotation = handle.annotate(document.text())?;
        let stream = extract(document, annotation);
        reporter.check_cancelled()?;

        let findings = aggregate(&request.kind, &stream, language, settings, reporter)?;
        (
            findings,
            handle.name().to_string(),
            Some(handle.model().to_string()),
            handle.fell_back_from().map(str::to_string),
        )
    } else {
        let findings = count_words(document.text())?;
        (findings, settings.engine_name(language.family()).to_string(), None, None)
    };

    reporter.report_fraction(1.0);
    info!(
        "{} finished: {} unique findings, {} total in {} ms",
        request.kind.title(),
        findings.len(),
        findings.total(),
        started.elapsed().as_millis()
    );

    Ok(AnalysisOutcome {
        kind: request.kind.clone(),
        findings,
        language,
        engine,
        model,
        fell_back_from,
    })
}

fn aggregate(
    kind: &AnalysisKind,
    stream: &TokenStream,
    language: Language,
    settings: &AnalyzerSettings,
    reporter: &ProgressReporter,
) -> Result<FindingCounts, TalosError> {
    let cadence = settings.progress_cadence();

    Ok(match kind {
        AnalysisKind::Words => {
            return Err(TalosError::Custom("word counts are taken from the raw text".into()))
        }
        AnalysisKind::Nouns => count_nouns(stream),
        AnalysisKind::Persons => count_entities(stream, EntityKind::Person),
        AnalysisKind::Locations => count_entities(stream, EntityKind::Location),
        AnalysisKind::Lemmas => count_lemmas(stream, language),
        AnalysisKind::Patterns(None) => match_builtin(&stream.tokens, reporter, cadence)?,
        AnalysisKind::Patterns(Some(template)) => {
            match_templates(&stream.tokens, slice::from_ref(template), reporter, cadence)?
        }
    })
}

/// Hands `request` to the runner with the configured timeout.
pub fn start_analysis(
    runner: &TaskRunner,
    request: AnalysisRequest,
    registry: Arc<BackendRegistry>,
    settings: Arc<AnalyzerSettings>,
) -> AnalysisTask<AnalysisOutcome> {
    let timeout = settings.timeout();
    runner.start(move |reporter| run_analysis(&request, &registry, &settings, reporter), timeout)
}
