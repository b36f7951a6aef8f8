use std::{
    io::Write,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};

use anyhow::{
    bail,
    Context,
    Result,
};
use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use talos::{
    analysis::{
        export::{
            default_file_name,
            ExportFormat,
        },
        patterns::PatternTemplate,
        ranking::calculate_ranks,
    },
    annotation::{
        loader_from_settings,
        BackendRegistry,
    },
    core::{
        settings::{
            AnnotatorCommand,
            LoadWait,
        },
        start_analysis,
        tasks::{
            TaskRunner,
            TaskUpdate,
        },
        AnalysisRequest,
    },
    language::LanguageIdentifier,
    persistence::DataDir,
    segmentation::PosTag,
    AnalysisKind,
    AnalysisOutcome,
    AnalyzerSettings,
    Document,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "talos=info";

#[derive(Parser)]
#[command(name = "talos", version)]
#[command(about = "Word, lemma, entity and POS-pattern frequencies for plain-text documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the language of a text file
    Detect { file: PathBuf },
    /// Run one analysis and print the ranked findings
    Analyze {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = KindArg::Words)]
        kind: KindArg,
        /// Custom template for --kind patterns, e.g. "ADJ, *, NOUN"
        #[arg(long)]
        pattern: Option<String>,
        /// Seconds before the analysis is abandoned
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(long, default_value_t = 50)]
        top: usize,
        /// Output file (.csv or .json) or an existing directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List the built-in templates and the tags a custom template may use
    Patterns,
    /// Show the saved settings, or change and save them
    Config {
        /// Default seconds before an analysis is abandoned
        #[arg(long)]
        timeout: Option<u64>,
        /// What a request does while another one loads the backend it needs
        #[arg(long, value_enum)]
        load_wait: Option<LoadWaitArg>,
        /// External annotator program
        #[arg(long, conflicts_with = "no_annotator")]
        annotator: Option<String>,
        /// Argument passed to the annotator before `--model`, repeatable
        #[arg(long = "annotator-arg", allow_hyphen_values = true, requires = "annotator")]
        annotator_args: Vec<String>,
        /// Forget the configured annotator
        #[arg(long)]
        no_annotator: bool,
        /// Start over from the defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LoadWaitArg {
    Block,
    FailFast,
}

impl From<LoadWaitArg> for LoadWait {
    fn from(arg: LoadWaitArg) -> Self {
        match arg {
            LoadWaitArg::Block => LoadWait::Block,
            LoadWaitArg::FailFast => LoadWait::FailFast,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Words,
    Nouns,
    Persons,
    Locations,
    Lemmas,
    Patterns,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let data_dir = DataDir::default_location();
    let settings = AnalyzerSettings::load_from(&data_dir);

    match cli.command {
        Commands::Detect { file } => detect(&file, &settings)?,
        Commands::Analyze { file, kind, pattern, timeout, top, export } => {
            let kind = analysis_kind(kind, pattern.as_deref())?;
            let mut settings = settings;
            if let Some(secs) = timeout {
                settings.timeout_secs = secs;
            }
            analyze(&file, kind, settings, top, export.as_deref())?;
        }
        Commands::Patterns => list_patterns(),
        Commands::Config { timeout, load_wait, annotator, annotator_args, no_annotator, reset } => {
            let mut settings = if reset { AnalyzerSettings::default() } else { settings };
            let mut changed = reset;

            if let Some(secs) = timeout {
                settings.timeout_secs = secs;
                changed = true;
            }
            if let Some(policy) = load_wait {
                settings.load_wait = policy.into();
                changed = true;
            }
            if let Some(program) = annotator {
                settings.annotator = Some(AnnotatorCommand { program, args: annotator_args });
                changed = true;
            }
            if no_annotator {
                settings.annotator = None;
                changed = true;
            }

            show_config(&settings, &data_dir, changed)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn analysis_kind(kind: KindArg, pattern: Option<&str>) -> Result<AnalysisKind> {
    if pattern.is_some() && kind != KindArg::Patterns {
        bail!("--pattern only applies to --kind patterns");
    }

    Ok(match kind {
        KindArg::Words => AnalysisKind::Words,
        KindArg::Nouns => AnalysisKind::Nouns,
        KindArg::Persons => AnalysisKind::Persons,
        KindArg::Locations => AnalysisKind::Locations,
        KindArg::Lemmas => AnalysisKind::Lemmas,
        KindArg::Patterns => {
            let template = pattern
                .map(PatternTemplate::parse)
                .transpose()
                .context("invalid --pattern")?;
            AnalysisKind::Patterns(template)
        }
    })
}

fn load_document(
    file: &Path,
    identifier: &LanguageIdentifier,
    settings: &AnalyzerSettings,
) -> Result<Document> {
    Document::load(file, identifier, settings)
        .with_context(|| format!("could not load {}", file.display()))
}

fn detect(file: &Path, settings: &AnalyzerSettings) -> Result<()> {
    let identifier = LanguageIdentifier::from_settings(settings);
    let document = load_document(file, &identifier, settings)?;
    let method = identifier.classifier_name().unwrap_or("lexical heuristic");
    println!("{} (via {})", document.language(), method);
    println!(
        "{} characters, {} words, {} bytes",
        document.char_count(),
        document.word_count(),
        document.file_size()
    );
    Ok(())
}

fn analyze(
    file: &Path,
    kind: AnalysisKind,
    settings: AnalyzerSettings,
    top: usize,
    export: Option<&Path>,
) -> Result<()> {
    let identifier = LanguageIdentifier::from_settings(&settings);
    let document = Arc::new(load_document(file, &identifier, &settings)?);
    let settings = Arc::new(settings);
    let registry =
        Arc::new(BackendRegistry::new(loader_from_settings(&settings), (*settings).clone()));
    let runner = TaskRunner::new(&settings)?;

    let request = AnalysisRequest::new(Arc::clone(&document), kind);
    let task = start_analysis(&runner, request, registry, Arc::clone(&settings));
    let clock = task.handle().clone();
    let terminal = task.wait_with_progress(|percent| {
        eprint!(
            "\rAnalyzing... {:>5.1}% ({:.0}s before timeout)",
            percent,
            clock.remaining().as_secs_f32()
        );
        let _ = std::io::stderr().flush();
    });
    eprintln!();

    let result = match terminal {
        TaskUpdate::Completed(outcome) => {
            info!("Analysis finished in {:.1}s", clock.elapsed().as_secs_f32());
            print_outcome(&outcome, top);
            match export {
                Some(path) => write_export(&outcome, path),
                None => Ok(()),
            }
        }
        TaskUpdate::Failed(e) => Err(e).context("analysis failed"),
        TaskUpdate::TimedOut { elapsed } => {
            Err(anyhow::anyhow!("analysis timed out after {:.0}s", elapsed.as_secs_f32()))
        }
        TaskUpdate::Progress(_) => Err(anyhow::anyhow!("analysis ended without a result")),
    };

    runner.shutdown();
    result
}

fn print_outcome(outcome: &AnalysisOutcome, top: usize) {
    if let (Some(requested), Some(model)) = (&outcome.fell_back_from, &outcome.model) {
        println!(
            "Warning: model '{}' is not installed, results come from '{}'",
            requested, model
        );
        println!();
    }

    let ranked = outcome.ranked();
    let counts: Vec<u32> = ranked.iter().map(|f| f.count).collect();
    let ranks = calculate_ranks(&counts);

    println!("{}", outcome.kind.title());
    println!("{:>6}  {:<50} {:>12}", "Rank", "Element", "Occurrences");
    println!("{:>6}  {:-<50} {:->12}", "", "", "");
    for (finding, rank) in ranked.iter().zip(&ranks).take(top) {
        println!("{:>6}  {:<50} {:>12}", rank, finding.label, finding.count);
    }
    if ranked.len() > top {
        println!("        ... {} more", ranked.len() - top);
    }

    let report = outcome.export_report();
    let stats = &report.statistics;
    println!();
    println!("Total occurrences:   {}", stats.total_occurrences);
    println!("Unique elements:     {}", stats.unique_elements);
    println!("Average per element: {:.2}", stats.average_per_element);
    println!("Language detected:   {}", stats.language);
    match &outcome.model {
        Some(model) => println!("NLP engine:          {} ({})", stats.engine, model),
        None => println!("NLP engine:          {}", stats.engine),
    }
}

fn write_export(outcome: &AnalysisOutcome, path: &Path) -> Result<()> {
    let path = if path.is_dir() {
        path.join(default_file_name(&outcome.kind.export_name(), ExportFormat::Csv))
    } else {
        path.to_path_buf()
    };

    outcome
        .export_report()
        .write(&path)
        .with_context(|| format!("could not write {}", path.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn show_config(settings: &AnalyzerSettings, data_dir: &DataDir, save: bool) -> Result<()> {
    if save {
        let path = settings
            .save_to(data_dir)
            .with_context(|| format!("could not save settings in {}", data_dir.root().display()))?;
        info!("Settings saved to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn list_patterns() {
    println!("Built-in templates:");
    for template in PatternTemplate::builtin() {
        println!("  {}", template);
    }

    println!();
    println!("Tags for custom templates (\"*\" matches any tag, up to 5 positions):");
    for tag in PosTag::SELECTABLE.iter() {
        println!("  {:<6} {}", tag, tag.description());
    }
}
