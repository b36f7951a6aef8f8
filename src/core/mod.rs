pub mod errors;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod tasks;

pub use errors::TalosError;
pub use models::{
    BackendFamily,
    Document,
    Language,
};
pub use pipeline::{
    run_analysis,
    start_analysis,
    AnalysisKind,
    AnalysisOutcome,
    AnalysisRequest,
};
pub use settings::AnalyzerSettings;
