pub mod analysis;
pub mod annotation;
pub mod core;
pub mod language;
pub mod persistence;
pub mod segmentation;

pub use crate::core::{
    AnalysisKind,
    AnalysisOutcome,
    AnalyzerSettings,
    Document,
    Language,
    TalosError,
};
