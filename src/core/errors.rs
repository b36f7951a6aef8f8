use std::path::PathBuf;

use thiserror::Error;

use super::models::BackendFamily;

#[derive(Error, Debug)]
pub enum TalosError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("File is not valid UTF-8 text: {}", path.display())]
    InvalidEncoding { path: PathBuf },

    #[error("Failed to load file: {0}")]
    FailedToLoadFile(String),

    #[error("Document contains no text")]
    EmptyDocument,

    #[error("{engine} model '{model}' is not installed")]
    ModelNotInstalled { engine: String, model: String },

    #[error("The {family} annotation backend is still loading")]
    BackendLoading { family: BackendFamily },

    #[error("Annotation backend failed to load: {0}")]
    BackendLoadFailed(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown POS tag: {0}")]
    UnknownPosTag(String),

    #[error("Malformed annotation output: {0}")]
    Annotation(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("TalosError: {0}")]
    Custom(String),
}

impl TalosError {
    /// Model-unavailable conditions, as opposed to input or analysis failures.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            TalosError::ModelNotInstalled { .. }
                | TalosError::BackendLoading { .. }
                | TalosError::BackendLoadFailed(_)
        )
    }
}

impl From<std::io::Error> for TalosError {
    fn from(error: std::io::Error) -> Self {
        TalosError::Io(Box::new(error))
    }
}
