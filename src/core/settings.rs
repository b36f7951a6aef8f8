use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::Duration,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    models::{
        BackendFamily,
        Language,
    },
    TalosError,
};
use crate::persistence::DataDir;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_MODERN_MODEL: &str = "en_core_web_sm";

/// What a request does when the backend it needs is still being loaded by another request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoadWait {
    #[default]
    Block,
    FailFast,
}

/// External annotator invoked as a subprocess, see `annotation::backend::CommandLoader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub detection_sample_chars: usize,
    pub classifier_prefix_chars: usize,
    pub english_bias_probability: f64,
    pub progress_every_windows: usize,
    pub large_file_warning_bytes: u64,
    pub load_wait: LoadWait,
    pub modern_models: BTreeMap<Language, String>,
    pub classical_model: String,
    pub modern_engine: String,
    pub classical_engine: String,
    pub annotator: Option<AnnotatorCommand>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        let modern_models = [
            (Language::English, DEFAULT_MODERN_MODEL),
            (Language::French, "fr_core_news_sm"),
            (Language::Spanish, "es_core_news_sm"),
            (Language::German, "de_core_news_sm"),
            (Language::Italian, "it_core_news_sm"),
            (Language::Portuguese, "pt_core_news_sm"),
            (Language::Dutch, "nl_core_news_sm"),
            (Language::ModernGreek, "el_core_news_sm"),
        ]
        .into_iter()
        .map(|(lang, model)| (lang, model.to_string()))
        .collect();

        Self {
            timeout_secs: 300,
            poll_interval_ms: 500,
            detection_sample_chars: 5000,
            classifier_prefix_chars: 3000,
            english_bias_probability: 0.30,
            progress_every_windows: 100,
            large_file_warning_bytes: 50 * 1024 * 1024,
            load_wait: LoadWait::Block,
            modern_models,
            classical_model: "grc".to_string(),
            modern_engine: "spaCy".to_string(),
            classical_engine: "Stanza".to_string(),
            annotator: None,
        }
    }
}

impl AnalyzerSettings {
    /// Settings from `settings.json` in `data`; defaults for anything missing.
    pub fn load_from(data: &DataDir) -> Self {
        data.load_or_default(SETTINGS_FILE)
    }

    /// Returns the path written.
    pub fn save_to(&self, data: &DataDir) -> Result<PathBuf, TalosError> {
        data.save(SETTINGS_FILE, self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Windows between two pattern-engine progress reports, never sparser than every 100.
    pub fn progress_cadence(&self) -> usize {
        self.progress_every_windows.clamp(1, 100)
    }

    /// Model the given language asks for. Languages without a dedicated modern
    /// model use the English one.
    pub fn model_for(&self, language: Language) -> String {
        match language.family() {
            BackendFamily::Classical => self.classical_model.clone(),
            BackendFamily::Modern => self
                .modern_models
                .get(&language)
                .cloned()
                .unwrap_or_else(|| self.default_modern_model()),
        }
    }

    pub fn default_modern_model(&self) -> String {
        self.modern_models
            .get(&Language::English)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODERN_MODEL.to_string())
    }

    pub fn engine_name(&self, family: BackendFamily) -> &str {
        match family {
            BackendFamily::Modern => &self.modern_engine,
            BackendFamily::Classical => &self.classical_engine,
        }
    }
}
