use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    warn,
};

use super::{
    settings::AnalyzerSettings,
    TalosError,
};
use crate::language::LanguageIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    English,
    French,
    Spanish,
    German,
    Italian,
    Portuguese,
    Dutch,
    Russian,
    Chinese,
    Japanese,
    Korean,
    Arabic,
    ModernGreek,
    AncientGreek,
}

impl Language {
    pub const ALL: [Language; 14] = [
        Language::English,
        Language::French,
        Language::Spanish,
        Language::German,
        Language::Italian,
        Language::Portuguese,
        Language::Dutch,
        Language::Russian,
        Language::Chinese,
        Language::Japanese,
        Language::Korean,
        Language::Arabic,
        Language::ModernGreek,
        Language::AncientGreek,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "French",
            Language::Spanish => "Spanish",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Dutch => "Dutch",
            Language::Russian => "Russian",
            Language::Chinese => "Chinese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::Arabic => "Arabic",
            Language::ModernGreek => "Modern Greek",
            Language::AncientGreek => "Ancient Greek",
        }
    }

    /// Maps a classifier language code onto the closed enumeration.
    /// Ancient Greek has no code; it is only reached through Greek disambiguation.
    pub fn from_code(code: &str) -> Option<Language> {
        let language = match code {
            "en" => Language::English,
            "fr" => Language::French,
            "es" => Language::Spanish,
            "de" => Language::German,
            "it" => Language::Italian,
            "pt" => Language::Portuguese,
            "nl" => Language::Dutch,
            "ru" => Language::Russian,
            "zh-cn" => Language::Chinese,
            "ja" => Language::Japanese,
            "ko" => Language::Korean,
            "ar" => Language::Arabic,
            "el" => Language::ModernGreek,
            _ => return None,
        };
        Some(language)
    }

    pub fn family(&self) -> BackendFamily {
        match self {
            Language::AncientGreek => BackendFamily::Classical,
            _ => BackendFamily::Modern,
        }
    }

    pub fn from_name(name: &str) -> Option<Language> {
        let wanted = name.trim();
        Language::ALL.into_iter().find(|lang| lang.name().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Annotation backends are shared per family: one for modern languages, one for Ancient Greek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendFamily {
    Modern,
    Classical,
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFamily::Modern => write!(f, "modern-language"),
            BackendFamily::Classical => write!(f, "classical"),
        }
    }
}

/// A loaded text. The language is decided once at construction; reloading a file
/// produces a new `Document`.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    text: Arc<str>,
    language: Language,
    file_size: u64,
}

impl Document {
    pub fn load(
        path: &Path,
        identifier: &LanguageIdentifier,
        settings: &AnalyzerSettings,
    ) -> Result<Document, TalosError> {
        let bytes = fs::read(path)
            .map_err(|e| TalosError::FailedToLoadFile(format!("{}: {}", path.display(), e)))?;
        let file_size = bytes.len() as u64;

        if file_size > settings.large_file_warning_bytes {
            warn!(
                "{} is {} MB, processing may be slow",
                path.display(),
                file_size / 1024 / 1024
            );
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| TalosError::InvalidEncoding { path: path.to_path_buf() })?;
        let text = text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text);

        let sample: String = text.chars().take(settings.detection_sample_chars).collect();
        let language = identifier.identify(&sample);

        let document =
            Document { path: Some(path.to_path_buf()), text: Arc::from(text), language, file_size };

        info!(
            "Loaded {} ({} chars, {} words, {})",
            path.display(),
            document.char_count(),
            document.word_count(),
            language
        );

        Ok(document)
    }

    /// Builds a document whose language is already known.
    pub fn with_language(text: impl Into<String>, language: Language) -> Document {
        let text: String = text.into();
        let file_size = text.len() as u64;
        Document { path: None, text: Arc::from(text), language, file_size }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("Untitled")
            .to_string()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn heuristic_identifier() -> LanguageIdentifier {
        LanguageIdentifier::heuristic_only()
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("en"), Some(Language::English));
        assert_eq!(Language::from_code("zh-cn"), Some(Language::Chinese));
        assert_eq!(Language::from_code("el"), Some(Language::ModernGreek));
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::from_name("modern greek"), Some(Language::ModernGreek));
        assert_eq!(Language::AncientGreek.family(), BackendFamily::Classical);
        assert_eq!(Language::French.family(), BackendFamily::Modern);
    }

    #[test]
    fn test_document_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}The cat and the dog are in the house with their owner.").unwrap();

        let settings = AnalyzerSettings::default();
        let document = Document::load(file.path(), &heuristic_identifier(), &settings).unwrap();

        assert_eq!(document.language(), Language::English);
        assert!(document.text().starts_with("The cat"));
        assert_eq!(document.word_count(), 12);
        assert!(document.path().is_some());
    }

    #[test]
    fn test_document_rejects_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x66, 0x6f, 0xff, 0xfe, 0x6f]).unwrap();

        let settings = AnalyzerSettings::default();
        let result = Document::load(file.path(), &heuristic_identifier(), &settings);
        assert!(matches!(result, Err(TalosError::InvalidEncoding { .. })));
    }

    #[test]
    fn test_document_missing_file() {
        let settings = AnalyzerSettings::default();
        let result = Document::load(
            Path::new("/definitely/not/here.txt"),
            &heuristic_identifier(),
            &settings,
        );
        assert!(matches!(result, Err(TalosError::FailedToLoadFile(_))));
    }
}
