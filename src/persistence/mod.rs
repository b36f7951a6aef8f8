use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

use crate::core::TalosError;

const APP_DIR_NAME: &str = "talos";

/// Directory holding talos's JSON state files.
///
/// Nothing is created on disk until the first save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// `<local data dir>/talos`, or the working directory when the platform has none.
    pub fn default_location() -> DataDir {
        let root = dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("."));
        DataDir { root }
    }

    pub fn at(root: impl Into<PathBuf>) -> DataDir {
        DataDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// `T::default()` when the file does not exist yet; an unreadable or malformed
    /// file is an error.
    pub fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, TalosError> {
        let path = self.file(name);
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(T::default());
        }

        let data = serde_json::from_str(&fs::read_to_string(&path)?)?;
        debug!("Loaded {}", path.display());
        Ok(data)
    }

    /// Never fails: any problem with the file is logged and defaults are used.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        self.load(name).unwrap_or_else(|e| {
            warn!("Could not read {}: {}. Using defaults.", self.file(name).display(), e);
            T::default()
        })
    }

    /// Writes pretty JSON through a sibling temp file, so a failed write leaves the
    /// previous contents in place.
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<PathBuf, TalosError> {
        fs::create_dir_all(&self.root)?;

        let path = self.file(name);
        let staging = self.file(&format!("{}.tmp", name));
        fs::write(&staging, serde_json::to_string_pretty(data)?)?;
        fs::rename(&staging, &path)?;

        debug!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::AnalyzerSettings;

    #[test]
    fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::at(dir.path().join("not_created_yet"));

        let settings: AnalyzerSettings = data.load("settings.json").unwrap();
        assert_eq!(settings.timeout_secs, 300);
        assert!(!data.root().exists());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::at(dir.path().join("nested").join("talos"));

        let settings = AnalyzerSettings { timeout_secs: 42, ..Default::default() };
        let path = data.save("settings.json", &settings).unwrap();
        assert_eq!(path, data.file("settings.json"));
        assert!(!data.file("settings.json.tmp").exists());

        let loaded: AnalyzerSettings = data.load("settings.json").unwrap();
        assert_eq!(loaded.timeout_secs, 42);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::at(dir.path());
        fs::write(data.file("settings.json"), "{ not json").unwrap();

        let strict: Result<AnalyzerSettings, _> = data.load("settings.json");
        assert!(matches!(strict, Err(TalosError::Json(_))));

        let lenient: AnalyzerSettings = data.load_or_default("settings.json");
        assert_eq!(lenient.timeout_secs, 300);
    }
}
