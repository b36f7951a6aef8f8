use std::{
    io::Write,
    process::{
        Command,
        Stdio,
    },
    sync::Arc,
    thread,
};

use tracing::{
    debug,
    warn,
};

use super::models::AnnotationResult;
use crate::core::{
    models::BackendFamily,
    settings::{
        AnalyzerSettings,
        AnnotatorCommand,
    },
    TalosError,
};

/// An external annotator performing tokenization, tagging, lemmatization and,
/// where supported, entity recognition.
pub trait AnnotationBackend: Send + Sync {
    /// Engine name reported to users and in export summaries.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn annotate(&self, text: &str) -> Result<AnnotationResult, TalosError>;
}

/// Loads backends for the registry. Loading is expensive and may take seconds.
pub trait BackendLoader: Send + Sync {
    /// Fails with `TalosError::ModelNotInstalled` when the model is missing so the
    /// registry can distinguish it from other load failures.
    fn load(
        &self,
        family: BackendFamily,
        model: &str,
    ) -> Result<Arc<dyn AnnotationBackend>, TalosError>;
}

/// Builds the loader the settings describe.
pub fn loader_from_settings(settings: &AnalyzerSettings) -> Arc<dyn BackendLoader> {
    let engines = EngineNames {
        modern: settings.modern_engine.clone(),
        classical: settings.classical_engine.clone(),
    };

    match &settings.annotator {
        Some(command) => Arc::new(CommandLoader { command: command.clone(), engines }),
        None => Arc::new(UnavailableLoader { engines }),
    }
}

#[derive(Debug, Clone)]
struct EngineNames {
    modern: String,
    classical: String,
}

impl EngineNames {
    fn for_family(&self, family: BackendFamily) -> &str {
        match family {
            BackendFamily::Modern => &self.modern,
            BackendFamily::Classical => &self.classical,
        }
    }
}

/// Loader used when no annotator is configured: every model is reported missing.
pub struct UnavailableLoader {
    engines: EngineNames,
}

impl BackendLoader for UnavailableLoader {
    fn load(
        &self,
        family: BackendFamily,
        model: &str,
    ) -> Result<Arc<dyn AnnotationBackend>, TalosError> {
        Err(TalosError::ModelNotInstalled {
            engine: self.engines.for_family(family).to_string(),
            model: model.to_string(),
        })
    }
}

/// Runs an external annotator program: `<program> <args> --model <name>` reads the
/// text on stdin and writes an `AnnotationResult` as JSON on stdout.
pub struct CommandLoader {
    command: AnnotatorCommand,
    engines: EngineNames,
}

impl CommandLoader {
    fn base_command(&self, model: &str) -> Command {
        let mut command = Command::new(&self.command.program);
        command.args(&self.command.args).arg("--model").arg(model);
        command
    }
}

impl BackendLoader for CommandLoader {
    fn load(
        &self,
        family: BackendFamily,
        model: &str,
    ) -> Result<Arc<dyn AnnotationBackend>, TalosError> {
        let engine = self.engines.for_family(family).to_string();

        let check = self
            .base_command(model)
            .arg("--check")
            .stdin(Stdio::null())
            .output();

        let check = match check {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not start annotator '{}': {}", self.command.program, e);
                return Err(TalosError::ModelNotInstalled { engine, model: model.to_string() });
            }
        };

        if !check.status.success() {
            debug!(
                "Annotator check for {} exited with {}: {}",
                model,
                check.status,
                String::from_utf8_lossy(&check.stderr).trim()
            );
            return Err(TalosError::ModelNotInstalled { engine, model: model.to_string() });
        }

        Ok(Arc::new(CommandBackend {
            command: self.command.clone(),
            engine,
            model: model.to_string(),
        }))
    }
}

pub struct CommandBackend {
    command: AnnotatorCommand,
    engine: String,
    model: String,
}

impl AnnotationBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.engine
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn annotate(&self, text: &str) -> Result<AnnotationResult, TalosError> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread so a chatty annotator cannot deadlock on a full pipe
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TalosError::Annotation("annotator stdin unavailable".into()))?;
        let input = text.to_string();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| TalosError::Annotation("annotator input writer panicked".into()))??;

        if !output.status.success() {
            return Err(TalosError::Annotation(format!(
                "annotator exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TalosError::Annotation(format!("invalid annotator JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_loader_reports_missing_model() {
        let loader = loader_from_settings(&AnalyzerSettings::default());
        let result = loader.load(BackendFamily::Classical, "grc");
        match result {
            Err(TalosError::ModelNotInstalled { engine, model }) => {
                assert_eq!(engine, "Stanza");
                assert_eq!(model, "grc");
            }
            Err(other) => panic!("Expected ModelNotInstalled, got {:?}", other),
            Ok(_) => panic!("Expected ModelNotInstalled, got a backend"),
        }
    }

    #[test]
    fn test_missing_annotator_program_reports_missing_model() {
        let mut settings = AnalyzerSettings::default();
        settings.annotator = Some(AnnotatorCommand {
            program: "talos-annotator-that-does-not-exist".into(),
            args: Vec::new(),
        });
        let loader = loader_from_settings(&settings);
        let result = loader.load(BackendFamily::Modern, "en_core_web_sm");
        assert!(matches!(result, Err(TalosError::ModelNotInstalled { .. })));
    }
}
