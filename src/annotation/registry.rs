use std::{
    collections::HashMap,
    panic::{
        self,
        AssertUnwindSafe,
    },
    sync::{
        Arc,
        Condvar,
        Mutex,
        MutexGuard,
    },
    time::Instant,
};

use tracing::{
    info,
    warn,
};

use super::{
    backend::{
        AnnotationBackend,
        BackendLoader,
    },
    models::AnnotationResult,
};
use crate::core::{
    models::{
        BackendFamily,
        Language,
    },
    settings::{
        AnalyzerSettings,
        LoadWait,
    },
    TalosError,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    family: BackendFamily,
    model: String,
}

enum SlotState {
    Loading,
    Ready(BackendHandle),
    LoadFailed(LoadFailure),
}

/// Why a slot failed, kept so waiters see the same error kind as the loading request.
struct LoadFailure {
    reason: String,
    /// Engine that reported the model as not installed.
    missing_from: Option<String>,
}

impl LoadFailure {
    fn from_error(error: &TalosError) -> Self {
        let missing_from = match error {
            TalosError::ModelNotInstalled { engine, .. } => Some(engine.clone()),
            _ => None,
        };
        Self { reason: error.to_string(), missing_from }
    }

    fn to_error(&self, model: &str) -> TalosError {
        match &self.missing_from {
            Some(engine) => {
                TalosError::ModelNotInstalled { engine: engine.clone(), model: model.to_string() }
            }
            None => TalosError::BackendLoadFailed(self.reason.clone()),
        }
    }
}

/// Observable state of one backend slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed(String),
}

/// A loaded backend plus the model request it answers.
#[derive(Clone)]
pub struct BackendHandle {
    backend: Arc<dyn AnnotationBackend>,
    family: BackendFamily,
    /// Model name of the slot that loaded `backend`.
    slot_model: String,
    requested_model: String,
}

impl BackendHandle {
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn family(&self) -> BackendFamily {
        self.family
    }

    /// Set when the requested model was missing and the default English model answered instead.
    pub fn fell_back_from(&self) -> Option<&str> {
        if self.requested_model != self.slot_model {
            Some(&self.requested_model)
        } else {
            None
        }
    }

    pub fn annotate(&self, text: &str) -> Result<AnnotationResult, TalosError> {
        self.backend.annotate(text)
    }

    fn requested_as(&self, model: &str) -> BackendHandle {
        BackendHandle { requested_model: model.to_string(), ..self.clone() }
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("engine", &self.backend.name())
            .field("model", &self.backend.model())
            .field("family", &self.family)
            .field("requested_model", &self.requested_model)
            .finish()
    }
}

/// Lazily loads and shares annotation backends, one slot per (family, model).
///
/// A slot moves Unloaded -> Loading -> Ready | LoadFailed. Only the request that
/// moved a slot to Loading runs the loader; others wait on the condvar or fail
/// fast, depending on `LoadWait`. A LoadFailed slot is retried by the next request.
pub struct BackendRegistry {
    loader: Arc<dyn BackendLoader>,
    settings: AnalyzerSettings,
    slots: Mutex<HashMap<SlotKey, SlotState>>,
    changed: Condvar,
}

impl BackendRegistry {
    pub fn new(loader: Arc<dyn BackendLoader>, settings: AnalyzerSettings) -> Self {
        Self { loader, settings, slots: Mutex::new(HashMap::new()), changed: Condvar::new() }
    }

    /// Backend for the language's family and model. A missing modern model falls
    /// back to the default English model; the classical family has no fallback.
    pub fn acquire(&self, language: Language) -> Result<BackendHandle, TalosError> {
        let family = language.family();
        let model = self.settings.model_for(language);

        match self.acquire_model(family, &model) {
            Err(TalosError::ModelNotInstalled { engine, model: missing })
                if family == BackendFamily::Modern
                    && missing != self.settings.default_modern_model() =>
            {
                let fallback = self.settings.default_modern_model();
                warn!(
                    "{} model '{}' for {} is not installed, falling back to '{}'",
                    engine, missing, language, fallback
                );
                let handle = self.acquire_model(family, &fallback)?;
                Ok(handle.requested_as(&missing))
            }
            other => other,
        }
    }

    pub fn state(&self, family: BackendFamily, model: &str) -> BackendState {
        let key = SlotKey { family, model: model.to_string() };
        let slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slots.get(&key) {
            None => BackendState::Unloaded,
            Some(SlotState::Loading) => BackendState::Loading,
            Some(SlotState::Ready(_)) => BackendState::Ready,
            Some(SlotState::LoadFailed(failure)) => BackendState::LoadFailed(failure.reason.clone()),
        }
    }

    fn lock_slots(&self) -> Result<MutexGuard<'_, HashMap<SlotKey, SlotState>>, TalosError> {
        self.slots.lock().map_err(|_| TalosError::Custom("backend registry lock poisoned".into()))
    }

    fn acquire_model(&self, family: BackendFamily, model: &str) -> Result<BackendHandle, TalosError> {
        let key = SlotKey { family, model: model.to_string() };
        let mut slots = self.lock_slots()?;
        let mut waited = false;

        loop {
            match slots.get(&key) {
                Some(SlotState::Ready(handle)) => return Ok(handle.clone()),
                Some(SlotState::Loading) => match self.settings.load_wait {
                    LoadWait::FailFast => return Err(TalosError::BackendLoading { family }),
                    LoadWait::Block => {
                        waited = true;
                        slots = self.changed.wait(slots).map_err(|_| {
                            TalosError::Custom("backend registry lock poisoned".into())
                        })?;
                    }
                },
                // Waiters report the load they waited on instead of retrying it themselves
                Some(SlotState::LoadFailed(failure)) if waited => {
                    return Err(failure.to_error(model));
                }
                Some(SlotState::LoadFailed(_)) | None => break,
            }
        }

        slots.insert(key.clone(), SlotState::Loading);
        drop(slots);

        info!("Loading {} model '{}'", self.settings.engine_name(family), model);
        let started = Instant::now();
        let loaded = panic::catch_unwind(AssertUnwindSafe(|| self.loader.load(family, model)))
            .unwrap_or_else(|_| {
                Err(TalosError::BackendLoadFailed(format!("loader panicked for model '{}'", model)))
            });

        let mut slots = self.lock_slots()?;
        let outcome = match loaded {
            Ok(backend) => {
                info!("Loaded '{}' in {} ms", model, started.elapsed().as_millis());
                let handle = BackendHandle {
                    backend,
                    family,
                    slot_model: model.to_string(),
                    requested_model: model.to_string(),
                };
                slots.insert(key, SlotState::Ready(handle.clone()));
                Ok(handle)
            }
            Err(e) => {
                slots.insert(key, SlotState::LoadFailed(LoadFailure::from_error(&e)));
                Err(e)
            }
        };
        drop(slots);
        self.changed.notify_all();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            mpsc,
        },
        thread,
        time::Duration,
    };

    use super::*;

    struct StubBackend {
        model: String,
    }

    impl AnnotationBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            &self.model
        }

        fn annotate(&self, _text: &str) -> Result<AnnotationResult, TalosError> {
            Ok(AnnotationResult::Flat { tokens: Vec::new(), entities: Vec::new() })
        }
    }

    /// Slow loader that knows a fixed set of models and counts load attempts.
    struct CountingLoader {
        installed: Vec<&'static str>,
        delay: Duration,
        loads: AtomicUsize,
    }

    impl CountingLoader {
        fn new(installed: Vec<&'static str>, delay: Duration) -> Arc<Self> {
            Arc::new(Self { installed, delay, loads: AtomicUsize::new(0) })
        }
    }

    impl BackendLoader for CountingLoader {
        fn load(
            &self,
            _family: BackendFamily,
            model: &str,
        ) -> Result<Arc<dyn AnnotationBackend>, TalosError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.installed.contains(&model) {
                Ok(Arc::new(StubBackend { model: model.to_string() }))
            } else {
                Err(TalosError::ModelNotInstalled { engine: "stub".into(), model: model.into() })
            }
        }
    }

    #[test]
    fn test_concurrent_acquire_loads_once() {
        let loader = CountingLoader::new(vec!["en_core_web_sm"], Duration::from_millis(200));
        let registry =
            Arc::new(BackendRegistry::new(loader.clone(), AnalyzerSettings::default()));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.acquire(Language::English))
            })
            .collect();

        for worker in workers {
            let handle = worker.join().unwrap().unwrap();
            assert_eq!(handle.model(), "en_core_web_sm");
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.state(BackendFamily::Modern, "en_core_web_sm"),
            BackendState::Ready
        );
    }

    #[test]
    fn test_waiter_on_missing_model_also_falls_back() {
        let loader = CountingLoader::new(vec!["en_core_web_sm"], Duration::from_millis(300));
        let registry =
            Arc::new(BackendRegistry::new(loader.clone(), AnalyzerSettings::default()));

        let first = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.acquire(Language::French))
        };
        while registry.state(BackendFamily::Modern, "fr_core_news_sm") == BackendState::Unloaded {
            thread::sleep(Duration::from_millis(5));
        }
        // Arrives while the French load is in flight and waits on it
        let second = registry.acquire(Language::French).unwrap();
        let first = first.join().unwrap().unwrap();

        for handle in [first, second] {
            assert_eq!(handle.model(), "en_core_web_sm");
            assert_eq!(handle.fell_back_from(), Some("fr_core_news_sm"));
        }
    }

    #[test]
    fn test_waiter_sees_load_failure_reason() {
        struct BrokenLoader;

        impl BackendLoader for BrokenLoader {
            fn load(
                &self,
                _family: BackendFamily,
                _model: &str,
            ) -> Result<Arc<dyn AnnotationBackend>, TalosError> {
                thread::sleep(Duration::from_millis(200));
                Err(TalosError::BackendLoadFailed("corrupt weights".into()))
            }
        }

        let registry =
            Arc::new(BackendRegistry::new(Arc::new(BrokenLoader), AnalyzerSettings::default()));
        let first = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.acquire(Language::AncientGreek))
        };
        while registry.state(BackendFamily::Classical, "grc") == BackendState::Unloaded {
            thread::sleep(Duration::from_millis(5));
        }

        let second = registry.acquire(Language::AncientGreek);
        assert!(matches!(
            second,
            Err(TalosError::BackendLoadFailed(reason)) if reason.contains("corrupt weights")
        ));
        assert!(first.join().unwrap().is_err());
    }

    #[test]
    fn test_fail_fast_while_loading() {
        let loader = CountingLoader::new(vec!["en_core_web_sm"], Duration::from_millis(500));
        let settings = AnalyzerSettings { load_wait: LoadWait::FailFast, ..Default::default() };
        let registry = Arc::new(BackendRegistry::new(loader, settings));

        let (started_tx, started_rx) = mpsc::channel();
        let first = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                started_tx.send(()).unwrap();
                registry.acquire(Language::English)
            })
        };
        started_rx.recv().unwrap();

        // Give the first request time to mark the slot as loading
        while registry.state(BackendFamily::Modern, "en_core_web_sm") == BackendState::Unloaded {
            thread::sleep(Duration::from_millis(5));
        }

        let second = registry.acquire(Language::English);
        assert!(matches!(second, Err(TalosError::BackendLoading { family: BackendFamily::Modern })));
        assert!(first.join().unwrap().is_ok());
    }

    #[test]
    fn test_missing_modern_model_falls_back_to_english() {
        let loader = CountingLoader::new(vec!["en_core_web_sm"], Duration::ZERO);
        let registry = BackendRegistry::new(loader, AnalyzerSettings::default());

        let handle = registry.acquire(Language::French).unwrap();
        assert_eq!(handle.model(), "en_core_web_sm");
        assert_eq!(handle.fell_back_from(), Some("fr_core_news_sm"));
        assert!(matches!(
            registry.state(BackendFamily::Modern, "fr_core_news_sm"),
            BackendState::LoadFailed(_)
        ));
    }

    #[test]
    fn test_missing_classical_model_fails() {
        let loader = CountingLoader::new(vec!["en_core_web_sm"], Duration::ZERO);
        let registry = BackendRegistry::new(loader, AnalyzerSettings::default());

        let result = registry.acquire(Language::AncientGreek);
        assert!(matches!(result, Err(TalosError::ModelNotInstalled { .. })));

        // The modern handle is unaffected by the classical failure
        assert!(registry.acquire(Language::English).is_ok());
    }

    #[test]
    fn test_failed_load_is_retried() {
        struct FlakyLoader {
            attempts: AtomicUsize,
        }

        impl BackendLoader for FlakyLoader {
            fn load(
                &self,
                _family: BackendFamily,
                model: &str,
            ) -> Result<Arc<dyn AnnotationBackend>, TalosError> {
                if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TalosError::BackendLoadFailed("disk hiccup".into()))
                } else {
                    Ok(Arc::new(StubBackend { model: model.to_string() }))
                }
            }
        }

        let loader = Arc::new(FlakyLoader { attempts: AtomicUsize::new(0) });
        let registry = BackendRegistry::new(loader, AnalyzerSettings::default());

        assert!(registry.acquire(Language::AncientGreek).is_err());
        let handle = registry.acquire(Language::AncientGreek).unwrap();
        assert_eq!(handle.model(), "grc");
        assert_eq!(handle.fell_back_from(), None);
    }
}
