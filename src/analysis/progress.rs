use std::sync::{
    atomic::{
        AtomicBool,
        AtomicU32,
        Ordering,
    },
    Arc,
    Mutex,
};

use tracing::debug;

use crate::core::TalosError;

const SCALE: f32 = 1_000_000.0;

type ProgressCallback = Box<dyn Fn(f32) + Send + Sync>;

/// Completion fraction and cooperative cancel flag shared between a worker and
/// whoever watches it.
///
/// The stored fraction only ever grows, and the callback sees strictly increasing
/// values even when several threads report at once.
pub struct ProgressReporter {
    fraction: AtomicU32,
    cancel_flag: Arc<AtomicBool>,
    callback: Option<ProgressCallback>,
    delivered: Mutex<f32>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_cancel_flag(Arc::new(AtomicBool::new(false)))
    }

    pub fn with_cancel_flag(cancel_flag: Arc<AtomicBool>) -> Self {
        Self { fraction: AtomicU32::new(0), cancel_flag, callback: None, delivered: Mutex::new(0.0) }
    }

    pub fn on_progress(mut self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Records `done` of `total` units of work.
    pub fn report(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        self.report_fraction(done as f32 / total as f32);
    }

    pub fn report_fraction(&self, fraction: f32) {
        let scaled = (fraction.clamp(0.0, 1.0) * SCALE) as u32;
        self.fraction.fetch_max(scaled, Ordering::AcqRel);

        if let Some(callback) = &self.callback {
            // Skipped deliveries are caught up by the next report
            if let Ok(mut delivered) = self.delivered.try_lock() {
                let current = self.fraction();
                if current > *delivered {
                    *delivered = current;
                    debug!("Progress {:.1}%", current * 100.0);
                    callback(current);
                }
            }
        }
    }

    pub fn fraction(&self) -> f32 {
        self.fraction.load(Ordering::Acquire) as f32 / SCALE
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    pub fn check_cancelled(&self) -> Result<(), TalosError> {
        if self.is_cancelled() {
            Err(TalosError::Cancelled)
        } else {
            Ok(())
        }
    }
}
