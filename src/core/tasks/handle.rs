use std::{
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    time::{
        Duration,
        Instant,
    },
};

/// Clock and cancel flag of one analysis, shared by the monitor and the caller.
///
/// The monitor raises the flag itself once the deadline passes; the worker sees it
/// through its `ProgressReporter` at the next checkpoint.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancel_token: Arc<AtomicBool>,
    started: Instant,
    deadline: Instant,
}

impl TaskHandle {
    pub fn new(cancel_token: Arc<AtomicBool>, timeout: Duration) -> Self {
        let started = Instant::now();
        Self { cancel_token, started, deadline: started + timeout }
    }

    pub fn cancel(&self) {
        self.cancel_token.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_overdue(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_cancel_flag() {
        let handle = TaskHandle::new(Arc::new(AtomicBool::new(false)), Duration::from_secs(60));
        let monitor_side = handle.clone();

        assert!(!handle.is_cancelled());
        monitor_side.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_deadline_and_remaining() {
        let handle = TaskHandle::new(Arc::new(AtomicBool::new(false)), Duration::from_secs(60));
        assert!(!handle.is_overdue());
        assert!(handle.remaining() <= Duration::from_secs(60));
        assert!(handle.remaining() > Duration::from_secs(59));

        let expired = TaskHandle::new(Arc::new(AtomicBool::new(false)), Duration::ZERO);
        assert!(expired.is_overdue());
        assert_eq!(expired.remaining(), Duration::ZERO);
    }
}
