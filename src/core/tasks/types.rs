use std::time::Duration;

pub use super::handle::TaskHandle;
use crate::core::TalosError;

/// Lifecycle of one analysis task. The last three states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::TimedOut)
    }
}

/// Message from a running task to its single consumer.
#[derive(Debug)]
pub enum TaskUpdate<T> {
    /// Percent complete, 0 to 100, never decreasing within one task.
    Progress(f32),
    Completed(T),
    Failed(TalosError),
    TimedOut { elapsed: Duration },
}

impl<T> TaskUpdate<T> {
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskUpdate::Progress(_) => "progress",
            TaskUpdate::Completed(_) => "completed",
            TaskUpdate::Failed(_) => "failed",
            TaskUpdate::TimedOut { .. } => "timed_out",
        }
    }

    /// State this update moves the task into, if it ends it.
    pub fn terminal_state(&self) -> Option<TaskState> {
        match self {
            TaskUpdate::Progress(_) => None,
            TaskUpdate::Completed(_) => Some(TaskState::Completed),
            TaskUpdate::Failed(_) => Some(TaskState::Failed),
            TaskUpdate::TimedOut { .. } => Some(TaskState::TimedOut),
        }
    }
}
