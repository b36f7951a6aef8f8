mod handle;
mod runner;
mod types;

pub use runner::{
    AnalysisTask,
    TaskRunner,
};
pub use types::{
    TaskHandle,
    TaskState,
    TaskUpdate,
};
