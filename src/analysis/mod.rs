pub mod aggregators;
pub mod counts;
pub mod export;
pub mod patterns;
pub mod progress;
pub mod ranking;

pub use aggregators::EntityKind;
pub use counts::{
    Finding,
    FindingCounts,
};
pub use patterns::{
    PatternKey,
    PatternTemplate,
    PosSlot,
};
pub use progress::ProgressReporter;
pub use ranking::rank;

#[cfg(test)]
mod patterns_tests;
