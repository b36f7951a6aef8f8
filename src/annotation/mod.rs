pub mod backend;
pub mod models;
pub mod registry;

pub use backend::{
    loader_from_settings,
    AnnotationBackend,
    BackendLoader,
};
pub use models::AnnotationResult;
pub use registry::{
    BackendHandle,
    BackendRegistry,
    BackendState,
};
