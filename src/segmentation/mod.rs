pub mod stream;

pub mod token_models;

pub use stream::{
    extract,
    TokenSource,
    TokenStream,
};
pub use token_models::{
    AnnotatedToken,
    EntitySpan,
    PosTag,
};
