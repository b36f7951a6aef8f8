pub mod classifier;
pub mod greek;
pub mod identifier;
pub mod lexicon;

pub use classifier::{
    default_classifier,
    LanguageClassifier,
    LanguageGuess,
};
pub use greek::disambiguate_greek;
pub use identifier::{
    LanguageIdentifier,
    LexicalScores,
};
