pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod error;
pub mod progress;
pub mod stats;
pub mod translate;

pub use corpus::{AlignedPair, PairResult, TextPair, Tokenizer};
pub use dictionary::{BilingualDictionary, DictionaryBuilder, TieBreak, VoteTable};
pub use error::AlignmentError;
pub use translate::{FallbackPolicy, PositionalTranslator, Translation};
