mod reader;
mod record;

pub use reader::{read_corpus, read_sentences};
pub use record::{CorpusRecord, FieldNames};

use serde::Serialize;

use crate::error::AlignmentError;

/// Raw sentence texts of one translation unit, before tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextPair {
    pub source: String,
    pub target: String,
}

/// A source sentence and its translation, both as word tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlignedPair {
    pub source: Vec<String>,
    pub target: Vec<String>,
}

impl AlignedPair {
    pub fn new<S, T>(source: S, target: T) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            source: source.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of positions that have a counterpart on both sides.
    #[must_use]
    pub fn aligned_len(&self) -> usize {
        self.source.len().min(self.target.len())
    }
}

/// Outcome of bringing one corpus record across the input boundary.
pub type PairResult = Result<AlignedPair, AlignmentError>;

/// Whitespace tokenizer, optionally case-folding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tokenizer {
    pub lowercase: bool,
}

impl Tokenizer {
    #[must_use]
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }

    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if self.lowercase {
            text.split_whitespace().map(str::to_lowercase).collect()
        } else {
            text.split_whitespace().map(str::to_string).collect()
        }
    }

    #[must_use]
    pub fn align(&self, pair: &TextPair) -> AlignedPair {
        AlignedPair {
            source: self.tokenize(&pair.source),
            target: self.tokenize(&pair.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlignedPair, TextPair, Tokenizer};

    #[test]
    fn tokenizer_splits_on_any_whitespace() {
        let tok = Tokenizer::new(false);
        assert_eq!(tok.tokenize("  Le  chat\tdort\n"), vec!["Le", "chat", "dort"]);
        assert!(tok.tokenize("   ").is_empty());
    }

    #[test]
    fn tokenizer_lowercases_when_asked() {
        let tok = Tokenizer::new(true);
        let pair = TextPair {
            source: "The European Parliament".to_string(),
            target: "Le Parlement européen".to_string(),
        };
        let aligned = tok.align(&pair);
        assert_eq!(aligned.source, vec!["the", "european", "parliament"]);
        assert_eq!(aligned.target, vec!["le", "parlement", "européen"]);
    }

    #[test]
    fn aligned_len_is_shorter_side() {
        let pair = AlignedPair::new(["a", "b", "c"], ["x"]);
        assert_eq!(pair.aligned_len(), 1);
        assert_eq!(AlignedPair::default().aligned_len(), 0);
    }
}
