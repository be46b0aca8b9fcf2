use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::corpus::Tokenizer;
use crate::dictionary::BilingualDictionary;

pub const DEFAULT_UNKNOWN_TOKEN: &str = "<unk>";

/// What to emit for a position whose (position, word) key is not in the dictionary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Copy the source word.
    #[default]
    PassThrough,
    /// Emit the configured unknown token.
    UnknownToken,
    /// Emit nothing for that position.
    Skip,
}

impl FromStr for FallbackPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pass-through" | "passthrough" => Ok(Self::PassThrough),
            "unknown-token" | "unk" => Ok(Self::UnknownToken),
            "skip" => Ok(Self::Skip),
            other => Err(anyhow!(
                "unknown fallback policy: {other} (expected pass-through | unknown-token | skip)"
            )),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough => f.write_str("pass-through"),
            Self::UnknownToken => f.write_str("unknown-token"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translation {
    pub words: Vec<String>,
    /// Source positions that had no dictionary entry.
    pub misses: Vec<usize>,
}

/// Word-for-word translator over a shared, read-only dictionary.
#[derive(Clone, Debug)]
pub struct PositionalTranslator<'d> {
    dict: &'d BilingualDictionary,
    fallback: FallbackPolicy,
    unknown_token: String,
}

impl<'d> PositionalTranslator<'d> {
    #[must_use]
    pub fn new(dict: &'d BilingualDictionary, fallback: FallbackPolicy) -> Self {
        Self {
            dict,
            fallback,
            unknown_token: DEFAULT_UNKNOWN_TOKEN.to_string(),
        }
    }

    #[must_use]
    pub fn with_unknown_token(mut self, token: impl Into<String>) -> Self {
        self.unknown_token = token.into();
        self
    }

    #[must_use]
    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    #[must_use]
    pub fn translate<S: AsRef<str>>(&self, sentence: &[S]) -> Vec<String> {
        self.translate_detailed(sentence).words
    }

    #[must_use]
    pub fn translate_detailed<S: AsRef<str>>(&self, sentence: &[S]) -> Translation {
        let mut out = Translation {
            words: Vec::with_capacity(sentence.len()),
            misses: Vec::new(),
        };
        for (pos, word) in sentence.iter().enumerate() {
            let word = word.as_ref();
            if let Some(tgt) = self.dict.get(pos, word) {
                out.words.push(tgt.to_string());
                continue;
            }
            out.misses.push(pos);
            match self.fallback {
                FallbackPolicy::PassThrough => out.words.push(word.to_string()),
                FallbackPolicy::UnknownToken => out.words.push(self.unknown_token.clone()),
                FallbackPolicy::Skip => {}
            }
        }
        out
    }

    /// Tokenizes `text` and translates the tokens.
    #[must_use]
    pub fn translate_text(&self, text: &str, tokenizer: &Tokenizer) -> Translation {
        self.translate_detailed(&tokenizer.tokenize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::{FallbackPolicy, PositionalTranslator};
    use crate::corpus::{AlignedPair, Tokenizer};
    use crate::dictionary::{BilingualDictionary, DictionaryBuilder};

    fn dict() -> BilingualDictionary {
        DictionaryBuilder::default().build_pairs(vec![
            AlignedPair::new(["the", "cat"], ["le", "chat"]),
            AlignedPair::new(["the", "dog"], ["le", "chien"]),
            AlignedPair::new(["the", "cat"], ["le", "chat"]),
        ])
    }

    #[test]
    fn known_sentences_translate_word_for_word() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::PassThrough);
        assert_eq!(tr.translate(&["the", "cat"]), vec!["le", "chat"]);
        assert_eq!(tr.translate(&["the", "dog"]), vec!["le", "chien"]);
    }

    #[test]
    fn pass_through_copies_unseen_words() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::PassThrough);
        let out = tr.translate_detailed(&["the", "fish"]);
        assert_eq!(out.words, vec!["le", "fish"]);
        assert_eq!(out.misses, vec![1]);
    }

    #[test]
    fn position_matters_for_lookup() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::PassThrough);
        // "cat" was only seen at position 1.
        assert_eq!(tr.translate(&["cat", "the"]), vec!["cat", "the"]);
    }

    #[test]
    fn unknown_token_policy() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::UnknownToken);
        assert_eq!(tr.translate(&["the", "fish"]), vec!["le", "<unk>"]);
        let tr = tr.with_unknown_token("UNK");
        assert_eq!(tr.translate(&["a", "cat"]), vec!["UNK", "chat"]);
    }

    #[test]
    fn skip_policy_drops_unseen_positions() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::Skip);
        let out = tr.translate_detailed(&["the", "fish", "swims"]);
        assert_eq!(out.words, vec!["le"]);
        assert_eq!(out.misses, vec![1, 2]);
    }

    #[test]
    fn empty_sentence_translates_to_nothing() {
        let dict = dict();
        for policy in [
            FallbackPolicy::PassThrough,
            FallbackPolicy::UnknownToken,
            FallbackPolicy::Skip,
        ] {
            let tr = PositionalTranslator::new(&dict, policy);
            assert!(tr.translate::<&str>(&[]).is_empty());
        }
        let empty = BilingualDictionary::new();
        let tr = PositionalTranslator::new(&empty, FallbackPolicy::PassThrough);
        assert!(tr.translate_text("", &Tokenizer::default()).words.is_empty());
    }

    #[test]
    fn text_translation_uses_tokenizer() {
        let dict = dict();
        let tr = PositionalTranslator::new(&dict, FallbackPolicy::PassThrough);
        let out = tr.translate_text("The  Cat", &Tokenizer::new(true));
        assert_eq!(out.words.join(" "), "le chat");
    }

    #[test]
    fn shared_dictionary_serves_concurrent_translators() {
        let dict = dict();
        let sentences: Vec<Vec<&str>> = (0..8)
            .map(|i| if i % 2 == 0 { vec!["the", "cat"] } else { vec!["the", "dog"] })
            .collect();
        let results: Vec<Vec<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = sentences
                .iter()
                .map(|s| {
                    let dict = &dict;
                    scope.spawn(move || {
                        PositionalTranslator::new(dict, FallbackPolicy::PassThrough)
                            .translate(s.as_slice())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .collect()
        });
        for (i, words) in results.iter().enumerate() {
            let expected = if i % 2 == 0 { "le chat" } else { "le chien" };
            assert_eq!(words.join(" "), expected);
        }
    }

    #[test]
    fn fallback_parses() {
        assert_eq!(
            "pass_through".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::PassThrough
        );
        assert_eq!(
            "unknown-token".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::UnknownToken
        );
        assert_eq!("SKIP".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Skip);
        assert!("drop".parse::<FallbackPolicy>().is_err());
    }
}
