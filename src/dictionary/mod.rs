mod builder;
pub mod store;
mod votes;

pub use builder::{BuildOptions, BuildReport, DictionaryBuilder, MalformedPolicy, Tallied};
pub use votes::{Tally, VoteTable};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use sha2::{Digest, Sha256};

/// Rule for choosing between target words with equal vote counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Smallest word in byte order wins.
    Lexicographic,
    /// Word whose first vote came from the earliest corpus record wins.
    #[default]
    FirstObserved,
}

impl FromStr for TieBreak {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "lexicographic" => Ok(Self::Lexicographic),
            "first-observed" => Ok(Self::FirstObserved),
            other => Err(anyhow!(
                "unknown tie_break: {other} (expected lexicographic | first-observed)"
            )),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexicographic => f.write_str("lexicographic"),
            Self::FirstObserved => f.write_str("first-observed"),
        }
    }
}

/// Finalized mapping from (position, source word) to the winning target word.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BilingualDictionary {
    positions: Vec<HashMap<String, String>>,
    len: usize,
}

impl BilingualDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, position: usize, source: &str) -> Option<&str> {
        self.positions
            .get(position)
            .and_then(|words| words.get(source))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest position that has an entry.
    #[must_use]
    pub fn span(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn insert(&mut self, position: usize, source: String, target: String) {
        if self.positions.len() <= position {
            self.positions.resize_with(position + 1, HashMap::new);
        }
        if self.positions[position].insert(source, target).is_none() {
            self.len += 1;
        }
    }

    /// All entries ordered by position, then source word.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(usize, &str, &str)> {
        let mut out = Vec::with_capacity(self.len);
        for (pos, words) in self.positions.iter().enumerate() {
            let mut at_pos: Vec<(usize, &str, &str)> = words
                .iter()
                .map(|(src, tgt)| (pos, src.as_str(), tgt.as_str()))
                .collect();
            at_pos.sort_unstable_by(|a, b| a.1.cmp(b.1));
            out.extend(at_pos);
        }
        out
    }

    /// Hex SHA-256 over the sorted entries. Equal dictionaries have equal fingerprints.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (pos, src, tgt) in self.sorted_entries() {
            hasher.update((pos as u64).to_le_bytes());
            hasher.update((src.len() as u64).to_le_bytes());
            hasher.update(src.as_bytes());
            hasher.update((tgt.len() as u64).to_le_bytes());
            hasher.update(tgt.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<(usize, String, String)> for BilingualDictionary {
    fn from_iter<I: IntoIterator<Item = (usize, String, String)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (pos, src, tgt) in iter {
            dict.insert(pos, src, tgt);
        }
        dict
    }
}
