use std::cmp::Ordering;
use std::collections::HashMap;

use crate::corpus::AlignedPair;
use crate::dictionary::{BilingualDictionary, TieBreak};

/// Votes for one target word under a (position, source word) key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally {
    pub count: u64,
    /// Ordinal of the earliest record that voted for this word.
    pub first_seen: u64,
}

/// Positional co-occurrence counts. Only ever incremented or merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteTable {
    positions: Vec<HashMap<String, HashMap<String, Tally>>>,
    votes: u64,
}

impl VoteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One vote per position up to the shorter side; an empty side votes nothing.
    pub fn vote_pair(&mut self, ordinal: u64, pair: &AlignedPair) {
        for (pos, (src, tgt)) in pair.source.iter().zip(&pair.target).enumerate() {
            self.vote(pos, src, tgt, ordinal);
        }
    }

    pub fn vote(&mut self, position: usize, source: &str, target: &str, ordinal: u64) {
        if self.positions.len() <= position {
            self.positions.resize_with(position + 1, HashMap::new);
        }
        self.votes += 1;
        let by_source = &mut self.positions[position];
        if let Some(targets) = by_source.get_mut(source) {
            if let Some(tally) = targets.get_mut(target) {
                tally.count += 1;
                tally.first_seen = tally.first_seen.min(ordinal);
            } else {
                targets.insert(
                    target.to_string(),
                    Tally {
                        count: 1,
                        first_seen: ordinal,
                    },
                );
            }
            return;
        }
        let mut targets = HashMap::new();
        targets.insert(
            target.to_string(),
            Tally {
                count: 1,
                first_seen: ordinal,
            },
        );
        by_source.insert(source.to_string(), targets);
    }

    #[must_use]
    pub fn get(&self, position: usize, source: &str) -> Option<&HashMap<String, Tally>> {
        self.positions.get(position)?.get(source)
    }

    #[must_use]
    pub fn count(&self, position: usize, source: &str, target: &str) -> u64 {
        self.get(position, source)
            .and_then(|t| t.get(target))
            .map_or(0, |t| t.count)
    }

    /// Number of (position, source word) keys.
    #[must_use]
    pub fn keys(&self) -> usize {
        self.positions.iter().map(HashMap::len).sum()
    }

    /// Total votes cast.
    #[must_use]
    pub fn votes(&self) -> u64 {
        self.votes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.votes == 0
    }

    /// Sums counts key by key and keeps the earliest `first_seen`.
    /// Associative and commutative, so shard tables can be combined in any grouping.
    #[must_use]
    pub fn merge(mut self, other: VoteTable) -> VoteTable {
        if self.positions.len() < other.positions.len() {
            self.positions.resize_with(other.positions.len(), HashMap::new);
        }
        for (pos, by_source) in other.positions.into_iter().enumerate() {
            let mine = &mut self.positions[pos];
            for (src, targets) in by_source {
                let merged = mine.entry(src).or_default();
                for (tgt, tally) in targets {
                    merged
                        .entry(tgt)
                        .and_modify(|t| {
                            t.count += tally.count;
                            t.first_seen = t.first_seen.min(tally.first_seen);
                        })
                        .or_insert(tally);
                }
            }
        }
        self.votes += other.votes;
        self
    }

    /// Picks the most-voted target for every key. Does not modify the table.
    #[must_use]
    pub fn finalize(&self, tie_break: TieBreak) -> BilingualDictionary {
        let mut dict = BilingualDictionary::new();
        for (pos, by_source) in self.positions.iter().enumerate() {
            for (src, targets) in by_source {
                let winner = targets
                    .iter()
                    .max_by(|a, b| rank(a, b, tie_break))
                    .map(|(tgt, _)| tgt.clone());
                if let Some(tgt) = winner {
                    dict.insert(pos, src.clone(), tgt);
                }
            }
        }
        dict
    }
}

/// Total order where the preferred candidate compares greater.
fn rank(a: &(&String, &Tally), b: &(&String, &Tally), tie_break: TieBreak) -> Ordering {
    let by_word = b.0.cmp(a.0);
    a.1.count.cmp(&b.1.count).then_with(|| match tie_break {
        TieBreak::Lexicographic => by_word,
        TieBreak::FirstObserved => b.1.first_seen.cmp(&a.1.first_seen).then(by_word),
    })
}

#[cfg(test)]
mod tests {
    use super::VoteTable;
    use crate::corpus::AlignedPair;
    use crate::dictionary::TieBreak;

    fn pair(src: &str, tgt: &str) -> AlignedPair {
        AlignedPair::new(src.split_whitespace(), tgt.split_whitespace())
    }

    #[test]
    fn counts_follow_positions() {
        let mut table = VoteTable::new();
        table.vote_pair(0, &pair("the cat", "le chat"));
        table.vote_pair(1, &pair("the dog", "le chien"));
        table.vote_pair(2, &pair("the cat", "le chat"));

        assert_eq!(table.count(0, "the", "le"), 3);
        assert_eq!(table.count(1, "cat", "chat"), 2);
        assert_eq!(table.count(1, "dog", "chien"), 1);
        assert_eq!(table.count(0, "cat", "chat"), 0);
        assert_eq!(table.keys(), 3);
        assert_eq!(table.votes(), 6);
    }

    #[test]
    fn longer_side_beyond_shorter_casts_no_votes() {
        let mut table = VoteTable::new();
        table.vote_pair(0, &pair("I am here today", "je suis"));
        table.vote_pair(1, &pair("", "rien"));
        assert_eq!(table.votes(), 2);
        assert!(table.get(2, "here").is_none());
    }

    #[test]
    fn lexicographic_tie_prefers_smaller_word() {
        let mut table = VoteTable::new();
        table.vote(0, "house", "maison", 0);
        table.vote(0, "house", "demeure", 1);
        assert_eq!(table.finalize(TieBreak::Lexicographic).get(0, "house"), Some("demeure"));
        assert_eq!(table.finalize(TieBreak::FirstObserved).get(0, "house"), Some("maison"));
    }

    #[test]
    fn majority_beats_tie_rule() {
        let mut table = VoteTable::new();
        table.vote(0, "house", "maison", 0);
        table.vote(0, "house", "demeure", 1);
        table.vote(0, "house", "demeure", 2);
        for rule in [TieBreak::Lexicographic, TieBreak::FirstObserved] {
            assert_eq!(table.finalize(rule).get(0, "house"), Some("demeure"));
        }
    }

    #[test]
    fn merge_sums_counts_and_keeps_earliest_sighting() {
        let mut left = VoteTable::new();
        left.vote(0, "house", "demeure", 5);
        let mut right = VoteTable::new();
        right.vote(0, "house", "maison", 3);
        right.vote(0, "house", "demeure", 9);
        right.vote(3, "green", "verte", 4);

        let merged = left.clone().merge(right.clone());
        let reversed = right.merge(left);
        assert_eq!(merged, reversed);
        assert_eq!(merged.count(0, "house", "demeure"), 2);
        let tally = merged.get(0, "house").and_then(|t| t.get("demeure")).copied();
        assert_eq!(tally.map(|t| t.first_seen), Some(5));
        assert_eq!(merged.votes(), 4);
        assert_eq!(merged.keys(), 2);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut table = VoteTable::new();
        table.vote_pair(0, &pair("the cat sleeps", "le chat dort"));
        table.vote_pair(1, &pair("the cat eats", "le chat mange"));
        let before = table.clone();
        let first = table.finalize(TieBreak::FirstObserved);
        let second = table.finalize(TieBreak::FirstObserved);
        assert_eq!(first, second);
        assert_eq!(table, before);
    }

    #[test]
    fn every_finalized_key_has_votes() {
        let mut table = VoteTable::new();
        table.vote_pair(0, &pair("a b c", "x y z"));
        table.vote_pair(1, &pair("a c", "x w"));
        let dict = table.finalize(TieBreak::Lexicographic);
        for (pos, src, tgt) in dict.sorted_entries() {
            assert!(table.count(pos, src, tgt) >= 1);
        }
        assert_eq!(dict.len(), table.keys());
    }

    #[test]
    fn empty_table_finalizes_empty() {
        assert!(VoteTable::new().finalize(TieBreak::Lexicographic).is_empty());
    }
}
