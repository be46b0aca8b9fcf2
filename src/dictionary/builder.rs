use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use rayon::prelude::*;

use crate::corpus::{AlignedPair, PairResult};
use crate::dictionary::{BilingualDictionary, TieBreak, VoteTable};
use crate::error::AlignmentError;

/// What to do with a record that did not convert into an aligned pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Leave it out of the vote and report it in the build result.
    #[default]
    Skip,
    /// Stop the build at the first malformed record.
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(anyhow!("unknown malformed policy: {other} (expected skip | abort)")),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub tie_break: TieBreak,
    pub malformed: MalformedPolicy,
}

/// Vote table plus bookkeeping for the records that fed it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tallied {
    pub table: VoteTable,
    /// Records that voted (including pairs with an empty side).
    pub pairs: usize,
    /// Malformed records left out under [`MalformedPolicy::Skip`], in input order.
    pub skipped: Vec<AlignmentError>,
}

impl Tallied {
    fn merge(mut self, other: Tallied) -> Tallied {
        self.table = self.table.merge(other.table);
        self.pairs += other.pairs;
        self.skipped.extend(other.skipped);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    pub dictionary: BilingualDictionary,
    pub pairs: usize,
    pub skipped: Vec<AlignmentError>,
    pub votes: u64,
}

/// Turns aligned sentence pairs into a [`BilingualDictionary`] by positional voting.
#[derive(Clone, Copy, Debug, Default)]
pub struct DictionaryBuilder {
    options: BuildOptions,
}

impl DictionaryBuilder {
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Single pass over `items`; the n-th item has ordinal n for first-observed tie breaks.
    pub fn tally<I>(&self, items: I) -> Result<Tallied, AlignmentError>
    where
        I: IntoIterator<Item = PairResult>,
    {
        let mut acc = Tallied::default();
        for (ordinal, item) in items.into_iter().enumerate() {
            self.absorb(&mut acc, ordinal, item.as_ref())?;
        }
        Ok(acc)
    }

    /// Splits `items` into `shards` contiguous runs, tallies them in parallel, then merges
    /// the shard tables in input order. Gives the same result as [`Self::tally`].
    pub fn tally_sharded(
        &self,
        items: &[PairResult],
        shards: usize,
    ) -> Result<Tallied, AlignmentError> {
        if shards <= 1 || items.len() < 2 {
            return self.tally_slice(0, items);
        }
        let chunk = items.len().div_ceil(shards);
        let parts: Vec<Result<Tallied, AlignmentError>> = items
            .par_chunks(chunk)
            .enumerate()
            .map(|(i, run)| self.tally_slice(i * chunk, run))
            .collect();

        let mut acc = Tallied::default();
        for part in parts {
            acc = acc.merge(part?);
        }
        Ok(acc)
    }

    pub fn build<I>(&self, items: I) -> Result<BuildReport, AlignmentError>
    where
        I: IntoIterator<Item = PairResult>,
    {
        Ok(self.finish(self.tally(items)?))
    }

    pub fn build_sharded(
        &self,
        items: &[PairResult],
        shards: usize,
    ) -> Result<BuildReport, AlignmentError> {
        Ok(self.finish(self.tally_sharded(items, shards)?))
    }

    /// Builds from pairs already known to be well formed.
    #[must_use]
    pub fn build_pairs<I>(&self, pairs: I) -> BilingualDictionary
    where
        I: IntoIterator<Item = AlignedPair>,
    {
        let mut table = VoteTable::new();
        for (ordinal, pair) in pairs.into_iter().enumerate() {
            table.vote_pair(ordinal as u64, &pair);
        }
        table.finalize(self.options.tie_break)
    }

    /// Consumes the vote table; only the dictionary and counters outlive the build.
    #[must_use]
    pub fn finish(&self, tallied: Tallied) -> BuildReport {
        let dictionary = tallied.table.finalize(self.options.tie_break);
        BuildReport {
            dictionary,
            pairs: tallied.pairs,
            skipped: tallied.skipped,
            votes: tallied.table.votes(),
        }
    }

    fn tally_slice(&self, offset: usize, items: &[PairResult]) -> Result<Tallied, AlignmentError> {
        let mut acc = Tallied::default();
        for (i, item) in items.iter().enumerate() {
            self.absorb(&mut acc, offset + i, item.as_ref())?;
        }
        Ok(acc)
    }

    fn absorb(
        &self,
        acc: &mut Tallied,
        ordinal: usize,
        item: Result<&AlignedPair, &AlignmentError>,
    ) -> Result<(), AlignmentError> {
        match item {
            Ok(pair) => {
                acc.table.vote_pair(ordinal as u64, pair);
                acc.pairs += 1;
                Ok(())
            }
            Err(err) => match self.options.malformed {
                MalformedPolicy::Skip => {
                    acc.skipped.push(err.clone());
                    Ok(())
                }
                MalformedPolicy::Abort => Err(err.clone()),
            },
        }
    }
}
