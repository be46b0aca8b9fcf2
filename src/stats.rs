//! Descriptive statistics over a parallel corpus sample.

use std::collections::HashMap;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::corpus::TextPair;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("word regex"));

/// Pairs with a shorter source are too noisy to rank by length ratio.
const MIN_RATIO_SOURCE_CHARS: usize = 20;
const PREVIEW_CHARS: usize = 60;
const SAMPLE_PREVIEW_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsOptions {
    pub samples: usize,
    pub buckets: usize,
    pub top_words: usize,
    pub top_ratios: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            samples: 5,
            buckets: 10,
            top_words: 20,
            top_ratios: 5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SideStats {
    pub char_mean: f64,
    pub char_min: usize,
    pub char_max: usize,
    pub word_mean: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatioSample {
    pub ratio: f64,
    pub source_chars: usize,
    pub target_chars: usize,
    pub source_preview: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LengthRatios {
    /// Mean target/source ratio by characters, over pairs with a non-empty source.
    pub mean_char: f64,
    /// Mean target/source ratio by words, over pairs with at least one source word.
    pub mean_word: f64,
    pub highest: Vec<RatioSample>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LengthBucket {
    pub lo: usize,
    pub hi: usize,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SamplePair {
    pub index: usize,
    pub pair: TextPair,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorpusReport {
    pub n_pairs: usize,
    pub source: SideStats,
    pub target: SideStats,
    pub ratios: LengthRatios,
    pub source_lengths: Vec<LengthBucket>,
    pub target_lengths: Vec<LengthBucket>,
    pub source_top_words: Vec<WordCount>,
    pub target_top_words: Vec<WordCount>,
    pub samples: Vec<SamplePair>,
}

/// Returns `None` for an empty corpus.
#[must_use]
pub fn explore(pairs: &[TextPair], opts: &StatsOptions) -> Option<CorpusReport> {
    if pairs.is_empty() {
        return None;
    }
    let src_chars: Vec<usize> = pairs.iter().map(|p| p.source.chars().count()).collect();
    let tgt_chars: Vec<usize> = pairs.iter().map(|p| p.target.chars().count()).collect();
    let src_words: Vec<usize> = pairs.iter().map(|p| word_count(&p.source)).collect();
    let tgt_words: Vec<usize> = pairs.iter().map(|p| word_count(&p.target)).collect();

    Some(CorpusReport {
        n_pairs: pairs.len(),
        source: side_stats(&src_chars, &src_words),
        target: side_stats(&tgt_chars, &tgt_words),
        ratios: length_ratios(
            pairs,
            &src_chars,
            &tgt_chars,
            &src_words,
            &tgt_words,
            opts.top_ratios,
        ),
        source_lengths: length_buckets(&src_words, opts.buckets),
        target_lengths: length_buckets(&tgt_words, opts.buckets),
        source_top_words: top_words(pairs.iter().map(|p| p.source.as_str()), opts.top_words),
        target_top_words: top_words(pairs.iter().map(|p| p.target.as_str()), opts.top_words),
        samples: samples(pairs, opts.samples),
    })
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn side_stats(chars: &[usize], words: &[usize]) -> SideStats {
    SideStats {
        char_mean: mean(chars.iter().map(|&c| c as f64)),
        char_min: chars.iter().copied().min().unwrap_or(0),
        char_max: chars.iter().copied().max().unwrap_or(0),
        word_mean: mean(words.iter().map(|&w| w as f64)),
    }
}

fn length_ratios(
    pairs: &[TextPair],
    src_chars: &[usize],
    tgt_chars: &[usize],
    src_words: &[usize],
    tgt_words: &[usize],
    top_k: usize,
) -> LengthRatios {
    let mean_char = mean(
        src_chars
            .iter()
            .zip(tgt_chars)
            .filter(|&(&s, _)| s > 0)
            .map(|(&s, &t)| t as f64 / s as f64),
    );
    let mean_word = mean(
        src_words
            .iter()
            .zip(tgt_words)
            .filter(|&(&s, _)| s > 0)
            .map(|(&s, &t)| t as f64 / s as f64),
    );

    let mut ranked: Vec<RatioSample> = pairs
        .iter()
        .enumerate()
        .filter(|&(i, _)| src_chars[i] >= MIN_RATIO_SOURCE_CHARS)
        .map(|(i, p)| RatioSample {
            ratio: tgt_chars[i] as f64 / src_chars[i] as f64,
            source_chars: src_chars[i],
            target_chars: tgt_chars[i],
            source_preview: preview(&p.source, PREVIEW_CHARS),
        })
        .collect();
    ranked.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    ranked.truncate(top_k);

    LengthRatios {
        mean_char,
        mean_word,
        highest: ranked,
    }
}

/// Equal-width buckets over word counts; the last bucket absorbs everything above it.
fn length_buckets(words: &[usize], num_buckets: usize) -> Vec<LengthBucket> {
    let num_buckets = num_buckets.max(1);
    let max_len = words.iter().copied().max().unwrap_or(0);
    let size = max_len.div_ceil(num_buckets).max(1);

    let mut counts = vec![0usize; num_buckets];
    for &w in words {
        counts[(w / size).min(num_buckets - 1)] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .map(|(b, count)| LengthBucket {
            lo: b * size,
            hi: if b < num_buckets - 1 {
                (b + 1) * size - 1
            } else {
                max_len
            },
            count,
        })
        .collect()
}

/// Most frequent lowercase words; equal counts keep first-appearance order.
fn top_words<'a>(texts: impl Iterator<Item = &'a str>, top_n: usize) -> Vec<WordCount> {
    let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
    for text in texts {
        let lower = text.to_lowercase();
        for m in WORD_RE.find_iter(&lower) {
            let next = freq.len();
            freq.entry(m.as_str().to_string()).or_insert((0, next)).0 += 1;
        }
    }
    let mut items: Vec<(String, (usize, usize))> = freq.into_iter().collect();
    items.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    items
        .into_iter()
        .take(top_n)
        .map(|(word, (count, _))| WordCount { word, count })
        .collect()
}

/// `k` pairs spread evenly over the corpus.
fn samples(pairs: &[TextPair], k: usize) -> Vec<SamplePair> {
    let step = (pairs.len() / k.saturating_add(1)).max(1);
    (0..k)
        .map(|i| i * step)
        .take_while(|&idx| idx < pairs.len())
        .map(|index| SamplePair {
            index,
            pair: pairs[index].clone(),
        })
        .collect()
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[must_use]
pub fn render(report: &CorpusReport) -> String {
    let mut out = String::new();
    let s = &report.source;
    let t = &report.target;
    let _ = writeln!(out, "=== Basic statistics ===");
    let _ = writeln!(out, "Sentence pairs: {}", report.n_pairs);
    let _ = writeln!(
        out,
        "Source chars: mean={:.1} min={} max={}",
        s.char_mean, s.char_min, s.char_max
    );
    let _ = writeln!(
        out,
        "Target chars: mean={:.1} min={} max={}",
        t.char_mean, t.char_min, t.char_max
    );
    let _ = writeln!(out, "Source words/sentence: mean={:.1}", s.word_mean);
    let _ = writeln!(out, "Target words/sentence: mean={:.1}", t.word_mean);

    let _ = writeln!(out, "\n=== Length ratios (target/source) ===");
    let _ = writeln!(out, "By character: mean={:.3}", report.ratios.mean_char);
    let _ = writeln!(out, "By word:      mean={:.3}", report.ratios.mean_word);
    if !report.ratios.highest.is_empty() {
        let _ = writeln!(
            out,
            "Highest character ratios (source >= {MIN_RATIO_SOURCE_CHARS} chars):"
        );
        for r in &report.ratios.highest {
            let _ = writeln!(
                out,
                "  {:.2}  src[{}] tgt[{}]  {}",
                r.ratio, r.source_chars, r.target_chars, r.source_preview
            );
        }
    }

    let _ = writeln!(out, "\n=== Sentence length (words) ===");
    for (label, buckets) in [
        ("Source", &report.source_lengths),
        ("Target", &report.target_lengths),
    ] {
        let _ = writeln!(out, "{label}:");
        for b in buckets {
            let _ = writeln!(out, "  [{:3}-{:3}]: {}", b.lo, b.hi, b.count);
        }
    }

    let _ = writeln!(out, "\n=== Top words ===");
    for (label, words) in [
        ("Source", &report.source_top_words),
        ("Target", &report.target_top_words),
    ] {
        let list: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        let _ = writeln!(out, "{label}: {}", list.join(", "));
    }

    if !report.samples.is_empty() {
        let _ = writeln!(out, "\n=== Sample pairs ===");
        for (i, sample) in report.samples.iter().enumerate() {
            let _ = writeln!(out, "--- Pair {} (index {}) ---", i + 1, sample.index);
            let source = preview(&sample.pair.source, SAMPLE_PREVIEW_CHARS);
            let target = preview(&sample.pair.target, SAMPLE_PREVIEW_CHARS);
            let _ = writeln!(out, "SRC: {source}");
            let _ = writeln!(out, "TGT: {target}");
        }
    }
    out
}
