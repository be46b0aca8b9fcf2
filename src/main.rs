use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use europarl_baseline::config::{init_default_config, CliOverrides, RunConfig};
use europarl_baseline::corpus::{read_corpus, read_sentences, PairResult, TextPair};
use europarl_baseline::dictionary::store::{load_dictionary, save_dictionary, DictionaryMeta};
use europarl_baseline::dictionary::DictionaryBuilder;
use europarl_baseline::progress::ConsoleProgress;
use europarl_baseline::stats::{explore, render, StatsOptions};
use europarl_baseline::translate::PositionalTranslator;

/// How many skipped-record reasons to print before summarising.
const MAX_REPORTED_SKIPS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "europarl-baseline")]
#[command(
    about = "Positional word-for-word translation baseline built from aligned sentence pairs",
    long_about = None
)]
struct Args {
    /// Config file path (default: search for europarl-baseline.toml upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// No progress output on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default config file, then exit
    InitConfig {
        /// Directory to write the config into (default: current directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Build a positional dictionary from a JSON-Lines corpus
    Build {
        /// Corpus: one {"en": .., "fr": ..} object or ["src", "tgt"] array per line
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Output dictionary (default: <corpus_stem>.dictionary.json)
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,

        /// Parallel tally shards (1 = single-threaded)
        #[arg(long)]
        shards: Option<usize>,

        /// lexicographic | first-observed
        #[arg(long)]
        tie_break: Option<String>,

        /// skip | abort
        #[arg(long)]
        malformed: Option<String>,

        /// Read at most N records
        #[arg(long)]
        max_records: Option<usize>,

        /// Case-fold tokens before voting
        #[arg(long, overrides_with = "no_lowercase")]
        lowercase: bool,

        /// Keep token case even if the config sets lowercase = true
        #[arg(long, overrides_with = "lowercase")]
        no_lowercase: bool,
    },

    /// Translate one sentence per line with a built dictionary
    Translate {
        /// Source sentences, one per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Dictionary written by `build`
        #[arg(short, long, value_name = "JSON")]
        dictionary: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "TXT")]
        output: Option<PathBuf>,

        /// pass-through | unknown-token | skip
        #[arg(long)]
        fallback: Option<String>,

        /// Token emitted for unseen words under unknown-token fallback
        #[arg(long)]
        unknown_token: Option<String>,

        /// Require a case-folded dictionary (default: follow the dictionary)
        #[arg(long, overrides_with = "no_lowercase")]
        lowercase: bool,

        /// Require a case-sensitive dictionary
        #[arg(long, overrides_with = "lowercase")]
        no_lowercase: bool,
    },

    /// Print descriptive statistics for a JSON-Lines corpus
    Stats {
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Number of sample pairs to show
        #[arg(long, default_value_t = 5)]
        samples: usize,

        /// Sentence-length histogram buckets
        #[arg(long, default_value_t = 10)]
        buckets: usize,

        /// Most frequent words to list per side
        #[arg(long, default_value_t = 20)]
        top_words: usize,

        /// Also write the report as JSON
        #[arg(long, value_name = "JSON")]
        json: Option<PathBuf>,

        /// Read at most N records
        #[arg(long)]
        max_records: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    match args.command {
        Command::InitConfig { dir, force } => {
            let dir = dir.unwrap_or_else(|| {
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            });
            let cfg_path = init_default_config(&dir, force).context("init default config")?;
            eprintln!("Wrote config: {}", cfg_path.display());
            Ok(())
        }
        Command::Build {
            corpus,
            output,
            shards,
            tie_break,
            malformed,
            max_records,
            lowercase,
            no_lowercase,
        } => {
            let overrides = CliOverrides {
                lowercase: lowercase_flag(lowercase, no_lowercase),
                max_records,
                tie_break,
                malformed,
                shards,
                ..CliOverrides::default()
            };
            let cfg = RunConfig::resolve(args.config, overrides).context("build config")?;
            let output = output.unwrap_or_else(|| default_dictionary_path(&corpus));
            run_build(&cfg, &corpus, &output, &progress)
        }
        Command::Translate {
            input,
            dictionary,
            output,
            fallback,
            unknown_token,
            lowercase,
            no_lowercase,
        } => {
            let overrides = CliOverrides {
                lowercase: lowercase_flag(lowercase, no_lowercase),
                fallback,
                unknown_token,
                ..CliOverrides::default()
            };
            let cfg = RunConfig::resolve(args.config, overrides).context("build config")?;
            run_translate(&cfg, &input, &dictionary, output.as_deref(), &progress)
        }
        Command::Stats {
            corpus,
            samples,
            buckets,
            top_words,
            json,
            max_records,
        } => {
            let overrides = CliOverrides {
                max_records,
                ..CliOverrides::default()
            };
            let cfg = RunConfig::resolve(args.config, overrides).context("build config")?;
            let opts = StatsOptions {
                samples,
                buckets,
                top_words,
                ..StatsOptions::default()
            };
            run_stats(&cfg, &corpus, &opts, json.as_deref(), &progress)
        }
    }
}

/// `--lowercase` / `--no-lowercase`; neither leaves the config (or dictionary) in charge.
fn lowercase_flag(lowercase: bool, no_lowercase: bool) -> Option<bool> {
    if lowercase {
        Some(true)
    } else if no_lowercase {
        Some(false)
    } else {
        None
    }
}

fn default_dictionary_path(corpus: &Path) -> PathBuf {
    let stem = corpus
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("corpus")
        .to_string();
    corpus.with_file_name(format!("{stem}.dictionary.json"))
}

fn log_config(cfg: &RunConfig, progress: &ConsoleProgress) {
    match cfg.config_path.as_ref() {
        Some(p) => progress.info(format!("config: {}", p.display())),
        None => progress.info("config: built-in defaults"),
    }
}

fn run_build(
    cfg: &RunConfig,
    corpus: &Path,
    output: &Path,
    progress: &ConsoleProgress,
) -> anyhow::Result<()> {
    log_config(cfg, progress);
    progress.info(format!("reading corpus: {}", corpus.display()));
    let records = read_corpus(corpus, &cfg.fields, cfg.max_records)?;
    progress.info(format!("records: {}", records.len()));

    let items: Vec<PairResult> = records
        .into_iter()
        .map(|r| r.into_aligned(&cfg.tokenizer))
        .collect();
    let builder = DictionaryBuilder::new(cfg.build);
    progress.info(format!(
        "voting: tie_break={} malformed={} shards={}",
        cfg.build.tie_break, cfg.build.malformed, cfg.shards
    ));
    let report = if cfg.shards > 1 {
        builder.build_sharded(&items, cfg.shards)
    } else {
        builder.build(items)
    }
    .context("build aborted on malformed record")?;

    if !report.skipped.is_empty() {
        progress.warn(format!("skipped {} malformed record(s)", report.skipped.len()));
        for err in report.skipped.iter().take(MAX_REPORTED_SKIPS) {
            progress.warn(format!("  {err}"));
        }
        if report.skipped.len() > MAX_REPORTED_SKIPS {
            progress.warn(format!(
                "  ... and {} more",
                report.skipped.len() - MAX_REPORTED_SKIPS
            ));
        }
    }
    progress.info(format!(
        "pairs={} votes={} entries={} positions={}",
        report.pairs,
        report.votes,
        report.dictionary.len(),
        report.dictionary.span()
    ));
    progress.info(format!("fingerprint: {}", report.dictionary.fingerprint()));

    let meta = DictionaryMeta {
        tie_break: cfg.build.tie_break,
        lowercase: cfg.tokenizer.lowercase,
    };
    save_dictionary(output, &report.dictionary, &meta)?;
    progress.info(format!("wrote dictionary: {}", output.display()));
    Ok(())
}

fn run_translate(
    cfg: &RunConfig,
    input: &Path,
    dictionary: &Path,
    output: Option<&Path>,
    progress: &ConsoleProgress,
) -> anyhow::Result<()> {
    log_config(cfg, progress);
    let (dict, meta) = load_dictionary(dictionary)?;
    progress.info(format!(
        "dictionary: {} entries (tie_break={} lowercase={})",
        dict.len(),
        meta.tie_break,
        meta.lowercase
    ));
    let tokenizer = meta
        .tokenizer(cfg.lowercase)
        .with_context(|| format!("dictionary {}", dictionary.display()))?;
    let sentences = read_sentences(input)?;
    let translator = PositionalTranslator::new(&dict, cfg.fallback)
        .with_unknown_token(cfg.unknown_token.clone());
    progress.info(format!("fallback: {}", translator.fallback()));

    let mut out: Box<dyn Write> = match output {
        Some(p) => Box::new(BufWriter::new(
            std::fs::File::create(p).with_context(|| format!("create output: {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let total = sentences.len();
    let mut tokens = 0usize;
    let mut misses = 0usize;
    for (i, line) in sentences.iter().enumerate() {
        let words = tokenizer.tokenize(line);
        let tr = translator.translate_detailed(&words);
        tokens += words.len();
        misses += tr.misses.len();
        writeln!(out, "{}", tr.words.join(" ")).context("write translation")?;
        if cfg.progress_every > 0 && (i + 1) % cfg.progress_every == 0 {
            progress.progress("translate", i + 1, total);
        }
    }
    out.flush().context("flush translations")?;

    let rate = if tokens == 0 {
        0.0
    } else {
        misses as f64 / tokens as f64 * 100.0
    };
    progress.info(format!(
        "translated {total} sentence(s); lookup misses {misses}/{tokens} ({rate:.1}%)"
    ));
    Ok(())
}

fn run_stats(
    cfg: &RunConfig,
    corpus: &Path,
    opts: &StatsOptions,
    json: Option<&Path>,
    progress: &ConsoleProgress,
) -> anyhow::Result<()> {
    log_config(cfg, progress);
    let records = read_corpus(corpus, &cfg.fields, cfg.max_records)?;
    let mut pairs: Vec<TextPair> = Vec::with_capacity(records.len());
    let mut malformed = 0usize;
    for rec in records {
        match rec.pair {
            Ok(p) => pairs.push(p),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        progress.warn(format!("ignored {malformed} malformed record(s)"));
    }

    let Some(report) = explore(&pairs, opts) else {
        progress.info("No pairs loaded.");
        return Ok(());
    };
    print!("{}", render(&report));

    if let Some(path) = json {
        let text = serde_json::to_string_pretty(&report).context("serialize stats")?;
        std::fs::write(path, text)
            .with_context(|| format!("write stats: {}", path.display()))?;
        progress.info(format!("wrote stats: {}", path.display()));
    }
    Ok(())
}
