use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::corpus::{FieldNames, Tokenizer};
use crate::dictionary::{BuildOptions, MalformedPolicy, TieBreak};
use crate::translate::{FallbackPolicy, DEFAULT_UNKNOWN_TOKEN};

pub const CONFIG_FILENAME: &str = "europarl-baseline.toml";
pub const CONFIG_ENV: &str = "EUROPARL_BASELINE_CONFIG";
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/europarl-baseline.toml");

const DEFAULT_PROGRESS_EVERY: usize = 1000;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub dictionary: DictionarySection,
    #[serde(default)]
    pub translate: TranslateSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CorpusSection {
    #[serde(default)]
    pub source_field: Option<String>,
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub lowercase: Option<bool>,
    #[serde(default)]
    pub max_records: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DictionarySection {
    /// "lexicographic" or "first-observed".
    #[serde(default)]
    pub tie_break: Option<String>,
    /// "skip" or "abort".
    #[serde(default)]
    pub malformed: Option<String>,
    #[serde(default)]
    pub shards: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslateSection {
    /// "pass-through", "unknown-token" or "skip".
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub unknown_token: Option<String>,
    #[serde(default)]
    pub progress_every: Option<usize>,
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub lowercase: Option<bool>,
    pub max_records: Option<usize>,
    pub tie_break: Option<String>,
    pub malformed: Option<String>,
    pub shards: Option<usize>,
    pub fallback: Option<String>,
    pub unknown_token: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub config_path: Option<PathBuf>,
    pub fields: FieldNames,
    /// Case folding set on the command line or in the config file; `None` when unset.
    pub lowercase: Option<bool>,
    pub tokenizer: Tokenizer,
    pub max_records: Option<usize>,
    pub build: BuildOptions,
    pub shards: usize,
    pub fallback: FallbackPolicy,
    pub unknown_token: String,
    pub progress_every: usize,
}

impl RunConfig {
    /// Locates and loads the config file (if any), then applies `overrides`.
    pub fn resolve(config_path: Option<PathBuf>, overrides: CliOverrides) -> anyhow::Result<Self> {
        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(CONFIG_FILENAME));

        let file_cfg = match cfg_file.as_ref() {
            Some(p) => load_config(p)?,
            None => AppConfig::default(),
        };
        Self::from_app_config(&file_cfg, cfg_file, overrides)
    }

    pub fn from_app_config(
        cfg: &AppConfig,
        config_path: Option<PathBuf>,
        overrides: CliOverrides,
    ) -> anyhow::Result<Self> {
        let defaults = FieldNames::default();
        let fields = FieldNames {
            source: non_empty(cfg.corpus.source_field.as_deref()).unwrap_or(defaults.source),
            target: non_empty(cfg.corpus.target_field.as_deref()).unwrap_or(defaults.target),
        };
        if fields.source == fields.target {
            return Err(anyhow!(
                "corpus.source_field and corpus.target_field are both {}",
                fields.source
            ));
        }

        let lowercase = overrides.lowercase.or(cfg.corpus.lowercase);
        let max_records = overrides.max_records.or(cfg.corpus.max_records);

        let tie_break = match overrides
            .tie_break
            .as_deref()
            .or(cfg.dictionary.tie_break.as_deref())
        {
            Some(s) => s.parse::<TieBreak>().context("dictionary.tie_break")?,
            None => TieBreak::default(),
        };
        let malformed = match overrides
            .malformed
            .as_deref()
            .or(cfg.dictionary.malformed.as_deref())
        {
            Some(s) => s.parse::<MalformedPolicy>().context("dictionary.malformed")?,
            None => MalformedPolicy::default(),
        };
        let shards = overrides.shards.or(cfg.dictionary.shards).unwrap_or(1);
        if shards == 0 {
            return Err(anyhow!("dictionary.shards must be at least 1"));
        }

        let fallback = match overrides
            .fallback
            .as_deref()
            .or(cfg.translate.fallback.as_deref())
        {
            Some(s) => s.parse::<FallbackPolicy>().context("translate.fallback")?,
            None => FallbackPolicy::default(),
        };
        let unknown_token = overrides
            .unknown_token
            .or_else(|| cfg.translate.unknown_token.clone())
            .unwrap_or_else(|| DEFAULT_UNKNOWN_TOKEN.to_string());
        if unknown_token.split_whitespace().count() != 1 {
            return Err(anyhow!(
                "translate.unknown_token must be a single word, got {unknown_token:?}"
            ));
        }

        Ok(Self {
            config_path,
            fields,
            lowercase,
            tokenizer: Tokenizer::new(lowercase.unwrap_or(false)),
            max_records,
            build: BuildOptions {
                tie_break,
                malformed,
            },
            shards,
            fallback,
            unknown_token,
            progress_every: cfg
                .translate
                .progress_every
                .unwrap_or(DEFAULT_PROGRESS_EVERY),
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 2) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text)
        .with_context(|| format!("parse config toml: {}", path.display()))?;
    Ok(cfg)
}

/// Writes the commented default config into `dir`.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Err(anyhow!(
            "config already exists: {} (use --force to overwrite)",
            cfg_path.display()
        ));
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}
