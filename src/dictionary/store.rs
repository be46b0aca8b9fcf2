use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::corpus::Tokenizer;
use crate::dictionary::{BilingualDictionary, TieBreak};

pub const SCHEMA: &str = "europarl.positional_dictionary.v1";

/// Build settings recorded next to the entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DictionaryMeta {
    pub tie_break: TieBreak,
    /// Keys were case-folded before voting.
    pub lowercase: bool,
}

impl DictionaryMeta {
    /// Tokenizer for looking words up in this dictionary.
    ///
    /// `requested` is an explicit case-folding choice from the command line or config;
    /// `None` follows the stored setting. A conflicting choice is an error, since
    /// lookups with the other casing would silently miss.
    pub fn tokenizer(&self, requested: Option<bool>) -> anyhow::Result<Tokenizer> {
        match requested {
            Some(lowercase) if lowercase != self.lowercase => Err(anyhow!(
                "dictionary was built with lowercase={} but lowercase={} was requested",
                self.lowercase,
                lowercase
            )),
            _ => Ok(Tokenizer::new(self.lowercase)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DictionaryFile {
    schema: String,
    tie_break: String,
    #[serde(default)]
    lowercase: bool,
    fingerprint: String,
    entries: Vec<EntryRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    pos: usize,
    src: String,
    tgt: String,
}

/// Writes the dictionary as JSON through a temp file in the destination directory.
pub fn save_dictionary(
    path: &Path,
    dict: &BilingualDictionary,
    meta: &DictionaryMeta,
) -> anyhow::Result<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("create output dir: {}", parent_dir.display()))?;

    let file = DictionaryFile {
        schema: SCHEMA.to_string(),
        tie_break: meta.tie_break.to_string(),
        lowercase: meta.lowercase,
        fingerprint: dict.fingerprint(),
        entries: dict
            .sorted_entries()
            .into_iter()
            .map(|(pos, src, tgt)| EntryRecord {
                pos,
                src: src.to_string(),
                tgt: tgt.to_string(),
            })
            .collect(),
    };

    let temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("create temp file in {}", parent_dir.display()))?;
    {
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer_pretty(&mut writer, &file).context("serialize dictionary")?;
        writer.flush().context("flush dictionary")?;
    }
    temp_file
        .persist(path)
        .with_context(|| format!("write dictionary: {}", path.display()))?;
    Ok(())
}

/// Loads a dictionary and checks its fingerprint. Returns the settings it was built with.
pub fn load_dictionary(path: &Path) -> anyhow::Result<(BilingualDictionary, DictionaryMeta)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read dictionary: {}", path.display()))?;
    let file: DictionaryFile = serde_json::from_str(&text)
        .with_context(|| format!("parse dictionary: {}", path.display()))?;
    if file.schema != SCHEMA {
        return Err(anyhow!(
            "unsupported dictionary schema {} in {} (expected {SCHEMA})",
            file.schema,
            path.display()
        ));
    }
    let tie_break: TieBreak = file.tie_break.parse()?;
    let dict: BilingualDictionary = file
        .entries
        .into_iter()
        .map(|e| (e.pos, e.src, e.tgt))
        .collect();
    let actual = dict.fingerprint();
    if actual != file.fingerprint {
        return Err(anyhow!(
            "dictionary fingerprint mismatch in {}: recorded {} computed {}",
            path.display(),
            file.fingerprint,
            actual
        ));
    }
    Ok((
        dict,
        DictionaryMeta {
            tie_break,
            lowercase: file.lowercase,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::{load_dictionary, save_dictionary, DictionaryMeta};
    use crate::corpus::{AlignedPair, TextPair, Tokenizer};
    use crate::dictionary::{DictionaryBuilder, TieBreak};
    use crate::translate::{FallbackPolicy, PositionalTranslator};

    fn sample() -> crate::dictionary::BilingualDictionary {
        DictionaryBuilder::default().build_pairs(vec![
            AlignedPair::new(["the", "cat"], ["le", "chat"]),
            AlignedPair::new(["the", "dog"], ["le", "chien"]),
        ])
    }

    #[test]
    fn save_then_load_restores_dictionary() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("nested").join("dict.json");
        let dict = sample();
        let meta = DictionaryMeta {
            tie_break: TieBreak::Lexicographic,
            lowercase: true,
        };
        save_dictionary(&path, &dict, &meta).expect("save");

        let (loaded, loaded_meta) = load_dictionary(&path).expect("load");
        assert_eq!(loaded, dict);
        assert_eq!(loaded_meta, meta);
        assert!(loaded_meta.lowercase);
    }

    #[test]
    fn file_without_lowercase_field_loads_as_case_sensitive() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("dict.json");
        let meta = DictionaryMeta {
            tie_break: TieBreak::FirstObserved,
            lowercase: true,
        };
        save_dictionary(&path, &sample(), &meta).expect("save");

        let text = std::fs::read_to_string(&path).expect("read");
        let mut value: serde_json::Value = serde_json::from_str(&text).expect("json");
        value
            .as_object_mut()
            .expect("object")
            .remove("lowercase")
            .expect("field present");
        std::fs::write(&path, value.to_string()).expect("write");

        let (_, loaded_meta) = load_dictionary(&path).expect("load");
        assert!(!loaded_meta.lowercase);
    }

    #[test]
    fn stored_case_folding_drives_lookup() {
        let lower = Tokenizer::new(true);
        let dict = DictionaryBuilder::default().build_pairs(vec![lower.align(&TextPair {
            source: "The Cat".to_string(),
            target: "Le Chat".to_string(),
        })]);
        let meta = DictionaryMeta {
            tie_break: TieBreak::FirstObserved,
            lowercase: true,
        };
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("dict.json");
        save_dictionary(&path, &dict, &meta).expect("save");

        let (loaded, loaded_meta) = load_dictionary(&path).expect("load");
        let tokenizer = loaded_meta.tokenizer(None).expect("tokenizer");
        assert!(tokenizer.lowercase);
        let translator = PositionalTranslator::new(&loaded, FallbackPolicy::PassThrough);
        assert_eq!(
            translator.translate_text("THE CAT", &tokenizer).words,
            vec!["le", "chat"]
        );
    }

    #[test]
    fn conflicting_case_folding_is_rejected() {
        let meta = DictionaryMeta {
            tie_break: TieBreak::FirstObserved,
            lowercase: true,
        };
        assert!(meta.tokenizer(Some(true)).expect("same").lowercase);
        let err = meta.tokenizer(Some(false)).unwrap_err();
        assert!(err.to_string().contains("lowercase=true"));
        assert!(!DictionaryMeta::default().tokenizer(None).expect("default").lowercase);
    }

    #[test]
    fn tampered_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("dict.json");
        save_dictionary(&path, &sample(), &DictionaryMeta::default()).expect("save");

        let text = std::fs::read_to_string(&path).expect("read");
        std::fs::write(&path, text.replace("chien", "loup")).expect("write");
        let err = load_dictionary(&path).unwrap_err();
        assert!(err.to_string().contains("fingerprint mismatch"));
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("dict.json");
        std::fs::write(
            &path,
            r#"{"schema":"other","tie_break":"lexicographic","fingerprint":"","entries":[]}"#,
        )
        .expect("write");
        assert!(load_dictionary(&path).is_err());
    }
}
