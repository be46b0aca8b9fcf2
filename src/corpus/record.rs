use serde_json::Value;

use crate::corpus::{PairResult, TextPair, Tokenizer};
use crate::error::{AlignmentError, Side};

/// Keys that hold each side of a translation unit in an object record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNames {
    pub source: String,
    pub target: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "fr".to_string(),
        }
    }
}

/// One input record, already checked at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusRecord {
    pub index: usize,
    pub pair: Result<TextPair, AlignmentError>,
}

impl CorpusRecord {
    pub fn from_json_line(index: usize, line: &str, fields: &FieldNames) -> Self {
        let pair = match serde_json::from_str::<Value>(line) {
            Ok(value) => text_pair_from_value(index, &value, fields),
            Err(e) => Err(AlignmentError::InvalidRecord {
                index,
                reason: format!("invalid json: {e}"),
            }),
        };
        Self { index, pair }
    }

    pub fn into_aligned(self, tokenizer: &Tokenizer) -> PairResult {
        self.pair.map(|p| tokenizer.align(&p))
    }
}

fn text_pair_from_value(
    index: usize,
    value: &Value,
    fields: &FieldNames,
) -> Result<TextPair, AlignmentError> {
    let (source, target) = match value {
        Value::Object(map) => (
            map.get(&fields.source).unwrap_or(&Value::Null),
            map.get(&fields.target).unwrap_or(&Value::Null),
        ),
        Value::Array(items) if items.len() == 2 => (&items[0], &items[1]),
        Value::Array(items) => {
            return Err(AlignmentError::InvalidRecord {
                index,
                reason: format!("expected 2 sentences, got {}", items.len()),
            })
        }
        _ => {
            return Err(AlignmentError::InvalidRecord {
                index,
                reason: "expected an object or a [source, target] array".to_string(),
            })
        }
    };
    Ok(TextPair {
        source: side_text(index, Side::Source, source)?,
        target: side_text(index, Side::Target, target)?,
    })
}

fn side_text(index: usize, side: Side, value: &Value) -> Result<String, AlignmentError> {
    match value {
        Value::Null => Err(AlignmentError::MissingSide { index, side }),
        Value::String(s) => Ok(s.clone()),
        _ => Err(AlignmentError::NotText { index, side }),
    }
}

#[cfg(test)]
mod tests {
    use super::{CorpusRecord, FieldNames};
    use crate::corpus::{TextPair, Tokenizer};
    use crate::error::{AlignmentError, Side};

    fn fields() -> FieldNames {
        FieldNames::default()
    }

    #[test]
    fn object_record_uses_configured_fields() {
        let line = r#"{"en":"the cat","fr":"le chat","id":3}"#;
        let rec = CorpusRecord::from_json_line(0, line, &fields());
        assert_eq!(
            rec.pair,
            Ok(TextPair {
                source: "the cat".to_string(),
                target: "le chat".to_string(),
            })
        );

        let custom = FieldNames {
            source: "src".to_string(),
            target: "tgt".to_string(),
        };
        let rec = CorpusRecord::from_json_line(1, r#"{"src":"a","tgt":"b"}"#, &custom);
        assert!(rec.pair.is_ok());
    }

    #[test]
    fn array_record_is_source_then_target() {
        let rec = CorpusRecord::from_json_line(2, r#"["the dog", "le chien"]"#, &fields());
        let aligned = rec.into_aligned(&Tokenizer::default()).expect("aligned");
        assert_eq!(aligned.source, vec!["the", "dog"]);
        assert_eq!(aligned.target, vec!["le", "chien"]);
    }

    #[test]
    fn missing_and_null_sides_are_reported() {
        let rec = CorpusRecord::from_json_line(4, r#"{"en":"hello"}"#, &fields());
        assert_eq!(
            rec.pair,
            Err(AlignmentError::MissingSide {
                index: 4,
                side: Side::Target
            })
        );
        let rec = CorpusRecord::from_json_line(5, r#"[null, "bonjour"]"#, &fields());
        assert_eq!(
            rec.pair,
            Err(AlignmentError::MissingSide {
                index: 5,
                side: Side::Source
            })
        );
    }

    #[test]
    fn non_text_side_is_reported() {
        let rec = CorpusRecord::from_json_line(6, r#"{"en":42,"fr":"quarante-deux"}"#, &fields());
        assert_eq!(
            rec.pair,
            Err(AlignmentError::NotText {
                index: 6,
                side: Side::Source
            })
        );
    }

    #[test]
    fn malformed_shapes_are_invalid_records() {
        for line in [r#"["only one"]"#, r#""just a string""#, "{not json"] {
            let rec = CorpusRecord::from_json_line(9, line, &fields());
            match rec.pair {
                Err(AlignmentError::InvalidRecord { index, .. }) => assert_eq!(index, 9),
                other => panic!("unexpected {other:?} for {line}"),
            }
        }
    }

    #[test]
    fn empty_side_is_still_a_valid_pair() {
        let rec = CorpusRecord::from_json_line(0, r#"{"en":"","fr":"le chat"}"#, &fields());
        let aligned = rec.into_aligned(&Tokenizer::default()).expect("aligned");
        assert!(aligned.source.is_empty());
        assert_eq!(aligned.aligned_len(), 0);
    }
}
