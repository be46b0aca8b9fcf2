use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use encoding_rs::{CoderResult, UTF_8};

use crate::corpus::{CorpusRecord, FieldNames};

const CHUNK_BYTES: usize = 64 * 1024;

/// Feeds decoded lines to `visit` until it returns `false` or the input ends.
///
/// A UTF-8 or UTF-16 byte order mark selects the encoding; plain UTF-8 otherwise.
/// Invalid sequences become U+FFFD. Line endings (`\n` or `\r\n`) are stripped and
/// a final newline does not produce a trailing empty line.
fn for_each_line<R: Read>(mut reader: R, mut visit: impl FnMut(&str) -> bool) -> io::Result<()> {
    let mut decoder = UTF_8.new_decoder();
    let mut raw = vec![0u8; CHUNK_BYTES];
    let mut pending = String::new();
    loop {
        let n = match reader.read(&mut raw) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let last = n == 0;
        let mut input = &raw[..n];
        loop {
            let room = decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(CHUNK_BYTES);
            pending.reserve(room);
            let (result, read, _had_errors) = decoder.decode_to_string(input, &mut pending, last);
            input = &input[read..];
            if result == CoderResult::InputEmpty {
                break;
            }
        }

        let mut start = 0;
        while let Some(offset) = pending[start..].find('\n') {
            let end = start + offset;
            let line = &pending[start..end];
            if !visit(line.strip_suffix('\r').unwrap_or(line)) {
                return Ok(());
            }
            start = end + 1;
        }
        pending.drain(..start);

        if last {
            if !pending.is_empty() {
                visit(pending.strip_suffix('\r').unwrap_or(&pending));
            }
            return Ok(());
        }
    }
}

/// Reads a JSON-Lines corpus, stopping once `max_records` well-formed pairs are loaded.
///
/// Blank lines are ignored and do not consume a record index. Malformed records keep
/// their index but do not count toward the cap.
pub fn read_corpus(
    path: &Path,
    fields: &FieldNames,
    max_records: Option<usize>,
) -> anyhow::Result<Vec<CorpusRecord>> {
    let file = File::open(path).with_context(|| format!("read corpus: {}", path.display()))?;
    let limit = max_records.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    if limit == 0 {
        return Ok(records);
    }

    let mut valid = 0usize;
    for_each_line(file, |line| {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let record = CorpusRecord::from_json_line(records.len(), line, fields);
        if record.pair.is_ok() {
            valid += 1;
        }
        records.push(record);
        valid < limit
    })
    .with_context(|| format!("read corpus: {}", path.display()))?;
    Ok(records)
}

/// Reads one sentence per line, keeping blank lines so output stays line-aligned with input.
pub fn read_sentences(path: &Path) -> anyhow::Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("read sentences: {}", path.display()))?;
    let mut lines = Vec::new();
    for_each_line(file, |line| {
        lines.push(line.to_string());
        true
    })
    .with_context(|| format!("read sentences: {}", path.display()))?;
    Ok(lines)
}
