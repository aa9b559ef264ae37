//! OLE2 compound-file stream walking
//!
//! Word 97-2003 files keep their text in the `WordDocument` stream, usually as
//! UTF-16LE. Without parsing the piece table we decode the stream wholesale
//! and keep the lines that look like prose.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use super::{Recovered, RecoveryContext, RecoveryStrategy, StrategyError, is_cjk};

pub const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const STREAM_PRIORITY: &[&str] = &["WordDocument", "1Table", "0Table", "Data"];
const FALLBACK_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb18030", "big5"];
const MIN_STREAM_TEXT: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct OleStreams;

impl RecoveryStrategy for OleStreams {
    fn name(&self) -> &'static str {
        "ole_streams"
    }

    fn attempt(&self, path: &Path, _ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        let mut signature = [0u8; 8];
        let mut file = File::open(path)?;
        if file.read_exact(&mut signature).is_err() || signature != OLE_SIGNATURE {
            return Err(StrategyError::NotApplicable("no OLE2 signature"));
        }

        let mut compound = cfb::CompoundFile::open(File::open(path)?)
            .map_err(|e| StrategyError::Failed(format!("corrupt compound file: {e}")))?;

        let streams: Vec<(String, PathBuf)> = compound
            .walk()
            .filter(|entry| entry.is_stream())
            .map(|entry| (entry.name().to_string(), entry.path().to_path_buf()))
            .collect();

        for wanted in STREAM_PRIORITY {
            let Some((_, stream_path)) = streams.iter().find(|(name, _)| name == wanted) else {
                continue;
            };
            let mut data = Vec::new();
            let Ok(mut stream) = compound.open_stream(stream_path) else {
                continue;
            };
            if stream.read_to_end(&mut data).is_err() {
                continue;
            }

            let text = if *wanted == "WordDocument" {
                word_document_text(&data)
            } else {
                ascii_runs(&data, 4)
            };
            if text.chars().count() > MIN_STREAM_TEXT {
                return Ok(Recovered::text(format!("OLE stream {wanted}"), text));
            }
        }

        Err(StrategyError::NoText)
    }
}

/// UTF-16LE first; if that yields nothing, the longest result among the
/// fallback byte encodings.
pub(crate) fn word_document_text(data: &[u8]) -> String {
    let utf16 = clean_lines(&decode_utf16le(data));
    if !utf16.is_empty() {
        return utf16;
    }

    FALLBACK_ENCODINGS
        .iter()
        .filter_map(|label| Encoding::for_label(label.as_bytes()))
        .map(|encoding| {
            let (decoded, _) = encoding.decode_without_bom_handling(data);
            clean_lines(&decoded)
        })
        .max_by_key(|text| text.chars().count())
        .unwrap_or_default()
}

pub(crate) fn decode_utf16le(data: &[u8]) -> String {
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn is_allowed(c: char) -> bool {
    is_cjk(c)
        || (' '..='~').contains(&c)
        || matches!(c, '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FFEF}')
}

/// Keep only prose-looking characters, one fragment per line; a fragment
/// survives if it has CJK text or an ASCII word of three letters or more.
pub(crate) fn clean_lines(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut flush = |current: &mut String| {
        let line = current.trim();
        if line.chars().count() >= 3 && looks_like_prose(line) {
            kept.push(line.to_string());
        }
        current.clear();
    };

    for c in text.chars() {
        if is_allowed(c) {
            current.push(c);
        } else {
            flush(&mut current);
        }
    }
    flush(&mut current);

    kept.join("\n")
}

fn looks_like_prose(line: &str) -> bool {
    if line.chars().any(is_cjk) {
        return true;
    }
    let mut letters = 0;
    for c in line.chars() {
        if c.is_ascii_alphabetic() {
            letters += 1;
            if letters >= 3 {
                return true;
            }
        } else {
            letters = 0;
        }
    }
    false
}

/// Printable ASCII spans of at least `min_len` bytes, one per line.
fn ascii_runs(data: &[u8], min_len: usize) -> String {
    data.split(|b| !(0x20..=0x7E).contains(b))
        .filter(|span| span.len() >= min_len)
        .map(|span| String::from_utf8_lossy(span).trim().to_string())
        .filter(|s| looks_like_prose(s))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn utf16_text_survives_binary_noise() {
        let mut data = vec![0x01, 0x00, 0xFF, 0xFF];
        data.extend(utf16("Quarterly report"));
        data.extend([0x00, 0x00, 0x07, 0x00]);
        data.extend(utf16("合同条款"));
        data.extend([0x00, 0x00]);
        let text = word_document_text(&data);
        assert_eq!(text, "Quarterly report\n合同条款");
    }

    #[test]
    fn short_or_symbolic_fragments_are_dropped() {
        assert_eq!(clean_lines("ab\u{1}12345\u{1}x-y"), "");
        assert_eq!(clean_lines("\u{1}hello\u{1}"), "hello");
    }

    #[test]
    fn ascii_runs_need_letters() {
        assert_eq!(ascii_runs(b"\x00\x00Table text\x00\x001234567\x00", 4), "Table text");
    }
}
