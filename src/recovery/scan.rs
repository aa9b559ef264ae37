//! Last-resort byte pattern scanning
//!
//! Looks for text-like spans anywhere in the file: UTF-16LE windows, UTF-8
//! CJK sequences, GBK double-byte runs and ASCII phrases. Product metadata
//! strings are filtered out and duplicates removed.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use regex::bytes::Regex as BytesRegex;

use super::ole::{clean_lines, decode_utf16le};
use super::{Recovered, RecoveryContext, RecoveryStrategy, StrategyError, is_cjk};

const UTF16_WINDOW: usize = 1024;
const MIN_TOTAL_TEXT: usize = 10;

static UTF8_CJK: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?-u)(?:[\xE4-\xE9][\x80-\xBF]{2}){2,}").unwrap());
static GBK_RUN: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?-u)(?:[\xB0-\xF7][\xA1-\xFE]){2,}").unwrap());
static ASCII_PHRASE: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(r"(?-u)[a-zA-Z][a-zA-Z0-9 \t.,;:\-]{2,30}[a-zA-Z0-9]").unwrap()
});
static METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(Microsoft|Office|Word|Document|Normal|Table)\b").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct ByteScan;

impl RecoveryStrategy for ByteScan {
    fn name(&self) -> &'static str {
        "byte_scan"
    }

    fn attempt(&self, path: &Path, _ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        let data = std::fs::read(path)?;
        let text = scan_bytes(&data);
        if text.chars().count() < MIN_TOTAL_TEXT {
            return Err(StrategyError::NoText);
        }
        Ok(Recovered::text("binary scan", text))
    }
}

pub(crate) fn scan_bytes(data: &[u8]) -> String {
    let mut fragments: Vec<String> = Vec::new();

    for window in data.chunks(UTF16_WINDOW) {
        let cleaned = clean_lines(&decode_utf16le(window));
        fragments.extend(cleaned.lines().map(str::to_string));
    }

    for m in UTF8_CJK.find_iter(data) {
        if let Ok(text) = std::str::from_utf8(m.as_bytes()) {
            fragments.push(text.to_string());
        }
    }

    for m in GBK_RUN.find_iter(data) {
        let (decoded, _, had_errors) = encoding_rs::GBK.decode(m.as_bytes());
        if !had_errors && decoded.chars().next().is_some_and(is_cjk) {
            fragments.push(decoded.into_owned());
        }
    }

    for m in ASCII_PHRASE.find_iter(data) {
        let phrase = String::from_utf8_lossy(m.as_bytes()).trim().to_string();
        if phrase.chars().all(|c| c.is_ascii_digit() || !c.is_alphanumeric()) {
            continue;
        }
        fragments.push(phrase);
    }

    let mut seen = HashSet::new();
    fragments
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| f.chars().count() >= 2)
        .filter(|f| !METADATA.is_match(f))
        .filter(|f| seen.insert(f.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}
