use ::csv::{ReaderBuilder, StringRecord, Trim};

use super::{ModificationParser, ParseError};
use crate::document::Modification;

const ORIGINAL_ALIASES: &[&str] = &["original_text", "OriginalText", "original", "原文", "原始文本"];
const NEW_ALIASES: &[&str] = &["new_text", "ModifiedText", "modified", "新文本", "修改后文本"];
const REASON_ALIASES: &[&str] = &["reason", "ModificationReason", "原因", "修改原因"];

/// Comma-separated rows with a header naming the columns in any order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

impl ModificationParser for CsvParser {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn accepts(&self, content: &str) -> bool {
        content
            .lines()
            .map(|l| l.trim_start_matches('\u{FEFF}').trim())
            .find(|l| !l.is_empty())
            .is_some_and(|header| {
                header
                    .split(',')
                    .any(|cell| ORIGINAL_ALIASES.contains(&clean_header(cell)))
            })
    }

    fn parse(&self, content: &str) -> Result<Vec<Modification>, ParseError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.trim_start_matches('\u{FEFF}').as_bytes());

        let headers = reader.headers()?.clone();
        let original = column(&headers, ORIGINAL_ALIASES)
            .ok_or(ParseError::MissingColumn("original text"))?;
        let new = column(&headers, NEW_ALIASES).ok_or(ParseError::MissingColumn("new text"))?;
        let reason = column(&headers, REASON_ALIASES);

        let mut modifications = Vec::new();
        for record in reader.records() {
            let record = record?;
            let original_text = record.get(original).unwrap_or_default();
            let new_text = record.get(new).unwrap_or_default();
            if original_text.is_empty() || new_text.is_empty() {
                continue;
            }
            modifications.push(Modification {
                original_text: original_text.to_string(),
                new_text: new_text.to_string(),
                reason: reason
                    .and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        Ok(modifications)
    }
}

fn clean_header(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

fn column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&clean_header(h)))
}
