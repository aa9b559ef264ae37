//! Modification list input
//!
//! Modification lists arrive as JSON or CSV text, from a file, a URL or
//! inline. Parsers form an ordered chain; each declares whether it accepts
//! the content and the first successful parse wins.

mod csv;
mod json;
mod source;

use thiserror::Error;

use crate::document::Modification;

pub use self::csv::CsvParser;
pub use self::json::JsonParser;
pub use self::source::{ModificationSource, fetch_source};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("CSV header has no {0} column")]
    MissingColumn(&'static str),
    #[error("no parser accepted the input ({0})")]
    Unrecognized(String),
    #[error("input contains no modifications")]
    Empty,
    #[error("could not read modification source: {0}")]
    Source(String),
}

pub trait ModificationParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap check on the raw text; parsing may still fail afterwards.
    fn accepts(&self, content: &str) -> bool;

    fn parse(&self, content: &str) -> Result<Vec<Modification>, ParseError>;
}

pub struct ParserChain {
    parsers: Vec<Box<dyn ModificationParser>>,
}

impl Default for ParserChain {
    fn default() -> Self {
        Self::new(vec![Box::new(JsonParser), Box::new(CsvParser)])
    }
}

impl ParserChain {
    pub fn new(parsers: Vec<Box<dyn ModificationParser>>) -> Self {
        Self { parsers }
    }

    /// Parse with the first parser that accepts the content and succeeds.
    /// An empty result is an error: there is nothing to apply.
    pub fn parse(&self, content: &str) -> Result<Vec<Modification>, ParseError> {
        if content.trim_start_matches('\u{FEFF}').trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let mut failures = Vec::new();

        for parser in &self.parsers {
            if !parser.accepts(content) {
                continue;
            }
            match parser.parse(content) {
                Ok(modifications) if modifications.is_empty() => return Err(ParseError::Empty),
                Ok(modifications) => return Ok(modifications),
                Err(err) => {
                    tracing::debug!(parser = parser.name(), error = %err, "parser rejected input");
                    failures.push(format!("{}: {err}", parser.name()));
                }
            }
        }

        if failures.is_empty() {
            return Err(ParseError::Unrecognized(
                "expected a JSON array or a CSV header".to_string(),
            ));
        }
        Err(ParseError::Unrecognized(failures.join("; ")))
    }

    /// Decode raw bytes with the modification encoding list, then parse.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<Modification>, ParseError> {
        let text = crate::encoding::decode_lossy(bytes, crate::encoding::MODIFICATION_ENCODINGS);
        self.parse(&text)
    }
}
