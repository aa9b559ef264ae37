//! Best-effort recovery of legacy `.doc` files
//!
//! An ordered chain of independent strategies is tried until one produces
//! either a converted Word package or plain text. Text is wrapped into a new
//! document whose first paragraph names the method that recovered it. The
//! result is lossy by nature: no formatting, tables or images survive.

mod command;
mod container;
mod external;
mod ole;
mod scan;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::Config;
use crate::document::builder::{self, TextStyle};
use crate::document::{DocxPackage, PackageError};
use crate::events::{EventKind, EventSink};

pub use container::ContainerSniff;
pub use external::{AutomationBridge, OfficeSuite, TextTools};
pub use ole::OleStreams;
pub use scan::ByteScan;

/// Paragraphs longer than this many graphemes are flushed early.
const PARAGRAPH_FLUSH_LEN: usize = 300;
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '。', '！', '？'];

#[derive(Debug, Clone)]
pub enum RecoveredContent {
    /// A complete Word package (office conversion, misnamed .docx).
    Package(Vec<u8>),
    /// Plain text that still needs wrapping.
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Recovered {
    pub method: String,
    pub content: RecoveredContent,
}

impl Recovered {
    pub fn text(method: impl Into<String>, text: String) -> Self {
        Self {
            method: method.into(),
            content: RecoveredContent::Text(text),
        }
    }

    pub fn package(method: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            method: method.into(),
            content: RecoveredContent::Package(bytes),
        }
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("not available on this host")]
    Unavailable,
    #[error("not applicable: {0}")]
    NotApplicable(&'static str),
    #[error("no usable text found")]
    NoText,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("legacy file not found: {0}")]
    NotFound(PathBuf),
    #[error(
        "could not recover any content; please re-save the file as .docx ({})",
        render_failures(.0)
    )]
    Exhausted(Vec<StrategyFailure>),
    #[error("failed to write recovered document: {0}")]
    Output(String),
}

fn render_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Settings shared by all strategies.
#[derive(Debug, Clone)]
pub struct RecoveryContext {
    pub temp_dir: PathBuf,
    pub conversion_timeout: Duration,
    pub tool_timeout: Duration,
    pub min_tool_output: usize,
    pub text_style: TextStyle,
}

impl RecoveryContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config.temp_dir(),
            conversion_timeout: config.conversion_timeout(),
            tool_timeout: config.tool_timeout(),
            min_tool_output: config.recovery.min_tool_output,
            text_style: config.text_style(),
        }
    }
}

pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, path: &Path, ctx: &RecoveryContext) -> Result<Recovered, StrategyError>;
}

#[derive(Debug, Clone)]
pub struct RecoveryOutput {
    pub path: PathBuf,
    pub method: String,
    /// True when the content went through the text wrap step.
    pub wrapped: bool,
}

pub struct RecoveryChain {
    strategies: Vec<Box<dyn RecoveryStrategy>>,
}

impl RecoveryChain {
    pub fn new(strategies: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// The built-in order: office suite, platform automation, text tools,
    /// misnamed container, OLE stream walk, raw byte scan.
    pub fn standard(config: &Config) -> Self {
        Self::new(vec![
            Box::new(OfficeSuite::new(config.recovery.office_paths.clone())),
            Box::new(AutomationBridge),
            Box::new(TextTools::standard()),
            Box::new(ContainerSniff),
            Box::new(OleStreams),
            Box::new(ByteScan),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order and write the first result under
    /// `ctx.temp_dir`.
    pub fn recover(
        &self,
        path: &Path,
        ctx: &RecoveryContext,
        sink: &dyn EventSink,
    ) -> Result<RecoveryOutput, RecoveryError> {
        if !path.is_file() {
            return Err(RecoveryError::NotFound(path.to_path_buf()));
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            sink.event(
                EventKind::RecoveryAttempt,
                &[
                    ("strategy", strategy.name().to_string()),
                    ("path", path.display().to_string()),
                ],
            );

            let outcome = strategy
                .attempt(path, ctx)
                .and_then(|recovered| finish(recovered, &ctx.text_style));

            match outcome {
                Ok((bytes, method, wrapped)) => {
                    let output = write_output(path, &bytes, &ctx.temp_dir)?;
                    sink.event(
                        EventKind::RecoverySucceeded,
                        &[
                            ("strategy", strategy.name().to_string()),
                            ("method", method.clone()),
                            ("output", output.display().to_string()),
                        ],
                    );
                    return Ok(RecoveryOutput {
                        path: output,
                        method,
                        wrapped,
                    });
                }
                Err(err) => {
                    sink.event(
                        EventKind::RecoveryStrategyFailed,
                        &[
                            ("strategy", strategy.name().to_string()),
                            ("reason", err.to_string()),
                        ],
                    );
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Err(RecoveryError::Exhausted(failures))
    }
}

/// Turn a strategy result into validated package bytes.
fn finish(
    recovered: Recovered,
    style: &TextStyle,
) -> Result<(Vec<u8>, String, bool), StrategyError> {
    match recovered.content {
        RecoveredContent::Package(bytes) => {
            DocxPackage::from_bytes(&bytes)
                .map_err(|e| StrategyError::Failed(format!("converted output unusable: {e}")))?;
            Ok((bytes, recovered.method, false))
        }
        RecoveredContent::Text(text) => {
            if text.trim().is_empty() {
                return Err(StrategyError::NoText);
            }
            let bytes = wrap_text(&recovered.method, &text, style)
                .map_err(|e| StrategyError::Failed(e.to_string()))?;
            Ok((bytes, recovered.method, true))
        }
    }
}

fn write_output(source: &Path, bytes: &[u8], temp_dir: &Path) -> Result<PathBuf, RecoveryError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    std::fs::create_dir_all(temp_dir).map_err(|e| RecoveryError::Output(e.to_string()))?;
    let output = temp_dir.join(format!("{stem}_recovered_{}.docx", Uuid::new_v4().simple()));
    std::fs::write(&output, bytes).map_err(|e| RecoveryError::Output(e.to_string()))?;
    Ok(output)
}

/// Build the recovered document: title, separator, blank line, body.
pub fn wrap_text(method: &str, text: &str, style: &TextStyle) -> Result<Vec<u8>, PackageError> {
    builder::recovered_document(method, &split_paragraphs(text), style)
}

/// Group recovered lines into paragraphs. A paragraph ends at a blank line,
/// after sentence-ending punctuation, or once it grows past the flush length.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }

        current.push(line);
        let joined_len: usize =
            current.iter().map(|l| l.graphemes(true).count()).sum::<usize>() + current.len() - 1;
        if joined_len > PARAGRAPH_FLUSH_LEN || line.ends_with(SENTENCE_ENDINGS) {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

pub(crate) fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}
