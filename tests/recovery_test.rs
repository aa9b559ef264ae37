mod common;

use std::io::{Cursor, Write};
use std::path::Path;

use redliner::document::{
    ContentNode, DocxPackage, ExtractOptions, ImageCache, TextAlignment, extract_content,
};
use redliner::recovery::{
    ByteScan, ContainerSniff, OleStreams, Recovered, RecoveredContent, RecoveryChain,
    RecoveryContext, RecoveryError, RecoveryStrategy, StrategyError,
};
use redliner::{Config, EventKind, MemorySink, MessageKey, Processor};
use tempfile::TempDir;

use common::{docx_bytes, paragraph, run};

struct Unavailable;

impl RecoveryStrategy for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn attempt(&self, _path: &Path, _ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        Err(StrategyError::Unavailable)
    }
}

struct FixedText(&'static str);

impl RecoveryStrategy for FixedText {
    fn name(&self) -> &'static str {
        "fixed_text"
    }

    fn attempt(&self, _path: &Path, _ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        Ok(Recovered::text("fixed", self.0.to_string()))
    }
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.io.temp_dir = Some(dir.join("scratch"));
    config
}

fn legacy_file(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join("legacy.doc");
    std::fs::write(&path, bytes).expect("write legacy file");
    path
}

fn paragraphs_of(path: &Path) -> Vec<(String, Option<bool>, TextAlignment)> {
    let package = DocxPackage::open(path).expect("recovered output opens");
    let images = ImageCache::from_package(&package);
    extract_content(&package, &images, &ExtractOptions::default())
        .into_iter()
        .filter_map(|node| match node {
            ContentNode::Paragraph(p) => {
                let bold = p.runs.first().and_then(|r| r.bold);
                Some((p.text, bold, p.alignment))
            }
            ContentNode::Table(_) => None,
        })
        .collect()
}

/// A compound file whose WordDocument stream holds `text` as UTF-16LE.
fn ole_file(text: &str) -> Vec<u8> {
    let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).expect("create cfb");
    {
        let mut stream = compound.create_stream("/WordDocument").expect("create stream");
        let mut data = vec![0u8; 32];
        for unit in text.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 32]);
        stream.write_all(&data).expect("write stream");
        stream.flush().expect("flush stream");
    }
    compound.flush().expect("flush cfb");
    compound.into_inner().into_inner()
}

#[cfg(test)]
mod recovery_tests {
    use super::*;

    #[test]
    fn test_first_successful_strategy_wins_and_is_wrapped() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), b"irrelevant");
        let config = config_in(dir.path());
        let ctx = RecoveryContext::from_config(&config);
        let sink = MemorySink::new();

        let chain = RecoveryChain::new(vec![
            Box::new(Unavailable),
            Box::new(FixedText("Opening line\ncontinues here.\nSecond paragraph")),
        ]);
        let output = chain.recover(&path, &ctx, sink.as_ref()).expect("recovered");

        assert_eq!(output.method, "fixed");
        assert!(output.wrapped);
        assert!(output.path.starts_with(dir.path().join("scratch")));
        let file_name = output.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(file_name.starts_with("legacy_recovered_"), "{file_name}");

        let paragraphs = paragraphs_of(&output.path);
        assert_eq!(paragraphs.len(), 4, "empty spacer paragraph is not extracted");
        assert_eq!(paragraphs[0].0, "Recovered from legacy document (fixed)");
        assert_eq!(paragraphs[0].1, Some(true), "title is bold");
        assert_eq!(paragraphs[0].2, TextAlignment::Center);
        assert_eq!(paragraphs[1].0, "=".repeat(50));
        assert_eq!(paragraphs[2].0, "Opening line continues here.");
        assert_eq!(paragraphs[3].0, "Second paragraph");

        assert_eq!(sink.of_kind(EventKind::RecoveryStrategyFailed).len(), 1);
        let succeeded = sink.of_kind(EventKind::RecoverySucceeded);
        assert_eq!(succeeded[0].field("strategy"), Some("fixed_text"));
    }

    #[test]
    fn test_exhausted_chain_lists_every_failure() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), &[0u8; 64]);
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));

        let chain = RecoveryChain::new(vec![Box::new(Unavailable), Box::new(ByteScan)]);
        let err = chain
            .recover(&path, &ctx, MemorySink::new().as_ref())
            .expect_err("nothing recoverable");

        let RecoveryError::Exhausted(failures) = err else {
            panic!("expected exhaustion, got {err:?}");
        };
        let names: Vec<_> = failures.iter().map(|f| f.strategy).collect();
        assert_eq!(names, ["unavailable", "byte_scan"]);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));
        let chain = RecoveryChain::new(vec![Box::new(ByteScan)]);

        let err = chain
            .recover(&dir.path().join("absent.doc"), &ctx, MemorySink::new().as_ref())
            .expect_err("missing input");
        assert!(matches!(err, RecoveryError::NotFound(_)));
    }

    #[test]
    fn test_misnamed_docx_is_returned_unwrapped() {
        let dir = TempDir::new().expect("temp dir");
        let bytes = docx_bytes(&paragraph(&[run("Actually a docx")])).expect("fixture");
        let path = legacy_file(dir.path(), &bytes);
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));

        let chain = RecoveryChain::new(vec![Box::new(ContainerSniff)]);
        let output = chain
            .recover(&path, &ctx, MemorySink::new().as_ref())
            .expect("recovered");

        assert!(!output.wrapped);
        assert_eq!(output.method, "misnamed .docx");
        let paragraphs = paragraphs_of(&output.path);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].0, "Actually a docx");
    }

    #[test]
    fn test_ole_word_stream_text_is_recovered() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), &ole_file("Quarterly budget report 季度预算"));
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));

        let recovered = OleStreams.attempt(&path, &ctx).expect("ole text");
        assert_eq!(recovered.method, "OLE stream WordDocument");
        let RecoveredContent::Text(text) = recovered.content else {
            panic!("expected text");
        };
        assert!(text.contains("Quarterly budget report 季度预算"), "{text}");
    }

    #[test]
    fn test_ole_strategy_skips_non_compound_files() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), b"plain bytes, no signature");
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));

        let err = OleStreams.attempt(&path, &ctx).expect_err("not OLE");
        assert!(matches!(err, StrategyError::NotApplicable(_)));
    }

    #[test]
    fn test_byte_scan_finds_utf16_text() {
        let dir = TempDir::new().expect("temp dir");
        let mut bytes = vec![0xFFu8; 40];
        for unit in "Meeting minutes for March".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes.extend_from_slice(&[0xFF; 40]);
        let path = legacy_file(dir.path(), &bytes);
        let ctx = RecoveryContext::from_config(&config_in(dir.path()));

        let recovered = ByteScan.attempt(&path, &ctx).expect("scan text");
        assert_eq!(recovered.method, "binary scan");
        let RecoveredContent::Text(text) = recovered.content else {
            panic!("expected text");
        };
        assert!(text.contains("Meeting minutes for March"), "{text}");
    }

    #[test]
    fn test_processor_tracks_and_cleans_recovered_files() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), b"irrelevant");
        let sink = MemorySink::new();
        let mut processor = Processor::with_sink(config_in(dir.path()), sink.clone())
            .with_recovery_chain(RecoveryChain::new(vec![Box::new(FixedText(
                "Recovered body text.",
            ))]));

        let outcome = processor.recover_legacy_document(&path);
        assert!(outcome.success, "{outcome:?}");
        assert_eq!(outcome.message, MessageKey::DocConversionSuccess);

        let recovered = std::path::PathBuf::from(outcome.detail.expect("output path"));
        assert!(recovered.exists());
        assert_eq!(processor.temp_files(), [recovered.clone()]);

        assert!(processor.load_document(&recovered).success);

        let cleaned = processor.cleanup_temp_files();
        assert!(cleaned.success);
        assert!(!recovered.exists(), "temp output is removed on cleanup");
        assert!(processor.temp_files().is_empty());
        assert_eq!(sink.of_kind(EventKind::TempFilesCleaned).len(), 1);
    }

    #[test]
    fn test_dropping_the_processor_removes_temp_files() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), b"irrelevant");
        let recovered = {
            let mut processor = Processor::with_sink(config_in(dir.path()), MemorySink::new())
                .with_recovery_chain(RecoveryChain::new(vec![Box::new(FixedText(
                    "Short lived.",
                ))]));
            processor.recover_legacy(&path).expect("recovered").path
        };
        assert!(!recovered.exists());
    }

    #[test]
    fn test_failed_recovery_maps_to_conversion_failure() {
        let dir = TempDir::new().expect("temp dir");
        let path = legacy_file(dir.path(), b"x");
        let mut processor = Processor::with_sink(config_in(dir.path()), MemorySink::new())
            .with_recovery_chain(RecoveryChain::new(vec![Box::new(Unavailable)]));

        let outcome = processor.recover_legacy_document(&path);
        assert!(!outcome.success);
        assert_eq!(outcome.message, MessageKey::DocConversionFailed);
        assert!(processor.temp_files().is_empty());
    }
}
