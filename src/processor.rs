//! Request-scoped document processing
//!
//! A [`Processor`] owns one original document and, after modifications are
//! applied, one modified working copy. The `*_document` / `*_modifications`
//! methods are the boundary: they never panic and always answer with an
//! [`Outcome`] carrying a message key. The plain methods underneath return
//! `Result` for callers that want the typed error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::document::{
    ApplyReport, CloneStrategy, ContentNode, DocumentInfo, DocumentSide, DocxPackage, LoadOptions,
    LoadedDocument, Modification, Replacer, SourceFormat, clone_document, extract_content,
    io::write_package, load_document, wordml,
};
use crate::error::{DocError, MessageKey, Outcome};
use crate::events::{EventKind, EventSink, default_sink};
use crate::recovery::{RecoveryChain, RecoveryContext, RecoveryOutput};

pub struct Processor {
    config: Config,
    sink: Arc<dyn EventSink>,
    recovery: RecoveryChain,
    original: Option<LoadedDocument>,
    modified: Option<DocxPackage>,
    modifications: Vec<Modification>,
    last_report: Option<ApplyReport>,
    clone_strategy: Option<CloneStrategy>,
    temp_files: Vec<PathBuf>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_sink(config, default_sink())
    }

    pub fn with_sink(config: Config, sink: Arc<dyn EventSink>) -> Self {
        let recovery = RecoveryChain::standard(&config);
        Self {
            config,
            sink,
            recovery,
            original: None,
            modified: None,
            modifications: Vec::new(),
            last_report: None,
            clone_strategy: None,
            temp_files: Vec::new(),
        }
    }

    /// Replace the legacy recovery chain.
    pub fn with_recovery_chain(mut self, chain: RecoveryChain) -> Self {
        self.recovery = chain;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn original(&self) -> Option<&LoadedDocument> {
        self.original.as_ref()
    }

    pub fn modified(&self) -> Option<&DocxPackage> {
        self.modified.as_ref()
    }

    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    pub fn last_report(&self) -> Option<&ApplyReport> {
        self.last_report.as_ref()
    }

    pub fn clone_strategy(&self) -> Option<CloneStrategy> {
        self.clone_strategy
    }

    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    // Boundary operations

    pub fn load_document(&mut self, path: &Path) -> Outcome {
        match self.load(path) {
            Ok(()) => Outcome::ok(MessageKey::UploadSuccess),
            Err(err) => Outcome::failed(&err),
        }
    }

    pub fn extract_content_with_formatting(
        &self,
        side: DocumentSide,
    ) -> Result<Vec<ContentNode>, DocError> {
        self.extract(side)
    }

    pub fn apply_modifications(&mut self, modifications: &[Modification]) -> Outcome {
        match self.apply(modifications) {
            Ok(report) => Outcome::ok_with(
                MessageKey::ModificationsApplied,
                format!(
                    "{} paragraphs and {} cells changed, {} failures",
                    report.paragraphs_changed, report.cells_changed, report.failures
                ),
            ),
            Err(err) => Outcome::failed(&err),
        }
    }

    pub fn save_modified_document(&mut self, output: &Path) -> Outcome {
        match self.save(output) {
            Ok(()) => Outcome::ok_with(MessageKey::DownloadStarted, output.display().to_string()),
            Err(err) => Outcome::failed(&err),
        }
    }

    pub fn get_document_info(&self) -> DocumentInfo {
        self.info()
    }

    pub fn cleanup_temp_files(&mut self) -> Outcome {
        let removed = self.cleanup();
        Outcome::ok_with(MessageKey::CleanupCompleted, format!("{removed} files removed"))
    }

    /// On success the outcome detail is the path of the recovered `.docx`.
    pub fn recover_legacy_document(&mut self, path: &Path) -> Outcome {
        match self.recover_legacy(path) {
            Ok(output) => Outcome::ok_with(
                MessageKey::DocConversionSuccess,
                output.path.display().to_string(),
            ),
            Err(err) => Outcome::failed(&err),
        }
    }

    // Typed operations

    /// Load a `.docx` or `.txt` file as the original document. Any previous
    /// modified copy and modification list are discarded.
    pub fn load(&mut self, path: &Path) -> Result<(), DocError> {
        let options = LoadOptions {
            text_style: self.config.text_style(),
            max_bytes: self.config.io.max_upload_bytes,
        };
        let loaded = load_document(path, &options)?;

        if loaded.format == SourceFormat::Txt {
            self.sink.event(
                EventKind::TextPromoted,
                &[
                    ("path", path.display().to_string()),
                    ("font", options.text_style.font.clone()),
                ],
            );
        }
        if !loaded.images.is_empty() {
            self.sink.event(
                EventKind::ImagesCached,
                &[("count", loaded.images.len().to_string())],
            );
        }
        self.sink.event(
            EventKind::DocumentLoaded,
            &[
                ("path", path.display().to_string()),
                ("format", format!("{:?}", loaded.format).to_lowercase()),
                ("styles", loaded.styles.len().to_string()),
            ],
        );

        self.original = Some(loaded);
        self.modified = None;
        self.modifications.clear();
        self.last_report = None;
        self.clone_strategy = None;
        Ok(())
    }

    pub fn extract(&self, side: DocumentSide) -> Result<Vec<ContentNode>, DocError> {
        let original = self.original.as_ref().ok_or(DocError::NoDocument)?;
        let package = match side {
            DocumentSide::Original => &original.package,
            DocumentSide::Modified => self.modified.as_ref().ok_or(DocError::NoModifiedDocument)?,
        };
        Ok(extract_content(
            package,
            &original.images,
            &self.config.extract_options(),
        ))
    }

    /// Clone the original and apply `modifications` to the copy. Each call
    /// starts again from the original, so re-applying never compounds.
    pub fn apply(&mut self, modifications: &[Modification]) -> Result<ApplyReport, DocError> {
        let original = self.original.as_ref().ok_or(DocError::NoDocument)?;
        if modifications.is_empty() {
            return Err(DocError::NoModifications);
        }

        let (mut copy, strategy) = clone_document(&original.package, self.sink.as_ref())
            .map_err(|e| DocError::Apply(e.to_string()))?;

        let replacer = Replacer::new(self.sink.as_ref(), &self.config.document.highlight);
        let report = replacer
            .apply(&mut copy, modifications)
            .map_err(|e| DocError::Apply(e.to_string()))?;

        self.sink.event(
            EventKind::ModificationsApplied,
            &[
                ("modifications", modifications.len().to_string()),
                ("paragraphs_changed", report.paragraphs_changed.to_string()),
                ("cells_changed", report.cells_changed.to_string()),
                ("failures", report.failures.to_string()),
            ],
        );

        self.modified = Some(copy);
        self.modifications = modifications.to_vec();
        self.last_report = Some(report.clone());
        self.clone_strategy = Some(strategy);
        Ok(report)
    }

    pub fn save(&mut self, output: &Path) -> Result<(), DocError> {
        let modified = self.modified.as_ref().ok_or(DocError::NoModifiedDocument)?;
        write_package(modified, output).map_err(|e| DocError::Save(e.to_string()))?;
        self.sink.event(
            EventKind::DocumentSaved,
            &[("path", output.display().to_string())],
        );
        Ok(())
    }

    /// Counts for the original document. Empty when nothing is loaded.
    pub fn info(&self) -> DocumentInfo {
        let Some(original) = &self.original else {
            return DocumentInfo {
                modifications_count: self.modifications.len(),
                ..DocumentInfo::default()
            };
        };

        let body = original.package.body();
        DocumentInfo {
            paragraph_count: body.elements().filter(|el| wordml::is_paragraph(el)).count(),
            table_count: body.elements().filter(|el| wordml::is_table(el)).count(),
            image_count: original.images.len(),
            style_count: original.styles.len(),
            modifications_count: self.modifications.len(),
        }
    }

    /// Convert a legacy file into a `.docx` under the temp area. The output is
    /// tracked and removed by [`Processor::cleanup`].
    pub fn recover_legacy(&mut self, path: &Path) -> Result<RecoveryOutput, DocError> {
        let ctx = RecoveryContext::from_config(&self.config);
        let output = self.recovery.recover(path, &ctx, self.sink.as_ref())?;
        self.temp_files.push(output.path.clone());
        Ok(output)
    }

    /// Release the image cache and delete tracked temp files. Returns the
    /// number of files removed.
    pub fn cleanup(&mut self) -> usize {
        if let Some(original) = &mut self.original {
            original.images.clear();
            original.styles.clear();
        }

        let mut removed = 0;
        for path in self.temp_files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to remove temp file"),
            }
        }

        self.sink.event(
            EventKind::TempFilesCleaned,
            &[("removed", removed.to_string())],
        );
        removed
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        if !self.temp_files.is_empty() {
            self.cleanup();
        }
    }
}
