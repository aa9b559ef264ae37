//! Boundary errors and message keys
//!
//! Every processor operation reports a [`MessageKey`] that a front end maps to
//! a localized string; the core never renders user-facing text itself.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::document::LoadError;
use crate::recovery::RecoveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    UploadSuccess,
    UploadFailed,
    InvalidFileFormat,
    ModificationsApplied,
    ProcessingFailed,
    NoModifications,
    NoDocument,
    DownloadStarted,
    FileNotFound,
    DocConversionFailed,
    DocConversionSuccess,
    CleanupCompleted,
}

impl MessageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::UploadSuccess => "upload_success",
            MessageKey::UploadFailed => "upload_failed",
            MessageKey::InvalidFileFormat => "invalid_file_format",
            MessageKey::ModificationsApplied => "modifications_applied",
            MessageKey::ProcessingFailed => "processing_failed",
            MessageKey::NoModifications => "no_modifications",
            MessageKey::NoDocument => "no_document",
            MessageKey::DownloadStarted => "download_started",
            MessageKey::FileNotFound => "file_not_found",
            MessageKey::DocConversionFailed => "doc_conversion_failed",
            MessageKey::DocConversionSuccess => "doc_conversion_success",
            MessageKey::CleanupCompleted => "cleanup_completed",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DocError {
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),
    #[error("failed to load document: {0}")]
    Load(String),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error("failed to copy document for editing: {0}")]
    Apply(String),
    #[error("failed to save document: {0}")]
    Save(String),
    #[error("no modifications provided")]
    NoModifications,
    #[error("no document loaded")]
    NoDocument,
    #[error("no modified document available")]
    NoModifiedDocument,
}

impl DocError {
    pub fn message_key(&self) -> MessageKey {
        match self {
            DocError::UnsupportedFormat(_) => MessageKey::InvalidFileFormat,
            DocError::Load(_) => MessageKey::UploadFailed,
            DocError::Recovery(_) => MessageKey::DocConversionFailed,
            DocError::Apply(_) => MessageKey::ProcessingFailed,
            DocError::Save(_) => MessageKey::ProcessingFailed,
            DocError::NoModifications => MessageKey::NoModifications,
            DocError::NoDocument => MessageKey::NoDocument,
            DocError::NoModifiedDocument => MessageKey::FileNotFound,
        }
    }
}

impl From<LoadError> for DocError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::UnsupportedFormat(ext) => DocError::UnsupportedFormat(ext),
            other => DocError::Load(other.to_string()),
        }
    }
}

/// Uniform result of a boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: MessageKey,
    /// Technical detail for failures (and occasional context on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Outcome {
    pub fn ok(message: MessageKey) -> Self {
        Self {
            success: true,
            message,
            detail: None,
        }
    }

    pub fn ok_with(message: MessageKey, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            message,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(err: &DocError) -> Self {
        Self {
            success: false,
            message: err.message_key(),
            detail: Some(err.to_string()),
        }
    }
}
