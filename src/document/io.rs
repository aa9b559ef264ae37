//! File I/O operations and validation
//!
//! Extension sniffing, size-limited reads and output writing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use super::package::{DocxPackage, PackageError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format: .{0} (expected .docx or .txt)")]
    UnsupportedFormat(String),
    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid .docx file: {0}")]
    Package(#[from] PackageError),
    #[error("text file could not be decoded")]
    Undecodable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Docx,
    Txt,
}

pub fn source_format(path: &Path) -> Result<SourceFormat, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "docx" => Ok(SourceFormat::Docx),
        "txt" => Ok(SourceFormat::Txt),
        _ => Err(LoadError::UnsupportedFormat(extension)),
    }
}

/// Read a whole file, refusing anything over `limit` bytes.
pub(crate) fn read_limited(path: &Path, limit: u64) -> Result<Vec<u8>, LoadError> {
    let size = std::fs::metadata(path)?.len();
    if size > limit {
        return Err(LoadError::TooLarge { size, limit });
    }
    let mut data = Vec::with_capacity(size as usize);
    File::open(path)?.read_to_end(&mut data)?;
    Ok(data)
}

/// Validates that the bytes form a Word package with a main document part.
pub(crate) fn validate_docx_bytes(data: &[u8]) -> Result<DocxPackage, LoadError> {
    DocxPackage::from_bytes(data).map_err(LoadError::Package)
}

/// Write a package to `path`, creating parent directories as needed.
pub(crate) fn write_package(package: &DocxPackage, path: &Path) -> Result<(), PackageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    package.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(
            source_format(Path::new("Report.DOCX")).ok(),
            Some(SourceFormat::Docx)
        );
        assert_eq!(source_format(Path::new("notes.txt")).ok(), Some(SourceFormat::Txt));
        assert!(matches!(
            source_format(Path::new("legacy.doc")),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "doc"
        ));
        assert!(matches!(
            source_format(Path::new("no_extension")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }
}
