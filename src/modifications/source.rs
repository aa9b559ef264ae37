use std::path::PathBuf;
use std::time::Duration;

use super::ParseError;

/// Where a modification list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationSource {
    Inline(String),
    File(PathBuf),
    Url(String),
}

impl ModificationSource {
    /// `http(s)://` → URL, an existing path → file, anything else → inline text.
    pub fn detect(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return ModificationSource::Url(trimmed.to_string());
        }
        let path = PathBuf::from(trimmed);
        if path.is_file() {
            return ModificationSource::File(path);
        }
        ModificationSource::Inline(value.to_string())
    }
}

/// Raw bytes of the source. URL fetches fail after `timeout`.
pub fn fetch_source(source: &ModificationSource, timeout: Duration) -> Result<Vec<u8>, ParseError> {
    match source {
        ModificationSource::Inline(text) => Ok(text.as_bytes().to_vec()),
        ModificationSource::File(path) => std::fs::read(path)
            .map_err(|e| ParseError::Source(format!("{}: {e}", path.display()))),
        ModificationSource::Url(url) => fetch_url(url, timeout),
    }
}

fn fetch_url(url: &str, timeout: Duration) -> Result<Vec<u8>, ParseError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ParseError::Source(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ParseError::Source(format!("{url}: {e}")))?;

    let bytes = response
        .bytes()
        .map_err(|e| ParseError::Source(format!("{url}: {e}")))?;
    Ok(bytes.to_vec())
}
