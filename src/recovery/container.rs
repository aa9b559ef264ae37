//! Misnamed package detection for files that carry a legacy extension

use std::path::Path;

use super::{Recovered, RecoveryContext, RecoveryStrategy, StrategyError};
use crate::document::package::looks_like_docx;

/// A `.doc` that is really a zip-based Word package with the wrong extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerSniff;

impl RecoveryStrategy for ContainerSniff {
    fn name(&self) -> &'static str {
        "container_sniff"
    }

    fn attempt(&self, path: &Path, _ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        let bytes = std::fs::read(path)?;
        if !looks_like_docx(&bytes) {
            return Err(StrategyError::NotApplicable("not a zip-based Word package"));
        }
        Ok(Recovered::package("misnamed .docx", bytes))
    }
}
