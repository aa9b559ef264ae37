//! Document model and modification engine
//!
//! This module opens Word packages, extracts a formatted content tree,
//! copies documents and applies format-preserving replacements.

pub mod builder;
pub mod clone;
pub mod extract;
pub mod io;
pub mod loader;
pub mod media;
pub mod models;
pub mod package;
pub mod replace;
pub mod wordml;
pub mod xml;

// Re-export the types most callers need
pub use clone::{CloneStrategy, clone_document};
pub use extract::{ExtractOptions, extract_content};
pub use io::{LoadError, SourceFormat};
pub use loader::{LoadOptions, LoadedDocument, load_document};
pub use media::ImageCache;
pub use models::*;
pub use package::{DocxPackage, PackageError};
pub use replace::{ApplyReport, ReplaceError, ReplaceKind, Replacer};
