//! redliner: format-preserving find/replace for .docx files
//!
//! This library loads Word documents (or plain text promoted to Word),
//! extracts a formatted content tree for previews, applies lists of text
//! modifications to a copy without losing run formatting, and recovers
//! text from legacy `.doc` files.

pub mod config;
pub mod document;
pub mod encoding;
pub mod error;
pub mod events;
pub mod modifications;
pub mod processor;
pub mod recovery;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use document::{
    ApplyReport, ContentNode, DocumentInfo, DocumentSide, DocxPackage, Modification,
};
pub use error::{DocError, MessageKey, Outcome};
pub use events::{EventKind, EventSink, MemorySink, TracingSink};
pub use modifications::{ModificationSource, ParseError, ParserChain};
pub use processor::Processor;
pub use recovery::{RecoveryChain, RecoveryError, RecoveryStrategy};
pub use store::{DocumentStore, MemoryStore, new_document_id};
