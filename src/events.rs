//! Structured processing events
//!
//! The core never prints. Everything noteworthy is reported through an
//! injected [`EventSink`]; the default sink forwards to `tracing`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DocumentLoaded,
    TextPromoted,
    ImagesCached,
    CloneCreated,
    CloneFallback,
    DuplicateModification,
    ParagraphReplaced,
    CellReplaced,
    ReplacementFailed,
    ModificationsApplied,
    DocumentSaved,
    RecoveryAttempt,
    RecoveryStrategyFailed,
    RecoverySucceeded,
    TempFilesCleaned,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::DocumentLoaded => "document_loaded",
            EventKind::TextPromoted => "text_promoted",
            EventKind::ImagesCached => "images_cached",
            EventKind::CloneCreated => "clone_created",
            EventKind::CloneFallback => "clone_fallback",
            EventKind::DuplicateModification => "duplicate_modification",
            EventKind::ParagraphReplaced => "paragraph_replaced",
            EventKind::CellReplaced => "cell_replaced",
            EventKind::ReplacementFailed => "replacement_failed",
            EventKind::ModificationsApplied => "modifications_applied",
            EventKind::DocumentSaved => "document_saved",
            EventKind::RecoveryAttempt => "recovery_attempt",
            EventKind::RecoveryStrategyFailed => "recovery_strategy_failed",
            EventKind::RecoverySucceeded => "recovery_succeeded",
            EventKind::TempFilesCleaned => "temp_files_cleaned",
        }
    }

    fn is_warning(self) -> bool {
        matches!(
            self,
            EventKind::CloneFallback
                | EventKind::DuplicateModification
                | EventKind::ReplacementFailed
                | EventKind::RecoveryStrategyFailed
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Fields<'a> = &'a [(&'static str, String)];

pub trait EventSink: Send + Sync {
    fn event(&self, kind: EventKind, fields: Fields<'_>);
}

/// Forwards events to `tracing`; warnings for recoverable failures, debug for
/// per-paragraph chatter, info for everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, kind: EventKind, fields: Fields<'_>) {
        let rendered = fields
            .iter()
            .map(|(k, v)| format!("{k}={v:?}"))
            .collect::<Vec<_>>()
            .join(" ");

        if kind.is_warning() {
            tracing::warn!(event = kind.as_str(), "{rendered}");
        } else if matches!(kind, EventKind::ParagraphReplaced | EventKind::CellReplaced) {
            tracing::debug!(event = kind.as_str(), "{rendered}");
        } else {
            tracing::info!(event = kind.as_str(), "{rendered}");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub fields: Vec<(String, String)>,
}

impl RecordedEvent {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every event in memory, for callers that report back to a user.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn event(&self, kind: EventKind, fields: Fields<'_>) {
        self.events.lock().push(RecordedEvent {
            kind,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}

pub(crate) fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}
