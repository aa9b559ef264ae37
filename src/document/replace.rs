//! Format-preserving find/replace
//!
//! Every body paragraph and every paragraph of a top-level table cell is
//! visited once per modification. A match inside a single run is replaced in
//! that run only; a match spanning runs collapses the paragraph's text into its
//! first run. Touched runs are always highlighted.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::models::Modification;
use super::package::{DocxPackage, PackageError};
use super::wordml::{self, CELL, PARAGRAPH, ROW};
use super::xml::{self, XmlElement};
use crate::events::{EventKind, EventSink};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplaceError {
    #[error("replacement text contains characters XML cannot store")]
    InvalidCharacters,
    #[error("run at {0:?} disappeared while editing")]
    RunMissing(Vec<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceKind {
    SingleRun,
    CrossRun,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub paragraphs_changed: usize,
    pub cells_changed: usize,
    pub single_run: usize,
    pub cross_run: usize,
    pub failures: usize,
}

impl ApplyReport {
    pub fn total_changes(&self) -> usize {
        self.single_run + self.cross_run
    }
}

#[derive(Debug, Clone, Copy)]
enum Location {
    Body {
        paragraph: usize,
    },
    Cell {
        table: usize,
        row: usize,
        cell: usize,
        paragraph: usize,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Body { paragraph } => write!(f, "paragraph {paragraph}"),
            Location::Cell {
                table,
                row,
                cell,
                paragraph,
            } => write!(f, "table {table} row {row} cell {cell} paragraph {paragraph}"),
        }
    }
}

/// Collapse the list into `original → new` pairs. Later entries overwrite
/// earlier ones with the same original text; the key keeps its first position.
pub fn build_lookup(modifications: &[Modification], sink: &dyn EventSink) -> Vec<(String, String)> {
    let mut lookup: Vec<(String, String)> = Vec::with_capacity(modifications.len());
    for m in modifications {
        match lookup.iter_mut().find(|(k, _)| *k == m.original_text) {
            Some(slot) => {
                sink.event(
                    EventKind::DuplicateModification,
                    &[
                        ("original_text", m.original_text.clone()),
                        ("discarded", slot.1.clone()),
                        ("kept", m.new_text.clone()),
                    ],
                );
                slot.1 = m.new_text.clone();
            }
            None => lookup.push((m.original_text.clone(), m.new_text.clone())),
        }
    }
    lookup
}

pub struct Replacer<'a> {
    sink: &'a dyn EventSink,
    highlight: &'a str,
}

impl<'a> Replacer<'a> {
    pub fn new(sink: &'a dyn EventSink, highlight: &'a str) -> Self {
        Self { sink, highlight }
    }

    /// Apply every modification to the package in place. Per-paragraph
    /// failures are reported through the sink and counted, never returned.
    pub fn apply(
        &self,
        package: &mut DocxPackage,
        modifications: &[Modification],
    ) -> Result<ApplyReport, PackageError> {
        let lookup = build_lookup(modifications, self.sink);
        let mut report = ApplyReport::default();

        let body = package.body_mut()?;
        let mut paragraph_index = 0;
        let mut table_index = 0;

        for element in body.elements_mut() {
            if wordml::is_paragraph(element) {
                let location = Location::Body {
                    paragraph: paragraph_index,
                };
                if self.process(element, &lookup, location, &mut report) {
                    report.paragraphs_changed += 1;
                }
                paragraph_index += 1;
            } else if wordml::is_table(element) {
                self.process_table(element, table_index, &lookup, &mut report);
                table_index += 1;
            }
        }

        Ok(report)
    }

    fn process_table(
        &self,
        table: &mut XmlElement,
        table_index: usize,
        lookup: &[(String, String)],
        report: &mut ApplyReport,
    ) {
        for (row_index, row) in table.children_named_mut(ROW).enumerate() {
            for (cell_index, cell) in row.children_named_mut(CELL).enumerate() {
                let mut cell_changed = false;
                for (p_index, paragraph) in cell.children_named_mut(PARAGRAPH).enumerate() {
                    let location = Location::Cell {
                        table: table_index,
                        row: row_index,
                        cell: cell_index,
                        paragraph: p_index,
                    };
                    cell_changed |= self.process(paragraph, lookup, location, report);
                }
                if cell_changed {
                    report.cells_changed += 1;
                }
            }
        }
    }

    /// Run every lookup pair against one paragraph; true if anything changed.
    fn process(
        &self,
        paragraph: &mut XmlElement,
        lookup: &[(String, String)],
        location: Location,
        report: &mut ApplyReport,
    ) -> bool {
        let mut changed = false;
        for (original, new) in lookup {
            match replace_in_paragraph(paragraph, original, new, self.highlight) {
                Ok(None) => {}
                Ok(Some(kind)) => {
                    changed = true;
                    match kind {
                        ReplaceKind::SingleRun => report.single_run += 1,
                        ReplaceKind::CrossRun => report.cross_run += 1,
                    }
                    let event = match location {
                        Location::Body { .. } => EventKind::ParagraphReplaced,
                        Location::Cell { .. } => EventKind::CellReplaced,
                    };
                    self.sink.event(
                        event,
                        &[
                            ("location", location.to_string()),
                            ("original_text", original.clone()),
                            ("new_text", new.clone()),
                            ("mode", format!("{kind:?}")),
                        ],
                    );
                }
                Err(err) => {
                    report.failures += 1;
                    self.sink.event(
                        EventKind::ReplacementFailed,
                        &[
                            ("location", location.to_string()),
                            ("original_text", original.clone()),
                            ("error", err.to_string()),
                        ],
                    );
                }
            }
        }
        changed
    }
}

/// Replace `original` with `new` in one paragraph.
///
/// Returns `Ok(None)` when the paragraph text does not contain `original`.
pub fn replace_in_paragraph(
    paragraph: &mut XmlElement,
    original: &str,
    new: &str,
    highlight: &str,
) -> Result<Option<ReplaceKind>, ReplaceError> {
    let full_text = wordml::paragraph_text(paragraph);
    if !full_text.contains(original) {
        return Ok(None);
    }
    if !xml::is_xml_safe(new) {
        return Err(ReplaceError::InvalidCharacters);
    }

    let paths = wordml::run_paths(paragraph);

    for path in &paths {
        let run = paragraph
            .at_path_mut(path)
            .ok_or_else(|| ReplaceError::RunMissing(path.clone()))?;
        let run_text = wordml::run_text(run);
        if run_text.contains(original) {
            wordml::set_run_text(run, &run_text.replace(original, new));
            wordml::set_highlight(run, highlight);
            return Ok(Some(ReplaceKind::SingleRun));
        }
    }

    // The match spans run boundaries: the whole new text goes to the first run.
    let replaced = full_text.replace(original, new);
    for path in paths.iter().skip(1) {
        let run = paragraph
            .at_path_mut(path)
            .ok_or_else(|| ReplaceError::RunMissing(path.clone()))?;
        wordml::set_run_text(run, "");
    }

    match paths.first() {
        Some(path) => {
            let run = paragraph
                .at_path_mut(path)
                .ok_or_else(|| ReplaceError::RunMissing(path.clone()))?;
            wordml::set_run_text(run, &replaced);
            wordml::set_highlight(run, highlight);
        }
        None => {
            let mut run = wordml::new_run();
            wordml::set_run_text(&mut run, &replaced);
            wordml::set_highlight(&mut run, highlight);
            paragraph.push(run);
        }
    }

    Ok(Some(ReplaceKind::CrossRun))
}
