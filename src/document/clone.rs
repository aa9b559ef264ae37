//! Working-copy creation
//!
//! The preferred copy is a full round trip through the zip container, which
//! preserves every part. If that fails, the document is rebuilt element by
//! element inside an empty generated package. The rebuilt copy has the same
//! text, but formatting can drift because styles are matched by name.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::builder;
use super::package::{CONTENT_TYPES_PART, CORE_PROPS_PART, DocxPackage, PackageError, STYLES_PART};
use super::xml::{XmlDocument, XmlElement, XmlNode};
use crate::events::{EventKind, EventSink};

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CORE_FIELDS: &[&str] = &[
    "dc:title",
    "dc:subject",
    "dc:creator",
    "dc:description",
    "cp:keywords",
    "cp:category",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStrategy {
    RoundTrip,
    Rebuild,
}

/// Copy `original`, falling back to a rebuild if the round trip fails.
pub fn clone_document(
    original: &DocxPackage,
    sink: &dyn EventSink,
) -> Result<(DocxPackage, CloneStrategy), PackageError> {
    match round_trip(original) {
        Ok(copy) => {
            sink.event(
                EventKind::CloneCreated,
                &[("strategy", "round_trip".to_string())],
            );
            Ok((copy, CloneStrategy::RoundTrip))
        }
        Err(err) => {
            sink.event(EventKind::CloneFallback, &[("error", err.to_string())]);
            let copy = rebuild(original)?;
            sink.event(
                EventKind::CloneCreated,
                &[("strategy", "rebuild".to_string())],
            );
            Ok((copy, CloneStrategy::Rebuild))
        }
    }
}

pub fn round_trip(original: &DocxPackage) -> Result<DocxPackage, PackageError> {
    let bytes = original.to_bytes()?;
    DocxPackage::from_bytes(&bytes)
}

/// Rebuild `original` inside a freshly generated empty package.
pub fn rebuild(original: &DocxPackage) -> Result<DocxPackage, PackageError> {
    let mut copy = DocxPackage::from_bytes(&builder::blank_document()?)?;

    copy_core_properties(original, &mut copy)?;
    copy_namespaces(original, &mut copy);
    let copied_parts = copy_relationships(original, &mut copy)?;
    copy_content_types(original, &mut copy, &copied_parts.parts)?;
    copy_styles(original, &mut copy)?;
    copy_body(original, &mut copy, &copied_parts.id_map)?;

    Ok(copy)
}

fn copy_core_properties(original: &DocxPackage, copy: &mut DocxPackage) -> Result<(), PackageError> {
    let Some(source) = original.xml_part(CORE_PROPS_PART)? else {
        return Ok(());
    };
    let Some(mut target) = copy.xml_part(CORE_PROPS_PART)? else {
        copy.set_xml_part(CORE_PROPS_PART, &source)?;
        return Ok(());
    };

    for field in CORE_FIELDS {
        let Some(value) = source.root.child(field).map(XmlElement::text) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match target.root.child_mut(field) {
            Some(el) => el.set_text(value),
            None => {
                let mut el = XmlElement::new(*field);
                el.set_text(value);
                target.root.push(el);
            }
        }
    }
    copy.set_xml_part(CORE_PROPS_PART, &target)
}

/// Namespace declarations the copied body may rely on.
fn copy_namespaces(original: &DocxPackage, copy: &mut DocxPackage) {
    let source = &original.document().root;
    let target = &mut copy.document_mut().root;
    for (key, value) in &source.attributes {
        let relevant = key.starts_with("xmlns:") || key == "mc:Ignorable";
        if relevant && target.attr(key).is_none() {
            target.set_attr(key.clone(), value.clone());
        }
    }
}

struct CopiedParts {
    /// Relationship id in the original → id in the copy.
    id_map: HashMap<String, String>,
    parts: Vec<String>,
}

fn copy_relationships(
    original: &DocxPackage,
    copy: &mut DocxPackage,
) -> Result<CopiedParts, PackageError> {
    let mut copied = CopiedParts {
        id_map: HashMap::new(),
        parts: Vec::new(),
    };

    let source_rels_name = DocxPackage::rels_part_name(original.main_part_name());
    let Some(source_rels) = original.xml_part(&source_rels_name)? else {
        return Ok(copied);
    };

    let target_rels_name = DocxPackage::rels_part_name(copy.main_part_name());
    let mut target_rels = copy.xml_part(&target_rels_name)?.unwrap_or_else(|| XmlDocument {
        declaration: Some(r#"xml version="1.0" encoding="UTF-8" standalone="yes""#.to_string()),
        root: XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS),
    });

    let existing_types: HashSet<String> = target_rels
        .root
        .children_named("Relationship")
        .filter_map(|rel| rel.attr("Type").map(str::to_string))
        .collect();
    let mut used_ids: HashSet<String> = target_rels
        .root
        .children_named("Relationship")
        .filter_map(|rel| rel.attr("Id").map(str::to_string))
        .collect();

    let base_dir = part_dir(original.main_part_name());
    let mut visited = HashSet::new();

    for rel in source_rels.root.children_named("Relationship") {
        let (Some(id), Some(kind), Some(target)) = (rel.attr("Id"), rel.attr("Type"), rel.attr("Target"))
        else {
            continue;
        };
        // Parts the generated package already provides (styles, settings, fonts...).
        if existing_types.contains(kind) {
            continue;
        }

        let new_id = unique_id(id, &mut used_ids);
        copied.id_map.insert(id.to_string(), new_id.clone());

        let mut new_rel = rel.clone();
        new_rel.set_attr("Id", new_id);
        target_rels.root.push(new_rel);

        if rel.attr("TargetMode") != Some("External") {
            let part = resolve_target(&base_dir, target);
            copy_part_tree(original, copy, &part, &mut visited, &mut copied.parts);
        }
    }

    copy.set_xml_part(&target_rels_name, &target_rels)?;
    Ok(copied)
}

/// Copy a part plus its own relationship file and everything that file points to.
fn copy_part_tree(
    original: &DocxPackage,
    copy: &mut DocxPackage,
    part: &str,
    visited: &mut HashSet<String>,
    copied: &mut Vec<String>,
) {
    if !visited.insert(part.to_string()) {
        return;
    }
    let Some(data) = original.part(part) else {
        return;
    };
    if !copy.has_part(part) {
        copy.set_part(part, data.to_vec());
        copied.push(part.to_string());
    }

    let rels_name = DocxPackage::rels_part_name(part);
    let Some(rels_data) = original.part(&rels_name) else {
        return;
    };
    copy.set_part(&rels_name, rels_data.to_vec());

    let Ok(Some(rels)) = original.xml_part(&rels_name) else {
        return;
    };
    let dir = part_dir(part);
    for rel in rels.root.children_named("Relationship") {
        if rel.attr("TargetMode") == Some("External") {
            continue;
        }
        if let Some(target) = rel.attr("Target") {
            let child = resolve_target(&dir, target);
            copy_part_tree(original, copy, &child, visited, copied);
        }
    }
}

fn copy_content_types(
    original: &DocxPackage,
    copy: &mut DocxPackage,
    copied_parts: &[String],
) -> Result<(), PackageError> {
    let (Some(source), Some(mut target)) = (
        original.xml_part(CONTENT_TYPES_PART)?,
        copy.xml_part(CONTENT_TYPES_PART)?,
    ) else {
        return Ok(());
    };

    let known_defaults: HashSet<String> = target
        .root
        .children_named("Default")
        .filter_map(|d| d.attr("Extension").map(str::to_ascii_lowercase))
        .collect();
    let known_overrides: HashSet<String> = target
        .root
        .children_named("Override")
        .filter_map(|o| o.attr("PartName").map(str::to_string))
        .collect();

    let mut additions = Vec::new();
    for entry in source.root.elements() {
        match entry.name.as_str() {
            "Default" => {
                let ext = entry.attr("Extension").map(str::to_ascii_lowercase);
                if ext.is_some_and(|e| !known_defaults.contains(&e)) {
                    additions.push(entry.clone());
                }
            }
            "Override" => {
                let Some(name) = entry.attr("PartName") else {
                    continue;
                };
                let part = name.trim_start_matches('/');
                if copied_parts.iter().any(|p| p == part) && !known_overrides.contains(name) {
                    additions.push(entry.clone());
                }
            }
            _ => {}
        }
    }

    // Defaults must precede overrides.
    for entry in additions {
        if entry.name == "Default" {
            let at = target
                .root
                .children
                .iter()
                .position(|n| matches!(n, XmlNode::Element(el) if el.name == "Override"))
                .unwrap_or(target.root.children.len());
            target.root.children.insert(at, XmlNode::Element(entry));
        } else {
            target.root.push(entry);
        }
    }

    copy.set_xml_part(CONTENT_TYPES_PART, &target)
}

/// Add every original style whose display name the copy lacks.
fn copy_styles(original: &DocxPackage, copy: &mut DocxPackage) -> Result<(), PackageError> {
    let Some(source) = original.xml_part(STYLES_PART)? else {
        return Ok(());
    };
    let Some(mut target) = copy.xml_part(STYLES_PART)? else {
        copy.set_xml_part(STYLES_PART, &source)?;
        return Ok(());
    };

    let mut names: HashSet<String> = target
        .root
        .children_named("w:style")
        .filter_map(style_name)
        .collect();

    for style in source.root.children_named("w:style") {
        let Some(name) = style_name(style) else {
            continue;
        };
        if names.insert(name) {
            target.root.push(style.clone());
        }
    }

    copy.set_xml_part(STYLES_PART, &target)
}

fn style_name(style: &XmlElement) -> Option<String> {
    style
        .child("w:name")
        .and_then(|n| n.attr("w:val"))
        .or_else(|| style.attr("w:styleId"))
        .map(str::to_string)
}

fn copy_body(
    original: &DocxPackage,
    copy: &mut DocxPackage,
    id_map: &HashMap<String, String>,
) -> Result<(), PackageError> {
    let source = original.body().clone();
    let body = copy.body_mut()?;
    body.children.clear();

    for node in source.children {
        if let XmlNode::Element(mut element) = node {
            remap_relationship_ids(&mut element, id_map);
            body.children.push(XmlNode::Element(element));
        }
    }
    Ok(())
}

fn remap_relationship_ids(element: &mut XmlElement, id_map: &HashMap<String, String>) {
    for (key, value) in element.attributes.iter_mut() {
        if key.starts_with("r:") {
            if let Some(new_id) = id_map.get(value.as_str()) {
                *value = new_id.clone();
            }
        }
    }
    for child in element.elements_mut() {
        remap_relationship_ids(child, id_map);
    }
}

fn unique_id(preferred: &str, used: &mut HashSet<String>) -> String {
    if used.insert(preferred.to_string()) {
        return preferred.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("rIdCopy{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn part_dir(part: &str) -> String {
    part.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_resolve_relative_to_the_source_part() {
        assert_eq!(resolve_target("word", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("word", "/word/header1.xml"), "word/header1.xml");
    }

    #[test]
    fn clashing_ids_get_fresh_names() {
        let mut used: HashSet<String> = ["rId1".to_string()].into_iter().collect();
        assert_eq!(unique_id("rId7", &mut used), "rId7");
        assert_eq!(unique_id("rId1", &mut used), "rIdCopy1");
        assert_eq!(unique_id("rId1", &mut used), "rIdCopy2");
    }
}
