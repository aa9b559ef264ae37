mod common;

use redliner::document::{
    CloneStrategy, ContentNode, DocxPackage, ExtractOptions, ImageCache, Modification, Replacer,
    clone::{rebuild, round_trip},
    clone_document, extract_content,
};
use redliner::{EventKind, MemorySink};

use common::{docx_with_media, paragraph, picture_paragraph, run, styled_run, table};

fn fixture() -> DocxPackage {
    let body = format!(
        "{}{}{}{}",
        paragraph(&[styled_run("<w:b/>", "Contract "), run("terms")]),
        table(&[&["left", "right"]]),
        picture_paragraph(),
        paragraph(&[run("Signed by the party")])
    );
    let bytes = docx_with_media(&body, &[("image1.png", &[7u8, 7, 7][..])]).expect("fixture");
    DocxPackage::from_bytes(&bytes).expect("package")
}

fn texts(package: &DocxPackage) -> Vec<String> {
    let images = ImageCache::from_package(package);
    extract_content(package, &images, &ExtractOptions::default())
        .into_iter()
        .map(|node| match node {
            ContentNode::Paragraph(p) => p.text,
            ContentNode::Table(t) => t
                .rows
                .iter()
                .flat_map(|row| row.iter().map(|cell| cell.text.clone()))
                .collect::<Vec<_>>()
                .join("|"),
        })
        .collect()
}

#[cfg(test)]
mod clone_tests {
    use super::*;

    #[test]
    fn test_round_trip_clone_is_structurally_identical() {
        let original = fixture();
        let sink = MemorySink::new();
        let (copy, strategy) = clone_document(&original, sink.as_ref()).expect("clone");

        assert_eq!(strategy, CloneStrategy::RoundTrip);
        assert_eq!(copy.body(), original.body(), "body tree must survive the round trip");
        assert_eq!(copy.parts().len(), original.parts().len());
        assert_eq!(
            copy.part("word/media/image1.png"),
            original.part("word/media/image1.png")
        );
        assert_eq!(sink.of_kind(EventKind::CloneCreated).len(), 1);
        assert!(sink.of_kind(EventKind::CloneFallback).is_empty());
    }

    #[test]
    fn test_editing_the_clone_leaves_the_original_alone() {
        let original = fixture();
        let before = texts(&original);

        let mut copy = round_trip(&original).expect("clone");
        let sink = MemorySink::new();
        Replacer::new(sink.as_ref(), "yellow")
            .apply(&mut copy, &[Modification::new("terms", "conditions")])
            .expect("apply");

        assert_eq!(texts(&original), before);
        assert_eq!(texts(&copy)[0], "Contract conditions");
    }

    #[test]
    fn test_rebuild_keeps_text_identical() {
        let original = fixture();
        let copy = rebuild(&original).expect("rebuild");
        assert_eq!(texts(&copy), texts(&original));
    }

    #[test]
    fn test_rebuild_carries_media_and_relationships() {
        let original = fixture();
        let copy = rebuild(&original).expect("rebuild");

        assert!(
            copy.media_parts().any(|part| part.data == [7u8, 7, 7]),
            "media bytes should be copied"
        );
        assert_eq!(ImageCache::from_package(&copy).len(), 1);

        let blip = copy
            .body()
            .descendants()
            .into_iter()
            .find(|el| el.name == "a:blip")
            .expect("picture survives");
        let embed = blip.attr("r:embed").expect("embed id");

        let rels_name = DocxPackage::rels_part_name(copy.main_part_name());
        let rels = copy.xml_part(&rels_name).expect("rels").expect("rels part");
        let target = rels
            .root
            .elements()
            .find(|rel| rel.attr("Id") == Some(embed))
            .and_then(|rel| rel.attr("Target"))
            .expect("embed id resolves in the copy");
        assert!(target.ends_with("image1.png"), "{target}");
    }

    #[test]
    fn test_rebuild_keeps_style_names_used_by_the_body() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Heading</w:t></w:r></w:p>"#;
        let bytes = common::docx_bytes(body).expect("fixture");
        let original = DocxPackage::from_bytes(&bytes).expect("package");

        let copy = rebuild(&original).expect("rebuild");
        let names = copy.style_names();
        assert!(
            names.values().any(|name| name == "heading 1"),
            "heading style should be carried over: {names:?}"
        );
        assert_eq!(texts(&copy), ["Heading"]);
    }
}
