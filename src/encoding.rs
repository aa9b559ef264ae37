//! Byte-to-text decoding with fixed encoding priority lists

use encoding_rs::Encoding;

/// Plain text files: Unicode first, then the Chinese code pages, then Western.
pub const TEXT_FILE_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb18030", "windows-1252"];

/// Modification lists (CSV / JSON uploads).
pub const MODIFICATION_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb18030", "utf-16le", "windows-1252"];

/// Decode `bytes` strictly with a single encoding label. A matching byte order
/// mark is skipped; malformed input yields `None`.
pub fn decode_strict(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.as_bytes())?;
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

/// Decode with the first encoding in `labels` that accepts the input. A byte
/// order mark, when present, wins over the list.
pub fn decode_with_priority(bytes: &[u8], labels: &[&str]) -> Option<(String, &'static str)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) =
            encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        {
            return Some((text.into_owned(), encoding.name()));
        }
    }
    labels.iter().find_map(|label| {
        let encoding = Encoding::for_label(label.as_bytes())?;
        decode_strict(bytes, label).map(|text| (text, encoding.name()))
    })
}

/// Like [`decode_with_priority`] but never fails; the last resort is lossy UTF-8.
pub fn decode_lossy(bytes: &[u8], labels: &[&str]) -> String {
    decode_with_priority(bytes, labels)
        .map(|(text, _)| text)
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_wins_when_valid() {
        let (text, name) = decode_with_priority("原文,新文本".as_bytes(), MODIFICATION_ENCODINGS)
            .expect("decodes");
        assert_eq!(text, "原文,新文本");
        assert_eq!(name, "UTF-8");
    }

    #[test]
    fn gbk_is_tried_after_utf8() {
        let (bytes, _, _) = encoding_rs::GBK.encode("修改原因");
        let (text, name) = decode_with_priority(&bytes, MODIFICATION_ENCODINGS).expect("decodes");
        assert_eq!(text, "修改原因");
        assert_eq!(name, "GBK");
    }

    #[test]
    fn utf16_bom_is_honoured() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "abc".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, name) = decode_with_priority(&bytes, MODIFICATION_ENCODINGS).expect("decodes");
        assert_eq!(text, "abc");
        assert_eq!(name, "UTF-16LE");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFhello";
        assert_eq!(decode_strict(bytes, "utf-8").as_deref(), Some("hello"));
    }
}
