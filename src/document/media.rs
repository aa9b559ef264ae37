//! Embedded media cache
//!
//! Every `word/media/*` part with a supported image extension is base64
//! encoded once at load time; content nodes only reference these entries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;

use super::models::ImageRef;
use super::package::DocxPackage;

#[derive(Debug, Clone)]
pub struct CachedImage {
    pub filename: String,
    pub base64_data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    images: Vec<CachedImage>,
}

impl ImageCache {
    pub fn from_package(package: &DocxPackage) -> Self {
        let images = package
            .media_parts()
            .filter_map(|part| {
                let filename = part.name.rsplit('/').next().unwrap_or(&part.name);
                let mime_type = supported_mime(filename)?;
                Some(CachedImage {
                    filename: filename.to_string(),
                    base64_data: STANDARD.encode(&part.data),
                    mime_type: mime_type.to_string(),
                })
            })
            .collect();
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, filename: &str) -> Option<&CachedImage> {
        self.images.iter().find(|img| img.filename == filename)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// References to the first `limit` cached images, numbered `img_0..`.
    pub fn first_refs(&self, limit: usize) -> Vec<ImageRef> {
        self.images
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, img)| ImageRef {
                filename: img.filename.clone(),
                base64_data: img.base64_data.clone(),
                mime_type: img.mime_type.clone(),
                embed_id: format!("img_{i}"),
            })
            .collect()
    }
}

/// Mime type for the image kinds the preview can show; `None` skips the file.
fn supported_mime(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ImageFormat::from_extension(ext)? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Bmp) => {
            Some(format.to_mime_type())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_common_raster_formats_are_cached() {
        assert_eq!(supported_mime("image1.png"), Some("image/png"));
        assert_eq!(supported_mime("photo.JPG"), Some("image/jpeg"));
        assert_eq!(supported_mime("anim.gif"), Some("image/gif"));
        assert_eq!(supported_mime("scan.bmp"), Some("image/bmp"));
        assert_eq!(supported_mime("vector.emf"), None);
        assert_eq!(supported_mime("noext"), None);
    }
}
