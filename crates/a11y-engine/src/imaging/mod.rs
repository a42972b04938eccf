//! Image source resolution and loading
//!
//! Markdown cells reference images as notebook attachments, absolute URLs,
//! `data:` URIs or paths relative to the notebook. Resolution is pure; the
//! actual decoding happens behind the `ImageLoader` seam so a headless or
//! browser-backed implementation can be swapped in.

pub mod ocr;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use image::RgbaImage;
use shared_types::Cell;
use url::Url;

use crate::error::{EngineError, Result};

pub use ocr::{recognize_once, BoundingBox, OcrEngine, OcrOutput, OcrWorker, PageSegMode, TextBlock};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractOcr;

/// Where an image's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64 payload embedded in the notebook
    Attachment {
        id: String,
        mime: String,
        data: String,
    },
    /// `data:` URI
    DataUri(String),
    /// http(s) URL
    Remote(String),
    Local(PathBuf),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Attachment { id, .. } => format!("attachment:{}", id),
            ImageSource::DataUri(_) => "data URI".to_string(),
            ImageSource::Remote(url) => url.clone(),
            ImageSource::Local(path) => path.display().to_string(),
        }
    }
}

/// Resolve an image URL found in `cell` to a loadable source
pub fn resolve_image_source(url: &str, cell: &Cell, base_path: Option<&Path>) -> Result<ImageSource> {
    let url = url.trim();
    if url.is_empty() {
        return Err(EngineError::ImageUnavailable("empty image URL".to_string()));
    }

    if let Some(id) = url.strip_prefix("attachment:") {
        let (mime, data) = cell
            .attachment_image(id)
            .ok_or_else(|| EngineError::AttachmentNotFound(id.to_string()))?;
        return Ok(ImageSource::Attachment {
            id: id.to_string(),
            mime: mime.to_string(),
            data: data.to_string(),
        });
    }

    if let Ok(parsed) = Url::parse(url) {
        match parsed.scheme() {
            "http" | "https" => return Ok(ImageSource::Remote(url.to_string())),
            "data" => return Ok(ImageSource::DataUri(url.to_string())),
            "file" => {
                return parsed
                    .to_file_path()
                    .map(ImageSource::Local)
                    .map_err(|_| EngineError::ImageUnavailable(url.to_string()))
            }
            // a Windows drive letter parses as a one-letter scheme
            scheme if scheme.len() > 1 => {
                return Err(EngineError::ImageUnavailable(format!(
                    "unsupported URL scheme '{}'",
                    scheme
                )))
            }
            _ => {}
        }
    }

    let path = Path::new(url);
    if path.is_absolute() {
        return Ok(ImageSource::Local(path.to_path_buf()));
    }
    let resolved = match base_path {
        Some(base) => base.join(path),
        None => path.to_path_buf(),
    };
    Ok(ImageSource::Local(resolved))
}

/// Decodes an image source into an RGBA pixel buffer
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, source: &ImageSource) -> Result<RgbaImage>;
}

/// Loader for headless use: attachments, data URIs, local files and
/// (with the `remote-images` feature) http(s) URLs
#[derive(Debug, Clone, Default)]
pub struct DefaultImageLoader {
    #[cfg(feature = "remote-images")]
    client: reqwest::Client,
}

impl DefaultImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_bytes(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Attachment { data, .. } => decode_base64(data),
            ImageSource::DataUri(uri) => decode_data_uri(uri),
            ImageSource::Local(path) => Ok(tokio::fs::read(path).await.map_err(|e| {
                EngineError::ImageUnavailable(format!("{}: {}", path.display(), e))
            })?),
            ImageSource::Remote(url) => self.fetch_remote(url).await,
        }
    }

    #[cfg(feature = "remote-images")]
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::ImageUnavailable(format!("{}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::ImageUnavailable(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "remote-images"))]
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        Err(EngineError::ImageUnavailable(format!(
            "remote images disabled, cannot fetch {}",
            url
        )))
    }
}

#[async_trait]
impl ImageLoader for DefaultImageLoader {
    async fn load(&self, source: &ImageSource) -> Result<RgbaImage> {
        let bytes = self.fetch_bytes(source).await?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Notebook writers wrap long base64 payloads, so whitespace is dropped first
fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EngineError::ImageDecode("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| EngineError::ImageDecode("data URI has no payload".to_string()))?;
    if header.ends_with(";base64") {
        decode_base64(payload)
    } else {
        Err(EngineError::ImageDecode(
            "only base64 data URIs carry raster images".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use base64::Engine;
    use image::{ImageFormat, Rgba, RgbaImage};

    /// A `width` x `height` image filled with `color`
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    pub fn png_base64(img: &RgbaImage) -> String {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::Attachments;
    use std::collections::BTreeMap;

    fn cell_with_attachment(id: &str, mime: &str, data: &str) -> Cell {
        let mut payloads = BTreeMap::new();
        payloads.insert(mime.to_string(), data.to_string());
        let mut attachments = Attachments::new();
        attachments.insert(id.to_string(), payloads);
        Cell::markdown(0, format!("![x](attachment:{})", id)).with_attachments(attachments)
    }

    #[test]
    fn test_resolve_attachment() {
        let cell = cell_with_attachment("fig.png", "image/png", "AAAA");
        let source = resolve_image_source("attachment:fig.png", &cell, None).unwrap();
        assert_eq!(
            source,
            ImageSource::Attachment {
                id: "fig.png".to_string(),
                mime: "image/png".to_string(),
                data: "AAAA".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_missing_attachment() {
        let cell = cell_with_attachment("fig.png", "text/plain", "AAAA");
        let err = resolve_image_source("attachment:fig.png", &cell, None).unwrap_err();
        assert!(matches!(err, EngineError::AttachmentNotFound(id) if id == "fig.png"));
    }

    #[test]
    fn test_resolve_urls_and_paths() {
        let cell = Cell::markdown(0, "");
        let base = Path::new("/notebooks/project");
        assert_eq!(
            resolve_image_source("https://example.com/a.png", &cell, Some(base)).unwrap(),
            ImageSource::Remote("https://example.com/a.png".to_string())
        );
        assert_eq!(
            resolve_image_source("img/a.png", &cell, Some(base)).unwrap(),
            ImageSource::Local(PathBuf::from("/notebooks/project/img/a.png"))
        );
        assert_eq!(
            resolve_image_source("/abs/a.png", &cell, Some(base)).unwrap(),
            ImageSource::Local(PathBuf::from("/abs/a.png"))
        );
        assert!(matches!(
            resolve_image_source("data:image/png;base64,AAAA", &cell, None).unwrap(),
            ImageSource::DataUri(_)
        ));
        assert!(resolve_image_source("ftp://example.com/a.png", &cell, None).is_err());
        assert!(resolve_image_source("   ", &cell, None).is_err());
    }

    #[tokio::test]
    async fn test_default_loader_decodes_attachment() {
        let img = test_support::solid(3, 2, [10, 20, 30, 255]);
        let encoded = test_support::png_base64(&img);
        // wrapped the way nbformat writers do
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        let source = ImageSource::Attachment {
            id: "a.png".to_string(),
            mime: "image/png".to_string(),
            data: wrapped,
        };
        let loaded = DefaultImageLoader::new().load(&source).await.unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn test_default_loader_decodes_data_uri() {
        let img = test_support::solid(1, 1, [255, 255, 255, 255]);
        let uri = format!("data:image/png;base64,{}", test_support::png_base64(&img));
        let loaded = DefaultImageLoader::new()
            .load(&ImageSource::DataUri(uri))
            .await
            .unwrap();
        assert_eq!(loaded.dimensions(), (1, 1));
    }

    #[tokio::test]
    async fn test_default_loader_reports_missing_file() {
        let err = DefaultImageLoader::new()
            .load(&ImageSource::Local(PathBuf::from("/definitely/not/here.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ImageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_default_loader_rejects_garbage() {
        let source = ImageSource::Attachment {
            id: "bad".to_string(),
            mime: "image/png".to_string(),
            data: "bm90IGFuIGltYWdl".to_string(),
        };
        let err = DefaultImageLoader::new().load(&source).await.unwrap_err();
        assert!(matches!(err, EngineError::ImageDecode(_)));
    }
}
