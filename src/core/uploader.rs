use crate::core::geometry;
use crate::core::render::{self, encode_png};
use crate::core::rules::{slugify, ListingRules};
use crate::domain::model::{FitMode, Size, Variant};
use crate::domain::ports::ObjectStore;
use crate::utils::error::Result;
use futures::stream::{self, StreamExt};
use image::Rgba;
use std::collections::HashMap;
use std::path::Path;

/// One distinct rendition of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKey {
    Original,
    Fitted { area: Size, mode: FitMode },
}

impl RenderKey {
    pub fn for_placeholder(area: Option<Size>, mode: FitMode) -> Self {
        match area {
            Some(area) if mode != FitMode::Original => RenderKey::Fitted { area, mode },
            _ => RenderKey::Original,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceImage {
    pub index: usize,
    pub path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub key: RenderKey,
    pub object_path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct UploadResult {
    pub key: RenderKey,
    pub url: Result<String>,
}

/// Renditions needed to fill every included placeholder, in first-seen order.
pub fn required_renders(
    variants: &[&Variant],
    rules: &ListingRules,
    default_mode: FitMode,
) -> Vec<RenderKey> {
    let mut keys = Vec::new();
    for variant in variants {
        for placeholder in &variant.placeholders {
            if !rules.includes_placeholder(&placeholder.name) {
                continue;
            }
            let mode = rules.fit_for(&placeholder.name, default_mode);
            let key = RenderKey::for_placeholder(placeholder.print_area(), mode);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Decode once and produce every rendition. CPU bound; run off the async workers.
pub fn prepare_image(
    source: &SourceImage,
    keys: &[RenderKey],
    background: Rgba<u8>,
    batch_id: &str,
) -> Result<Vec<RenderedFile>> {
    let file_path = Path::new(&source.path);
    let stem = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let prefix = format!("{}/{:03}-{}", batch_id, source.index + 1, slugify(stem));

    let needs_decode = keys.iter().any(|k| matches!(k, RenderKey::Fitted { .. }));
    let decoded = if needs_decode {
        Some(image::load_from_memory(&source.bytes)?)
    } else {
        None
    };

    let mut files = Vec::with_capacity(keys.len());
    for key in keys {
        let file = match (key, &decoded) {
            (RenderKey::Fitted { area, mode }, Some(img)) => {
                let plan = geometry::plan(Size::new(img.width(), img.height()), *area, *mode)?;
                let canvas = render::render(img, &plan, background);
                tracing::debug!(
                    "Rendered {} to {} ({}), source rect {:?}",
                    source.path,
                    area,
                    mode,
                    plan.source
                );
                RenderedFile {
                    key: *key,
                    object_path: format!("{}-{}-{}.png", prefix, area, mode),
                    content_type: "image/png".to_string(),
                    bytes: encode_png(&canvas)?,
                }
            }
            _ => {
                let ext = file_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_else(|| "png".to_string());
                RenderedFile {
                    key: *key,
                    object_path: format!("{}.{}", prefix, ext),
                    content_type: mime_guess::from_ext(&ext)
                        .first_or_octet_stream()
                        .to_string(),
                    bytes: source.bytes.clone(),
                }
            }
        };
        files.push(file);
    }

    Ok(files)
}

/// Upload the renditions of one image, at most `concurrency` at a time.
/// Results come back in completion order; one failure does not stop the others.
pub async fn upload_all<O: ObjectStore + ?Sized>(
    store: &O,
    files: Vec<RenderedFile>,
    concurrency: usize,
) -> Vec<UploadResult> {
    stream::iter(files)
        .map(|file| async move {
            let RenderedFile {
                key,
                object_path,
                content_type,
                bytes,
            } = file;
            let size = bytes.len();
            let url = store.upload(&object_path, bytes, &content_type).await;
            match &url {
                Ok(url) => tracing::debug!("Uploaded {} ({} bytes) -> {}", object_path, size, url),
                Err(e) => tracing::warn!("Upload of {} failed: {}", object_path, e),
            }
            UploadResult { key, url }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// Public URL per rendition, or the first upload error.
pub fn group_urls(
    results: Vec<UploadResult>,
) -> std::result::Result<HashMap<RenderKey, String>, String> {
    let mut urls = HashMap::with_capacity(results.len());
    for result in results {
        let url = result.url.map_err(|e| e.to_string())?;
        urls.insert(result.key, url);
    }
    Ok(urls)
}
