use crate::core::poller::{wait_for_product, PollPolicy};
use crate::core::render::parse_background;
use crate::core::report::write_report;
use crate::core::rules::{listing_vars, ListingRules};
use crate::core::uploader::{
    group_urls, prepare_image, required_renders, upload_all, RenderKey, RenderedFile,
    SourceImage,
};
use crate::domain::model::{
    BatchReport, CreateProductRequest, FitMode, ItemReport, ItemStatus, PlaceholderImage,
    ProductStatus, Variant, VariantPayload,
};
use crate::domain::ports::{ConfigProvider, ObjectStore, ProductApi, Storage};
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::IMAGE_EXTENSIONS;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use image::Rgba;
use std::collections::HashMap;
use std::time::Duration;

/// Everything a run needs, resolved from whichever config source was used.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub template_id: String,
    pub images: Vec<String>,
    pub fit_mode: FitMode,
    pub background: Rgba<u8>,
    pub concurrent_uploads: usize,
    pub poll: PollPolicy,
    pub dry_run: bool,
    pub rules: ListingRules,
}

impl BatchSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Ok(Self {
            template_id: config.template_id().to_string(),
            images: resolve_images(config.images(), config.image_dir())?,
            fit_mode: config.fit_mode(),
            background: parse_background(config.background())?,
            concurrent_uploads: config.concurrent_uploads().max(1),
            poll: PollPolicy {
                attempts: config.poll_attempts(),
                interval: Duration::from_millis(config.poll_interval_ms()),
            },
            dry_run: config.dry_run(),
            rules: config.rules(),
        })
    }
}

/// Explicit files first, then the directory's images sorted by name.
pub fn resolve_images(explicit: &[String], dir: Option<&str>) -> Result<Vec<String>> {
    let mut images: Vec<String> = Vec::new();
    for path in explicit {
        if !images.contains(path) {
            images.push(path.clone());
        }
    }

    if let Some(dir) = dir {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
            if is_image {
                found.push(path.to_string_lossy().to_string());
            }
        }
        found.sort();
        tracing::debug!("Found {} images in {}", found.len(), dir);
        for path in found {
            if !images.contains(&path) {
                images.push(path);
            }
        }
    }

    if images.is_empty() {
        return Err(BulkError::MissingConfigError {
            field: "images".to_string(),
        });
    }
    Ok(images)
}

#[derive(Debug)]
pub struct BatchRun {
    pub report: BatchReport,
    /// Report files written to the output storage.
    pub report_files: Vec<String>,
    /// Set when the report could not be written; the products still exist.
    pub report_error: Option<BulkError>,
}

pub struct BulkEngine<A: ProductApi, O: ObjectStore, S: Storage> {
    api: A,
    store: O,
    storage: S,
    settings: BatchSettings,
}

impl<A: ProductApi, O: ObjectStore, S: Storage> BulkEngine<A, O, S> {
    pub fn new(api: A, store: O, storage: S, settings: BatchSettings) -> Self {
        Self {
            api,
            store,
            storage,
            settings,
        }
    }

    pub async fn run(&self) -> Result<BatchRun> {
        let started_at = Utc::now();
        let batch_id = format!(
            "{}-{}",
            started_at.format("%Y%m%d-%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let settings = &self.settings;
        tracing::info!(
            "Starting batch {} with {} images for template {}",
            batch_id,
            settings.images.len(),
            settings.template_id
        );

        let template = self.api.fetch_template(&settings.template_id).await?;
        let variants = settings.rules.select_variants(&template)?;
        let keys = required_renders(&variants, &settings.rules, settings.fit_mode);
        if keys.is_empty() {
            return Err(BulkError::ValidationError {
                message: format!(
                    "no placeholders left to fill in template '{}'",
                    template.id
                ),
            });
        }
        tracing::info!(
            "Template '{}': {} variants selected, {} renditions per image",
            template.name,
            variants.len(),
            keys.len()
        );

        let mut items: Vec<ItemReport> = Vec::with_capacity(settings.images.len());
        let mut descriptions = Vec::with_capacity(settings.images.len());
        for (index, path) in settings.images.iter().enumerate() {
            let vars = listing_vars(path, index, &template);
            items.push(ItemReport::planned(
                index,
                path.clone(),
                settings.rules.title(&vars),
            ));
            descriptions.push(settings.rules.description(&vars));
        }

        self.check_sources(&mut items).await;

        if !settings.dry_run {
            let mut urls = self.render_and_upload(&keys, &batch_id, &mut items).await;

            for item in items.iter_mut() {
                if item.status == ItemStatus::Failed {
                    continue;
                }
                match urls.remove(&item.index) {
                    Some(Ok(image_urls)) => {
                        let description = std::mem::take(&mut descriptions[item.index]);
                        self.publish(item, &variants, &image_urls, description).await;
                    }
                    Some(Err(e)) => item.fail(format!("upload failed: {}", e)),
                    None => item.fail("no files were uploaded"),
                }
            }
        } else {
            tracing::info!("Dry run: skipping uploads and product creation");
        }

        let report = BatchReport {
            batch_id,
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            started_at,
            finished_at: Utc::now(),
            dry_run: settings.dry_run,
            items,
        };
        let summary = report.summary();
        tracing::info!(
            "Batch {} finished: {} completed, {} failed, {} timed out, {} planned",
            report.batch_id,
            summary.completed,
            summary.failed,
            summary.timeout,
            summary.planned
        );

        let (report_files, report_error) = match write_report(&self.storage, &report).await {
            Ok(files) => (files, None),
            Err(e) => {
                tracing::error!("Writing the report of batch {} failed: {}", report.batch_id, e);
                for item in &report.items {
                    tracing::error!(
                        "{} -> {} [{}] {}",
                        item.image,
                        item.product_id.as_deref().unwrap_or("-"),
                        item.status,
                        item.error.as_deref().unwrap_or("")
                    );
                }
                (Vec::new(), Some(e))
            }
        };

        Ok(BatchRun {
            report,
            report_files,
            report_error,
        })
    }

    /// Fails every item whose input is missing or not a readable file.
    async fn check_sources(&self, items: &mut [ItemReport]) {
        for item in items.iter_mut() {
            let readable = match tokio::fs::metadata(&item.image).await {
                Ok(meta) if meta.is_file() => tokio::fs::File::open(&item.image).await.map(|_| ()),
                Ok(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a regular file",
                )),
                Err(e) => Err(e),
            };
            if let Err(e) = readable {
                tracing::warn!("Cannot read {}: {}", item.image, e);
                item.fail(format!("cannot read image: {}", e));
            }
        }
    }

    /// Renders at most `concurrent_uploads` images at a time and uploads each
    /// one as soon as it is ready, so only that many images sit in memory.
    async fn render_and_upload(
        &self,
        keys: &[RenderKey],
        batch_id: &str,
        items: &mut [ItemReport],
    ) -> HashMap<usize, std::result::Result<HashMap<RenderKey, String>, String>> {
        let background = self.settings.background;
        let concurrency = self.settings.concurrent_uploads.max(1);
        let pending: Vec<(usize, String)> = items
            .iter()
            .filter(|item| item.status != ItemStatus::Failed)
            .map(|item| (item.index, item.image.clone()))
            .collect();
        tracing::info!(
            "Rendering and uploading {} images ({} at a time)",
            pending.len(),
            concurrency
        );

        let mut rendered = stream::iter(pending)
            .map(|(index, path)| {
                let keys = keys.to_vec();
                let batch_id = batch_id.to_string();
                async move {
                    let outcome = render_source(index, path, keys, background, batch_id).await;
                    (index, outcome)
                }
            })
            .buffer_unordered(concurrency);

        let mut urls = HashMap::new();
        while let Some((index, outcome)) = rendered.next().await {
            match outcome {
                Ok(files) => {
                    let results = upload_all(&self.store, files, concurrency).await;
                    urls.insert(index, group_urls(results));
                }
                Err(e) => {
                    tracing::warn!("Cannot prepare {}: {}", items[index].image, e);
                    items[index].fail(e);
                }
            }
        }
        urls
    }

    async fn publish(
        &self,
        item: &mut ItemReport,
        variants: &[&Variant],
        urls: &HashMap<RenderKey, String>,
        description: String,
    ) {
        let request = match build_request(
            &self.settings,
            variants,
            urls,
            item.title.clone(),
            description,
        ) {
            Ok(request) => request,
            Err(e) => return item.fail(e),
        };

        let product = match self.api.create_product(&request).await {
            Ok(product) => product,
            Err(e) => {
                tracing::warn!("Creating '{}' failed: {}", item.title, e);
                return item.fail(e);
            }
        };
        tracing::info!("Created product {} for {}", product.id, item.image);
        item.product_id = Some(product.id.clone());

        let (status, attempts, timed_out) = if product.status.is_terminal() {
            (Some(product.status), 0, false)
        } else {
            let outcome = wait_for_product(&self.api, &product.id, self.settings.poll).await;
            (outcome.status, outcome.attempts, outcome.timed_out)
        };

        item.poll_attempts = attempts;
        item.product_status = status.clone();
        item.status = match status {
            _ if timed_out => ItemStatus::Timeout,
            Some(ProductStatus::Completed) => ItemStatus::Completed,
            _ => {
                item.error = Some("provider reported the product as failed".to_string());
                ItemStatus::Failed
            }
        };
    }
}

/// Reads one input and produces its renditions on the blocking pool.
async fn render_source(
    index: usize,
    path: String,
    keys: Vec<RenderKey>,
    background: Rgba<u8>,
    batch_id: String,
) -> Result<Vec<RenderedFile>> {
    let bytes = tokio::fs::read(&path).await?;
    let source = SourceImage { index, path, bytes };
    tokio::task::spawn_blocking(move || prepare_image(&source, &keys, background, &batch_id))
        .await
        .map_err(|e| BulkError::ProcessingError {
            message: format!("render task failed: {}", e),
        })?
}

/// One payload per image: every selected variant, every included placeholder.
pub fn build_request(
    settings: &BatchSettings,
    variants: &[&Variant],
    urls: &HashMap<RenderKey, String>,
    title: String,
    description: String,
) -> Result<CreateProductRequest> {
    let rules = &settings.rules;
    let mut payloads = Vec::with_capacity(variants.len());

    for variant in variants {
        let mut placeholders = Vec::new();
        for placeholder in &variant.placeholders {
            if !rules.includes_placeholder(&placeholder.name) {
                continue;
            }
            let key = RenderKey::for_placeholder(
                placeholder.print_area(),
                rules.fit_for(&placeholder.name, settings.fit_mode),
            );
            let image_url = urls.get(&key).ok_or_else(|| BulkError::ProcessingError {
                message: format!(
                    "no uploaded image for placeholder '{}' of variant '{}'",
                    placeholder.name, variant.id
                ),
            })?;
            placeholders.push(PlaceholderImage {
                name: placeholder.name.clone(),
                image_url: image_url.clone(),
            });
        }

        payloads.push(VariantPayload {
            variant_id: variant.id.clone(),
            price: rules.price_for(&variant.id),
            placeholders,
        });
    }

    Ok(CreateProductRequest {
        template_id: settings.template_id.clone(),
        title,
        description,
        tags: rules.tags.clone(),
        variants: payloads,
    })
}
