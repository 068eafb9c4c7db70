pub mod local_storage;
pub mod toml_config;

use crate::core::render::parse_background;
use crate::core::ConfigProvider;
use crate::domain::model::FitMode;
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::{self, IMAGE_EXTENSIONS};
use std::collections::HashMap;

#[cfg(feature = "cli")]
use crate::core::poller::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
#[cfg(feature = "cli")]
use crate::core::rules::ListingRules;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const MAX_POLL_ATTEMPTS: u32 = 600;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "pod-bulk")]
#[command(about = "Bulk-create print-on-demand products from a folder of images")]
pub struct CliConfig {
    /// Base URL of the print API, or of the proxy function in front of it
    #[arg(long)]
    pub api_endpoint: String,

    #[arg(long)]
    pub api_key: String,

    /// Gateway key sent as `apikey` when the API sits behind a proxy function
    #[arg(long)]
    pub gateway_key: Option<String>,

    #[arg(long)]
    pub storage_url: String,

    #[arg(long)]
    pub storage_key: String,

    #[arg(long, default_value = "product-images")]
    pub bucket: String,

    #[arg(long)]
    pub template_id: String,

    #[arg(long, value_delimiter = ',')]
    pub images: Vec<String>,

    /// Directory scanned for png, jpg, jpeg and webp files
    #[arg(long)]
    pub image_dir: Option<String>,

    /// cover (crop), contain (fit), stretch or original
    #[arg(long, default_value = "cover")]
    pub fit: FitMode,

    /// Padding colour for contain: #rrggbb, #rrggbbaa or transparent
    #[arg(long, default_value = "transparent")]
    pub background: String,

    #[arg(long, default_value = "{name}")]
    pub title_template: String,

    #[arg(long, default_value = "")]
    pub description_template: String,

    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Price in minor units for every variant
    #[arg(long)]
    pub price: Option<u32>,

    /// Per-variant price, as VARIANT_ID=PRICE
    #[arg(long = "variant-price")]
    pub variant_prices: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub variant_ids: Vec<String>,

    /// Per-placeholder fit, as PLACEHOLDER=MODE
    #[arg(long = "placeholder-fit")]
    pub placeholder_fit: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub skip_placeholders: Vec<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "4")]
    pub concurrent_uploads: usize,

    #[arg(long, default_value_t = DEFAULT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Resolve the template and titles without uploading or creating anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

/// Splits `key=value`; whitespace around either side is dropped.
pub fn parse_key_value(field: &str, raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(BulkError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected KEY=VALUE".to_string(),
        }),
    }
}

pub fn parse_variant_prices(raw: &[String]) -> Result<HashMap<String, u32>> {
    raw.iter()
        .map(|entry| {
            let (variant, price) = parse_key_value("variant_prices", entry)?;
            let price = price
                .parse::<u32>()
                .map_err(|e| BulkError::InvalidConfigValueError {
                    field: "variant_prices".to_string(),
                    value: entry.clone(),
                    reason: format!("price must be a whole number of minor units: {}", e),
                })?;
            Ok((variant, price))
        })
        .collect()
}

pub fn parse_placeholder_fit(raw: &[String]) -> Result<HashMap<String, FitMode>> {
    raw.iter()
        .map(|entry| {
            let (placeholder, mode) = parse_key_value("placeholder_fit", entry)?;
            let mode = mode
                .parse::<FitMode>()
                .map_err(|reason| BulkError::InvalidConfigValueError {
                    field: "placeholder_fit".to_string(),
                    value: entry.clone(),
                    reason,
                })?;
            Ok((placeholder, mode))
        })
        .collect()
}

/// Checks shared by every config source.
pub(crate) fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validation::validate_url("api_endpoint", config.api_endpoint())?;
    validation::validate_non_empty_string("api_key", config.api_key())?;
    validation::validate_url("storage_url", config.storage_url())?;
    validation::validate_non_empty_string("storage_key", config.storage_key())?;
    validation::validate_non_empty_string("bucket", config.bucket())?;
    validation::validate_non_empty_string("template_id", config.template_id())?;
    validation::validate_path("output_path", config.output_path())?;
    validation::validate_positive_number("concurrent_uploads", config.concurrent_uploads(), 1)?;
    validation::validate_range("poll_attempts", config.poll_attempts(), 1, MAX_POLL_ATTEMPTS)?;
    parse_background(config.background())?;

    if config.images().is_empty() && config.image_dir().is_none() {
        return Err(BulkError::MissingConfigError {
            field: "images or image_dir".to_string(),
        });
    }
    validation::validate_file_extensions("images", config.images(), IMAGE_EXTENSIONS)?;
    if let Some(dir) = config.image_dir() {
        validation::validate_path("image_dir", dir)?;
    }
    Ok(())
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn gateway_key(&self) -> Option<&str> {
        self.gateway_key.as_deref()
    }

    fn storage_url(&self) -> &str {
        &self.storage_url
    }

    fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn template_id(&self) -> &str {
        &self.template_id
    }

    fn images(&self) -> &[String] {
        &self.images
    }

    fn image_dir(&self) -> Option<&str> {
        self.image_dir.as_deref()
    }

    fn fit_mode(&self) -> FitMode {
        self.fit
    }

    fn background(&self) -> &str {
        &self.background
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn concurrent_uploads(&self) -> usize {
        self.concurrent_uploads
    }

    fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    // Malformed pairs are rejected by `validate`, so they are skipped here.
    fn rules(&self) -> ListingRules {
        ListingRules {
            title_template: self.title_template.clone(),
            description_template: self.description_template.clone(),
            tags: self.tags.clone(),
            price: self.price,
            variant_prices: parse_variant_prices(&self.variant_prices).unwrap_or_default(),
            variant_ids: self.variant_ids.clone(),
            placeholder_fit: parse_placeholder_fit(&self.placeholder_fit).unwrap_or_default(),
            skip_placeholders: self.skip_placeholders.clone(),
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)?;
        parse_variant_prices(&self.variant_prices)?;
        parse_placeholder_fit(&self.placeholder_fit)?;
        Ok(())
    }
}
