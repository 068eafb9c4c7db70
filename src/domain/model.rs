use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel dimensions of an image or a print area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub placeholders: Vec<ImagePlaceholder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlaceholder {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ImagePlaceholder {
    /// Print area in pixels, when the provider publishes one.
    pub fn print_area(&self) -> Option<Size> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(Size::new(width, height))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProductStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductStatus::Completed | ProductStatus::Failed)
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Processing => "processing",
            ProductStatus::Completed => "completed",
            ProductStatus::Failed => "failed",
            ProductStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default = "default_product_status")]
    pub status: ProductStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
}

fn default_product_status() -> ProductStatus {
    ProductStatus::Pending
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub template_id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub variants: Vec<VariantPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPayload {
    pub variant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    pub placeholders: Vec<PlaceholderImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderImage {
    pub name: String,
    pub image_url: String,
}

/// How an uploaded image is adapted to a placeholder's print area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to fill the print area, cropping the overflow around the centre.
    #[default]
    #[serde(alias = "crop", alias = "fill")]
    Cover,
    /// Scale to fit inside the print area, padding the rest with background.
    #[serde(alias = "fit")]
    Contain,
    /// Scale each axis independently to the print area.
    Stretch,
    /// Upload the file untouched.
    Original,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cover" | "crop" | "fill" => Ok(FitMode::Cover),
            "contain" | "fit" => Ok(FitMode::Contain),
            "stretch" => Ok(FitMode::Stretch),
            "original" | "none" => Ok(FitMode::Original),
            other => Err(format!(
                "unknown fit mode '{}', expected cover, contain, stretch or original",
                other
            )),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitMode::Cover => "cover",
            FitMode::Contain => "contain",
            FitMode::Stretch => "stretch",
            FitMode::Original => "original",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Planned,
    Completed,
    Failed,
    Timeout,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Planned => "planned",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
            ItemStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Outcome for one source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub index: usize,
    pub image: String,
    pub title: String,
    pub product_id: Option<String>,
    pub status: ItemStatus,
    pub product_status: Option<ProductStatus>,
    pub poll_attempts: u32,
    pub error: Option<String>,
}

impl ItemReport {
    pub fn planned(index: usize, image: String, title: String) -> Self {
        Self {
            index,
            image,
            title,
            product_id: None,
            status: ItemStatus::Planned,
            product_status: None,
            poll_attempts: 0,
            error: None,
        }
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        self.status = ItemStatus::Failed;
        self.error = Some(error.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub template_id: String,
    pub template_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub planned: usize,
    pub completed: usize,
    pub failed: usize,
    pub timeout: usize,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        self.items
            .iter()
            .fold(BatchSummary::default(), |mut acc, item| {
                match item.status {
                    ItemStatus::Planned => acc.planned += 1,
                    ItemStatus::Completed => acc.completed += 1,
                    ItemStatus::Failed => acc.failed += 1,
                    ItemStatus::Timeout => acc.timeout += 1,
                }
                acc
            })
    }
}
