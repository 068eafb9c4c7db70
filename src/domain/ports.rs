use crate::core::rules::ListingRules;
use crate::domain::model::{CreateProductRequest, FitMode, Product, Template};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where batch reports are written.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn gateway_key(&self) -> Option<&str>;
    fn storage_url(&self) -> &str;
    fn storage_key(&self) -> &str;
    fn bucket(&self) -> &str;
    fn template_id(&self) -> &str;
    /// Explicit image files, before any directory scan.
    fn images(&self) -> &[String];
    fn image_dir(&self) -> Option<&str>;
    fn fit_mode(&self) -> FitMode;
    fn background(&self) -> &str;
    fn output_path(&self) -> &str;
    fn concurrent_uploads(&self) -> usize;
    fn poll_attempts(&self) -> u32;
    fn poll_interval_ms(&self) -> u64;
    fn dry_run(&self) -> bool;
    fn rules(&self) -> ListingRules;
}

/// The print fulfillment API.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<Template>>;
    async fn fetch_template(&self, template_id: &str) -> Result<Template>;
    async fn create_product(&self, request: &CreateProductRequest) -> Result<Product>;
    async fn fetch_product(&self, product_id: &str) -> Result<Product>;
}

/// A bucket whose objects are served by public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `path` and returns its public URL.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String>;
    fn public_url(&self, path: &str) -> String;
}
