use crate::adapters::{endpoint_url, http_client};
use crate::domain::model::{CreateProductRequest, Product, Template};
use crate::domain::ports::{ConfigProvider, ProductApi};
use crate::utils::error::{BulkError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Providers (and the proxy functions in front of them) answer either with
/// the bare payload or wrapped in `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

/// Client for the print fulfillment API, either called directly or through a
/// serverless proxy function that expects a gateway `apikey` header.
#[derive(Debug, Clone)]
pub struct PodApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    gateway_key: Option<String>,
}

impl PodApiClient {
    pub fn new(base_url: &str, api_key: &str, gateway_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            gateway_key: gateway_key.map(str::to_string),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.api_endpoint(), config.api_key(), config.gateway_key())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.bearer_auth(&self.api_key);
        match &self.gateway_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("{} -> {} ({} bytes)", url, status, body.len());

        if !status.is_success() {
            return Err(BulkError::ApiStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl ProductApi for PodApiClient {
    async fn list_templates(&self) -> Result<Vec<Template>> {
        let url = endpoint_url(&self.base_url, &["templates"])?;
        tracing::debug!("Fetching templates from {}", url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::read_json(response, &url).await
    }

    async fn fetch_template(&self, template_id: &str) -> Result<Template> {
        let url = endpoint_url(&self.base_url, &["templates", template_id])?;
        tracing::debug!("Fetching template {}", template_id);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::read_json(response, &url).await
    }

    async fn create_product(&self, request: &CreateProductRequest) -> Result<Product> {
        let url = endpoint_url(&self.base_url, &["products", "from-template"])?;
        tracing::debug!(
            "Creating product '{}' from template {} with {} variants",
            request.title,
            request.template_id,
            request.variants.len()
        );
        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        Self::read_json(response, &url).await
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Product> {
        let url = endpoint_url(&self.base_url, &["products", product_id])?;
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::read_json(response, &url).await
    }
}
