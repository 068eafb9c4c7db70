use crate::adapters::{http_client, join_url};
use crate::domain::ports::{ConfigProvider, ObjectStore};
use crate::utils::error::{BulkError, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Storage bucket of the hosted backend: objects are written through the
/// authenticated object endpoint and read back through the public one.
#[derive(Debug, Clone)]
pub struct BucketClient {
    client: Client,
    storage_url: String,
    bucket: String,
    key: String,
}

impl BucketClient {
    pub fn new(storage_url: &str, bucket: &str, key: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.storage_url(), config.bucket(), config.storage_key())
    }

    fn object_url(&self, path: &str) -> String {
        join_url(
            &self.storage_url,
            &format!("storage/v1/object/{}/{}", self.bucket, path.trim_start_matches('/')),
        )
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let url = self.object_url(path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| BulkError::UploadError {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BulkError::UploadError {
                path: path.to_string(),
                message: format!("{}: {}", status, body),
            });
        }

        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(
            &self.storage_url,
            &format!(
                "storage/v1/object/public/{}/{}",
                self.bucket,
                path.trim_start_matches('/')
            ),
        )
    }
}
