use crate::config::validate_provider;
use crate::core::poller::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
use crate::core::rules::ListingRules;
use crate::core::ConfigProvider;
use crate::domain::model::FitMode;
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// A batch job described in a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job: JobSection,
    pub api: ApiSection,
    pub storage: StorageSection,
    pub input: InputSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub listing: ListingSection,
    #[serde(default)]
    pub polling: PollingSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSection {
    pub name: String,
    pub template_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    pub endpoint: String,
    pub key: String,
    #[serde(default)]
    pub gateway_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    pub url: String,
    pub key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSection {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSection {
    #[serde(default)]
    pub fit: FitMode,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default)]
    pub placeholder_fit: HashMap<String, FitMode>,
    #[serde(default)]
    pub skip_placeholders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSection {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub variant_ids: Vec<String>,
    #[serde(default)]
    pub variant_prices: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_poll_attempts")]
    pub attempts: u32,
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_concurrency")]
    pub concurrent_uploads: usize,
}

fn default_bucket() -> String {
    "product-images".to_string()
}

fn default_background() -> String {
    "transparent".to_string()
}

fn default_title() -> String {
    "{name}".to_string()
}

fn default_poll_attempts() -> u32 {
    DEFAULT_POLL_ATTEMPTS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_concurrency() -> usize {
    4
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            fit: FitMode::default(),
            background: default_background(),
            placeholder_fit: HashMap::new(),
            skip_placeholders: Vec::new(),
        }
    }
}

impl Default for ListingSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: String::new(),
            tags: Vec::new(),
            price: None,
            variant_ids: Vec::new(),
            variant_prices: HashMap::new(),
        }
    }
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            attempts: default_poll_attempts(),
            interval_ms: default_poll_interval(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            concurrent_uploads: default_concurrency(),
        }
    }
}

impl JobConfig {
    /// Load a job from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BulkError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BulkError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the environment value; unset variables
    /// are left as written so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    fn unresolved_variable(&self) -> Option<(&'static str, &str)> {
        [
            ("api.endpoint", self.api.endpoint.as_str()),
            ("api.key", self.api.key.as_str()),
            ("storage.url", self.storage.url.as_str()),
            ("storage.key", self.storage.key.as_str()),
            (
                "api.gateway_key",
                self.api.gateway_key.as_deref().unwrap_or_default(),
            ),
        ]
        .into_iter()
        .find(|(_, value)| value.contains("${"))
    }
}

impl ConfigProvider for JobConfig {
    fn api_endpoint(&self) -> &str {
        &self.api.endpoint
    }

    fn api_key(&self) -> &str {
        &self.api.key
    }

    fn gateway_key(&self) -> Option<&str> {
        self.api.gateway_key.as_deref()
    }

    fn storage_url(&self) -> &str {
        &self.storage.url
    }

    fn storage_key(&self) -> &str {
        &self.storage.key
    }

    fn bucket(&self) -> &str {
        &self.storage.bucket
    }

    fn template_id(&self) -> &str {
        &self.job.template_id
    }

    fn images(&self) -> &[String] {
        &self.input.images
    }

    fn image_dir(&self) -> Option<&str> {
        self.input.dir.as_deref()
    }

    fn fit_mode(&self) -> FitMode {
        self.render.fit
    }

    fn background(&self) -> &str {
        &self.render.background
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn concurrent_uploads(&self) -> usize {
        self.output.concurrent_uploads
    }

    fn poll_attempts(&self) -> u32 {
        self.polling.attempts
    }

    fn poll_interval_ms(&self) -> u64 {
        self.polling.interval_ms
    }

    fn dry_run(&self) -> bool {
        self.job.dry_run
    }

    fn rules(&self) -> ListingRules {
        ListingRules {
            title_template: self.listing.title.clone(),
            description_template: self.listing.description.clone(),
            tags: self.listing.tags.clone(),
            price: self.listing.price,
            variant_prices: self.listing.variant_prices.clone(),
            variant_ids: self.listing.variant_ids.clone(),
            placeholder_fit: self.render.placeholder_fit.clone(),
            skip_placeholders: self.render.skip_placeholders.clone(),
        }
    }
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        if let Some((field, value)) = self.unresolved_variable() {
            return Err(BulkError::ConfigValidationError {
                field: field.to_string(),
                message: format!("environment variable in '{}' is not set", value),
            });
        }
        validate_provider(self)
    }
}
