pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{BucketClient, PodApiClient};
pub use config::local_storage::LocalStorage;
pub use config::toml_config::JobConfig;
pub use crate::core::batch::{BatchRun, BatchSettings, BulkEngine};
pub use crate::core::rules::ListingRules;
pub use utils::error::{BulkError, Result};
