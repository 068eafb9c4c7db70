pub mod batch;
pub mod geometry;
pub mod poller;
pub mod render;
pub mod report;
pub mod rules;
pub mod uploader;

pub use crate::domain::model::{BatchReport, FitMode, Size};
pub use crate::domain::ports::{ConfigProvider, ObjectStore, ProductApi, Storage};
pub use crate::utils::error::Result;
