use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status} for {url}: {body}")]
    ApiStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Upload of '{path}' failed: {message}")]
    UploadError { path: String, message: String },

    #[error("Geometry error: {message}")]
    GeometryError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    RemoteApi,
    Image,
    Io,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BulkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BulkError::ApiError(_) | BulkError::UploadError { .. } => ErrorCategory::Network,
            BulkError::ApiStatus { .. } => ErrorCategory::RemoteApi,
            BulkError::ImageError(_) | BulkError::GeometryError { .. } => ErrorCategory::Image,
            BulkError::IoError(_) | BulkError::CsvError(_) => ErrorCategory::Io,
            BulkError::ConfigValidationError { .. }
            | BulkError::InvalidConfigValueError { .. }
            | BulkError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BulkError::SerializationError(_)
            | BulkError::ProcessingError { .. }
            | BulkError::ValidationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Worth another run as-is.
            BulkError::ApiError(_) | BulkError::UploadError { .. } => ErrorSeverity::Medium,
            BulkError::ApiStatus { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            BulkError::ApiStatus { .. }
            | BulkError::ImageError(_)
            | BulkError::GeometryError { .. }
            | BulkError::SerializationError(_)
            | BulkError::ProcessingError { .. }
            | BulkError::ValidationError { .. } => ErrorSeverity::High,
            BulkError::IoError(_)
            | BulkError::CsvError(_)
            | BulkError::ConfigValidationError { .. }
            | BulkError::InvalidConfigValueError { .. }
            | BulkError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BulkError::ApiError(_) => {
                "Check network connectivity and the API endpoint, then rerun".to_string()
            }
            BulkError::ApiStatus { status: 401, .. } | BulkError::ApiStatus { status: 403, .. } => {
                "Check the API key (and gateway key when going through a proxy function)"
                    .to_string()
            }
            BulkError::ApiStatus { status: 404, .. } => {
                "Check the template id; run list_templates to see what is available".to_string()
            }
            BulkError::ApiStatus { .. } => {
                "The print API rejected the request; inspect the response body above".to_string()
            }
            BulkError::UploadError { .. } => {
                "Check the storage URL, bucket name and storage key".to_string()
            }
            BulkError::ImageError(_) | BulkError::GeometryError { .. } => {
                "Make sure every input is a readable PNG, JPEG or WebP image".to_string()
            }
            BulkError::IoError(_) | BulkError::CsvError(_) => {
                "Check file paths and permissions of the input and output directories".to_string()
            }
            BulkError::ConfigValidationError { .. }
            | BulkError::InvalidConfigValueError { .. }
            | BulkError::MissingConfigError { .. } => {
                "Fix the configuration value named above and rerun".to_string()
            }
            BulkError::SerializationError(_) => {
                "The API response did not match the expected shape".to_string()
            }
            BulkError::ProcessingError { .. } | BulkError::ValidationError { .. } => {
                "Review the listing rules and the selected template".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::RemoteApi => format!("Print API error: {}", self),
            ErrorCategory::Image => format!("Image problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Processing problem: {}", self),
        }
    }

    /// Exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, BulkError>;
