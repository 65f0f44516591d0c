#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),
    #[error("Image job failed: {0}")]
    Job(String),
    #[error("Prompt enhancement failed: {0}")]
    Enhancement(String),
    #[error("Failed to fetch image: {0}")]
    Fetch(String),
    #[error("Failed to split image: {0}")]
    Partition(String),
    #[error("Upload failed: {0}")]
    Storage(String),
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Failed to parse API response: {0}")]
    ResponseParseFailed(#[from] serde_json::Error),
    #[error("API request failed: {message}")]
    ApiError { message: String },
    #[error("URL parsing failed: {0}")]
    UrlParseFailed(#[from] url::ParseError),
}

impl StudioError {
    /// Whether the error was caused by the caller's input rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(self, StudioError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
