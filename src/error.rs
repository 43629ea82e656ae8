use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Failure to turn an image reference into raw bytes.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to fetch image: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Per-image pipeline failure, shared by both invocation adapters.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid image format (only JPEG and PNG are supported)")]
    InvalidFormat,

    #[error("image is {size} bytes, exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("ingredient extraction failed")]
    ExtractionFailed,
}

/// Caller-facing error for the on-demand adapter.
///
/// Every terminal failure of `IngredientDetector::detect_ingredients` maps to
/// one of these variants; the display strings are shown to end users as-is.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DetectError {
    #[error("Could not retrieve image bytes from provided data")]
    SourceUnavailable,

    #[error("Invalid image format. Only JPEG and PNG are supported.")]
    InvalidFormat,

    #[error("Image too large. Maximum size is {0}MB")]
    TooLarge(u64),

    #[error("Failed to extract ingredients from image. Please try another image.")]
    ExtractionFailed,

    #[error("No ingredients detected with sufficient confidence. Please try another image.")]
    NoConfidentIngredients,
}

/// Structural violation rejected when constructing a [`Detection`](crate::extract::Detection).
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("ingredients list is empty")]
    EmptyIngredients,

    #[error("confidence score for '{0}' out of range: {1}")]
    ScoreOutOfRange(String, f64),

    #[error("missing confidence score for '{0}'")]
    MissingScore(String),
}
