//! Pipeline configuration from environment variables.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default maximum image size in MiB.
pub const DEFAULT_MAX_IMAGE_SIZE_MB: u64 = 5;

/// Default minimum confidence for an ingredient to survive filtering.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// Default compression skip threshold in KiB; smaller images are sent as-is.
pub const DEFAULT_COMPRESS_THRESHOLD_KB: u64 = 300;

/// Default maximum width in pixels after compression.
pub const DEFAULT_COMPRESS_MAX_WIDTH: u32 = 1024;

/// Default retry budget for the vision call.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Default per-request image cap (enforced upstream, re-checked here).
pub const DEFAULT_MAX_IMAGES_PER_REQUEST: usize = 10;

/// Default timeout for fetching a remote image.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default vision model.
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash-lite";

/// Default Gemini API base URL.
pub const DEFAULT_VISION_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Tunables for the ingredient detection pipeline.
///
/// Passed explicitly into pipeline entry points rather than read from ambient
/// global state, so thresholds can vary per test and per deployment.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Maximum accepted image size in MiB.
    pub max_image_size_mb: u64,
    /// Minimum confidence score (0.0-1.0) for an ingredient to be kept.
    pub min_ingredient_confidence: f64,
    /// Whether to re-encode oversized images before the vision call.
    pub compress_images: bool,
    /// Images smaller than this many KiB skip compression entirely.
    pub compress_threshold_kb: u64,
    /// Maximum width in pixels when compressing; aspect ratio is preserved.
    pub compress_max_width: u32,
    /// Retry budget for the vision call in the on-demand path.
    pub max_retry_attempts: u32,
    /// Per-request image cap. Enforced upstream; requests exceeding it are
    /// truncated here with a warning.
    pub max_images_per_request: usize,
    /// Timeout for fetching a remote image URL.
    pub fetch_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_image_size_mb: DEFAULT_MAX_IMAGE_SIZE_MB,
            min_ingredient_confidence: DEFAULT_MIN_CONFIDENCE,
            compress_images: true,
            compress_threshold_kb: DEFAULT_COMPRESS_THRESHOLD_KB,
            compress_max_width: DEFAULT_COMPRESS_MAX_WIDTH,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            max_images_per_request: DEFAULT_MAX_IMAGES_PER_REQUEST,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults for anything unset or unparseable.
    ///
    /// Optional:
    /// - `PANTRYLENS_MAX_IMAGE_SIZE_MB`: Maximum image size in MiB (default: 5)
    /// - `PANTRYLENS_MIN_CONFIDENCE`: Confidence threshold (default: 0.7)
    /// - `PANTRYLENS_COMPRESS_IMAGES`: "true"/"1" to enable compression (default: true)
    /// - `PANTRYLENS_COMPRESS_THRESHOLD_KB`: Compression skip threshold (default: 300)
    /// - `PANTRYLENS_COMPRESS_MAX_WIDTH`: Max width after compression (default: 1024)
    /// - `PANTRYLENS_MAX_RETRIES`: Vision call retry budget (default: 3)
    /// - `PANTRYLENS_MAX_IMAGES`: Per-request image cap (default: 10)
    /// - `PANTRYLENS_FETCH_TIMEOUT_SECS`: Remote fetch timeout (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_image_size_mb: parse_var("PANTRYLENS_MAX_IMAGE_SIZE_MB", defaults.max_image_size_mb),
            min_ingredient_confidence: parse_var(
                "PANTRYLENS_MIN_CONFIDENCE",
                defaults.min_ingredient_confidence,
            ),
            compress_images: env::var("PANTRYLENS_COMPRESS_IMAGES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.compress_images),
            compress_threshold_kb: parse_var(
                "PANTRYLENS_COMPRESS_THRESHOLD_KB",
                defaults.compress_threshold_kb,
            ),
            compress_max_width: parse_var("PANTRYLENS_COMPRESS_MAX_WIDTH", defaults.compress_max_width),
            max_retry_attempts: parse_var("PANTRYLENS_MAX_RETRIES", defaults.max_retry_attempts),
            max_images_per_request: parse_var("PANTRYLENS_MAX_IMAGES", defaults.max_images_per_request),
            fetch_timeout: Duration::from_secs(parse_var(
                "PANTRYLENS_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )),
        }
    }

    /// Maximum image size in bytes.
    pub fn max_image_size_bytes(&self) -> usize {
        self.max_image_size_mb as usize * 1024 * 1024
    }

    /// Compression skip threshold in bytes.
    pub fn compress_threshold_bytes(&self) -> usize {
        self.compress_threshold_kb as usize * 1024
    }
}

/// Configuration for the Gemini vision client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for the Gemini API.
    pub api_key: String,
    /// Vision model name (e.g., "gemini-2.5-flash-lite").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
}

impl GeminiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`: API key for the Gemini API
    ///
    /// Optional:
    /// - `PANTRYLENS_VISION_MODEL`: Model name (default: "gemini-2.5-flash-lite")
    /// - `PANTRYLENS_VISION_BASE_URL`: API base URL
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model =
            env::var("PANTRYLENS_VISION_MODEL").unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());

        let base_url = env::var("PANTRYLENS_VISION_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_VISION_BASE_URL.to_string());

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.max_image_size_mb, 5);
        assert_eq!(config.max_image_size_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.compress_threshold_bytes(), 300 * 1024);
        assert!(config.compress_images);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }
}
