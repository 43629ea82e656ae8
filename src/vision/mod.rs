//! Vision inference client abstraction.
//!
//! This module provides a trait-based abstraction over image-capable
//! inference providers, with a Gemini implementation for production and a
//! fake for tests.

mod fake;
mod gemini;

pub use fake::FakeVisionClient;
pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for vision inference calls.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision request failed: {0}")]
    RequestFailed(String),

    #[error("vision API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse vision response: {0}")]
    ParseError(String),
}

/// Trait for image-capable inference clients.
///
/// Implementations should be stateless and thread-safe. One call sends the
/// instruction plus one image and returns the model's raw text response.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send an instruction and an image to the model, returning its text output.
    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, VisionError>;
}
