//! Image-based ingredient recognition for a conversational recipe service.
//!
//! Given one or more uploaded images, produce a deduplicated,
//! confidence-filtered list of food ingredient names using a vision-capable
//! inference call. Two invocation adapters share one pipeline:
//!
//! - [`IngredientDetector::annotate_message`] runs silently ahead of the main
//!   conversational turn, appending a `[Detected Ingredients]` annotation and
//!   never failing;
//! - [`IngredientDetector::detect_ingredients`] is the explicit on-demand
//!   call, returning a validated [`Detection`] or a typed, user-facing
//!   [`DetectError`].
//!
//! External collaborators (the agent runtime, recipe search, session
//! persistence) sit behind the [`HttpClient`] and [`VisionClient`] traits.

pub mod config;
pub mod detector;
pub mod error;
pub mod extract;
pub mod filter;
pub mod http;
pub mod image;
pub mod retry;
pub mod source;
pub mod vision;

pub use config::{ConfigError, DetectorConfig, GeminiConfig};
pub use detector::{IngredientDetector, OutgoingMessage};
pub use error::{DetectError, DetectionError, FetchError, PipelineError, SourceError};
pub use extract::{extract_ingredients, parse_vision_response, Detection, EXTRACTION_PROMPT};
pub use filter::filter_by_confidence;
pub use http::{HttpClient, MockClient, MockResponse, ReqwestClient};
pub use image::{maybe_compress, sniff_format, validate_image, ImageKind, RawImage};
pub use retry::{extract_with_retries, is_transient};
pub use source::{resolve, ImageSource};
pub use vision::{FakeVisionClient, GeminiClient, VisionClient, VisionError};
