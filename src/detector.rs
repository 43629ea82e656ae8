//! Batch coordination and the two invocation adapters.
//!
//! Both adapters share one per-image pipeline (validate, compress, extract,
//! filter); "never fail" versus "always fail with detail" is a policy applied
//! at the adapter boundary, not duplicated pipeline logic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;

use crate::config::DetectorConfig;
use crate::error::{DetectError, PipelineError};
use crate::extract::{extract_ingredients, Detection};
use crate::filter::filter_by_confidence;
use crate::http::HttpClient;
use crate::image::{maybe_compress, validate_image, RawImage};
use crate::retry::extract_with_retries;
use crate::source::{resolve, ImageSource};
use crate::vision::VisionClient;

/// Prefix appended to the outgoing message when ingredients are detected.
const DETECTED_INGREDIENTS_TAG: &str = "[Detected Ingredients]";

/// The outgoing conversational request, as seen by the pre-processing adapter.
///
/// The adapter mutates this in place: the text may gain an ingredients
/// annotation, and the image list is always cleared so large payloads never
/// travel downstream.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub message: String,
    pub images: Vec<ImageSource>,
}

/// Ingredient recognition pipeline over an HTTP client and a vision client.
pub struct IngredientDetector {
    http: Arc<dyn HttpClient>,
    vision: Arc<dyn VisionClient>,
    config: DetectorConfig,
}

impl IngredientDetector {
    /// Create a new detector.
    pub fn new(
        http: Arc<dyn HttpClient>,
        vision: Arc<dyn VisionClient>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            http,
            vision,
            config,
        }
    }

    /// Shared per-image pipeline: validate format then size, optionally
    /// compress, extract (with or without the retry layer), filter.
    ///
    /// Returns the surviving ingredient names alongside the full detection so
    /// each adapter can apply its own empty-result policy.
    async fn process_bytes(
        &self,
        bytes: Vec<u8>,
        with_retries: bool,
    ) -> Result<(Vec<String>, Detection), PipelineError> {
        let format = validate_image(&bytes, &self.config)?;
        let image = maybe_compress(RawImage { data: bytes, format }, &self.config);

        let detection = if with_retries {
            extract_with_retries(
                self.vision.as_ref(),
                &image,
                self.config.max_retry_attempts,
            )
            .await
        } else {
            // Latency-sensitive path: a raised inference error is logged and
            // degrades to "no result" instead of going through the retry layer.
            match extract_ingredients(self.vision.as_ref(), &image).await {
                Ok(detection) => detection,
                Err(e) => {
                    tracing::warn!(error = %e, "vision extraction failed");
                    None
                }
            }
        };

        let detection = detection.ok_or(PipelineError::ExtractionFailed)?;

        let filtered = filter_by_confidence(
            &detection.ingredients,
            &detection.confidence_scores,
            self.config.min_ingredient_confidence,
        );

        Ok((filtered, detection))
    }

    /// Run one image through resolve + pipeline, degrading every failure to
    /// "contributed nothing". Used by the pre-processing fan-out.
    async fn process_single_image(&self, idx: usize, source: &ImageSource) -> Option<Vec<String>> {
        let bytes = match resolve(self.http.as_ref(), source).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(image = idx + 1, error = %e, "failed to get image bytes");
                return None;
            }
        };

        match self.process_bytes(bytes, false).await {
            Ok((ingredients, _)) if !ingredients.is_empty() => {
                tracing::info!(
                    image = idx + 1,
                    count = ingredients.len(),
                    threshold = self.config.min_ingredient_confidence,
                    "extracted ingredients"
                );
                Some(ingredients)
            }
            Ok(_) => {
                tracing::warn!(image = idx + 1, "no ingredients with sufficient confidence");
                None
            }
            Err(e) => {
                tracing::warn!(image = idx + 1, error = %e, "image skipped");
                None
            }
        }
    }

    /// Pre-processing adapter: silently enrich an outgoing message with
    /// ingredients detected in its images.
    ///
    /// All images are processed concurrently; per-image failures contribute
    /// nothing and never abort the batch. When anything survives filtering,
    /// the deduplicated list (first-seen order, by request image order) is
    /// appended to the message text. The image list is always cleared,
    /// regardless of outcome. This adapter never fails.
    pub async fn annotate_message(&self, input: &mut OutgoingMessage) {
        if input.images.is_empty() {
            tracing::debug!("no images in request, skipping ingredient extraction");
            return;
        }

        // Taking the list up front guarantees the images are cleared from the
        // request no matter what happens below.
        let mut images = std::mem::take(&mut input.images);
        if images.len() > self.config.max_images_per_request {
            tracing::warn!(
                count = images.len(),
                max = self.config.max_images_per_request,
                "request exceeds image cap, truncating"
            );
            images.truncate(self.config.max_images_per_request);
        }

        tracing::debug!(count = images.len(), "processing images concurrently");

        let tasks = images
            .iter()
            .enumerate()
            .map(|(idx, source)| self.process_single_image(idx, source));
        let results = join_all(tasks).await;

        // join_all returns results in request order, so first-seen
        // deduplication is deterministic regardless of completion order.
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for ingredients in results.into_iter().flatten() {
            for name in ingredients {
                if seen.insert(name.clone()) {
                    unique.push(name);
                }
            }
        }

        if !unique.is_empty() {
            tracing::info!(
                count = unique.len(),
                ingredients = ?unique,
                "appending detected ingredients to message"
            );
            input.message.push_str("\n\n");
            input.message.push_str(DETECTED_INGREDIENTS_TAG);
            input.message.push(' ');
            input.message.push_str(&unique.join(", "));
        }

        tracing::debug!("images cleared from request after ingredient extraction");
    }

    /// On-demand adapter: extract ingredients from one opaque image reference.
    ///
    /// Unlike the pre-processing adapter, every terminal failure becomes a
    /// distinct caller-facing [`DetectError`], and the vision call goes
    /// through the retry controller. On success the returned detection is
    /// restricted to the ingredients that met the confidence threshold, with
    /// a description summarizing the top five.
    pub async fn detect_ingredients(&self, image_data: &str) -> Result<Detection, DetectError> {
        let source = ImageSource::parse(image_data);

        let bytes = resolve(self.http.as_ref(), &source).await.map_err(|e| {
            tracing::warn!(error = %e, "could not resolve image source");
            DetectError::SourceUnavailable
        })?;

        let (filtered, detection) =
            self.process_bytes(bytes, true)
                .await
                .map_err(|e| match e {
                    PipelineError::InvalidFormat => DetectError::InvalidFormat,
                    PipelineError::TooLarge { .. } => {
                        DetectError::TooLarge(self.config.max_image_size_mb)
                    }
                    PipelineError::ExtractionFailed => DetectError::ExtractionFailed,
                })?;

        if filtered.is_empty() {
            return Err(DetectError::NoConfidentIngredients);
        }

        let confidence_scores: HashMap<String, f64> = filtered
            .iter()
            .map(|name| {
                let score = detection
                    .confidence_scores
                    .get(name)
                    .copied()
                    .unwrap_or(0.0);
                (name.clone(), score)
            })
            .collect();

        let description = describe_detection(&filtered, &confidence_scores);

        Ok(Detection {
            ingredients: filtered,
            confidence_scores,
            description: Some(description),
        })
    }
}

/// Summarize up to five ingredients with percentage confidence, plus a
/// remainder count for the rest.
fn describe_detection(ingredients: &[String], confidence_scores: &HashMap<String, f64>) -> String {
    let top: Vec<String> = ingredients
        .iter()
        .take(5)
        .map(|name| {
            let score = confidence_scores.get(name).copied().unwrap_or(0.0);
            format!("{} ({:.0}%)", name, score * 100.0)
        })
        .collect();

    let mut description = format!("Detected ingredients: {}", top.join(", "));
    if ingredients.len() > 5 {
        description.push_str(&format!(" and {} more", ingredients.len() - 5));
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_describe_detection_short_list() {
        let ingredients = names(&["tomato", "basil"]);
        let scores: HashMap<String, f64> =
            [("tomato".to_string(), 0.95), ("basil".to_string(), 0.88)]
                .into_iter()
                .collect();
        assert_eq!(
            describe_detection(&ingredients, &scores),
            "Detected ingredients: tomato (95%), basil (88%)"
        );
    }

    #[test]
    fn test_describe_detection_remainder_count() {
        let ingredients = names(&["a", "b", "c", "d", "e", "f", "g"]);
        let scores: HashMap<String, f64> = ingredients
            .iter()
            .map(|name| (name.clone(), 0.8))
            .collect();
        let description = describe_detection(&ingredients, &scores);
        assert!(description.starts_with("Detected ingredients: a (80%), b (80%)"));
        assert!(description.ends_with(" and 2 more"));
    }
}
