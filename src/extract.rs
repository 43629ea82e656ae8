//! Ingredient extraction from a single image via the vision client.
//!
//! The model is asked for a bare JSON object, but real responses often wrap
//! it in prose, so parsing is deliberately lenient: try the whole body as
//! JSON first, then fall back to the outermost `{...}` span.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DetectionError;
use crate::image::RawImage;
use crate::vision::{VisionClient, VisionError};

/// Fixed instruction sent with every extraction call.
pub const EXTRACTION_PROMPT: &str = r#"Extract all food ingredients from this image. Return ONLY valid JSON with 'ingredients' list (strings) and 'confidence_scores' dict mapping ingredient name to confidence (0.0-1.0). Example: {"ingredients": ["tomato", "basil"], "confidence_scores": {"tomato": 0.95, "basil": 0.88}}"#;

/// A validated ingredient detection result.
///
/// Invariants enforced at construction: ingredient names are distinct,
/// trimmed, lowercase and non-empty; every ingredient has a confidence score
/// in (0.0, 1.0]. Extra score keys are tolerated. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub ingredients: Vec<String>,
    pub confidence_scores: HashMap<String, f64>,
    pub description: Option<String>,
}

impl Detection {
    /// Build a detection, normalizing names and rejecting structural violations.
    pub fn new(
        ingredients: Vec<String>,
        confidence_scores: HashMap<String, f64>,
        description: Option<String>,
    ) -> Result<Self, DetectionError> {
        let mut scores = HashMap::with_capacity(confidence_scores.len());
        for (name, score) in confidence_scores {
            if !(score > 0.0 && score <= 1.0) {
                return Err(DetectionError::ScoreOutOfRange(name, score));
            }
            scores.insert(name.trim().to_lowercase(), score);
        }

        let mut normalized = Vec::with_capacity(ingredients.len());
        for name in ingredients {
            let name = name.trim().to_lowercase();
            if name.is_empty() || normalized.contains(&name) {
                continue;
            }
            if !scores.contains_key(&name) {
                return Err(DetectionError::MissingScore(name));
            }
            normalized.push(name);
        }

        if normalized.is_empty() {
            return Err(DetectionError::EmptyIngredients);
        }

        Ok(Self {
            ingredients: normalized,
            confidence_scores: scores,
            description,
        })
    }
}

/// Wire shape of the model's JSON output.
#[derive(Debug, Deserialize)]
struct RawDetection {
    ingredients: Vec<String>,
    #[serde(default)]
    confidence_scores: HashMap<String, Value>,
    #[serde(default)]
    image_description: Option<String>,
}

/// Parse a vision response into a validated [`Detection`].
///
/// Stage 1 parses the entire response text as JSON; stage 2 falls back to the
/// span from the first `{` to the last `}`. Returns `None` when no JSON object
/// is found or the object violates the detection invariants.
pub fn parse_vision_response(text: &str) -> Option<Detection> {
    let value = serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| extract_json_object(text))?;

    let raw: RawDetection = serde_json::from_value(value).ok()?;

    let mut scores = HashMap::with_capacity(raw.confidence_scores.len());
    for (name, value) in raw.confidence_scores {
        scores.insert(name, usable_score(&value)?);
    }

    match Detection::new(raw.ingredients, scores, raw.image_description) {
        Ok(detection) => Some(detection),
        Err(e) => {
            tracing::debug!(error = %e, "vision response failed detection validation");
            None
        }
    }
}

fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(text.get(start..=end)?).ok()
}

/// A confidence value is usable if it is a number or numeric string.
fn usable_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Run one vision inference call and parse the result. Single attempt, no
/// retry; the retry controller wraps this at the extraction layer.
///
/// `Ok(None)` means the call succeeded but no usable detection came back;
/// `Err` carries the raised inference error for transient/permanent
/// classification by the caller.
pub async fn extract_ingredients(
    vision: &dyn VisionClient,
    image: &RawImage,
) -> Result<Option<Detection>, VisionError> {
    let text = vision
        .describe_image(EXTRACTION_PROMPT, &image.data, image.format.mime_type())
        .await?;

    match parse_vision_response(&text) {
        Some(detection) => Ok(Some(detection)),
        None => {
            tracing::warn!("failed to parse ingredients from vision response");
            Ok(None)
        }
    }
}
