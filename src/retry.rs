//! Retry controller for the vision extraction call.
//!
//! Bounded retries with exponential backoff. Errors whose text carries a
//! transient indicator are retried; everything else stops immediately, even
//! with budget remaining, so permanent failures never burn quota.

use std::time::Duration;

use crate::extract::{extract_ingredients, Detection};
use crate::image::RawImage;
use crate::vision::{VisionClient, VisionError};

/// Substrings marking an error as likely to succeed on retry.
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "connection",
    "429",
    "500",
    "502",
    "503",
    "retryable",
];

/// Classify a vision error as transient by inspecting its text.
pub fn is_transient(error: &VisionError) -> bool {
    let text = error.to_string().to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Run the extraction with bounded retries and exponential backoff.
///
/// The delay starts at one second and doubles per retry (1s, 2s, 4s, ...).
/// An empty result without an error counts against the budget and is retried;
/// a permanent error returns immediately with no sleep. Exhaustion returns
/// `None`, logged as a warning, never an error.
pub async fn extract_with_retries(
    vision: &dyn VisionClient,
    image: &RawImage,
    max_attempts: u32,
) -> Option<Detection> {
    let mut attempt = 0;
    let mut delay = Duration::from_secs(1);

    while attempt < max_attempts {
        match extract_ingredients(vision, image).await {
            Ok(Some(detection)) => return Some(detection),
            Ok(None) => {
                // No result but no raised error: might be a transient API hiccup
                attempt += 1;
                if attempt < max_attempts {
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        "empty extraction result, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
            Err(e) => {
                if is_transient(&e) && attempt < max_attempts - 1 {
                    attempt += 1;
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "transient vision error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                } else {
                    tracing::warn!(error = %e, "giving up on ingredient extraction");
                    return None;
                }
            }
        }
    }

    tracing::warn!(max_attempts, "ingredient extraction exhausted retry budget");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageKind;
    use crate::vision::FakeVisionClient;
    use tokio::time::Instant;

    const GOOD_RESPONSE: &str =
        r#"{"ingredients": ["tomato"], "confidence_scores": {"tomato": 0.95}}"#;

    fn test_image() -> RawImage {
        RawImage {
            data: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
            format: ImageKind::Png,
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&VisionError::RequestFailed(
            "connection reset by peer".to_string()
        )));
        assert!(is_transient(&VisionError::RequestFailed(
            "timeout after 30s".to_string()
        )));
        assert!(is_transient(&VisionError::Api {
            status: 429,
            message: "rate limited".to_string()
        }));
        assert!(is_transient(&VisionError::Api {
            status: 503,
            message: "overloaded".to_string()
        }));
        assert!(is_transient(&VisionError::RequestFailed(
            "marked retryable by server".to_string()
        )));
        assert!(!is_transient(&VisionError::Api {
            status: 401,
            message: "invalid api key".to_string()
        }));
        assert!(!is_transient(&VisionError::RequestFailed(
            "malformed request".to_string()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_then_success() {
        let client = FakeVisionClient::new();
        client.push_err(VisionError::RequestFailed("connection refused".to_string()));
        client.push_err(VisionError::Api {
            status: 503,
            message: "overloaded".to_string(),
        });
        client.push_ok(GOOD_RESPONSE);

        let start = Instant::now();
        let detection = extract_with_retries(&client, &test_image(), 3).await.unwrap();

        assert_eq!(detection.ingredients, vec!["tomato"]);
        assert_eq!(client.call_count(), 3);
        // Backoff doubles: 1s after the first failure, 2s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops_immediately() {
        let client = FakeVisionClient::new();
        client.push_err(VisionError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        });

        let start = Instant::now();
        let result = extract_with_retries(&client, &test_image(), 3).await;

        assert!(result.is_none());
        assert_eq!(client.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_results_exhaust_budget() {
        let client = FakeVisionClient::with_response("no json here");

        let start = Instant::now();
        let result = extract_with_retries(&client, &test_image(), 3).await;

        assert!(result.is_none());
        assert_eq!(client.call_count(), 3);
        // Sleeps between attempts only: 1s + 2s
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_on_last_attempt_not_retried() {
        let client = FakeVisionClient::new();
        client.push_err(VisionError::RequestFailed("timeout".to_string()));
        client.push_err(VisionError::RequestFailed("timeout".to_string()));

        let result = extract_with_retries(&client, &test_image(), 2).await;

        assert!(result.is_none());
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_immediate_success_makes_one_call() {
        let client = FakeVisionClient::with_response(GOOD_RESPONSE);
        let detection = extract_with_retries(&client, &test_image(), 3).await.unwrap();
        assert_eq!(detection.ingredients, vec!["tomato"]);
        assert_eq!(client.call_count(), 1);
    }
}
