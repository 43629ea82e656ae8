//! Fake vision client for testing.
//!
//! Returns scripted responses in order, allowing tests to run without
//! network access or API costs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{VisionClient, VisionError};

/// A fake vision client for testing.
///
/// Responses keyed by exact image bytes take precedence, which keeps
/// concurrent multi-image tests deterministic. Otherwise scripted responses
/// are consumed first-in-first-out, one per call; once the script is
/// exhausted the default response (if any) is returned. Calls are counted so
/// tests can assert on retry behavior.
#[derive(Debug, Default)]
pub struct FakeVisionClient {
    keyed: Mutex<HashMap<Vec<u8>, String>>,
    scripted: Mutex<VecDeque<Result<String, VisionError>>>,
    default_response: Option<String>,
    calls: AtomicU32,
}

impl FakeVisionClient {
    /// Create a new client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client that always returns the given response text.
    pub fn with_response(response: &str) -> Self {
        Self {
            default_response: Some(response.to_string()),
            ..Self::default()
        }
    }

    /// Queue a successful response.
    pub fn push_ok(&self, response: &str) {
        self.scripted
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    /// Queue an error response.
    pub fn push_err(&self, error: VisionError) {
        self.scripted.lock().unwrap().push_back(Err(error));
    }

    /// Register a response for calls carrying exactly these image bytes.
    pub fn add_image_response(&self, image: &[u8], response: &str) {
        self.keyed
            .lock()
            .unwrap()
            .insert(image.to_vec(), response.to_string());
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for FakeVisionClient {
    async fn describe_image(
        &self,
        _instruction: &str,
        image: &[u8],
        _mime_type: &str,
    ) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.keyed.lock().unwrap().get(image) {
            return Ok(response.clone());
        }

        if let Some(next) = self.scripted.lock().unwrap().pop_front() {
            return next;
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(VisionError::RequestFailed(
                "no scripted response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let client = FakeVisionClient::new();
        client.push_ok("first");
        client.push_ok("second");

        assert_eq!(client.describe_image("p", &[], "image/png").await.unwrap(), "first");
        assert_eq!(client.describe_image("p", &[], "image/png").await.unwrap(), "second");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_default_response_after_script() {
        let client = FakeVisionClient::with_response("default");
        client.push_ok("scripted");

        assert_eq!(client.describe_image("p", &[], "image/png").await.unwrap(), "scripted");
        assert_eq!(client.describe_image("p", &[], "image/png").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_errors_without_script_or_default() {
        let client = FakeVisionClient::new();
        assert!(client.describe_image("p", &[], "image/png").await.is_err());
    }
}
