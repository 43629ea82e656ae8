//! Gemini vision API client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{VisionClient, VisionError};
use crate::config::{ConfigError, GeminiConfig};

/// Gemini `generateContent` API client.
#[derive(Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new client from environment configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(GeminiConfig::from_env()?))
    }
}

/// Gemini API request format.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, VisionError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(instruction.to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        }),
                    },
                ],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        tracing::debug!(model = %self.config.model, "calling vision API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Keep the failure kind visible in the error text so the retry
                // controller classifies it correctly.
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection"
                } else {
                    "request"
                };
                VisionError::RequestFailed(format!("{} error: {}", kind, e))
            })?;

        let status = response.status().as_u16();

        let body = response
            .text()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        if status != 200 {
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                return Err(VisionError::Api {
                    status,
                    message: error_response.error.message,
                });
            }
            return Err(VisionError::Api {
                status,
                message: body,
            });
        }

        let response: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| VisionError::ParseError(e.to_string()))?;

        // Extract text from the first candidate's first text part
        let text = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| VisionError::ParseError("no text content in response".to_string()))?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some("describe".to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/png".to_string(),
                            data: "aGVsbG8=".to_string(),
                        }),
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        // Absent fields must be omitted, not serialized as null
        assert!(json["contents"][0]["parts"][0]
            .as_object()
            .unwrap()
            .get("inline_data")
            .is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"ingredients\":[]}"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let text = response.candidates[0].content.as_ref().unwrap().parts[0]
            .text
            .as_ref()
            .unwrap();
        assert_eq!(text, "{\"ingredients\":[]}");
    }
}
