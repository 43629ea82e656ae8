//! HTTP client trait and implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch binary content from a URL.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Production HTTP client backed by reqwest.
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        tracing::debug!(url, "fetching image bytes");
        let response = self.inner.get(parsed).send().await?;

        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "fetch failed");
            return Err(FetchError::Status(response.status().as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Mock response for testing.
#[derive(Clone)]
pub enum MockResponse {
    Bytes(Vec<u8>),
    Error(String),
}

/// Mock HTTP client for testing.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
}

impl MockClient {
    /// Create a new empty mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bytes response for a URL.
    pub fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), MockResponse::Bytes(bytes));
        self
    }

    /// Add an error response for a URL.
    pub fn with_error(mut self, url: &str, error: &str) -> Self {
        self.responses
            .insert(url.to_string(), MockResponse::Error(error.to_string()));
        self
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.responses.get(url) {
            Some(MockResponse::Bytes(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Error(e)) => Err(FetchError::InvalidUrl(e.clone())),
            None => Err(FetchError::InvalidUrl(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_bytes() {
        let client = MockClient::new().with_bytes("https://example.com/a.png", vec![1, 2, 3]);
        let bytes = client.fetch_bytes("https://example.com/a.png").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_mock_client_unknown_url() {
        let client = MockClient::new();
        assert!(client.fetch_bytes("https://example.com/b.png").await.is_err());
    }
}
