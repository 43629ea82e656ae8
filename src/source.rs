//! Image source resolution: normalize an arbitrary image reference into raw bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::SourceError;
use crate::http::HttpClient;

/// A single image reference, as supplied by the caller.
///
/// Built per request and consumed once by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// HTTP or HTTPS URL to fetch.
    RemoteUrl(String),
    /// Data URI payload: the media type and the base64 text after the comma.
    DataUri { mime: String, data: String },
    /// Bare base64 text with no URI wrapping.
    PlainBase64(String),
    /// Raw image bytes, passed through unchanged.
    RawBytes(Vec<u8>),
}

impl ImageSource {
    /// Classify an opaque image reference string.
    ///
    /// `http://` and `https://` prefixes become [`ImageSource::RemoteUrl`],
    /// `data:` becomes [`ImageSource::DataUri`], and anything else is treated
    /// as plain base64 text. A `data:` reference with no comma keeps its whole
    /// remainder as the payload, which fails base64 decoding in [`resolve`].
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return ImageSource::RemoteUrl(reference.to_string());
        }

        if let Some(rest) = reference.strip_prefix("data:") {
            return match rest.split_once(',') {
                Some((header, payload)) => ImageSource::DataUri {
                    mime: header.split(';').next().unwrap_or("").to_string(),
                    data: payload.to_string(),
                },
                None => ImageSource::DataUri {
                    mime: String::new(),
                    data: rest.to_string(),
                },
            };
        }

        ImageSource::PlainBase64(reference.to_string())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::RawBytes(bytes)
    }
}

/// Resolve an image source into raw bytes.
///
/// Remote URLs are fetched with the client's configured timeout; any network
/// error or non-success status fails immediately. Retrying is the retry
/// controller's job at the extraction layer, never the resolver's.
pub async fn resolve(http: &dyn HttpClient, source: &ImageSource) -> Result<Vec<u8>, SourceError> {
    match source {
        ImageSource::RemoteUrl(url) => Ok(http.fetch_bytes(url).await?),
        ImageSource::DataUri { data, .. } => Ok(BASE64.decode(data.trim())?),
        ImageSource::PlainBase64(data) => Ok(BASE64.decode(data.trim())?),
        ImageSource::RawBytes(bytes) => Ok(bytes.clone()),
    }
}
