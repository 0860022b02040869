//! Context resource fetching and payload decoding.

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use lumen_core::config::PayloadEncoding;
use lumen_core::error::{LumenError, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

/// Accepts payloads with or without `=` padding, like a browser `atob`.
const FORGIVING_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A single static resource holding the knowledge context.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Fetches the undecoded payload.
    async fn fetch(&self) -> Result<String>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Context served over HTTP(S).
#[derive(Clone)]
pub struct HttpContextSource {
    client: Client,
    url: String,
}

impl HttpContextSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ContextSource for HttpContextSource {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| LumenError::ContextIo(format!("{}: {err}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LumenError::ContextFetchFailed {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| LumenError::ContextDecodeFailed(err.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Context stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileContextSource {
    path: PathBuf,
}

impl FileContextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContextSource for FileContextSource {
    async fn fetch(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        String::from_utf8(bytes).map_err(|err| LumenError::ContextDecodeFailed(err.to_string()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Picks an HTTP source for `http://` / `https://` locations, a file source otherwise.
pub fn source_for_location(location: &str) -> Arc<dyn ContextSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpContextSource::new(location))
    } else {
        Arc::new(FileContextSource::new(location))
    }
}

/// Turns a fetched payload into context text according to `encoding`.
///
/// Base64 payloads may contain line breaks and may omit padding.
pub fn decode_payload(payload: &str, encoding: PayloadEncoding) -> Result<String> {
    match encoding {
        PayloadEncoding::Raw => Ok(payload.to_string()),
        PayloadEncoding::Base64 => {
            let compact: String = payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let bytes = FORGIVING_BASE64
                .decode(compact.as_bytes())
                .map_err(|err| LumenError::ContextDecodeFailed(err.to_string()))?;
            String::from_utf8(bytes).map_err(|err| LumenError::ContextDecodeFailed(err.to_string()))
        }
    }
}
