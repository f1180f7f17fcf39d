//! Normalizes a [`ConversionInput`] into bytes.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tracing::debug;

use meshport_core::config::fetch::FetchConfig;

use crate::models::ConversionInput;

/// Failures while obtaining source bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level HTTP failure.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Failed to fetch {url}: HTTP {status}")]
    Status {
        /// Requested locator.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// The body exceeded the configured limit.
    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested locator.
        url: String,
        /// Configured maximum.
        limit: u64,
    },
}

/// Fetches remote sources with a shared HTTP client.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
    max_response_bytes: u64,
}

impl SourceFetcher {
    /// Build the HTTP client from the fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self, SourceError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone());
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Bytes of any input variant. Blobs and buffers are passed through.
    pub async fn read(&self, input: &ConversionInput) -> Result<Bytes, SourceError> {
        match input {
            ConversionInput::Url(url) => self.fetch(url).await,
            ConversionInput::Blob(blob) => Ok(blob.data.clone()),
            ConversionInput::Buffer(bytes) => Ok(bytes.clone()),
        }
    }

    /// HTTP GET `url`, failing on non-success status or an oversized body.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, SourceError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || SourceError::TooLarge {
            url: url.to_string(),
            limit: self.max_response_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_response_bytes)
        {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_response_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "Fetched remote source");
        Ok(body.freeze())
    }
}
