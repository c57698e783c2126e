//! Payload size metrics
//!
//! HTML and image sizes are measured concurrently; both finish before the
//! caller builds its record. Measurement problems degrade to `0` and a
//! warning, they never fail an interaction.

use base64::Engine;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, warn};

use framedev_common::Result;

/// Sizes for one interaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadSizes {
    pub html_size: u64,
    pub image_size: u64,
}

/// Measures payload sizes referenced by a frame
#[derive(Clone)]
pub struct MetricsCollector {
    client: reqwest::Client,
}

impl MetricsCollector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Measure the HTML body and the frame image together.
    pub async fn collect(&self, html: &[u8], image_url: Option<&str>) -> PayloadSizes {
        let (html_size, image_size) = tokio::join!(
            async { html.len() as u64 },
            self.image_size(image_url)
        );
        PayloadSizes {
            html_size,
            image_size,
        }
    }

    /// Byte size of the image at `url`, 0 when absent or unmeasurable.
    pub async fn image_size(&self, url: Option<&str>) -> u64 {
        let Some(url) = url else {
            return 0;
        };

        if url.starts_with("data:") {
            return data_url_size(url).unwrap_or_else(|| {
                warn!("malformed data URL for frame image");
                0
            });
        }

        match self.remote_image_size(url).await {
            Ok(size) => size,
            Err(e) => {
                warn!("could not measure image {}: {}", url, e);
                0
            }
        }
    }

    async fn remote_image_size(&self, url: &str) -> Result<u64> {
        // HEAD first; only trust an explicit, non-zero Content-Length.
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let declared = resp
                    .headers()
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|len| *len > 0);
                if let Some(len) = declared {
                    return Ok(len);
                }
                debug!("no usable content-length for {}, downloading", url);
            }
            Ok(resp) => debug!("HEAD {} returned {}, downloading", url, resp.status()),
            Err(e) => debug!("HEAD {} failed ({}), downloading", url, e),
        }

        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.len() as u64)
    }
}

/// Decoded payload size of a `data:` URL.
pub fn data_url_size(url: &str) -> Option<u64> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;

    if header.ends_with(";base64") {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .ok()
            .map(|bytes| bytes.len() as u64)
    } else {
        Some(urlencoding::decode_binary(payload.as_bytes()).len() as u64)
    }
}
