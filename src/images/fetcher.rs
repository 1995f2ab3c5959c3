use super::ImageError;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

/// Default per-request timeout for image downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default body size limit (10MB).
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Transport boundary: retrieves the raw bytes of one image.
///
/// Implementations must not cache; [`ImageCache`](super::ImageCache) owns
/// memoization and de-duplication.
#[async_trait]
pub trait ImageFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError>;
}

/// [`ImageFetcher`] over HTTP(S).
///
/// One attempt per call. Failed slots stay empty, so retrying here would only
/// delay the moment the placeholder becomes final.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError> {
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| ImageError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ImageError::BadStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, self.max_bytes).await
        };

        let bytes = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ImageError::Timeout)??;

        tracing::trace!(url = %url, bytes = bytes.len(), "Image downloaded");
        Ok(bytes)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ImageError> {
    // Fast path: reject on Content-Length before reading anything
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ImageError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ImageError::Network(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ImageError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
