use futures::StreamExt;
use secrecy::ExposeSecret;
use std::time::Duration;
use thiserror::Error;

use crate::source::UpdateRequest;

const MAX_RETRIES: u32 = 3;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a remote document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A completed fetch, fully materialized in memory.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// URL the document was fetched from
    pub source: String,
    pub http_status: u16,
    /// Response body; `None` when the server sent an empty one.
    pub data: Option<Vec<u8>>,
}

/// Fetch the document an [`UpdateRequest`] points at.
///
/// # Behavior
///
/// - Sends the request's auth value as the `Authorization` header
/// - Rate limiting (HTTP 429) and 5xx responses are retried with exponential
///   backoff (2s, 4s, 8s), up to 3 retries
/// - Other non-2xx responses fail immediately
/// - Bodies are limited to 10MB; truncated downloads are retried
pub async fn fetch_update(
    client: &reqwest::Client,
    request: &UpdateRequest,
    timeout: Duration,
) -> Result<UpdateResult, FetchError> {
    let mut retry_count = 0;

    loop {
        let mut builder = client.get(request.source.clone());
        if let Some(auth) = &request.auth_value {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth.expose_secret());
        }

        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if retry_count >= MAX_RETRIES {
                return Err(if status.is_server_error() {
                    FetchError::HttpStatus(status.as_u16())
                } else {
                    FetchError::RateLimited(MAX_RETRIES)
                });
            }

            tracing::warn!(
                url = %request.source,
                status = %status,
                retry = retry_count,
                delay_secs = backoff_delay(retry_count).as_secs(),
                "Remote service unavailable, backing off"
            );

            backoff(retry_count).await;
            retry_count += 1;
            continue;
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        match read_limited_bytes(response, MAX_FEED_SIZE).await {
            Ok(bytes) => {
                return Ok(UpdateResult {
                    source: request.source.to_string(),
                    http_status: status.as_u16(),
                    data: Some(bytes).filter(|b| !b.is_empty()),
                });
            }
            Err(FetchError::IncompleteResponse { expected, received }) => {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::IncompleteResponse { expected, received });
                }

                tracing::debug!(
                    url = %request.source,
                    expected = expected,
                    received = received,
                    attempt = retry_count + 1,
                    delay_secs = backoff_delay(retry_count).as_secs(),
                    "Retrying incomplete download"
                );

                backoff(retry_count).await;
                retry_count += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Delay before retry number `retry_count + 1`: 2s, 4s, 8s.
fn backoff_delay(retry_count: u32) -> Duration {
    Duration::from_secs(2u64.pow(retry_count + 1))
}

async fn backoff(retry_count: u32) {
    tokio::time::sleep(backoff_delay(retry_count)).await;
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
