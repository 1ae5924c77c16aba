//! Async HTTP client wrapping reqwest, used for documents linked from the cause list.
//!
//! Plain HTTP, no browser. Handles redirects, timeouts,
//! retry on 5xx, and backoff on 429.

use anyhow::{bail, Result};
use std::time::Duration;

/// Response from a binary GET request.
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client for linked documents.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with standard Chrome user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_retries: 2,
        }
    }

    /// GET `url` and return the raw body, retrying on 5xx and backing off on 429.
    ///
    /// Any status of 400 or above left after retries is an error.
    pub async fn get_bytes(&self, url: &str) -> Result<BinaryResponse> {
        let mut retries = 0u32;

        loop {
            match self.client.get(url).send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        tracing::debug!(url, status, retries, "retrying after server error");
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < self.max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    if status >= 400 {
                        bail!("GET {url} returned HTTP {status}");
                    }

                    let content_type = r
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());
                    let body = r.bytes().await?.to_vec();

                    return Ok(BinaryResponse {
                        status,
                        content_type,
                        body,
                    });
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1)))
}
