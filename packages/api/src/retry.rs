//! HTTP retry helpers for transient errors.
//!
//! Every backend call goes through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so transient failures
//! (timeouts, connection resets, HTTP 429 and 5xx) are retried with
//! exponential backoff according to a [`RetryPolicy`].
//!
//! # Usage
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params), &policy).await?;
//! ```

use std::time::Duration;

use crate::ApiError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after it.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based): 1x, 2x, 4x, ...
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// * [`ApiError::Unauthorized`] on HTTP 401
/// * [`ApiError::Status`] on any other non-retryable or exhausted status
/// * [`ApiError::Http`] if the request cannot be sent or the body read
/// * [`ApiError::Malformed`] if the body is not JSON
pub async fn send_json<F>(
    build_request: F,
    policy: &RetryPolicy,
) -> Result<serde_json::Value, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send(&build_request, policy).await?;

    let url = response.url().to_string();
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|json_err| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!(
            "JSON parse failed\n  \
             url: {url}\n  \
             status: {status}\n  \
             content-type: {content_type:?}\n  \
             received: {} bytes\n  \
             parse error: {json_err}\n  \
             body preview: {preview}",
            text.len(),
        );
        ApiError::Malformed {
            url,
            message: format!("JSON parse failed: {json_err}"),
        }
    })
}

/// Core retry loop. Returns the successful [`reqwest::Response`]
/// (status 2xx or 3xx).
async fn send<F>(build_request: &F, policy: &RetryPolicy) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ApiError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                let url = response.url().to_string();

                if status == reqwest::StatusCode::UNAUTHORIZED {
                    return Err(ApiError::Unauthorized { url });
                }

                // 429 Too Many Requests and 5xx Server Error: retry
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} from {url}");
                        attempt += 1;
                        continue;
                    }
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        url,
                    });
                }

                // Remaining 4xx: permanent, don't retry
                if status.is_client_error() {
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        url,
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
