//! Live feed fetched category by category over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use hazard_map_api::{ApiError, RetryPolicy, retry};
use hazard_map_map_models::RawAlert;

use crate::{AlertFeed, FeedCategory, FeedError, process_category};

/// Reads each category's feed document from `base_url`.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpFeed {
    /// # Errors
    ///
    /// Returns [`FeedError::Api`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }
}

#[async_trait]
impl AlertFeed for HttpFeed {
    /// Fetches every category. A category that fails is logged and
    /// skipped; only when all of them fail is an error returned.
    async fn active_warnings(&self) -> Result<Vec<RawAlert>, FeedError> {
        let categories = FeedCategory::all();
        let mut alerts = Vec::new();
        let mut failed = 0;

        for category in &categories {
            let url = format!("{}{}", self.base_url, category.endpoint());
            match retry::send_json(|| self.client.get(&url), &self.retry).await {
                Ok(document) => {
                    let processed = process_category(*category, &document);
                    log::debug!("{category}: {} warnings", processed.len());
                    alerts.extend(processed);
                }
                Err(e) => {
                    log::warn!("{category} feed unavailable: {e}");
                    failed += 1;
                }
            }
        }

        if failed == categories.len() {
            return Err(FeedError::Unavailable { failed });
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use hazard_map_map_models::FailureKind;

    use super::*;

    #[tokio::test]
    async fn unreachable_feed_is_unavailable() {
        let feed = HttpFeed::new(
            "http://127.0.0.1:9/feed",
            Duration::from_secs(2),
            RetryPolicy::none(),
        )
        .unwrap();

        let err = feed.active_warnings().await.unwrap_err();

        assert!(matches!(err, FeedError::Unavailable { failed: 6 }));
        assert_eq!(err.kind(), FailureKind::NetworkFailure);
    }
}
