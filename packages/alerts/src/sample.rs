//! Built-in sample feed used when no live feed is configured.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hazard_map_map_models::RawAlert;
use serde_json::{Value, json};

use crate::{AlertFeed, FeedCategory, FeedError, process_category};

/// Serves a fixed set of warnings, one per category except rip currents,
/// stamped relative to the time of the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleFeed;

impl SampleFeed {
    /// The sample document for a category as of `now`.
    #[must_use]
    pub fn document(category: FeedCategory, now: DateTime<Utc>) -> Value {
        let issued = now.to_rfc3339();
        let until = |hours: i64| (now + Duration::hours(hours)).to_rfc3339();

        match category {
            FeedCategory::Tsunami => json!({
                "warnings": [{
                    "id": 1,
                    "level": "high",
                    "description": "Tsunami warning for coastal areas of Tamil Nadu and Andhra Pradesh",
                    "latitude": 13.0827,
                    "longitude": 80.2707,
                    "affected_area": "Tamil Nadu and Andhra Pradesh coast",
                    "issued_time": issued,
                    "valid_until": until(6),
                    "status": "active"
                }]
            }),
            FeedCategory::StormSurge => json!({
                "warnings": [{
                    "id": 1,
                    "level": "moderate",
                    "description": "Storm surge warning for Odisha coast",
                    "latitude": 20.2961,
                    "longitude": 85.8245,
                    "affected_area": "Odisha coast",
                    "issued_time": issued,
                    "valid_until": until(12),
                    "status": "active"
                }]
            }),
            FeedCategory::HighWaves => json!({
                "warnings": [{
                    "id": 1,
                    "level": "moderate",
                    "description": "High wave warning for Kerala coast",
                    "latitude": 10.8505,
                    "longitude": 76.2711,
                    "wave_height": "3-4 meters",
                    "issued_time": issued,
                    "valid_until": until(24),
                    "status": "active"
                }]
            }),
            FeedCategory::RipCurrents => json!({"warnings": []}),
            FeedCategory::OilSpill => json!({
                "alerts": [{
                    "id": 1,
                    "level": "high",
                    "description": "Oil spill detected near Mumbai coast",
                    "latitude": 19.0760,
                    "longitude": 72.8777,
                    "area_affected": "10 sq km",
                    "estimated_volume": "5000 liters",
                    "reported_time": issued,
                    "status": "active"
                }]
            }),
            FeedCategory::AlgalBloom => json!({
                "alerts": [{
                    "id": 1,
                    "level": "moderate",
                    "description": "Algal bloom detected in Arabian Sea",
                    "latitude": 15.2993,
                    "longitude": 74.1240,
                    "bloom_type": "Red tide",
                    "area_affected": "25 sq km",
                    "detected_time": issued,
                    "status": "active"
                }]
            }),
        }
    }
}

#[async_trait]
impl AlertFeed for SampleFeed {
    async fn active_warnings(&self) -> Result<Vec<RawAlert>, FeedError> {
        let now = Utc::now();
        log::debug!("serving sample alert feed as of {now}");
        Ok(FeedCategory::all()
            .into_iter()
            .flat_map(|category| process_category(category, &Self::document(category, now)))
            .collect())
    }
}
