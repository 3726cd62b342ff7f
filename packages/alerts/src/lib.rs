#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Official ocean-hazard warnings.
//!
//! The national ocean-information agency publishes one feed per hazard
//! category (tsunami, storm surge, high waves, rip currents, oil spills,
//! algal blooms). Each feed has its own list key, id scheme and timestamp
//! field; [`process_category`] flattens them all into [`RawAlert`]s that
//! the map then normalizes like any pushed alert.

pub mod http;
pub mod sample;

pub use http::HttpFeed;
pub use sample::SampleFeed;

use async_trait::async_trait;
use hazard_map_api::ApiError;
use hazard_map_hazard_models::Severity;
use hazard_map_map_models::{FailureKind, RawAlert};
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Source tag stamped on every official alert.
pub const OFFICIAL_SOURCE: &str = "INCOIS";

/// Errors that can occur while reading the official feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A category endpoint could not be fetched.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Every category endpoint failed.
    #[error("all {failed} alert feed categories failed")]
    Unavailable {
        /// Number of categories attempted.
        failed: usize,
    },
}

impl FeedError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::Unavailable { .. } => FailureKind::NetworkFailure,
        }
    }
}

/// A source of official alerts.
#[async_trait]
pub trait AlertFeed: Send + Sync {
    /// Returns every currently published warning across all categories.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the feed cannot be read at all.
    async fn active_warnings(&self) -> Result<Vec<RawAlert>, FeedError>;
}

/// One of the agency's per-category feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FeedCategory {
    Tsunami,
    StormSurge,
    HighWaves,
    RipCurrents,
    OilSpill,
    AlgalBloom,
}

impl FeedCategory {
    /// Path of the category's feed, relative to the feed base URL.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Tsunami => "/tsunami_warning.json",
            Self::StormSurge => "/storm_surge_warning.json",
            Self::HighWaves => "/high_wave_warning.json",
            Self::RipCurrents => "/rip_current_warning.json",
            Self::OilSpill => "/oil_spill_alerts.json",
            Self::AlgalBloom => "/algal_bloom_alerts.json",
        }
    }

    /// Key of the entry list in the feed document.
    #[must_use]
    pub const fn list_key(self) -> &'static str {
        match self {
            Self::Tsunami | Self::StormSurge | Self::HighWaves | Self::RipCurrents => "warnings",
            Self::OilSpill | Self::AlgalBloom => "alerts",
        }
    }

    /// Hazard type of the produced alerts; also the id prefix.
    #[must_use]
    pub const fn hazard_type(self) -> &'static str {
        match self {
            Self::Tsunami => "tsunami",
            Self::StormSurge => "storm_surge",
            Self::HighWaves => "high_waves",
            Self::RipCurrents => "rip_current",
            Self::OilSpill => "oil_spill",
            Self::AlgalBloom => "algal_bloom",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Tsunami => "Tsunami Warning",
            Self::StormSurge => "Storm Surge Warning",
            Self::HighWaves => "High Wave Warning",
            Self::RipCurrents => "Rip Current Warning",
            Self::OilSpill => "Oil Spill Alert",
            Self::AlgalBloom => "Algal Bloom Alert",
        }
    }

    /// Field holding the entry's publication time.
    #[must_use]
    pub const fn time_field(self) -> &'static str {
        match self {
            Self::Tsunami | Self::StormSurge | Self::HighWaves | Self::RipCurrents => {
                "issued_time"
            }
            Self::OilSpill => "reported_time",
            Self::AlgalBloom => "detected_time",
        }
    }

    /// Field holding the affected area, if the category reports one.
    #[must_use]
    pub const fn area_field(self) -> Option<&'static str> {
        match self {
            Self::Tsunami | Self::StormSurge => Some("affected_area"),
            Self::OilSpill | Self::AlgalBloom => Some("area_affected"),
            Self::HighWaves | Self::RipCurrents => None,
        }
    }

    /// All categories, in the order they are merged.
    #[must_use]
    pub fn all() -> Vec<Self> {
        <Self as strum::IntoEnumIterator>::iter().collect()
    }
}

/// Flattens one category's feed document into raw alerts.
///
/// A document without the category's list key yields nothing. Entry
/// levels are mapped onto the severity scale with
/// [`Severity::from_level`]; an entry is active iff its status is
/// `"active"`.
#[must_use]
pub fn process_category(category: FeedCategory, document: &Value) -> Vec<RawAlert> {
    let Some(entries) = document.get(category.list_key()).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| {
            let field = |name: &str| entry.get(name).filter(|v| !v.is_null()).cloned();
            let latitude = field("latitude");
            let longitude = field("longitude");
            let coordinates = match (&latitude, &longitude) {
                (Some(lat), Some(lng)) => Some(json!({"lat": lat, "lng": lng})),
                _ => None,
            };
            let id = match entry.get("id") {
                Some(Value::String(id)) => Some(format!("{}_{id}", category.hazard_type())),
                Some(Value::Number(id)) => Some(format!("{}_{id}", category.hazard_type())),
                _ => None,
            };

            RawAlert {
                id: id.map(Value::String),
                kind: Some(json!(category.hazard_type())),
                title: Some(json!(category.title())),
                description: field("description"),
                severity: Some(json!(
                    Severity::from_level(entry.get("level").and_then(Value::as_str)).value()
                )),
                coordinates,
                latitude,
                longitude,
                area: category.area_field().and_then(field),
                issued_at: field(category.time_field()),
                valid_until: field("valid_until"),
                source: Some(json!(OFFICIAL_SOURCE)),
                is_active: Some(json!(
                    entry.get("status").and_then(Value::as_str) == Some("active")
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hazard_map_hazard_models::HazardCategory;
    use hazard_map_map_models::{Coordinates, normalize_alert};

    use super::*;

    #[test]
    fn processes_warning_documents() {
        let document = json!({
            "warnings": [{
                "id": 1,
                "level": "high",
                "description": "Tsunami warning for Tamil Nadu",
                "latitude": 13.0827,
                "longitude": 80.2707,
                "affected_area": "Tamil Nadu coast",
                "issued_time": "2025-09-01T00:00:00Z",
                "valid_until": "2025-09-01T06:00:00Z",
                "status": "active"
            }]
        });

        let raw = process_category(FeedCategory::Tsunami, &document);
        assert_eq!(raw.len(), 1);

        let alert = normalize_alert(raw[0].clone()).unwrap();
        assert_eq!(alert.id, "tsunami_1");
        assert_eq!(alert.category, HazardCategory::Tsunami);
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.coordinates, Coordinates::new(13.0827, 80.2707));
        assert_eq!(alert.area.as_deref(), Some("Tamil Nadu coast"));
        assert_eq!(alert.source, OFFICIAL_SOURCE);
        assert!(alert.is_active);
        assert!(alert.issued_at.is_some());
        assert!(alert.valid_until.is_some());
    }

    #[test]
    fn processes_alert_documents() {
        let document = json!({
            "alerts": [{
                "id": "7",
                "level": "Extreme",
                "latitude": 19.076,
                "longitude": 72.8777,
                "area_affected": "10 sq km",
                "reported_time": "2025-09-01T00:00:00Z",
                "status": "resolved"
            }]
        });

        let alert = normalize_alert(process_category(FeedCategory::OilSpill, &document)[0].clone())
            .unwrap();
        assert_eq!(alert.id, "oil_spill_7");
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.description, "Oil Spill Alert");
        assert!(!alert.is_active);
        assert!(alert.issued_at.is_some());
    }

    #[test]
    fn rip_current_ids_use_singular_prefix() {
        let document = json!({"warnings": [{"id": 2, "latitude": 15.0, "longitude": 73.0}]});
        let raw = process_category(FeedCategory::RipCurrents, &document);
        assert_eq!(raw[0].id, Some(json!("rip_current_2")));
        assert_eq!(raw[0].severity, Some(json!(3)));
    }

    #[test]
    fn wrong_list_key_yields_nothing() {
        assert!(process_category(FeedCategory::OilSpill, &json!({"warnings": [{}]})).is_empty());
        assert!(process_category(FeedCategory::Tsunami, &json!([])).is_empty());
    }

    #[test]
    fn every_category_is_an_ocean_or_pollution_hazard() {
        for category in FeedCategory::all() {
            assert_ne!(
                HazardCategory::parse_lenient(category.hazard_type()),
                HazardCategory::Unknown,
                "{category}"
            );
        }
        assert_eq!(FeedCategory::all().len(), 6);
    }
}
