//! Citizen hazard reports.

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{HazardCategory, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient::{as_bool, as_coordinates, as_f64, as_id, as_text, as_timestamp};
use crate::{Coordinates, EntityError};

/// A hazard report submitted by a citizen.
///
/// Deserialization accepts both the API's shape (`coordinates`,
/// `event_type`, `created_at`, numeric ids) and the flatter shapes used by
/// older payloads (`latitude`/`longitude`, `type`, `timestamp`). A report
/// without an id or a valid position fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReport")]
pub struct Report {
    /// Unique identifier.
    pub id: String,
    /// Where the hazard was observed.
    #[serde(rename = "coordinates")]
    pub position: Coordinates,
    /// What was observed.
    #[serde(rename = "event_type")]
    pub category: HazardCategory,
    /// How bad it is.
    pub severity: Severity,
    /// Short headline.
    pub title: String,
    /// Free-text details.
    pub description: String,
    /// Human-readable place name.
    pub location_name: Option<String>,
    /// When the report was created.
    pub created_at: Option<DateTime<Utc>>,
    /// Paths or URLs of attached photos and videos.
    #[serde(rename = "media_paths")]
    pub media: Vec<String>,
    /// Hazard score assigned by the server-side classifier.
    pub ml_hazard_score: Option<f64>,
    /// Label assigned by the server-side classifier.
    pub ml_prediction_label: Option<String>,
    /// Whether a moderator verified the report.
    pub is_verified: bool,
    /// Whether the report was captured offline and synced later.
    pub is_offline_report: bool,
}

impl Report {
    /// Parses a single report from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the value is not an object or the
    /// report has no id or no valid position.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Wire shape of a report before validation.
#[derive(Debug, Default, Deserialize)]
struct RawReport {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "position")]
    coordinates: Option<Value>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
    #[serde(default, alias = "type", alias = "category")]
    event_type: Option<Value>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default, alias = "location")]
    location_name: Option<Value>,
    #[serde(default, alias = "timestamp")]
    created_at: Option<Value>,
    #[serde(default, alias = "media")]
    media_paths: Option<Value>,
    #[serde(default)]
    image_url: Option<Value>,
    #[serde(default)]
    ml_hazard_score: Option<Value>,
    #[serde(default)]
    ml_prediction_label: Option<Value>,
    #[serde(default)]
    is_verified: Option<Value>,
    #[serde(default)]
    is_offline_report: Option<Value>,
}

impl TryFrom<RawReport> for Report {
    type Error = EntityError;

    fn try_from(raw: RawReport) -> Result<Self, Self::Error> {
        let id = raw.id.as_ref().and_then(as_id).ok_or(EntityError::MissingId)?;

        let position = raw
            .coordinates
            .as_ref()
            .and_then(as_coordinates)
            .or_else(|| {
                let lat = as_f64(raw.latitude.as_ref()?)?;
                let lng = as_f64(raw.longitude.as_ref()?)?;
                Some(Coordinates::new(lat, lng))
            })
            .filter(Coordinates::is_valid)
            .ok_or(EntityError::InvalidPosition)?;

        let category = raw
            .event_type
            .as_ref()
            .and_then(Value::as_str)
            .map_or(HazardCategory::Unknown, HazardCategory::parse_lenient);

        let mut media: Vec<String> = match raw.media_paths {
            Some(Value::Array(paths)) => paths.iter().filter_map(as_text).collect(),
            _ => Vec::new(),
        };
        if let Some(url) = raw.image_url.as_ref().and_then(as_text) {
            media.push(url);
        }

        Ok(Self {
            id,
            position,
            category,
            severity: Severity::coerce(raw.severity.as_ref().unwrap_or(&Value::Null)),
            title: raw
                .title
                .as_ref()
                .and_then(as_text)
                .unwrap_or_else(|| category.label().to_string()),
            description: raw
                .description
                .as_ref()
                .and_then(as_text)
                .unwrap_or_default(),
            location_name: raw.location_name.as_ref().and_then(as_text),
            created_at: raw.created_at.as_ref().and_then(as_timestamp),
            media,
            ml_hazard_score: raw.ml_hazard_score.as_ref().and_then(as_f64),
            ml_prediction_label: raw.ml_prediction_label.as_ref().and_then(as_text),
            is_verified: raw
                .is_verified
                .as_ref()
                .and_then(as_bool)
                .unwrap_or(false),
            is_offline_report: raw
                .is_offline_report
                .as_ref()
                .and_then(as_bool)
                .unwrap_or(false),
        })
    }
}
