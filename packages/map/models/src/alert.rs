//! Official alerts and the normalization every alert passes through.
//!
//! Alerts arrive from two places: the periodic poll of the official feed
//! and `incois_alerts_update` pushes. Both deliver partially-shaped JSON,
//! so nothing enters the alert set without going through
//! [`normalize_alert`].

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{HazardCategory, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Coordinates;
use crate::lenient::{as_bool, as_coordinates, as_f64, as_id, as_text, as_timestamp};

/// Description used when an alert carries neither a description nor a
/// title.
pub const NO_DESCRIPTION: &str = "No description available";

/// An alert exactly as received, before normalization.
///
/// Every field is optional and untyped: the feed and push payloads do not
/// agree on shapes, and normalization decides what to make of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<Value>,
}

/// A normalized official alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Identifier; synthesized when the payload had none.
    pub id: String,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub category: HazardCategory,
    pub severity: Severity,
    pub title: Option<String>,
    pub description: String,
    /// Affected area as free text.
    pub area: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Issuing agency tag.
    pub source: String,
    pub is_active: bool,
}

impl Alert {
    /// Whether `now` falls inside the alert's validity window. Open-ended
    /// windows count as valid on that side.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.issued_at.is_none_or(|issued| issued <= now)
            && self.valid_until.is_none_or(|until| now <= until)
    }
}

/// Normalizes a raw alert.
///
/// * coordinates come from a `{lat, lng}` object, else from
///   `latitude`/`longitude` with each missing component defaulting to 0
/// * `type` defaults to [`HazardCategory::Unknown`]
/// * severity is coerced onto 1-5, falling back to 3
/// * description falls back to the title, then to [`NO_DESCRIPTION`]
///
/// Returns `None` only when the resulting position is out of range, which
/// cannot be represented on the map.
#[must_use]
pub fn normalize_alert(raw: RawAlert) -> Option<Alert> {
    let coordinates = raw
        .coordinates
        .as_ref()
        .and_then(as_coordinates)
        .unwrap_or_else(|| {
            Coordinates::new(
                raw.latitude.as_ref().and_then(as_f64).unwrap_or(0.0),
                raw.longitude.as_ref().and_then(as_f64).unwrap_or(0.0),
            )
        });

    if !coordinates.is_valid() {
        log::warn!("normalize_alert: dropping alert with position {coordinates:?}");
        return None;
    }

    let title = raw.title.as_ref().and_then(as_text);
    let description = raw
        .description
        .as_ref()
        .and_then(as_text)
        .or_else(|| title.clone())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    Some(Alert {
        id: raw
            .id
            .as_ref()
            .and_then(as_id)
            .unwrap_or_else(|| format!("alert_{}", uuid::Uuid::new_v4())),
        coordinates,
        category: raw
            .kind
            .as_ref()
            .and_then(Value::as_str)
            .map_or(HazardCategory::Unknown, HazardCategory::parse_lenient),
        severity: Severity::coerce(raw.severity.as_ref().unwrap_or(&Value::Null)),
        title,
        description,
        area: raw.area.as_ref().and_then(as_text),
        issued_at: raw.issued_at.as_ref().and_then(as_timestamp),
        valid_until: raw.valid_until.as_ref().and_then(as_timestamp),
        source: raw
            .source
            .as_ref()
            .and_then(as_text)
            .unwrap_or_else(|| "unknown".to_string()),
        is_active: raw.is_active.as_ref().and_then(as_bool).unwrap_or(true),
    })
}

/// Normalizes an alert straight from JSON. Non-object values yield `None`.
#[must_use]
pub fn normalize_alert_value(value: &Value) -> Option<Alert> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value::<RawAlert>(value.clone())
        .ok()
        .and_then(normalize_alert)
}
