//! Server-aggregated hotspots.

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient::{as_coordinates, as_f64, as_id, as_text, as_timestamp};
use crate::{Coordinates, EntityError};

/// An area where reports cluster, as computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHotspot")]
pub struct Hotspot {
    pub id: String,
    #[serde(rename = "center")]
    pub position: Coordinates,
    pub risk_level: RiskLevel,
    pub report_count: u32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub weighted_score: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHotspot {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    center: Option<Value>,
    #[serde(default)]
    coordinates: Option<Value>,
    #[serde(default, alias = "latitude")]
    lat: Option<Value>,
    #[serde(default, alias = "longitude")]
    lng: Option<Value>,
    #[serde(default)]
    risk_level: Option<Value>,
    #[serde(default)]
    report_count: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    weighted_score: Option<Value>,
    #[serde(default, alias = "lastUpdated")]
    updated_at: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
}

impl TryFrom<RawHotspot> for Hotspot {
    type Error = EntityError;

    fn try_from(raw: RawHotspot) -> Result<Self, Self::Error> {
        let id = raw.id.as_ref().and_then(as_id).ok_or(EntityError::MissingId)?;

        let position = raw
            .center
            .as_ref()
            .and_then(as_coordinates)
            .or_else(|| raw.coordinates.as_ref().and_then(as_coordinates))
            .or_else(|| {
                let lat = as_f64(raw.lat.as_ref()?)?;
                let lng = as_f64(raw.lng.as_ref()?)?;
                Some(Coordinates::new(lat, lng))
            })
            .filter(Coordinates::is_valid)
            .ok_or(EntityError::InvalidPosition)?;

        let report_count = raw
            .report_count
            .as_ref()
            .and_then(as_f64)
            .filter(|n| *n >= 0.0)
            .map_or(0, |n| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = n.min(f64::from(u32::MAX)) as u32;
                count
            });

        Ok(Self {
            id,
            position,
            risk_level: raw
                .risk_level
                .as_ref()
                .and_then(Value::as_str)
                .map_or_else(RiskLevel::default, RiskLevel::parse_lenient),
            report_count,
            name: raw.name.as_ref().and_then(as_text),
            description: raw.description.as_ref().and_then(as_text),
            weighted_score: raw.weighted_score.as_ref().and_then(as_f64),
            updated_at: raw
                .updated_at
                .as_ref()
                .and_then(as_timestamp)
                .or_else(|| raw.created_at.as_ref().and_then(as_timestamp)),
        })
    }
}
