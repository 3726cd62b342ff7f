#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard category taxonomy, severity scale and hotspot risk levels.
//!
//! These are the shared vocabulary of the hazard map: citizen reports,
//! server-aggregated hotspots and official alerts all classify the event
//! with a [`HazardCategory`] and grade it with a [`Severity`]. Values
//! arriving from the network are parsed leniently: unrecognized
//! categories become [`HazardCategory::Unknown`] and malformed severities
//! become [`Severity::Moderate`].

use std::str::FromStr as _;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity level for a hazard, from 1 (minimal) to 5 (critical).
///
/// Serialized as its bare integer value.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Level 1: barely noticeable, informational
    Minimal = 1,
    /// Level 2: localized nuisance
    Low = 2,
    /// Level 3: the fallback for anything that cannot be graded
    #[default]
    Moderate = 3,
    /// Level 4: dangerous, avoid the area
    High = 4,
    /// Level 5: life-threatening
    Critical = 5,
}

impl Severity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minimal),
            2 => Ok(Self::Low),
            3 => Ok(Self::Moderate),
            4 => Ok(Self::High),
            5 => Ok(Self::Critical),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Coerces an arbitrary JSON value into a severity.
    ///
    /// Only JSON numbers count: integral numbers in 1-5 keep their level.
    /// Everything else, numeric strings included, becomes
    /// [`Severity::Moderate`].
    #[must_use]
    pub fn coerce(value: &serde_json::Value) -> Self {
        let numeric = match value {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| {
                        #[allow(clippy::cast_possible_truncation)]
                        let whole = f as i64;
                        whole
                    })
            }),
            _ => None,
        };

        numeric
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| Self::from_value(n).ok())
            .unwrap_or_default()
    }

    /// Maps an official feed's warning level (`"high"`, `"moderate"`, ...)
    /// onto the severity scale. Unrecognized or missing levels map to
    /// [`Severity::Moderate`].
    #[must_use]
    pub fn from_level(level: Option<&str>) -> Self {
        match level.map(str::to_lowercase).as_deref() {
            Some("extreme" | "critical") => Self::Critical,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            Some("minimal") => Self::Minimal,
            _ => Self::Moderate,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minimal,
            Self::Low,
            Self::Moderate,
            Self::High,
            Self::Critical,
        ]
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::coerce(&value))
    }
}

/// Error returned when attempting to create a [`Severity`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-5", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// The kind of event a report or alert describes.
///
/// Citizen reports use the pollution-oriented categories; official alerts
/// use the ocean-state ones (tsunami, storm surge, high waves, rip
/// current). Any string outside the taxonomy parses to [`Self::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardCategory {
    // ── Pollution ───────────────────────────────────────
    /// Oil slick on the water surface
    OilSpill,
    /// Plastic debris washed up or floating
    PlasticWaste,
    /// Plastic pollution as labelled by the map icon set
    PlasticPollution,
    /// Chemical contamination of the water
    ChemicalPollution,
    /// Acute chemical release
    ChemicalSpill,
    /// Generic pollution sighting
    Pollution,

    // ── Ecological ──────────────────────────────────────
    /// Harmful algal bloom / red tide
    AlgalBloom,
    /// Reef bleaching event
    CoralBleaching,
    /// Mass fish mortality
    FishKill,
    /// Jellyfish swarm
    Jellyfish,

    // ── Ocean state ─────────────────────────────────────
    /// Tsunami wave
    Tsunami,
    /// Storm-driven sea level rise
    StormSurge,
    /// Dangerous swell
    HighWaves,
    /// Strong seaward current at the shore
    RipCurrent,

    // ── Catch-all ───────────────────────────────────────
    /// Reported as "other" by the submitter
    Other,
    /// Missing or unrecognized category
    #[default]
    Unknown,
}

impl HazardCategory {
    /// Parses a category name, mapping anything unrecognized (including
    /// the empty string) to [`Self::Unknown`].
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        Self::from_str(name.trim()).unwrap_or(Self::Unknown)
    }

    /// Returns the human-readable label shown in popups and overlays.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OilSpill => "Oil Spill",
            Self::PlasticWaste => "Plastic Waste",
            Self::PlasticPollution => "Plastic Pollution",
            Self::ChemicalPollution => "Chemical Pollution",
            Self::ChemicalSpill => "Chemical Spill",
            Self::Pollution => "Pollution",
            Self::AlgalBloom => "Algal Bloom",
            Self::CoralBleaching => "Coral Bleaching",
            Self::FishKill => "Fish Kill",
            Self::Jellyfish => "Jellyfish Sighting",
            Self::Tsunami => "Tsunami",
            Self::StormSurge => "Storm Surge",
            Self::HighWaves => "High Waves",
            Self::RipCurrent => "Rip Current",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether official alert feeds publish this category.
    #[must_use]
    pub const fn is_ocean_state(self) -> bool {
        matches!(
            self,
            Self::Tsunami | Self::StormSurge | Self::HighWaves | Self::RipCurrent
        )
    }

    /// Categories a citizen can pick when submitting a report, in the
    /// order the form lists them.
    #[must_use]
    pub const fn reportable() -> &'static [Self] {
        &[
            Self::OilSpill,
            Self::PlasticWaste,
            Self::ChemicalPollution,
            Self::AlgalBloom,
            Self::CoralBleaching,
            Self::FishKill,
            Self::Other,
        ]
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::OilSpill,
            Self::PlasticWaste,
            Self::PlasticPollution,
            Self::ChemicalPollution,
            Self::ChemicalSpill,
            Self::Pollution,
            Self::AlgalBloom,
            Self::CoralBleaching,
            Self::FishKill,
            Self::Jellyfish,
            Self::Tsunami,
            Self::StormSurge,
            Self::HighWaves,
            Self::RipCurrent,
            Self::Other,
            Self::Unknown,
        ]
    }
}

impl<'de> Deserialize<'de> for HazardCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(Self::Unknown, Self::parse_lenient))
    }
}

/// Risk level of a server-aggregated hotspot.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RiskLevel {
    /// Few or minor reports
    #[default]
    Low,
    /// Recurring activity
    Medium,
    /// Frequent or severe activity
    High,
}

impl RiskLevel {
    /// Parses a risk level, defaulting to [`Self::Low`] for anything
    /// unrecognized.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        Self::from_str(name.trim()).unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or_else(Self::default, Self::parse_lenient))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn severity_from_value_roundtrip() {
        for v in 1..=5u8 {
            let severity = Severity::from_value(v).unwrap();
            assert_eq!(severity.value(), v);
        }
        assert!(Severity::from_value(0).is_err());
        assert!(Severity::from_value(6).is_err());
    }

    #[test]
    fn severity_coerce_keeps_in_range_integers() {
        assert_eq!(Severity::coerce(&json!(1)), Severity::Minimal);
        assert_eq!(Severity::coerce(&json!(5)), Severity::Critical);
        assert_eq!(Severity::coerce(&json!(4.0)), Severity::High);
    }

    #[test]
    fn severity_coerce_falls_back_to_moderate() {
        for raw in [
            json!(0),
            json!(6),
            json!(-1),
            json!(2.5),
            json!("high"),
            json!("4"),
            json!(" 2 "),
            json!(null),
            json!(true),
            json!([4]),
            json!({"value": 4}),
        ] {
            assert_eq!(
                Severity::coerce(&raw),
                Severity::Moderate,
                "{raw} should coerce to 3"
            );
        }
    }

    #[test]
    fn severity_serializes_as_integer() {
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), json!(4));
        let parsed: Severity = serde_json::from_value(json!("not a number")).unwrap();
        assert_eq!(parsed, Severity::Moderate);
    }

    #[test]
    fn severity_from_feed_level() {
        assert_eq!(Severity::from_level(Some("EXTREME")), Severity::Critical);
        assert_eq!(Severity::from_level(Some("critical")), Severity::Critical);
        assert_eq!(Severity::from_level(Some("High")), Severity::High);
        assert_eq!(Severity::from_level(Some("medium")), Severity::Moderate);
        assert_eq!(Severity::from_level(Some("moderate")), Severity::Moderate);
        assert_eq!(Severity::from_level(Some("low")), Severity::Low);
        assert_eq!(Severity::from_level(Some("minimal")), Severity::Minimal);
        assert_eq!(Severity::from_level(Some("severe")), Severity::Moderate);
        assert_eq!(Severity::from_level(None), Severity::Moderate);
    }

    #[test]
    fn category_names_roundtrip() {
        for category in HazardCategory::all() {
            let name = category.to_string();
            assert_eq!(HazardCategory::parse_lenient(&name), *category);
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, json!(name));
        }
    }

    #[test]
    fn unknown_category_strings_parse_to_unknown() {
        assert_eq!(
            HazardCategory::parse_lenient("volcano"),
            HazardCategory::Unknown
        );
        assert_eq!(HazardCategory::parse_lenient(""), HazardCategory::Unknown);
        let parsed: HazardCategory = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(parsed, HazardCategory::Unknown);
        let parsed: HazardCategory = serde_json::from_value(json!("rip_current")).unwrap();
        assert_eq!(parsed, HazardCategory::RipCurrent);
    }

    #[test]
    fn reportable_categories_are_not_ocean_state() {
        for category in HazardCategory::reportable() {
            assert!(!category.is_ocean_state(), "{category:?}");
        }
    }

    #[test]
    fn risk_level_defaults_to_low() {
        assert_eq!(RiskLevel::parse_lenient("HIGH"), RiskLevel::High);
        assert_eq!(RiskLevel::parse_lenient("medium"), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse_lenient("extreme"), RiskLevel::Low);
        let parsed: RiskLevel = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(parsed, RiskLevel::Low);
    }
}
