//! Icons, colours and labels shared by markers, popups and the overlay.

use hazard_map_hazard_models::{HazardCategory, RiskLevel, Severity};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Stroke and fill colour of report heat circles.
pub const HEAT_COLOUR: &str = "#ff6b6b";
pub const HEAT_FILL_OPACITY: f64 = 0.3;
pub const HEAT_STROKE_WEIGHT: u8 = 2;
/// Heat circle radius per severity level.
pub const HEAT_METERS_PER_SEVERITY: f64 = 1000.0;

/// Marker image. Categories without their own image use [`Self::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkerIcon {
    OilSpill,
    AlgalBloom,
    PlasticPollution,
    ChemicalSpill,
    TsunamiIncois,
    StormSurgeIncois,
    HighWavesIncois,
    RipCurrentIncois,
    Default,
}

impl MarkerIcon {
    #[must_use]
    pub const fn for_report(category: HazardCategory) -> Self {
        match category {
            HazardCategory::OilSpill => Self::OilSpill,
            HazardCategory::AlgalBloom => Self::AlgalBloom,
            HazardCategory::PlasticPollution => Self::PlasticPollution,
            HazardCategory::ChemicalSpill => Self::ChemicalSpill,
            _ => Self::Default,
        }
    }

    /// Ocean-state alerts get the official-alert variant of their icon.
    #[must_use]
    pub const fn for_alert(category: HazardCategory) -> Self {
        match category {
            HazardCategory::Tsunami => Self::TsunamiIncois,
            HazardCategory::StormSurge => Self::StormSurgeIncois,
            HazardCategory::HighWaves => Self::HighWavesIncois,
            HazardCategory::RipCurrent => Self::RipCurrentIncois,
            other => Self::for_report(other),
        }
    }
}

#[must_use]
pub const fn risk_colour(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "#ff0000",
        RiskLevel::Medium => "#ff9900",
        RiskLevel::Low => "#00ff00",
    }
}

/// Named badge colours used for alert severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Badge {
    Red,
    Orange,
    Yellow,
    Blue,
    Green,
}

impl Badge {
    /// Colour of an alert in the overlay list.
    #[must_use]
    pub const fn overlay(severity: Severity) -> Self {
        match severity.value() {
            4.. => Self::Red,
            3 => Self::Orange,
            2 => Self::Yellow,
            _ => Self::Green,
        }
    }

    /// Colour of the severity dot in an alert popup. One step per level.
    #[must_use]
    pub const fn popup(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Red,
            Severity::High => Self::Orange,
            Severity::Moderate => Self::Yellow,
            Severity::Low => Self::Blue,
            Severity::Minimal => Self::Green,
        }
    }
}

/// `"rip_current"` -> `"RIP CURRENT"`.
#[must_use]
pub fn shout(name: &str) -> String {
    name.replace('_', " ").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_icons_use_official_variants() {
        assert_eq!(MarkerIcon::for_alert(HazardCategory::Tsunami).to_string(), "tsunami_incois");
        assert_eq!(MarkerIcon::for_alert(HazardCategory::OilSpill), MarkerIcon::OilSpill);
        assert_eq!(MarkerIcon::for_report(HazardCategory::Tsunami), MarkerIcon::Default);
        assert_eq!(MarkerIcon::for_report(HazardCategory::Jellyfish).as_ref(), "default");
    }

    #[test]
    fn badges_by_severity() {
        let overlay: Vec<Badge> = Severity::all().iter().map(|s| Badge::overlay(*s)).collect();
        assert_eq!(
            overlay,
            [Badge::Green, Badge::Yellow, Badge::Orange, Badge::Red, Badge::Red]
        );
        assert_eq!(Badge::popup(Severity::Low), Badge::Blue);
        assert_eq!(risk_colour(RiskLevel::Medium), "#ff9900");
    }

    #[test]
    fn shout_replaces_every_underscore() {
        assert_eq!(shout("storm_surge"), "STORM SURGE");
        assert_eq!(shout("plastic_waste_x"), "PLASTIC WASTE X");
    }
}
