//! Built-in sample data shown when the backend cannot be reached at
//! startup.

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{HazardCategory, RiskLevel, Severity};
use hazard_map_map_models::{Coordinates, Hotspot, Report};

fn sample_report(
    id: &str,
    category: HazardCategory,
    severity: Severity,
    description: &str,
    location: &str,
    position: Coordinates,
    now: DateTime<Utc>,
) -> Report {
    Report {
        id: id.to_string(),
        position,
        category,
        severity,
        title: category.label().to_string(),
        description: description.to_string(),
        location_name: Some(location.to_string()),
        created_at: Some(now),
        media: vec![],
        ml_hazard_score: None,
        ml_prediction_label: None,
        is_verified: false,
        is_offline_report: false,
    }
}

/// Three sample reports on the Mumbai, Goa and Chennai beaches, stamped
/// `now`.
#[must_use]
pub fn fallback_reports(now: DateTime<Utc>) -> Vec<Report> {
    vec![
        sample_report(
            "report_1",
            HazardCategory::RipCurrent,
            Severity::High,
            "Strong rip current observed at beach",
            "Mumbai Beach",
            Coordinates::new(19.0760, 72.8777),
            now,
        ),
        sample_report(
            "report_2",
            HazardCategory::Jellyfish,
            Severity::Moderate,
            "Large jellyfish swarm spotted",
            "Goa Beach",
            Coordinates::new(15.2993, 73.9124),
            now,
        ),
        sample_report(
            "report_3",
            HazardCategory::Pollution,
            Severity::Low,
            "Plastic waste accumulation on beach",
            "Chennai Beach",
            Coordinates::new(13.0827, 80.2707),
            now,
        ),
    ]
}

/// Two sample hotspots over the Mumbai and Goa sample reports.
#[must_use]
pub fn fallback_hotspots(now: DateTime<Utc>) -> Vec<Hotspot> {
    vec![
        Hotspot {
            id: "hotspot_1".to_string(),
            position: Coordinates::new(19.0760, 72.8777),
            risk_level: RiskLevel::High,
            report_count: 5,
            name: Some("Dangerous Rip Current Zone".to_string()),
            description: Some("Frequent rip current activity observed".to_string()),
            weighted_score: None,
            updated_at: Some(now),
        },
        Hotspot {
            id: "hotspot_2".to_string(),
            position: Coordinates::new(15.2993, 73.9124),
            risk_level: RiskLevel::Medium,
            report_count: 3,
            name: Some("Jellyfish Infestation Area".to_string()),
            description: Some("Seasonal jellyfish presence".to_string()),
            weighted_score: None,
            updated_at: Some(now),
        },
    ]
}
