//! Popup contents for each kind of marker.

use chrono::{DateTime, Utc};
use hazard_map_map_models::{Alert, Hotspot, Report};
use serde::Serialize;

use crate::style::{Badge, shout};

/// What a marker shows when opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popup {
    pub title: String,
    pub body: String,
    /// Labelled detail rows, in display order.
    pub details: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

fn date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "unknown".to_string(), |at| at.format("%Y-%m-%d").to_string())
}

fn row(label: &str, value: impl Into<String>) -> (String, String) {
    (label.to_string(), value.into())
}

impl Popup {
    #[must_use]
    pub fn for_report(report: &Report) -> Self {
        Self {
            title: report.title.clone(),
            body: report.description.clone(),
            details: vec![
                row("Type", shout(report.category.as_ref())),
                row("Severity", format!("{}/5", report.severity.value())),
                row("Reported", date(report.created_at)),
            ],
            image: report.media.first().cloned(),
            badge: None,
        }
    }

    #[must_use]
    pub fn for_hotspot(hotspot: &Hotspot) -> Self {
        Self {
            title: hotspot
                .name
                .clone()
                .unwrap_or_else(|| format!("Hotspot {}", hotspot.id)),
            body: hotspot.description.clone().unwrap_or_default(),
            details: vec![
                row("Risk Level", shout(hotspot.risk_level.as_ref())),
                row("Reports", hotspot.report_count.to_string()),
                row("Last Updated", date(hotspot.updated_at)),
            ],
            image: None,
            badge: None,
        }
    }

    #[must_use]
    pub fn for_alert(alert: &Alert) -> Self {
        Self {
            title: format!("{} Alert", alert.source),
            body: alert.description.clone(),
            details: vec![
                row("Type", shout(alert.category.as_ref())),
                row("Severity", format!("{}/5", alert.severity.value())),
                row("Valid Until", date(alert.valid_until)),
                row("Issued", date(alert.issued_at)),
            ],
            image: None,
            badge: Some(Badge::popup(alert.severity)),
        }
    }
}

impl std::fmt::Display for Popup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.badge {
            Some(badge) => writeln!(f, "[{badge}] {}", self.title)?,
            None => writeln!(f, "{}", self.title)?,
        }
        if !self.body.is_empty() {
            writeln!(f, "  {}", self.body)?;
        }
        for (label, value) in &self.details {
            writeln!(f, "  {label}: {value}")?;
        }
        if let Some(image) = &self.image {
            writeln!(f, "  Image: {image}")?;
        }
        Ok(())
    }
}
