//! The compact "Real-Time" alert list shown over the map.

use hazard_map_map_models::Alert;

use crate::style::Badge;

/// Alerts listed before the rest are summarized as a count.
pub const OVERLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub id: String,
    pub label: &'static str,
    pub description: String,
    pub badge: Badge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertOverlay {
    pub entries: Vec<OverlayEntry>,
    /// Alerts not listed.
    pub hidden: usize,
}

impl AlertOverlay {
    #[must_use]
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let entries = alerts
            .iter()
            .take(OVERLAY_LIMIT)
            .map(|alert| OverlayEntry {
                id: alert.id.clone(),
                label: alert.category.label(),
                description: alert.description.clone(),
                badge: Badge::overlay(alert.severity),
            })
            .collect();

        Self {
            entries,
            hidden: alerts.len().saturating_sub(OVERLAY_LIMIT),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"+N more alerts"` when some alerts are not listed.
    #[must_use]
    pub fn more_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more alerts", self.hidden))
    }
}

impl std::fmt::Display for AlertOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(f, "Official alerts")?;
        for entry in &self.entries {
            writeln!(f, "  [{}] {}: {}", entry.badge, entry.label, entry.description)?;
        }
        if let Some(more) = self.more_label() {
            writeln!(f, "  {more}")?;
        }
        Ok(())
    }
}
