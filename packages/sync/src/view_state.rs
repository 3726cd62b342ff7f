//! The authoritative snapshot of what the map shows.

use std::sync::{Arc, PoisonError, RwLock};

use hazard_map_map_models::{
    Alert, BoundingBox, Coordinates, Hotspot, RawAlert, Report, Viewport, normalize_alert,
};
use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;

/// Where the current report set came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReportOrigin {
    /// Nothing loaded yet.
    #[default]
    Empty,
    /// Fetched from the backend.
    Live,
    /// The built-in sample set, installed because the backend was
    /// unreachable.
    Fallback,
}

/// Sequence number of a full report fetch.
///
/// Issued before the request is sent; the result is applied only if no
/// newer fetch has been applied in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportTicket(u64);

impl ReportTicket {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Reports, hotspots, alerts and viewport currently on the map.
///
/// Every stored entity has a position inside the valid ranges and a
/// severity in 1-5. Updates never fail: input that cannot be represented
/// is dropped and logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    reports: Vec<Report>,
    hotspots: Vec<Hotspot>,
    alerts: Vec<Alert>,
    viewport: Viewport,
    report_origin: ReportOrigin,
    report_sets: u64,
    issued_tickets: u64,
    applied_ticket: u64,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    #[must_use]
    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    #[must_use]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn report_origin(&self) -> ReportOrigin {
        self.report_origin
    }

    /// How many times the report set has been fully replaced.
    #[must_use]
    pub const fn report_sets(&self) -> u64 {
        self.report_sets
    }

    #[must_use]
    pub fn report(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|report| report.id == id)
    }

    #[must_use]
    pub fn hotspot(&self, id: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|hotspot| hotspot.id == id)
    }

    /// Replaces the report set with live data.
    ///
    /// This is the newest state by definition: every ticket issued so far
    /// becomes stale.
    pub fn set_reports(&mut self, reports: Vec<Report>) {
        self.set_reports_from(reports, ReportOrigin::Live);
    }

    /// Replaces the report set, recording where it came from.
    pub fn set_reports_from(&mut self, reports: Vec<Report>, origin: ReportOrigin) {
        self.applied_ticket = self.issued_tickets;
        self.install_reports(reports, origin);
    }

    /// Takes a ticket for a full report fetch about to be sent.
    pub const fn issue_report_ticket(&mut self) -> ReportTicket {
        self.issued_tickets += 1;
        ReportTicket(self.issued_tickets)
    }

    /// Replaces the report set with the result of the fetch holding
    /// `ticket`, unless a newer fetch has already been applied.
    ///
    /// Returns whether the reports were applied.
    pub fn apply_report_set(
        &mut self,
        ticket: ReportTicket,
        reports: Vec<Report>,
        origin: ReportOrigin,
    ) -> bool {
        if ticket.0 <= self.applied_ticket {
            log::debug!(
                "discarding report set #{} ({} reports): #{} already applied",
                ticket.0,
                reports.len(),
                self.applied_ticket
            );
            return false;
        }
        self.applied_ticket = ticket.0;
        self.install_reports(reports, origin);
        true
    }

    fn install_reports(&mut self, reports: Vec<Report>, origin: ReportOrigin) {
        self.reports = retain_valid(reports, |report| report.position, "report");
        self.report_origin = origin;
        self.report_sets += 1;
    }

    /// Inserts a pushed report at the head of the list, keeping the order
    /// of the rest. Duplicate ids are kept as-is.
    ///
    /// Returns `false` if the report was dropped for an invalid position.
    pub fn prepend_report(&mut self, report: Report) -> bool {
        if !report.position.is_valid() {
            log::warn!("dropping pushed report {}: invalid position", report.id);
            return false;
        }
        self.reports.insert(0, report);
        true
    }

    /// Replaces the hotspot set. An empty list empties it.
    pub fn replace_hotspots(&mut self, hotspots: Vec<Hotspot>) {
        self.hotspots = retain_valid(hotspots, |hotspot| hotspot.position, "hotspot");
    }

    /// Replaces the alert set. An empty list empties it.
    pub fn replace_alerts(&mut self, alerts: Vec<Alert>) {
        self.alerts = retain_valid(alerts, |alert| alert.coordinates, "alert");
    }

    /// Normalizes raw alerts and replaces the alert set with the result.
    /// Returns how many alerts were kept.
    pub fn replace_alerts_raw(&mut self, raw: Vec<RawAlert>) -> usize {
        let alerts: Vec<Alert> = raw.into_iter().filter_map(normalize_alert).collect();
        let kept = alerts.len();
        self.replace_alerts(alerts);
        kept
    }

    /// Moves the map. Without `bounds` the previous bounds are kept.
    pub fn set_viewport(&mut self, center: Coordinates, zoom: u8, bounds: Option<BoundingBox>) {
        if !center.is_valid() {
            log::warn!("ignoring viewport change to invalid center {center:?}");
            return;
        }
        self.viewport.center = center;
        self.viewport.zoom = zoom;
        if let Some(bounds) = bounds {
            self.viewport.bounds = Some(bounds);
        }
    }
}

fn retain_valid<T>(items: Vec<T>, position: impl Fn(&T) -> Coordinates, what: &str) -> Vec<T> {
    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| position(item).is_valid())
        .collect();
    if kept.len() < total {
        log::warn!(
            "dropped {} {what}(s) with invalid positions",
            total - kept.len()
        );
    }
    kept
}

/// Shared handle to a [`ViewState`].
///
/// The lock is never held across an await. Every update bumps a revision
/// counter that subscribers (the renderer, the CLI) watch for changes.
#[derive(Debug, Clone)]
pub struct ViewStateHandle {
    state: Arc<RwLock<ViewState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for ViewStateHandle {
    fn default() -> Self {
        Self::new(ViewState::default())
    }
}

impl ViewStateHandle {
    #[must_use]
    pub fn new(state: ViewState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(state)),
            revision: Arc::new(revision),
        }
    }

    /// Reads the state.
    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Mutates the state and notifies subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let result = f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
        self.revision.send_modify(|revision| *revision += 1);
        result
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ViewState {
        self.read(Clone::clone)
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that changes whenever the state is updated.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
