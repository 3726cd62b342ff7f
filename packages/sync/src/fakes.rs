//! In-memory collaborators for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use hazard_map_alerts::{AlertFeed, FeedError};
use hazard_map_api::{ApiError, ReportApi};
use hazard_map_map_models::{
    AuthToken, BoundingBox, Coordinates, Hotspot, LoginRequest, RawAlert, Report,
    ReportSubmission,
};
use serde_json::json;

use crate::channel::{ChannelError, MessageStream, PushTransport};

pub fn report(id: &str, lat: f64, lng: f64) -> Report {
    Report::from_value(json!({"id": id, "type": "oil_spill", "latitude": lat, "longitude": lng}))
        .unwrap()
}

pub fn hotspot(id: &str) -> Hotspot {
    serde_json::from_value(json!({
        "id": id,
        "center": {"lat": 19.0, "lng": 72.8},
        "risk_level": "medium"
    }))
    .unwrap()
}

fn unavailable(url: &str) -> ApiError {
    ApiError::Status {
        status: 503,
        url: url.to_string(),
    }
}

/// `None` lists answer with a 503.
///
/// Bounds queries answer after `north` seconds with one report at the
/// box center, named `r{north}`.
#[derive(Default)]
pub struct FakeApi {
    pub reports: Option<Vec<Report>>,
    pub hotspots: Option<Vec<Hotspot>>,
    pub fail_bounds: bool,
    pub report_calls: AtomicU32,
    pub submitted: Mutex<Vec<ReportSubmission>>,
}

impl FakeApi {
    pub fn live(reports: Vec<Report>, hotspots: Vec<Hotspot>) -> Self {
        Self {
            reports: Some(reports),
            hotspots: Some(hotspots),
            ..Self::default()
        }
    }

    pub fn report_calls(&self) -> u32 {
        self.report_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportApi for FakeApi {
    async fn reports(&self, _limit: u32) -> Result<Vec<Report>, ApiError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.reports.clone().ok_or_else(|| unavailable("/reports"))
    }

    async fn reports_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<Report>, ApiError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_secs(bounds.north.max(0.0) as u64);
        tokio::time::sleep(delay).await;
        if self.fail_bounds {
            return Err(unavailable("/reports/bounds"));
        }
        let center = bounds.center();
        Ok(vec![report(&format!("r{}", bounds.north), center.lat, center.lng)])
    }

    async fn hotspots(&self) -> Result<Vec<Hotspot>, ApiError> {
        self.hotspots.clone().ok_or_else(|| unavailable("/hotspots"))
    }

    async fn submit_report(&self, submission: &ReportSubmission) -> Result<Report, ApiError> {
        self.submitted.lock().unwrap().push(submission.clone());
        Ok(report("created", submission.position.lat, submission.position.lng))
    }

    async fn login(&self, _credentials: &LoginRequest) -> Result<AuthToken, ApiError> {
        Err(ApiError::Unauthorized {
            url: "/auth/login".to_string(),
        })
    }

    fn logout(&self) {}

    async fn reports_near(
        &self,
        _position: Coordinates,
        _radius_m: u32,
    ) -> Result<Vec<Report>, ApiError> {
        Ok(vec![])
    }

    async fn hotspot_reports(&self, _hotspot_id: &str) -> Result<Vec<Report>, ApiError> {
        Ok(vec![])
    }
}

/// Serves a fixed list, or fails when `alerts` is `None`. Counts calls.
#[derive(Default)]
pub struct FakeFeed {
    pub alerts: Mutex<Option<Vec<RawAlert>>>,
    pub calls: AtomicU32,
}

impl FakeFeed {
    pub fn serving(alerts: Vec<RawAlert>) -> Self {
        Self {
            alerts: Mutex::new(Some(alerts)),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set(&self, alerts: Option<Vec<RawAlert>>) {
        *self.alerts.lock().unwrap() = alerts;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertFeed for FakeFeed {
    async fn active_warnings(&self) -> Result<Vec<RawAlert>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.alerts
            .lock()
            .unwrap()
            .clone()
            .ok_or(FeedError::Unavailable { failed: 6 })
    }
}

pub fn raw_alert(id: &str, lat: f64, lng: f64) -> RawAlert {
    RawAlert {
        id: Some(json!(id)),
        kind: Some(json!("tsunami")),
        severity: Some(json!(4)),
        latitude: Some(json!(lat)),
        longitude: Some(json!(lng)),
        ..RawAlert::default()
    }
}

/// Each connection delivers the next scripted batch of messages and then
/// closes. Once the script runs out, connections close immediately.
#[derive(Default)]
pub struct FakeTransport {
    pub sessions: Mutex<VecDeque<Vec<String>>>,
}

impl FakeTransport {
    pub fn scripted(sessions: Vec<Vec<String>>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
        }
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn connect(&self) -> Result<MessageStream, ChannelError> {
        let messages = self.sessions.lock().unwrap().pop_front().unwrap_or_default();
        Ok(futures::stream::iter(messages.into_iter().map(Ok)).boxed())
    }
}
