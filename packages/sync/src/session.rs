//! One map session: the view state, its collaborators and the background
//! tasks that keep it current.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use hazard_map_alerts::{AlertFeed, FeedError, HttpFeed, SampleFeed};
use hazard_map_api::{ApiError, HttpReportApi, ReportApi};
use hazard_map_map_models::{FailureKind, Report};
use hazard_map_submission::{
    Classifier, ClassifierError, HeuristicClassifier, HttpClassifier, Prediction, ReportDraft,
    ValidationErrors,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::channel::{ChannelOptions, ChannelState, PushTransport, RealtimeChannel};
use crate::config::{ClassifierConfig, ClientConfig, FeedConfig};
use crate::fallback::{fallback_hotspots, fallback_reports};
use crate::poller::AlertPoller;
use crate::shutdown::{ShutdownTrigger, shutdown_pair};
use crate::view_state::{ReportOrigin, ViewStateHandle};
use crate::viewport::ViewportRefresher;
use crate::websocket::WebSocketTransport;

/// Zoom used when focusing a report marker.
pub const REPORT_FOCUS_ZOOM: u8 = 15;
/// Zoom used when focusing a hotspot or a freshly submitted report.
pub const AREA_FOCUS_ZOOM: u8 = 12;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl SessionError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Invalid(e) => e.kind(),
            Self::Api(e) => e.kind(),
            Self::Feed(e) => e.kind(),
            Self::Classifier(e) => e.kind(),
        }
    }
}

/// The services a session talks to. Built once and shared by every task
/// of the session.
#[derive(Clone)]
pub struct Collaborators {
    pub api: Arc<dyn ReportApi>,
    pub feed: Arc<dyn AlertFeed>,
    pub transport: Arc<dyn PushTransport>,
    pub classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Builds the HTTP, WebSocket and feed clients described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if an HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SessionError> {
        let timeout = config.request_timeout();
        let retry = config.retry_policy();

        let api = HttpReportApi::new(&config.api.base_url, timeout, retry)?;
        api.set_token(config.api.token.clone());

        let feed: Arc<dyn AlertFeed> = match &config.alerts.feed {
            FeedConfig::Sample => Arc::new(SampleFeed),
            FeedConfig::Http { base_url } => Arc::new(HttpFeed::new(base_url, timeout, retry)?),
        };

        let classifier: Arc<dyn Classifier> = match &config.classifier {
            ClassifierConfig::Heuristic => Arc::new(HeuristicClassifier),
            ClassifierConfig::Http { base_url } => {
                Arc::new(HttpClassifier::new(base_url, timeout)?)
            }
        };

        log::debug!(
            "session collaborators: api={} channel={} feed={:?} classifier={:?}",
            config.api.base_url,
            config.channel.url,
            config.alerts.feed,
            config.classifier
        );

        Ok(Self {
            api: Arc::new(api),
            feed,
            transport: Arc::new(WebSocketTransport::new(config.channel.url.clone())),
            classifier,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// `limit` of every full report fetch.
    pub report_limit: u32,
    pub channel: ChannelOptions,
    pub alert_poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            report_limit: 50,
            channel: ChannelOptions::default(),
            alert_poll_interval: Duration::from_secs(300),
        }
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            report_limit: config.reports.initial_limit,
            channel: config.channel_options(),
            alert_poll_interval: config.alert_poll_interval(),
        }
    }
}

/// What the initial load ended up showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialLoad {
    pub reports: ReportOrigin,
    pub live_hotspots: bool,
    /// Alerts kept, or `None` if the feed failed.
    pub alerts: Option<usize>,
}

pub struct Session {
    view: ViewStateHandle,
    collaborators: Collaborators,
    options: SessionOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("revision", &self.view.revision())
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(collaborators: Collaborators, options: SessionOptions) -> Self {
        Self {
            view: ViewStateHandle::default(),
            collaborators,
            options,
        }
    }

    #[must_use]
    pub const fn view(&self) -> &ViewStateHandle {
        &self.view
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn ReportApi> {
        &self.collaborators.api
    }

    /// Fetches reports, hotspots and alerts concurrently.
    ///
    /// Reports and hotspots that cannot be fetched are replaced with the
    /// built-in samples. Alerts that cannot be fetched stay empty.
    pub async fn initial_load(&self) -> InitialLoad {
        let api = &self.collaborators.api;
        let ticket = self.view.update(|state| state.issue_report_ticket());

        let (reports, hotspots, alerts) = tokio::join!(
            api.reports(self.options.report_limit),
            api.hotspots(),
            self.collaborators.feed.active_warnings(),
        );

        let now = Utc::now();
        let (reports, origin) = match reports {
            Ok(reports) => (reports, ReportOrigin::Live),
            Err(e) => {
                log::warn!("using sample reports, initial report fetch failed: {e}");
                (fallback_reports(now), ReportOrigin::Fallback)
            }
        };
        let (hotspots, live_hotspots) = match hotspots {
            Ok(hotspots) => (hotspots, true),
            Err(e) => {
                log::warn!("using sample hotspots, hotspot fetch failed: {e}");
                (fallback_hotspots(now), false)
            }
        };

        let alerts = self.view.update(|state| {
            state.apply_report_set(ticket, reports, origin);
            state.replace_hotspots(hotspots);
            match alerts {
                Ok(raw) => Some(state.replace_alerts_raw(raw)),
                Err(e) => {
                    log::warn!("no alerts on initial load: {e}");
                    None
                }
            }
        });

        let result = InitialLoad {
            reports: self.view.read(|state| state.report_origin()),
            live_hotspots,
            alerts,
        };
        log::info!("initial load: {result:?}");
        result
    }

    /// Starts the push channel and the alert poller.
    #[must_use]
    pub fn start(&self) -> SessionHandle {
        let (trigger, shutdown) = shutdown_pair();

        let channel = RealtimeChannel::new(
            self.collaborators.transport.clone(),
            self.view.clone(),
            self.options.channel,
        );
        let channel_state = channel.state();
        let connect_attempts = channel.attempts();

        let poller = AlertPoller::new(
            self.collaborators.feed.clone(),
            self.view.clone(),
            self.options.alert_poll_interval,
        );

        let tasks = vec![
            tokio::spawn(channel.run(shutdown.clone())),
            tokio::spawn(poller.run(shutdown)),
        ];

        SessionHandle {
            trigger,
            tasks,
            channel_state,
            connect_attempts,
        }
    }

    /// Handler for the map's move-end callback.
    #[must_use]
    pub fn refresher(&self) -> ViewportRefresher {
        ViewportRefresher::new(self.collaborators.api.clone(), self.view.clone())
    }

    /// Classifies the draft's media and raises its severity if the
    /// prediction is a confident disaster.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the classifier fails.
    pub async fn classify(&self, draft: &mut ReportDraft) -> Result<Prediction, ClassifierError> {
        let prediction = self
            .collaborators
            .classifier
            .predict(draft.media(), draft.position())
            .await?;
        draft.apply_prediction(&prediction);
        Ok(prediction)
    }

    /// Validates and submits the draft, refetches the report set and
    /// centers the map on the new report.
    ///
    /// A failed refetch is logged and leaves the current reports in place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] if the draft does not validate and
    /// [`SessionError::Api`] if the submission is rejected.
    pub async fn submit(&self, draft: &ReportDraft) -> Result<Report, SessionError> {
        let submission = draft.validate()?;
        let created = self.collaborators.api.submit_report(&submission).await?;
        log::info!("submitted report {}", created.id);

        let ticket = self.view.update(|state| state.issue_report_ticket());
        match self.collaborators.api.reports(self.options.report_limit).await {
            Ok(reports) => {
                self.view
                    .update(|state| state.apply_report_set(ticket, reports, ReportOrigin::Live));
            }
            Err(e) => log::warn!("report refetch after submission failed: {e}"),
        }

        self.view
            .update(|state| state.set_viewport(created.position, AREA_FOCUS_ZOOM, None));
        Ok(created)
    }

    /// Centers on a report. Returns `false` if it is not in the view.
    pub fn focus_report(&self, id: &str) -> bool {
        self.view.update(|state| {
            let Some(position) = state.report(id).map(|report| report.position) else {
                return false;
            };
            state.set_viewport(position, REPORT_FOCUS_ZOOM, None);
            true
        })
    }

    /// Centers on a hotspot. Returns `false` if it is not in the view.
    pub fn focus_hotspot(&self, id: &str) -> bool {
        self.view.update(|state| {
            let Some(position) = state.hotspot(id).map(|hotspot| hotspot.position) else {
                return false;
            };
            state.set_viewport(position, AREA_FOCUS_ZOOM, None);
            true
        })
    }
}

/// Owns the background tasks of a started session. Dropping the handle
/// aborts them.
#[derive(Debug)]
pub struct SessionHandle {
    trigger: ShutdownTrigger,
    tasks: Vec<JoinHandle<()>>,
    channel_state: watch::Receiver<ChannelState>,
    connect_attempts: Arc<AtomicU64>,
}

impl SessionHandle {
    #[must_use]
    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.channel_state.clone()
    }

    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Stops the channel and the poller together and waits for both.
    pub async fn shutdown(mut self) {
        self.trigger.fire();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                log::error!("session task failed: {e}");
            }
        }
        log::info!("session stopped");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use hazard_map_map_models::{BoundingBox, Coordinates};
    use serde_json::json;

    use super::*;
    use crate::fakes::{FakeApi, FakeFeed, FakeTransport, hotspot, raw_alert, report};

    fn session(
        api: FakeApi,
        feed: FakeFeed,
        transport: FakeTransport,
    ) -> (Session, Arc<FakeApi>, Arc<FakeFeed>) {
        let api = Arc::new(api);
        let feed = Arc::new(feed);
        let collaborators = Collaborators {
            api: api.clone(),
            feed: feed.clone(),
            transport: Arc::new(transport),
            classifier: Arc::new(HeuristicClassifier),
        };
        (Session::new(collaborators, SessionOptions::default()), api, feed)
    }

    fn ids(session: &Session) -> Vec<String> {
        session
            .view()
            .read(|state| state.reports().iter().map(|r| r.id.clone()).collect())
    }

    #[tokio::test]
    async fn initial_load_with_reachable_api() {
        let (session, api, _) = session(
            FakeApi::live(
                vec![report("a", 10.0, 76.0), report("b", 11.0, 77.0)],
                vec![hotspot("h")],
            ),
            FakeFeed::serving(vec![raw_alert("t1", 13.0, 80.3)]),
            FakeTransport::default(),
        );

        let load = session.initial_load().await;

        assert_eq!(
            load,
            InitialLoad {
                reports: ReportOrigin::Live,
                live_hotspots: true,
                alerts: Some(1),
            }
        );
        assert_eq!(api.report_calls(), 1);
        assert_eq!(ids(&session), ["a", "b"]);
        assert_eq!(session.view().read(|state| state.report_sets()), 1);
    }

    #[tokio::test]
    async fn initial_load_with_unreachable_api_uses_samples() {
        let (session, _, _) = session(
            FakeApi::default(),
            FakeFeed::default(),
            FakeTransport::default(),
        );

        let load = session.initial_load().await;

        assert_eq!(load.reports, ReportOrigin::Fallback);
        assert!(!load.live_hotspots);
        assert_eq!(load.alerts, None);
        assert_eq!(ids(&session), ["report_1", "report_2", "report_3"]);
        session.view().read(|state| {
            assert_eq!(state.report_sets(), 1);
            assert_eq!(
                state.report("report_1").unwrap().location_name.as_deref(),
                Some("Mumbai Beach")
            );
            assert_eq!(state.hotspots().len(), 2);
            assert!(state.alerts().is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn background_tasks_run_until_shutdown() {
        let push = json!({
            "type": "hotspots_update",
            "data": [{"id": "H1", "latitude": 15.3, "longitude": 73.9}]
        });
        let (session, _, feed) = session(
            FakeApi::live(vec![], vec![]),
            FakeFeed::serving(vec![raw_alert("t1", 13.0, 80.3)]),
            FakeTransport::scripted(vec![vec![push.to_string()]]),
        );

        let handle = session.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.connect_attempts(), 1);
        let hotspots: Vec<String> = session
            .view()
            .read(|state| state.hotspots().iter().map(|h| h.id.clone()).collect());
        assert_eq!(hotspots, ["H1"]);

        // Every close is followed by exactly one attempt per delay.
        for expected in 2..=4 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(handle.connect_attempts(), expected);
        }

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(feed.calls(), 1);
        assert_eq!(session.view().read(|state| state.alerts().len()), 1);

        let mut state = handle.channel_state();
        let attempts = handle.connect_attempts();
        handle.shutdown().await;
        assert_eq!(*state.borrow_and_update(), ChannelState::Disconnected);

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(feed.calls(), 1);
        assert!(attempts >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_viewport_refresh_keeps_reports() {
        let (session, _, _) = session(
            FakeApi {
                fail_bounds: true,
                ..FakeApi::live(vec![report("a", 10.0, 76.0)], vec![])
            },
            FakeFeed::default(),
            FakeTransport::default(),
        );
        session.initial_load().await;

        let result = session
            .refresher()
            .on_move_end(BoundingBox::new(20.0, 10.0, 80.0, 70.0))
            .await;

        assert!(result.is_err());
        assert_eq!(ids(&session), ["a"]);
    }

    #[tokio::test]
    async fn submit_validates_refetches_and_focuses() {
        let (session, api, _) = session(
            FakeApi::live(
                vec![report("created", 8.38, 76.99), report("a", 10.0, 76.0)],
                vec![],
            ),
            FakeFeed::default(),
            FakeTransport::default(),
        );

        let err = session.submit(&ReportDraft::default()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ValidationFailure);
        assert!(api.submitted.lock().unwrap().is_empty());

        let draft = ReportDraft::new(
            "Oil sheen",
            "Rainbow film along the jetty",
            "Vizhinjam",
            "8.38",
            "76.99",
        );
        let created = session.submit(&draft).await.unwrap();

        assert_eq!(created.id, "created");
        assert_eq!(api.submitted.lock().unwrap().len(), 1);
        assert_eq!(api.report_calls(), 1);
        assert_eq!(ids(&session), ["created", "a"]);
        session.view().read(|state| {
            assert_eq!(state.viewport().center, Coordinates::new(8.38, 76.99));
            assert_eq!(state.viewport().zoom, AREA_FOCUS_ZOOM);
        });
    }

    #[tokio::test]
    async fn focus_moves_viewport_without_bounds() {
        let (session, _, _) = session(
            FakeApi::live(vec![report("a", 10.0, 76.0)], vec![hotspot("h")]),
            FakeFeed::default(),
            FakeTransport::default(),
        );
        session.initial_load().await;
        let bounds = BoundingBox::new(12.0, 8.0, 78.0, 74.0);
        session
            .view()
            .update(|state| state.set_viewport(bounds.center(), 9, Some(bounds)));

        assert!(session.focus_report("a"));
        session.view().read(|state| {
            assert_eq!(state.viewport().center, Coordinates::new(10.0, 76.0));
            assert_eq!(state.viewport().zoom, REPORT_FOCUS_ZOOM);
            assert_eq!(state.viewport().bounds, Some(bounds));
        });

        assert!(session.focus_hotspot("h"));
        assert_eq!(session.view().read(|state| state.viewport().zoom), AREA_FOCUS_ZOOM);
        assert!(!session.focus_report("missing"));
    }

    #[tokio::test]
    async fn classify_raises_severity_for_videos() {
        let (session, _, _) = session(
            FakeApi::default(),
            FakeFeed::default(),
            FakeTransport::default(),
        );
        let mut draft = ReportDraft::default();
        let clip = hazard_map_map_models::MediaFile::new("clip.mp4", "video/mp4", vec![0]);
        draft.add_media(vec![clip]).unwrap();

        let prediction = session.classify(&mut draft).await.unwrap();

        assert_eq!(prediction.label, "Water_Disaster");
        assert_eq!(draft.severity.value(), 5);
    }
}
