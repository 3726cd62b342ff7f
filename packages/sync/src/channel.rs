//! The push channel: one receive-only connection that applies server
//! events to the view state and reconnects after a fixed delay.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> (delay) -> Connecting ...
//!                     |                                        ^
//!                     +------------- open failed --------------+
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use hazard_map_map_models::lenient::parse_list;
use hazard_map_map_models::{FailureKind, Hotspot, Report, normalize_alert_value};
use serde::Deserialize;
use serde_json::Value;
use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;

use crate::shutdown::{Shutdown, cancelled};
use crate::view_state::ViewStateHandle;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Errors raised by a [`PushTransport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The connection could not be opened.
    #[error("failed to connect to {url}: {message}")]
    Connect {
        /// Endpoint.
        url: String,
        /// Transport message.
        message: String,
    },

    /// An open connection failed.
    #[error("push channel error: {message}")]
    Transport {
        /// Transport message.
        message: String,
    },
}

impl ChannelError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::NetworkFailure
    }
}

/// Text frames received on an open connection. The stream ends when the
/// connection closes; an `Err` item is a connection error.
pub type MessageStream = BoxStream<'static, Result<String, ChannelError>>;

/// Opens receive-only connections to the push endpoint.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Connect`] if the connection cannot be
    /// established.
    async fn connect(&self) -> Result<MessageStream, ChannelError>;
}

/// Reconnection behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Fixed wait after every disconnect.
    pub reconnect_delay: Duration,
    /// Give up after this many consecutive attempts that never reached
    /// `Connected`. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: None,
        }
    }
}

/// What a single pushed message did to the view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// `new_report`: the report was prepended.
    NewReport {
        id: String,
    },
    /// `hotspots_update`: the hotspot set was replaced.
    Hotspots {
        count: usize,
    },
    /// `incois_alerts_update`: the alert set was replaced.
    Alerts {
        count: usize,
    },
    /// A well-formed envelope of a type this client does not handle.
    Ignored {
        kind: String,
    },
    /// Not JSON, not an envelope, or data of the wrong shape. Nothing
    /// changed.
    Malformed,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Applies one pushed message to the view state.
#[must_use]
pub fn dispatch(view: &ViewStateHandle, text: &str) -> Dispatch {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("ignoring malformed push message: {e}");
            return Dispatch::Malformed;
        }
    };

    match envelope.kind.as_str() {
        "new_report" => match Report::from_value(envelope.data) {
            Ok(report) => {
                let id = report.id.clone();
                if view.update(|state| state.prepend_report(report)) {
                    Dispatch::NewReport { id }
                } else {
                    Dispatch::Malformed
                }
            }
            Err(e) => {
                log::warn!("ignoring new_report push: {e}");
                Dispatch::Malformed
            }
        },
        "hotspots_update" => match parse_list::<Hotspot>(envelope.data) {
            Ok(parsed) => {
                if parsed.dropped > 0 {
                    log::warn!("hotspots_update: dropped {} malformed hotspots", parsed.dropped);
                }
                let count = parsed.items.len();
                view.update(|state| state.replace_hotspots(parsed.items));
                Dispatch::Hotspots { count }
            }
            Err(e) => {
                log::warn!("ignoring hotspots_update push: {e}");
                Dispatch::Malformed
            }
        },
        "incois_alerts_update" => match envelope.data {
            Value::Array(raw) => {
                let alerts: Vec<_> = raw.iter().filter_map(normalize_alert_value).collect();
                if alerts.len() < raw.len() {
                    log::warn!(
                        "incois_alerts_update: dropped {} unusable alerts",
                        raw.len() - alerts.len()
                    );
                }
                let count = alerts.len();
                view.update(|state| state.replace_alerts(alerts));
                Dispatch::Alerts { count }
            }
            other => {
                log::warn!("ignoring incois_alerts_update push with non-list data: {other}");
                Dispatch::Malformed
            }
        },
        other => {
            log::debug!("ignoring push message of type {other:?}");
            Dispatch::Ignored {
                kind: other.to_string(),
            }
        }
    }
}

/// The single push channel of a session.
pub struct RealtimeChannel {
    transport: Arc<dyn PushTransport>,
    view: ViewStateHandle,
    options: ChannelOptions,
    state: watch::Sender<ChannelState>,
    attempts: Arc<AtomicU64>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("options", &self.options)
            .field("state", &*self.state.borrow())
            .field("attempts", &self.attempts.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl RealtimeChannel {
    #[must_use]
    pub fn new(
        transport: Arc<dyn PushTransport>,
        view: ViewStateHandle,
        options: ChannelOptions,
    ) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            transport,
            view,
            options,
            state,
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Watches state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Shared counter of connection attempts, the first one included.
    #[must_use]
    pub fn attempts(&self) -> Arc<AtomicU64> {
        self.attempts.clone()
    }

    fn transition(&self, next: ChannelState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            log::info!("push channel {previous} -> {next}");
        }
    }

    /// Connects and keeps reconnecting until `shutdown` fires or the
    /// attempt cap is reached. Ends in [`ChannelState::Disconnected`].
    pub async fn run(self, mut shutdown: Shutdown) {
        let mut failed_in_a_row: u32 = 0;

        loop {
            self.transition(ChannelState::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            log::debug!("push channel connection attempt {attempt}");

            let connected = tokio::select! {
                () = cancelled(&mut shutdown) => break,
                result = self.transport.connect() => result,
            };

            match connected {
                Ok(mut messages) => {
                    failed_in_a_row = 0;
                    self.transition(ChannelState::Connected);
                    loop {
                        tokio::select! {
                            () = cancelled(&mut shutdown) => {
                                self.transition(ChannelState::Disconnected);
                                return;
                            }
                            next = messages.next() => match next {
                                Some(Ok(text)) => {
                                    let outcome = dispatch(&self.view, &text);
                                    log::trace!("push message: {outcome:?}");
                                }
                                Some(Err(e)) => {
                                    log::warn!("{e}");
                                    break;
                                }
                                None => {
                                    log::info!("push channel closed by server");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => {
                    failed_in_a_row += 1;
                    log::warn!("{e}");
                }
            }

            self.transition(ChannelState::Disconnected);

            if let Some(max) = self.options.max_reconnect_attempts
                && failed_in_a_row >= max
            {
                log::error!("push channel giving up after {failed_in_a_row} failed attempts");
                return;
            }

            log::info!(
                "push channel reconnecting in {:?}",
                self.options.reconnect_delay
            );
            tokio::select! {
                () = cancelled(&mut shutdown) => break,
                () = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        }

        self.transition(ChannelState::Disconnected);
    }
}
