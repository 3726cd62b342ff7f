//! Periodic replacement of the alert set from the official feed.

use std::sync::Arc;
use std::time::Duration;

use hazard_map_alerts::{AlertFeed, FeedError};
use tokio::time::{Instant, MissedTickBehavior};

use crate::shutdown::{Shutdown, cancelled};
use crate::view_state::ViewStateHandle;

pub struct AlertPoller {
    feed: Arc<dyn AlertFeed>,
    view: ViewStateHandle,
    period: Duration,
}

impl std::fmt::Debug for AlertPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPoller")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl AlertPoller {
    #[must_use]
    pub fn new(feed: Arc<dyn AlertFeed>, view: ViewStateHandle, period: Duration) -> Self {
        Self { feed, view, period }
    }

    /// Fetches the feed once and replaces the alert set, normalizing every
    /// entry. Returns how many alerts were kept.
    ///
    /// # Errors
    ///
    /// Returns the [`FeedError`] if the feed could not be read; the alert
    /// set is unchanged.
    pub async fn poll_once(&self) -> Result<usize, FeedError> {
        let raw = self.feed.active_warnings().await?;
        let received = raw.len();
        let kept = self.view.update(|state| state.replace_alerts_raw(raw));
        log::debug!("alert poll: kept {kept} of {received} warnings");
        Ok(kept)
    }

    /// Polls every period, starting one period from now, until `shutdown`
    /// fires. Failed polls are logged and leave the previous alerts in
    /// place.
    pub async fn run(self, mut shutdown: Shutdown) {
        if self.period.is_zero() {
            log::error!("alert polling disabled: poll interval is zero");
            return;
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancelled(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                () = cancelled(&mut shutdown) => break,
                result = self.poll_once() => {
                    if let Err(e) = result {
                        log::warn!("alert poll failed, keeping previous alerts: {e}");
                    }
                }
            }
        }

        log::debug!("alert poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeFeed, raw_alert};
    use crate::shutdown::shutdown_pair;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn poll_once_normalizes_and_replaces() {
        let feed = Arc::new(FakeFeed::serving(vec![
            raw_alert("a", 13.0, 80.3),
            raw_alert("bad", 95.0, 80.3),
        ]));
        let view = ViewStateHandle::default();
        let poller = AlertPoller::new(feed, view.clone(), FIVE_MINUTES);

        assert_eq!(poller.poll_once().await.unwrap(), 1);
        let alerts = view.read(|state| state.alerts().to_vec());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity.value(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_stops_without_polling() {
        let feed = Arc::new(FakeFeed::serving(vec![raw_alert("a", 13.0, 80.3)]));
        let poller = AlertPoller::new(feed.clone(), ViewStateHandle::default(), Duration::ZERO);
        let (_trigger, shutdown) = shutdown_pair();

        tokio::spawn(poller.run(shutdown)).await.unwrap();
        assert_eq!(feed.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_period_and_survives_failures() {
        let feed = Arc::new(FakeFeed::serving(vec![raw_alert("a", 13.0, 80.3)]));
        let view = ViewStateHandle::default();
        let poller = AlertPoller::new(feed.clone(), view.clone(), FIVE_MINUTES);
        let (trigger, shutdown) = shutdown_pair();
        let task = tokio::spawn(poller.run(shutdown));

        tokio::time::sleep(FIVE_MINUTES - Duration::from_secs(1)).await;
        assert_eq!(feed.calls(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(feed.calls(), 1);
        assert_eq!(view.read(|state| state.alerts().len()), 1);

        feed.set(None);
        tokio::time::sleep(FIVE_MINUTES).await;
        assert_eq!(feed.calls(), 2);
        assert_eq!(view.read(|state| state.alerts().len()), 1);

        feed.set(Some(vec![]));
        tokio::time::sleep(FIVE_MINUTES).await;
        assert_eq!(feed.calls(), 3);
        assert!(view.read(|state| state.alerts().is_empty()));

        trigger.fire();
        task.await.unwrap();
        tokio::time::sleep(FIVE_MINUTES * 3).await;
        assert_eq!(feed.calls(), 3);
    }
}
