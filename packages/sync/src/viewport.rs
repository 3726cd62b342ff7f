//! Refetching reports when the map settles on a new rectangle.

use std::sync::Arc;

use hazard_map_api::{ApiError, ReportApi};
use hazard_map_map_models::BoundingBox;

use crate::view_state::{ReportOrigin, ViewStateHandle};

/// What a move-end refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The report set was replaced with `count` reports.
    Applied { count: usize },
    /// A newer fetch had already been applied; this result was dropped.
    Superseded,
    /// The rectangle was not usable; nothing was fetched.
    InvalidBounds,
}

/// Handles the map's move-end callback.
#[derive(Clone)]
pub struct ViewportRefresher {
    api: Arc<dyn ReportApi>,
    view: ViewStateHandle,
}

impl std::fmt::Debug for ViewportRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportRefresher").finish_non_exhaustive()
    }
}

impl ViewportRefresher {
    #[must_use]
    pub fn new(api: Arc<dyn ReportApi>, view: ViewStateHandle) -> Self {
        Self { api, view }
    }

    /// Records `bounds` as the viewport, queries the reports inside it and
    /// replaces the report set with them. Reports outside the rectangle
    /// are not kept.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of a failed query. The report set is left
    /// untouched in that case.
    pub async fn on_move_end(&self, bounds: BoundingBox) -> Result<RefreshOutcome, ApiError> {
        if !bounds.is_valid() {
            log::warn!("ignoring move-end with invalid bounds {bounds:?}");
            return Ok(RefreshOutcome::InvalidBounds);
        }

        let ticket = self.view.update(|state| {
            let zoom = state.viewport().zoom;
            state.set_viewport(bounds.center(), zoom, Some(bounds));
            state.issue_report_ticket()
        });

        let reports = match self.api.reports_in_bounds(&bounds).await {
            Ok(reports) => reports,
            Err(e) => {
                log::warn!("keeping current reports, bounds query {bounds:?} failed: {e}");
                return Err(e);
            }
        };

        let count = reports.len();
        let applied = self
            .view
            .update(|state| state.apply_report_set(ticket, reports, ReportOrigin::Live));

        Ok(if applied {
            RefreshOutcome::Applied { count }
        } else {
            RefreshOutcome::Superseded
        })
    }
}
