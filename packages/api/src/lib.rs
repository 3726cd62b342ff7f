#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! REST client for the hazard reporting backend.
//!
//! The map talks to the backend through the [`ReportApi`] trait so the
//! synchronization core can be exercised against in-memory fakes.
//! [`HttpReportApi`] is the production implementation.

pub mod http;
pub mod retry;

pub use http::HttpReportApi;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use hazard_map_map_models::{
    AuthToken, BoundingBox, Coordinates, FailureKind, Hotspot, LoginRequest, Report,
    ReportSubmission,
};

/// Search radius used by [`ReportApi::reports_near`] callers that have no
/// preference, in meters.
pub const DEFAULT_NEARBY_RADIUS_M: u32 = 1000;

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The backend rejected the bearer token. The stored token has been
    /// cleared.
    #[error("unauthorized request to {url}")]
    Unauthorized {
        /// Request URL.
        url: String,
    },

    /// The response body was not the expected shape.
    #[error("malformed response from {url}: {message}")]
    Malformed {
        /// Request URL.
        url: String,
        /// What was wrong with it.
        message: String,
    },

    /// The configured base URL cannot carry a request path.
    #[error("cannot build a request URL from {url}: {message}")]
    InvalidUrl {
        /// Configured base URL.
        url: String,
        /// Why it was unusable.
        message: String,
    },
}

impl ApiError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_)
            | Self::Status { .. }
            | Self::Unauthorized { .. }
            | Self::InvalidUrl { .. } => {
                FailureKind::NetworkFailure
            }
            Self::Malformed { .. } => FailureKind::MalformedPayload,
        }
    }
}

/// The backend's report, hotspot and auth endpoints.
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// `GET /reports?limit=N`: the most recent reports.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a list.
    async fn reports(&self, limit: u32) -> Result<Vec<Report>, ApiError>;

    /// `GET /reports/bounds`: reports inside a rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a list.
    async fn reports_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<Report>, ApiError>;

    /// `GET /hotspots`: the current hotspot snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a list.
    async fn hotspots(&self) -> Result<Vec<Hotspot>, ApiError>;

    /// `POST /reports` as multipart form data; returns the created report.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the created report
    /// cannot be parsed.
    async fn submit_report(&self, submission: &ReportSubmission) -> Result<Report, ApiError>;

    /// `POST /auth/login`. On success the token is kept and sent with
    /// every later request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the credentials are rejected or the
    /// response has no token.
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthToken, ApiError>;

    /// Forgets the stored token.
    fn logout(&self);

    /// `GET /reports/nearby`: reports within `radius_m` meters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a list.
    async fn reports_near(
        &self,
        position: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<Report>, ApiError>;

    /// `GET /hotspots/{id}/reports`: the reports behind a hotspot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the body is not a list.
    async fn hotspot_reports(&self, hotspot_id: &str) -> Result<Vec<Report>, ApiError>;
}
