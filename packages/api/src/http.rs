//! [`ReportApi`] over HTTP with `reqwest`.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hazard_map_map_models::lenient::parse_list;
use hazard_map_map_models::{
    AuthToken, BoundingBox, Coordinates, Hotspot, LoginRequest, MediaFile, Report,
    ReportSubmission,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::retry::{self, RetryPolicy};
use crate::{ApiError, ReportApi};

/// REST client for the hazard backend.
///
/// Holds the bearer token obtained by [`ReportApi::login`]. A 401 from any
/// endpoint clears it.
#[derive(Debug)]
pub struct HttpReportApi {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl HttpReportApi {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g. `http://localhost:8000/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, retry))
    }

    /// Creates a client around an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            retry,
        }
    }

    /// Replaces the stored bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// The stored bearer token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Appends each segment to the base URL, percent-encoding it.
    fn url_with_segments(&self, segments: &[&str]) -> Result<String, ApiError> {
        let invalid = |message: String| ApiError::InvalidUrl {
            url: self.base_url.clone(),
            message,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("not a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Clears the token when the backend rejected it.
    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ApiError::Unauthorized { url }) = &result {
            log::warn!("{url} rejected the session token, logging out");
            self.set_token(None);
        }
        result
    }

    async fn get_list<T, Q>(&self, path: &str, query: &Q) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + Sync + ?Sized,
    {
        self.get_list_at(self.url(path), query).await
    }

    async fn get_list_at<T, Q>(&self, url: String, query: &Q) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + Sync + ?Sized,
    {
        let body = self.observe(
            retry::send_json(
                || self.authorize(self.client.get(&url).query(query)),
                &self.retry,
            )
            .await,
        )?;

        let parsed = parse_list::<T>(body).map_err(|e| ApiError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if parsed.dropped > 0 {
            log::warn!(
                "{url}: dropped {} malformed entries, kept {}",
                parsed.dropped,
                parsed.items.len()
            );
        }
        Ok(parsed.items)
    }
}

fn media_part(file: &MediaFile) -> Part {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    part().mime_str(&file.content_type).unwrap_or_else(|e| {
        log::warn!(
            "{}: unusable content type {:?}: {e}",
            file.file_name,
            file.content_type
        );
        part()
    })
}

fn submission_form(submission: &ReportSubmission) -> Form {
    let form = submission
        .form_fields()
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    submission
        .media
        .iter()
        .fold(form, |form, file| form.part("media_files", media_part(file)))
}

#[async_trait]
impl ReportApi for HttpReportApi {
    async fn reports(&self, limit: u32) -> Result<Vec<Report>, ApiError> {
        self.get_list("/reports", &[("limit", limit)]).await
    }

    async fn reports_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<Report>, ApiError> {
        self.get_list(
            "/reports/bounds",
            &[
                ("north", bounds.north),
                ("south", bounds.south),
                ("east", bounds.east),
                ("west", bounds.west),
            ],
        )
        .await
    }

    async fn hotspots(&self) -> Result<Vec<Hotspot>, ApiError> {
        self.get_list::<Hotspot, [(&str, &str)]>("/hotspots", &[])
            .await
    }

    async fn submit_report(&self, submission: &ReportSubmission) -> Result<Report, ApiError> {
        let url = self.url("/reports");
        // Creating a report is not idempotent, so it is never retried.
        let body = self.observe(
            retry::send_json(
                || self.authorize(self.client.post(&url).multipart(submission_form(submission))),
                &RetryPolicy::none(),
            )
            .await,
        )?;

        Report::from_value(body).map_err(|e| ApiError::Malformed {
            url,
            message: format!("created report: {e}"),
        })
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<AuthToken, ApiError> {
        let url = self.url("/auth/login");
        let body = self.observe(
            retry::send_json(|| self.client.post(&url).json(credentials), &self.retry).await,
        )?;

        let token: AuthToken = serde_json::from_value(body).map_err(|e| ApiError::Malformed {
            url,
            message: format!("login response: {e}"),
        })?;
        self.set_token(Some(token.access_token.clone()));
        log::info!("logged in as {}", credentials.username);
        Ok(token)
    }

    fn logout(&self) {
        self.set_token(None);
    }

    async fn reports_near(
        &self,
        position: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<Report>, ApiError> {
        self.get_list(
            "/reports/nearby",
            &[
                ("lat", position.lat.to_string()),
                ("lng", position.lng.to_string()),
                ("radius", radius_m.to_string()),
            ],
        )
        .await
    }

    async fn hotspot_reports(&self, hotspot_id: &str) -> Result<Vec<Report>, ApiError> {
        let url = self.url_with_segments(&["hotspots", hotspot_id, "reports"])?;
        self.get_list_at::<Report, [(&str, &str)]>(url, &[]).await
    }
}
