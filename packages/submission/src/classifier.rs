//! Media classification: does the attached media show a water disaster?

use std::time::Duration;

use async_trait::async_trait;
use hazard_map_api::{ApiError, RetryPolicy, retry};
use hazard_map_hazard_models::Severity;
use hazard_map_map_models::lenient::{as_bool, as_f64, as_text};
use hazard_map_map_models::{Coordinates, FailureKind, MediaFile, MediaKind};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

/// Errors that can occur while classifying media.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The classification service could not be reached or refused the
    /// request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// There was nothing to classify.
    #[error("no media to classify")]
    NoMedia,

    /// The service needs the report position.
    #[error("classification requires a position")]
    MissingPosition,

    /// The service answered with something other than a prediction.
    #[error("malformed prediction: {message}")]
    Malformed {
        /// What was wrong with it.
        message: String,
    },
}

impl ClassifierError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::NoMedia | Self::MissingPosition => FailureKind::ValidationFailure,
            Self::Malformed { .. } => FailureKind::MalformedPayload,
        }
    }
}

/// Result of classifying a set of media files.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub is_disaster: bool,
    pub label: String,
    /// Confidence in 0-1.
    pub score: f64,
    /// Which classifier produced it.
    pub source: String,
}

/// Suggested severity for a prediction: confident disasters
/// (`score > 0.8`) map to `ceil(score * 5)` clamped to 3-5. Anything else
/// leaves the severity alone.
#[must_use]
pub fn suggest_severity(prediction: &Prediction) -> Option<Severity> {
    if !prediction.is_disaster || prediction.score.is_nan() || prediction.score <= 0.8 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let level = (prediction.score * 5.0).ceil().clamp(3.0, 5.0) as u8;
    Severity::from_value(level).ok()
}

/// Classifies report media.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Predicts whether `files` show a water disaster. `position` is where
    /// the report was made.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the prediction cannot be made.
    async fn predict(
        &self,
        files: &[MediaFile],
        position: Option<Coordinates>,
    ) -> Result<Prediction, ClassifierError>;
}

/// Offline classifier that judges by media type alone: any video is taken
/// as a water disaster, images as flooding.
///
/// Confidence grows with the share of videos, from 0.75 for images only
/// to 0.95 for videos only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// Synchronous form of [`Classifier::predict`].
    #[must_use]
    pub fn classify(files: &[MediaFile]) -> Prediction {
        let kinds: Vec<MediaKind> = files.iter().filter_map(MediaFile::kind).collect();
        let videos = kinds.iter().filter(|k| **k == MediaKind::Video).count();

        let (is_disaster, label) = match (kinds.is_empty(), videos > 0) {
            (true, _) => (false, "Unknown"),
            (false, true) => (true, "Water_Disaster"),
            (false, false) => (true, "Flood"),
        };

        #[allow(clippy::cast_precision_loss)]
        let score = if kinds.is_empty() {
            0.0
        } else {
            0.2f64.mul_add(videos as f64 / kinds.len() as f64, 0.75)
        };

        Prediction {
            is_disaster,
            label: label.to_string(),
            score,
            source: "heuristic".to_string(),
        }
    }
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn predict(
        &self,
        files: &[MediaFile],
        _position: Option<Coordinates>,
    ) -> Result<Prediction, ClassifierError> {
        if files.is_empty() {
            return Err(ClassifierError::NoMedia);
        }
        Ok(Self::classify(files))
    }
}

/// Posts the first file to an image-classification service's `/predict`
/// endpoint.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    /// `base_url` is the service root; requests go to `{base_url}/predict`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Api`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            client,
            url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

/// Reads the service's `{is_disaster, label, score}` answer. The score
/// may be a number or a formatted string.
fn parse_prediction(body: &Value) -> Result<Prediction, ClassifierError> {
    if let Some(error) = body.get("error").and_then(as_text) {
        return Err(ClassifierError::Malformed { message: error });
    }
    let score = body
        .get("score")
        .and_then(as_f64)
        .ok_or_else(|| ClassifierError::Malformed {
            message: format!("missing score in {body}"),
        })?;

    Ok(Prediction {
        is_disaster: body.get("is_disaster").and_then(as_bool).unwrap_or(false),
        label: body
            .get("label")
            .and_then(as_text)
            .unwrap_or_else(|| "Unknown".to_string()),
        score: score.clamp(0.0, 1.0),
        source: "classifier".to_string(),
    })
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn predict(
        &self,
        files: &[MediaFile],
        position: Option<Coordinates>,
    ) -> Result<Prediction, ClassifierError> {
        let file = files.first().ok_or(ClassifierError::NoMedia)?;
        let position = position.ok_or(ClassifierError::MissingPosition)?;

        let body = retry::send_json(
            || {
                let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                let form = Form::new()
                    .part("file", part)
                    .text("latitude", position.lat.to_string())
                    .text("longitude", position.lng.to_string());
                self.client.post(&self.url).multipart(form)
            },
            &RetryPolicy::none(),
        )
        .await?;

        parse_prediction(&body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn prediction(is_disaster: bool, score: f64) -> Prediction {
        Prediction {
            is_disaster,
            label: "Flood".to_string(),
            score,
            source: "test".to_string(),
        }
    }

    #[test]
    fn severity_suggestion_thresholds() {
        assert_eq!(suggest_severity(&prediction(true, 0.8)), None);
        assert_eq!(suggest_severity(&prediction(false, 0.99)), None);
        assert_eq!(
            suggest_severity(&prediction(true, 0.81)),
            Some(Severity::Critical)
        );
        assert_eq!(suggest_severity(&prediction(true, 1.0)), Some(Severity::Critical));
        assert_eq!(suggest_severity(&prediction(true, f64::NAN)), None);
    }

    #[test]
    fn heuristic_labels_by_media_type() {
        let image = MediaFile::new("a.png", "image/png", vec![]);
        let video = MediaFile::new("b.mp4", "video/mp4", vec![]);

        let images = HeuristicClassifier::classify(std::slice::from_ref(&image));
        assert!(images.is_disaster);
        assert_eq!(images.label, "Flood");
        assert!((images.score - 0.75).abs() < 1e-9);
        assert_eq!(suggest_severity(&images), None);

        let mixed = HeuristicClassifier::classify(&[image, video.clone()]);
        assert_eq!(mixed.label, "Water_Disaster");
        assert!((mixed.score - 0.85).abs() < 1e-9);

        let videos = HeuristicClassifier::classify(&[video]);
        assert!((videos.score - 0.95).abs() < 1e-9);
        assert_eq!(suggest_severity(&videos), Some(Severity::Critical));

        let text = MediaFile::new("x.txt", "text/plain", vec![]);
        let unknown = HeuristicClassifier::classify(&[text]);
        assert!(!unknown.is_disaster);
        assert_eq!(unknown.label, "Unknown");
    }

    #[tokio::test]
    async fn heuristic_needs_media() {
        let err = HeuristicClassifier.predict(&[], None).await.unwrap_err();
        assert!(matches!(err, ClassifierError::NoMedia));
        assert_eq!(err.kind(), FailureKind::ValidationFailure);
    }

    #[test]
    fn parses_service_answers() {
        let parsed = parse_prediction(&json!({
            "is_disaster": true,
            "label": "Water_Disaster",
            "score": "0.87"
        }))
        .unwrap();
        assert!(parsed.is_disaster);
        assert!((parsed.score - 0.87).abs() < 1e-9);

        let err = parse_prediction(&json!({"error": "File type not allowed"})).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedPayload);
        assert!(parse_prediction(&json!({"label": "Flood"})).is_err());
    }

    #[tokio::test]
    async fn http_classifier_requires_position() {
        let classifier = HttpClassifier::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let files = [MediaFile::new("a.png", "image/png", vec![1])];
        let err = classifier.predict(&files, None).await.unwrap_err();
        assert!(matches!(err, ClassifierError::MissingPosition));
    }
}
