//! Report drafts and their validation.

use std::collections::BTreeMap;

use hazard_map_hazard_models::{HazardCategory, Severity};
use hazard_map_map_models::{Coordinates, FailureKind, MediaFile, ReportSubmission};
use strum_macros::{AsRefStr, Display};

use crate::classifier::{Prediction, suggest_severity};

/// Most attachments a single report may carry.
pub const MAX_MEDIA_FILES: usize = 5;

/// A form field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DraftField {
    Title,
    Description,
    LocationName,
    Coordinates,
    Latitude,
    Longitude,
    MediaFiles,
}

/// Every problem found in a draft, one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<DraftField, String>,
}

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: DraftField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    fn insert(&mut self, field: DraftField, message: &str) {
        self.fields.insert(field, message.to_string());
    }

    /// Always [`FailureKind::ValidationFailure`].
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::ValidationFailure
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid report")?;
        for (i, (field, message)) in self.fields.iter().enumerate() {
            write!(f, "{} {field}: {message}", if i == 0 { ":" } else { ";" })?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Attachments that could not be added.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Adding the files would exceed [`MAX_MEDIA_FILES`]; nothing was
    /// added.
    #[error("Maximum {max} files allowed ({attempted} requested)")]
    TooMany {
        /// The limit.
        max: usize,
        /// Attached plus newly accepted files.
        attempted: usize,
    },
}

/// A report being filled in.
///
/// Latitude and longitude are kept as entered so that "missing" and
/// "not a number" can be told apart when validating.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub category: HazardCategory,
    pub severity: Severity,
    pub location_name: String,
    pub latitude: String,
    pub longitude: String,
    pub is_offline_report: bool,
    media: Vec<MediaFile>,
}

impl Default for ReportDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: HazardCategory::OilSpill,
            severity: Severity::Moderate,
            location_name: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            is_offline_report: false,
            media: Vec::new(),
        }
    }
}

impl ReportDraft {
    /// A draft with the required text fields filled in, the default
    /// category and severity, and no media.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        location_name: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            location_name: location_name.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            ..Self::default()
        }
    }

    /// Fills both coordinate fields from a known position, e.g. the
    /// device location, with six decimals.
    pub fn set_position(&mut self, position: Coordinates) {
        self.latitude = format!("{:.6}", position.lat);
        self.longitude = format!("{:.6}", position.lng);
    }

    /// The entered position, if both fields parse into range.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        let lat = parse_in_range(&self.latitude, 90.0)?;
        let lng = parse_in_range(&self.longitude, 180.0)?;
        Some(Coordinates::new(lat, lng))
    }

    /// Attached media, in the order added.
    #[must_use]
    pub fn media(&self) -> &[MediaFile] {
        &self.media
    }

    /// Attaches files, skipping any whose type is not a JPEG/PNG image or
    /// an MP4/AVI/MOV video.
    ///
    /// Returns the names of the skipped files.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::TooMany`] if the accepted files would take
    /// the draft past [`MAX_MEDIA_FILES`]. In that case nothing is added.
    pub fn add_media(&mut self, files: Vec<MediaFile>) -> Result<Vec<String>, MediaError> {
        let (accepted, rejected): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|file| file.kind().is_some());

        let attempted = self.media.len() + accepted.len();
        if attempted > MAX_MEDIA_FILES {
            return Err(MediaError::TooMany {
                max: MAX_MEDIA_FILES,
                attempted,
            });
        }

        let rejected: Vec<String> = rejected.into_iter().map(|file| file.file_name).collect();
        if !rejected.is_empty() {
            log::warn!(
                "rejected {} attachment(s): only JPEG, PNG images and MP4, AVI, MOV videos are allowed",
                rejected.len()
            );
        }
        self.media.extend(accepted);
        Ok(rejected)
    }

    /// Detaches the file at `index`, if there is one.
    pub fn remove_media(&mut self, index: usize) -> Option<MediaFile> {
        (index < self.media.len()).then(|| self.media.remove(index))
    }

    /// Raises the severity when the prediction is a confident disaster.
    /// Returns the new severity if it changed.
    pub fn apply_prediction(&mut self, prediction: &Prediction) -> Option<Severity> {
        let suggested = suggest_severity(prediction)?;
        if suggested == self.severity {
            return None;
        }
        log::info!(
            "{} ({:.2}): severity {} -> {}",
            prediction.label,
            prediction.score,
            self.severity.value(),
            suggested.value()
        );
        self.severity = suggested;
        Some(suggested)
    }

    /// Checks the draft and turns it into a submission.
    ///
    /// Title, description and location name must be non-blank; latitude
    /// and longitude must both be present and parse into range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every failing field.
    pub fn validate(&self) -> Result<ReportSubmission, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.insert(DraftField::Title, "Title is required");
        }
        if self.description.trim().is_empty() {
            errors.insert(DraftField::Description, "Description is required");
        }
        if self.location_name.trim().is_empty() {
            errors.insert(DraftField::LocationName, "Location name is required");
        }

        let mut position = None;
        if self.latitude.trim().is_empty() || self.longitude.trim().is_empty() {
            errors.insert(
                DraftField::Coordinates,
                "Latitude and longitude are required",
            );
        } else {
            let lat = parse_in_range(&self.latitude, 90.0);
            let lng = parse_in_range(&self.longitude, 180.0);
            if lat.is_none() {
                errors.insert(DraftField::Latitude, "Invalid latitude (-90 to 90)");
            }
            if lng.is_none() {
                errors.insert(DraftField::Longitude, "Invalid longitude (-180 to 180)");
            }
            if let (Some(lat), Some(lng)) = (lat, lng) {
                position = Some(Coordinates::new(lat, lng));
            }
        }

        match position {
            Some(position) if errors.is_empty() => Ok(ReportSubmission {
                title: self.title.trim().to_string(),
                description: self.description.trim().to_string(),
                category: self.category,
                severity: self.severity,
                location_name: self.location_name.trim().to_string(),
                position,
                is_offline_report: self.is_offline_report,
                media: self.media.clone(),
            }),
            _ => Err(errors),
        }
    }
}

fn parse_in_range(text: &str, limit: f64) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (-limit..=limit).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> ReportDraft {
        ReportDraft::new(
            "Oil sheen",
            "Rainbow film along the jetty",
            "Vizhinjam",
            "8.3800",
            "76.9900",
        )
    }

    fn jpeg(name: &str) -> MediaFile {
        MediaFile::new(name, "image/jpeg", vec![0xff, 0xd8])
    }

    #[test]
    fn complete_draft_validates() {
        let submission = complete_draft().validate().unwrap();
        assert_eq!(submission.position, Coordinates::new(8.38, 76.99));
        assert_eq!(submission.category, HazardCategory::OilSpill);
        assert_eq!(submission.severity, Severity::Moderate);
        assert!(submission.media.is_empty());
        assert!(!submission.is_offline_report);
    }

    #[test]
    fn blank_draft_reports_every_required_field() {
        let errors = ReportDraft::default().validate().unwrap_err();
        assert_eq!(errors.get(DraftField::Title), Some("Title is required"));
        assert!(errors.get(DraftField::Description).is_some());
        assert!(errors.get(DraftField::LocationName).is_some());
        assert_eq!(
            errors.get(DraftField::Coordinates),
            Some("Latitude and longitude are required")
        );
        assert!(errors.get(DraftField::Latitude).is_none());
        assert_eq!(errors.kind(), FailureKind::ValidationFailure);
    }

    #[test]
    fn out_of_range_coordinates() {
        let draft = ReportDraft {
            latitude: "91".to_string(),
            longitude: "east".to_string(),
            ..complete_draft()
        };
        let errors = draft.validate().unwrap_err();
        assert_eq!(
            errors.get(DraftField::Latitude),
            Some("Invalid latitude (-90 to 90)")
        );
        assert_eq!(
            errors.get(DraftField::Longitude),
            Some("Invalid longitude (-180 to 180)")
        );
        assert!(errors.to_string().starts_with("invalid report: latitude: "));
    }

    #[test]
    fn unsupported_media_is_skipped() {
        let mut draft = complete_draft();
        let rejected = draft
            .add_media(vec![
                jpeg("a.jpg"),
                MediaFile::new("b.gif", "image/gif", vec![]),
                MediaFile::new("c.mov", "video/quicktime", vec![]),
            ])
            .unwrap();
        assert_eq!(rejected, vec!["b.gif".to_string()]);
        assert_eq!(draft.media().len(), 2);
    }

    #[test]
    fn at_most_five_attachments() {
        let mut draft = complete_draft();
        draft
            .add_media((0..4).map(|i| jpeg(&format!("{i}.jpg"))).collect())
            .unwrap();

        let err = draft
            .add_media(vec![jpeg("4.jpg"), jpeg("5.jpg")])
            .unwrap_err();
        assert_eq!(err, MediaError::TooMany { max: 5, attempted: 6 });
        assert_eq!(draft.media().len(), 4);

        draft.add_media(vec![jpeg("4.jpg")]).unwrap();
        assert_eq!(draft.media().len(), 5);
        assert!(draft.remove_media(9).is_none());
        assert_eq!(draft.remove_media(0).unwrap().file_name, "0.jpg");
    }

    #[test]
    fn set_position_formats_six_decimals() {
        let mut draft = ReportDraft::default();
        draft.set_position(Coordinates::new(19.076_012_34, 72.8777));
        assert_eq!(draft.latitude, "19.076012");
        assert_eq!(draft.longitude, "72.877700");
        assert_eq!(draft.position(), Some(Coordinates::new(19.076_012, 72.8777)));

        draft.longitude = "200".to_string();
        assert_eq!(draft.position(), None);
    }

    #[test]
    fn confident_prediction_raises_severity() {
        let mut draft = complete_draft();
        let prediction = Prediction {
            is_disaster: true,
            label: "Water_Disaster".to_string(),
            score: 0.91,
            source: "test".to_string(),
        };
        assert_eq!(draft.apply_prediction(&prediction), Some(Severity::Critical));
        assert_eq!(draft.severity, Severity::Critical);
        assert_eq!(draft.apply_prediction(&prediction), None);
    }
}
