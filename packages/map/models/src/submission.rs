//! Payloads sent to the backend: new reports, media and login.

use hazard_map_hazard_models::{HazardCategory, Severity};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::Coordinates;

/// Broad class of an attached media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a MIME type. Only JPEG/PNG images and MP4/AVI/MOV videos
    /// are accepted.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/png" => Some(Self::Image),
            "video/mp4" | "video/avi" | "video/x-msvideo" | "video/mov" | "video/quicktime" => {
                Some(Self::Video)
            }
            _ => None,
        }
    }

    /// Classifies a file by extension, returning the kind and the MIME type
    /// to upload it with.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<(Self, &'static str)> {
        let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" => Some((Self::Image, "image/jpeg")),
            "png" => Some((Self::Image, "image/png")),
            "mp4" => Some((Self::Video, "video/mp4")),
            "avi" => Some((Self::Video, "video/x-msvideo")),
            "mov" => Some((Self::Video, "video/quicktime")),
            _ => None,
        }
    }
}

/// A photo or video attached to a report.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// The kind of media, if the content type is one the backend accepts.
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_content_type(&self.content_type)
    }
}

impl std::fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A validated report ready to be posted as multipart form data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub title: String,
    pub description: String,
    pub category: HazardCategory,
    pub severity: Severity,
    pub location_name: String,
    pub position: Coordinates,
    pub is_offline_report: bool,
    pub media: Vec<MediaFile>,
}

impl ReportSubmission {
    /// The text fields of the multipart form, in the order they are sent.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("event_type", self.category.to_string()),
            ("severity", self.severity.value().to_string()),
            ("location_name", self.location_name.clone()),
            ("latitude", self.position.lat.to_string()),
            ("longitude", self.position.lng.to_string()),
            ("is_offline_report", self.is_offline_report.to_string()),
        ]
    }
}

/// Credentials posted to `/auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Bearer token returned by a successful login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken").finish_non_exhaustive()
    }
}
