#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building a hazard report before it is sent.
//!
//! A [`ReportDraft`] collects the form input, enforces the attachment rules
//! and validates into a [`ReportSubmission`](hazard_map_map_models::ReportSubmission).
//! Attached media can be run through a [`Classifier`] whose prediction may
//! raise the draft's severity.

pub mod classifier;
pub mod draft;

pub use classifier::{
    Classifier, ClassifierError, HeuristicClassifier, HttpClassifier, Prediction,
    suggest_severity,
};
pub use draft::{DraftField, MAX_MEDIA_FILES, MediaError, ReportDraft, ValidationErrors};
