#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns a [`ViewState`](hazard_map_sync::ViewState) into something to
//! draw: report markers and heat circles, hotspot dots, official alert
//! markers, popups, the alert overlay and a GeoJSON export of it all.

pub mod overlay;
pub mod popup;
pub mod scene;
pub mod style;

pub use overlay::{AlertOverlay, OVERLAY_LIMIT, OverlayEntry};
pub use popup::Popup;
pub use scene::{HeatCircle, LayerToggles, MapScene, Marker, MarkerLayer, Symbol};
pub use style::{Badge, MarkerIcon};
