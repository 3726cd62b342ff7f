//! The drawable contents of the map for one view state.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use hazard_map_map_models::{Alert, BoundingBox, Coordinates, Hotspot, Report};
use hazard_map_sync::ViewState;
use serde::Serialize;
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display};

use crate::popup::Popup;
use crate::style::{
    HEAT_COLOUR, HEAT_FILL_OPACITY, HEAT_METERS_PER_SEVERITY, HEAT_STROKE_WEIGHT, MarkerIcon,
    risk_colour,
};

/// Which optional layers are drawn. Alerts are always drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerToggles {
    pub heatmap: bool,
    pub markers: bool,
    pub hotspots: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            heatmap: true,
            markers: true,
            hotspots: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkerLayer {
    Report,
    Hotspot,
    Alert,
}

/// How a marker is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Icon(MarkerIcon),
    /// A plain coloured dot.
    Dot(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub layer: MarkerLayer,
    pub position: Coordinates,
    pub symbol: Symbol,
    pub popup: Popup,
}

impl Marker {
    fn report(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            layer: MarkerLayer::Report,
            position: report.position,
            symbol: Symbol::Icon(MarkerIcon::for_report(report.category)),
            popup: Popup::for_report(report),
        }
    }

    fn hotspot(hotspot: &Hotspot) -> Self {
        Self {
            id: hotspot.id.clone(),
            layer: MarkerLayer::Hotspot,
            position: hotspot.position,
            symbol: Symbol::Dot(risk_colour(hotspot.risk_level)),
            popup: Popup::for_hotspot(hotspot),
        }
    }

    fn alert(alert: &Alert) -> Self {
        Self {
            id: alert.id.clone(),
            layer: MarkerLayer::Alert,
            position: alert.coordinates,
            symbol: Symbol::Icon(MarkerIcon::for_alert(alert.category)),
            popup: Popup::for_alert(alert),
        }
    }
}

/// A translucent circle under a report, sized by severity.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatCircle {
    pub report_id: String,
    pub center: Coordinates,
    pub radius_m: f64,
}

impl HeatCircle {
    fn for_report(report: &Report) -> Self {
        Self {
            report_id: report.id.clone(),
            center: report.position,
            radius_m: f64::from(report.severity.value()) * HEAT_METERS_PER_SEVERITY,
        }
    }
}

/// Everything drawn on the map, in drawing order: heat circles, report
/// markers, hotspot markers, alert markers.
#[derive(Debug, Clone, PartialEq)]
pub struct MapScene {
    pub center: Coordinates,
    pub zoom: u8,
    pub bounds: Option<BoundingBox>,
    pub heat: Vec<HeatCircle>,
    pub markers: Vec<Marker>,
}

impl MapScene {
    #[must_use]
    pub fn build(state: &ViewState, layers: LayerToggles) -> Self {
        let reports = state.reports();

        let heat = if layers.heatmap {
            reports.iter().map(HeatCircle::for_report).collect()
        } else {
            vec![]
        };

        let mut markers = Vec::new();
        if layers.markers {
            markers.extend(reports.iter().map(Marker::report));
        }
        if layers.hotspots {
            markers.extend(state.hotspots().iter().map(Marker::hotspot));
        }
        markers.extend(state.alerts().iter().map(Marker::alert));

        let viewport = state.viewport();
        log::trace!(
            "scene: {} heat circles, {} markers at zoom {}",
            heat.len(),
            markers.len(),
            viewport.zoom
        );

        Self {
            center: viewport.center,
            zoom: viewport.zoom,
            bounds: viewport.bounds,
            heat,
            markers,
        }
    }

    pub fn markers_in(&self, layer: MarkerLayer) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |marker| marker.layer == layer)
    }

    /// The scene as point features. Heat circles carry their radius and
    /// style, markers their icon or colour and popup. The viewport goes
    /// into `center`/`zoom` members of the collection.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let heat = self.heat.iter().map(|circle| {
            point(
                format!("heat_{}", circle.report_id),
                circle.center,
                json!({
                    "layer": "heat",
                    "report_id": circle.report_id,
                    "radius_m": circle.radius_m,
                    "color": HEAT_COLOUR,
                    "fill_opacity": HEAT_FILL_OPACITY,
                    "weight": HEAT_STROKE_WEIGHT,
                }),
            )
        });

        let markers = self.markers.iter().map(|marker| {
            let mut properties = json!({
                "layer": marker.layer,
                "title": marker.popup.title,
                "popup": marker.popup,
            });
            match marker.symbol {
                Symbol::Icon(icon) => properties["icon"] = json!(icon),
                Symbol::Dot(colour) => properties["color"] = json!(colour),
            }
            point(format!("{}_{}", marker.layer, marker.id), marker.position, properties)
        });

        let mut viewport = JsonObject::new();
        viewport.insert(
            "center".to_string(),
            json!([self.center.lng, self.center.lat]),
        );
        viewport.insert("zoom".to_string(), json!(self.zoom));

        FeatureCollection {
            bbox: self
                .bounds
                .map(|b| vec![b.west, b.south, b.east, b.north]),
            features: heat.chain(markers).collect(),
            foreign_members: Some(viewport),
        }
    }

    /// Pretty-printed GeoJSON of [`Self::to_feature_collection`].
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_geojson_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_feature_collection())
    }
}

fn point(id: String, position: Coordinates, properties: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            position.lng,
            position.lat,
        ]))),
        id: Some(Id::String(id)),
        properties: match properties {
            Value::Object(map) => Some(map),
            _ => None,
        },
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use hazard_map_hazard_models::HazardCategory;
    use hazard_map_sync::fallback::{fallback_hotspots, fallback_reports};
    use serde_json::json;

    use super::*;

    fn state() -> ViewState {
        let now = chrono::Utc::now();
        let mut state = ViewState::new();
        state.set_reports(fallback_reports(now));
        state.replace_hotspots(fallback_hotspots(now));
        state.replace_alerts(
            [
                json!({"id": "t1", "type": "tsunami", "severity": 5, "latitude": 11.0, "longitude": 92.7}),
                json!({"id": "o1", "type": "oil_spill", "severity": 3, "latitude": 19.0, "longitude": 72.8}),
            ]
            .iter()
            .filter_map(hazard_map_map_models::normalize_alert_value)
            .collect(),
        );
        state
    }

    #[test]
    fn full_scene_layers() {
        let scene = MapScene::build(&state(), LayerToggles::default());

        assert_eq!(scene.heat.len(), 3);
        assert!((scene.heat[0].radius_m - 4000.0).abs() < f64::EPSILON);
        assert_eq!(scene.markers_in(MarkerLayer::Report).count(), 3);

        let hotspots: Vec<Symbol> = scene
            .markers_in(MarkerLayer::Hotspot)
            .map(|m| m.symbol)
            .collect();
        assert_eq!(hotspots, [Symbol::Dot("#ff0000"), Symbol::Dot("#ff9900")]);

        let alerts: Vec<Symbol> = scene
            .markers_in(MarkerLayer::Alert)
            .map(|m| m.symbol)
            .collect();
        assert_eq!(
            alerts,
            [
                Symbol::Icon(MarkerIcon::TsunamiIncois),
                Symbol::Icon(MarkerIcon::OilSpill)
            ]
        );
    }

    #[test]
    fn toggles_hide_layers_but_not_alerts() {
        let scene = MapScene::build(
            &state(),
            LayerToggles {
                heatmap: false,
                markers: false,
                hotspots: false,
            },
        );
        assert!(scene.heat.is_empty());
        assert_eq!(scene.markers.len(), 2);
        assert!(scene.markers.iter().all(|m| m.layer == MarkerLayer::Alert));
    }

    #[test]
    fn report_marker_icons() {
        let report = Report::from_value(json!({
            "id": "c", "type": "chemical_spill", "severity": 1, "latitude": 9.9, "longitude": 76.2
        }))
        .unwrap();
        let marker = Marker::report(&report);
        assert_eq!(report.category, HazardCategory::ChemicalSpill);
        assert_eq!(marker.symbol, Symbol::Icon(MarkerIcon::ChemicalSpill));
        assert!((HeatCircle::for_report(&report).radius_m - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geojson_export() {
        let mut state = state();
        let bounds = BoundingBox::new(20.0, 10.0, 80.0, 70.0);
        state.set_viewport(bounds.center(), 7, Some(bounds));
        let scene = MapScene::build(&state, LayerToggles::default());

        let collection = scene.to_feature_collection();
        assert_eq!(collection.features.len(), 3 + 3 + 2 + 2);
        assert_eq!(collection.bbox, Some(vec![70.0, 10.0, 80.0, 20.0]));

        let value: Value = serde_json::from_str(&scene.to_geojson_string().unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["zoom"], 7);

        let heat = &value["features"][0];
        assert_eq!(heat["geometry"]["coordinates"], json!([72.8777, 19.076]));
        assert_eq!(heat["properties"]["color"], "#ff6b6b");
        assert_eq!(heat["properties"]["fill_opacity"], 0.3);

        let hotspot = &value["features"][6];
        assert_eq!(hotspot["id"], "hotspot_hotspot_1");
        assert_eq!(hotspot["properties"]["color"], "#ff0000");
        assert_eq!(hotspot["properties"]["popup"]["title"], "Dangerous Rip Current Zone");

        let alert = &value["features"][8];
        assert_eq!(alert["properties"]["icon"], "tsunami_incois");
        assert_eq!(alert["properties"]["layer"], "alert");
    }
}
