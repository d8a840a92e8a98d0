//! Stations, their outgoing targets, and the wire documents they are read from.

use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use smallvec::SmallVec;

use crate::error::{FetchFailure, PanoError};
use crate::geo::{nearest_feature, GeoPoint};

/// Identifier of a photo station (the panorama image name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub String);

impl StationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        StationId(s.to_string())
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        StationId(s)
    }
}

/// Directional link to a navigably-adjacent station.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: StationId,
    pub position: GeoPoint,
}

/// Most stations link to a handful of neighbours.
pub type Targets = SmallVec<[Target; 4]>;

/// A loaded panorama capture point. Immutable; navigation replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub position: GeoPoint,
    /// Capture heading in degrees clockwise from north.
    pub heading: f64,
    /// Yaw correction applied to the panorama texture, degrees.
    pub fix_heading: f64,
    /// Image reference resolved by the panorama loader.
    pub image: String,
    pub targets: Targets,
}

pub type SharedStation = Rc<Station>;

#[derive(Debug, Clone, Deserialize)]
struct CameraDoc {
    img: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    heading: f64,
    #[serde(default)]
    fix_heading: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TargetDoc {
    id: StationId,
    lat: f64,
    lon: f64,
}

/// Station metadata document as served by the metadata resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StationDocument {
    camera: CameraDoc,
    #[serde(default)]
    targets: Vec<TargetDoc>,
}

impl StationDocument {
    pub fn into_station(self) -> Station {
        Station {
            id: StationId(self.camera.img.clone()),
            position: GeoPoint::new(self.camera.lat, self.camera.lon),
            heading: self.camera.heading,
            fix_heading: self.camera.fix_heading,
            image: self.camera.img,
            targets: self
                .targets
                .into_iter()
                .map(|t| Target {
                    id: t.id,
                    position: GeoPoint::new(t.lat, t.lon),
                })
                .collect(),
        }
    }
}

/// Parse a metadata document fetched for `requested`.
pub fn parse_station(requested: &StationId, json: &str) -> Result<Station, PanoError> {
    serde_json::from_str::<StationDocument>(json)
        .map(StationDocument::into_station)
        .map_err(|e| PanoError::metadata(requested, FetchFailure::Parse, e.to_string()))
}

// ---------------- Overhead map features ----------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Feature {
    /// Point position, GeoJSON order is `[lon, lat]`.
    pub fn point(&self) -> Option<GeoPoint> {
        match &self.geometry {
            Geometry::Point { coordinates } if coordinates.len() >= 2 => {
                Some(GeoPoint::new(coordinates[1], coordinates[0]))
            }
            _ => None,
        }
    }

    pub fn station_id(&self, property: &str) -> Option<StationId> {
        match self.properties.as_ref()?.get(property)? {
            serde_json::Value::String(s) => Some(StationId(s.clone())),
            serde_json::Value::Number(n) => Some(StationId(n.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Point feature closest to `point`, by great-circle distance.
    pub fn nearest_point(&self, point: GeoPoint) -> Option<&Feature> {
        nearest_feature(point, &self.features)
    }

    /// Mean of all point positions; used as the mini-map's initial centre.
    pub fn centroid(&self) -> Option<GeoPoint> {
        let pts: Vec<GeoPoint> = self.features.iter().filter_map(Feature::point).collect();
        if pts.is_empty() {
            return None;
        }
        let n = pts.len() as f64;
        let lat = pts.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = pts.iter().map(|p| p.lon).sum::<f64>() / n;
        Some(GeoPoint::new(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "camera": { "img": "IMG001", "lat": -22.9, "lon": -43.2, "heading": 90.0, "fix_heading": 12.5 },
        "targets": [ { "id": "IMG002", "lat": -22.9, "lon": -43.1999 } ]
    }"#;

    #[test]
    fn parses_station_document() {
        let st = parse_station(&StationId::from("IMG001"), DOC).expect("valid doc");
        assert_eq!(st.id.as_str(), "IMG001");
        assert_eq!(st.image, "IMG001");
        assert_eq!(st.heading, 90.0);
        assert_eq!(st.fix_heading, 12.5);
        assert_eq!(st.targets.len(), 1);
        assert_eq!(st.targets[0].id, StationId::from("IMG002"));
    }

    #[test]
    fn malformed_document_is_a_parse_failure() {
        let err = parse_station(&StationId::from("X"), "{ not json").unwrap_err();
        match err {
            PanoError::MetadataFetch { kind, id, .. } => {
                assert_eq!(kind, FetchFailure::Parse);
                assert_eq!(id.as_str(), "X");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nearest_point_and_empty_collection() {
        let fc = FeatureCollection::from_json(
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }, "properties": { "station_id": "A" } },
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.001, 0.0] }, "properties": { "station_id": "B" } },
                { "type": "Feature", "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [0.001, 0.0]] }, "properties": {} }
            ] }"#,
        )
        .expect("valid geojson");
        let f = fc.nearest_point(GeoPoint::new(0.0, 0.0009)).expect("has points");
        assert_eq!(f.station_id("station_id"), Some(StationId::from("B")));
        assert!(FeatureCollection::default()
            .nearest_point(GeoPoint::new(0.0, 0.0))
            .is_none());
        let c = fc.centroid().expect("centroid");
        assert!((c.lon - 0.0005).abs() < 1e-12);
    }
}
