// In-memory stand-ins for the services a viewer session talks to.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use pano_core::{
    parse_station, FetchFailure, GeoBounds, GeoPoint, MeshHandle, MiniMap, PanoError,
    PanoramaImage, PanoramaLoader, SceneRenderer, SceneView, Session, Station, StationId,
    StationSource, ViewerConfig,
};
use serde_json::json;

#[derive(Default)]
pub struct RecordingRenderer {
    next: u32,
    live: BTreeMap<u32, StationId>,
    pub created: usize,
    pub disposed: usize,
    pub panoramas_set: usize,
    pub released: usize,
    pub draws: usize,
    pub size: (u32, u32),
}

impl RecordingRenderer {
    /// Targets of the marker meshes still alive, sorted.
    pub fn live_targets(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.live.values().map(|id| id.0.clone()).collect();
        ids.sort();
        ids
    }
}

impl SceneRenderer for RecordingRenderer {
    fn create_marker(&mut self, target: &StationId) -> MeshHandle {
        self.next += 1;
        self.created += 1;
        self.live.insert(self.next, target.clone());
        MeshHandle(self.next)
    }

    fn dispose_marker(&mut self, handle: MeshHandle) {
        assert!(
            self.live.remove(&handle.0).is_some(),
            "disposed unknown marker {:?}",
            handle
        );
        self.disposed += 1;
    }

    fn set_panorama(&mut self, _image: &PanoramaImage) -> Result<(), PanoError> {
        self.panoramas_set += 1;
        Ok(())
    }

    fn release_panorama(&mut self) {
        self.released += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn draw(&mut self, view: &SceneView) -> Result<(), PanoError> {
        for m in &view.markers {
            assert!(self.live.contains_key(&m.handle.0), "drew disposed marker");
        }
        self.draws += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    Select(String),
    Center(GeoPoint),
    Fit(GeoBounds),
    Rotate(f64),
}

#[derive(Default)]
pub struct RecordingMap {
    pub calls: Vec<MapCall>,
}

impl MiniMap for RecordingMap {
    fn set_selected_station(&mut self, id: &StationId) {
        self.calls.push(MapCall::Select(id.0.clone()));
    }
    fn set_center(&mut self, center: GeoPoint) {
        self.calls.push(MapCall::Center(center));
    }
    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.calls.push(MapCall::Fit(bounds));
    }
    fn set_icon_rotation(&mut self, degrees: f64) {
        self.calls.push(MapCall::Rotate(degrees));
    }
}

/// Station documents keyed by id, served from memory.
#[derive(Default)]
pub struct MemorySource {
    docs: HashMap<String, String>,
    pub fetched: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn with(mut self, id: &str, json: String) -> Self {
        self.docs.insert(id.to_string(), json);
        self
    }
}

impl StationSource for MemorySource {
    async fn fetch_station(&self, id: &StationId) -> Result<Station, PanoError> {
        self.fetched.borrow_mut().push(id.0.clone());
        match self.docs.get(id.as_str()) {
            Some(json) => parse_station(id, json),
            None => Err(PanoError::metadata(id, FetchFailure::NotFound, "HTTP 404")),
        }
    }
}

/// Returns a tiny image for every name except the ones marked corrupt.
#[derive(Default)]
pub struct MemoryLoader {
    pub corrupt: HashSet<String>,
}

impl PanoramaLoader for MemoryLoader {
    async fn load_panorama(&self, image: &str) -> Result<PanoramaImage, PanoError> {
        if self.corrupt.contains(image) {
            return Err(PanoError::texture(image, "truncated webp"));
        }
        PanoramaImage::new(2, 1, vec![128; 8])
    }
}

pub fn station_json(
    id: &str,
    lat: f64,
    lon: f64,
    heading: f64,
    targets: &[(&str, f64, f64)],
) -> String {
    let targets: Vec<_> = targets
        .iter()
        .map(|(t, la, lo)| json!({ "id": t, "lat": la, "lon": lo }))
        .collect();
    json!({
        "camera": { "img": id, "lat": lat, "lon": lon, "heading": heading, "fix_heading": 12.0 },
        "targets": targets
    })
    .to_string()
}

/// Three stations on the equator, 0.001 degrees apart, linked as A <-> B <-> C.
pub fn street() -> MemorySource {
    MemorySource::default()
        .with("A", station_json("A", 0.0, 0.0, 90.0, &[("B", 0.0, 0.001)]))
        .with(
            "B",
            station_json("B", 0.0, 0.001, 90.0, &[("A", 0.0, 0.0), ("C", 0.0, 0.002)]),
        )
        .with("C", station_json("C", 0.0, 0.002, 270.0, &[("B", 0.0, 0.001)]))
}

pub type TestSession = RefCell<Session<RecordingRenderer, RecordingMap>>;

pub fn session_with(config: ViewerConfig) -> TestSession {
    let mut s = Session::new(config, RecordingRenderer::default(), RecordingMap::default());
    s.resize(800, 600);
    RefCell::new(s)
}

pub fn session() -> TestSession {
    session_with(ViewerConfig::default())
}

pub fn assert_close(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "{a} != {b} (eps {eps})");
}
