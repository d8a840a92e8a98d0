//! Keeps the overhead mini-map in step with the panorama view.
//!
//! Everything here is derived from the session's view state; the map is only
//! ever written to. Repeated icon rotations are skipped.

use fnv::FnvHashMap;

use crate::constants::MINIMAP_BUFFER_M;
use crate::geo::{buffered_bounds, normalize_degrees, GeoBounds, GeoPoint};
use crate::markers::{Activatable, Command};
use crate::services::MiniMap;
use crate::station::{FeatureCollection, Station, StationId};

/// A station dot on the mini-map; clicking it jumps straight there.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniMapPoint {
    pub id: StationId,
    pub position: GeoPoint,
}

impl Activatable for MiniMapPoint {
    fn id(&self) -> &StationId {
        &self.id
    }

    fn on_activate(&self) -> Command {
        Command::NavigateTo(self.id.clone())
    }
}

/// Last values pushed to the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiniMapState {
    pub selected: Option<StationId>,
    pub center: Option<GeoPoint>,
    pub bounds: Option<GeoBounds>,
    pub icon_rotation: Option<f64>,
}

pub struct MiniMapSync<M: MiniMap> {
    map: M,
    state: MiniMapState,
    stations: FnvHashMap<StationId, GeoPoint>,
}

impl<M: MiniMap> MiniMapSync<M> {
    pub fn new(map: M) -> Self {
        Self {
            map,
            state: MiniMapState::default(),
            stations: FnvHashMap::default(),
        }
    }

    /// Index the station point features by their id property.
    pub fn set_features(&mut self, features: &FeatureCollection, id_property: &str) {
        self.stations = features
            .features
            .iter()
            .filter_map(|f| Some((f.station_id(id_property)?, f.point()?)))
            .collect();
        log::info!("[minimap] indexed {} station point(s)", self.stations.len());
    }

    pub fn point(&self, id: &StationId) -> Option<MiniMapPoint> {
        self.stations.get(id).map(|p| MiniMapPoint {
            id: id.clone(),
            position: *p,
        })
    }

    /// Select the station, centre on its point and zoom to the buffer around
    /// it. Pushed on every change: the user may have panned the map since.
    pub fn on_station_changed(&mut self, station: &Station) {
        let center = self
            .stations
            .get(&station.id)
            .copied()
            .unwrap_or(station.position);
        let bounds = buffered_bounds(center, MINIMAP_BUFFER_M);
        self.map.set_selected_station(&station.id);
        self.map.set_center(center);
        self.map.fit_bounds(bounds);
        self.state.selected = Some(station.id.clone());
        self.state.center = Some(center);
        self.state.bounds = Some(bounds);
    }

    pub fn on_heading_changed(&mut self, heading_deg: f64) {
        let heading = normalize_degrees(heading_deg);
        if let Some(prev) = self.state.icon_rotation {
            if (prev - heading).abs() < 1e-9 {
                return;
            }
        }
        self.map.set_icon_rotation(heading);
        self.state.icon_rotation = Some(heading);
    }

    /// Forget what was pushed; the next open starts from scratch.
    pub fn reset(&mut self) {
        self.state = MiniMapState::default();
    }

    pub fn state(&self) -> &MiniMapState {
        &self.state
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }
}
