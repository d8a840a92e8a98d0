//! The street-view map tool: the toggle button, the main-map click that
//! picks a station, and which of the two layouts is on screen.

use crate::error::PanoError;
use crate::geo::GeoPoint;
use crate::markers::Command;
use crate::station::FeatureCollection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Only the main map, with its toolbars.
    #[default]
    FullMap,
    /// Panorama viewer with the mini-map; main-map chrome hidden.
    Panorama,
}

#[derive(Debug, Default)]
pub struct StreetViewTool {
    active: bool,
    layout: LayoutMode,
}

impl StreetViewTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    /// Flip the tool on or off; returns the new state. Turning it off always
    /// goes back to the full map.
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if !self.active {
            self.layout = LayoutMode::FullMap;
        }
        log::info!("[tool] {}", if self.active { "activated" } else { "deactivated" });
        self.active
    }

    /// Station nearest to a click on the main map. Opens the viewer when it is
    /// closed, otherwise walks there. Clicks are ignored while inactive.
    pub fn main_map_click(
        &self,
        at: GeoPoint,
        points: &FeatureCollection,
        id_property: &str,
        viewer_open: bool,
    ) -> Result<Option<Command>, PanoError> {
        if !self.active {
            return Ok(None);
        }
        let id = points
            .nearest_point(at)
            .and_then(|f| f.station_id(id_property))
            .ok_or(PanoError::NoNeighborFound {
                lat: at.lat,
                lon: at.lon,
            })?;
        log::debug!("[tool] nearest station to ({:.6}, {:.6}) is {}", at.lat, at.lon, id);
        Ok(Some(if viewer_open {
            Command::NavigateTo(id)
        } else {
            Command::Open(id)
        }))
    }

    pub fn panorama_opened(&mut self) {
        self.layout = LayoutMode::Panorama;
    }

    /// Close button: back to the full map, tool stays active.
    pub fn panorama_closed(&mut self) {
        self.layout = LayoutMode::FullMap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationId;

    fn points() -> FeatureCollection {
        FeatureCollection::from_json(
            r#"{ "features": [
                { "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }, "properties": { "station_id": "A" } },
                { "geometry": { "type": "Point", "coordinates": [0.01, 0.0] }, "properties": { "station_id": "B" } }
            ] }"#,
        )
        .expect("geojson")
    }

    #[test]
    fn toggle_twice_deactivates() {
        let mut tool = StreetViewTool::new();
        assert!(tool.toggle());
        tool.panorama_opened();
        assert_eq!(tool.layout(), LayoutMode::Panorama);
        assert!(!tool.toggle());
        assert_eq!(tool.layout(), LayoutMode::FullMap);
    }

    #[test]
    fn click_opens_then_navigates() {
        let mut tool = StreetViewTool::new();
        let fc = points();
        let at = GeoPoint::new(0.0, 0.009);
        assert_eq!(tool.main_map_click(at, &fc, "station_id", false), Ok(None));
        tool.toggle();
        assert_eq!(
            tool.main_map_click(at, &fc, "station_id", false),
            Ok(Some(Command::Open(StationId::from("B"))))
        );
        assert_eq!(
            tool.main_map_click(at, &fc, "station_id", true),
            Ok(Some(Command::NavigateTo(StationId::from("B"))))
        );
    }

    #[test]
    fn empty_points_is_no_neighbor() {
        let mut tool = StreetViewTool::new();
        tool.toggle();
        let err = tool
            .main_map_click(GeoPoint::new(1.0, 2.0), &FeatureCollection::default(), "station_id", false)
            .unwrap_err();
        assert!(matches!(err, PanoError::NoNeighborFound { .. }));
    }
}
