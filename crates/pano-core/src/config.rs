//! Resource locations and page wiring for a viewer instance.

use anyhow::Context;
use serde::Deserialize;

use crate::station::StationId;

/// What to do when several navigations overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// Whichever request completes last becomes current.
    #[default]
    LastCompleted,
    /// Only the most recently issued request may become current.
    LatestIssued,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory of `<id>.json` station documents.
    pub metadata_base: String,
    /// Directory of panorama images.
    pub image_base: String,
    pub image_extension: String,
    pub points_url: String,
    pub lines_url: String,
    /// Point feature property holding the station id.
    pub id_property: String,
    pub marker_texture_url: String,
    pub minimap_style_url: String,
    pub minimap_zoom: f64,
    pub minimap_point_icon_url: String,
    pub minimap_selected_icon_url: String,

    pub container_id: String,
    pub canvas_id: String,
    pub minimap_id: String,
    pub close_button_id: String,
    pub toggle_button_id: String,
    /// Receives the last navigation error, cleared on success.
    pub status_id: String,
    /// Elements only shown while the full map layout is active.
    pub full_map_elements: Vec<String>,

    pub navigation_policy: NavigationPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            metadata_base: "/street_view/METADATA".to_string(),
            image_base: "/street_view/IMG".to_string(),
            image_extension: "webp".to_string(),
            points_url: "/street_view/points.geojson".to_string(),
            lines_url: "/street_view/lines.geojson".to_string(),
            id_property: "station_id".to_string(),
            marker_texture_url: "/street_view/arrow.png".to_string(),
            minimap_style_url: "/street_view/street-view-map-style.json".to_string(),
            minimap_zoom: 12.5,
            minimap_point_icon_url: "/street_view/point.png".to_string(),
            minimap_selected_icon_url: "/street_view/point-selected-v2.png".to_string(),
            container_id: "street-view-container".to_string(),
            canvas_id: "street-view-canvas".to_string(),
            minimap_id: "mini-map-street-view".to_string(),
            close_button_id: "close-street-view-button".to_string(),
            toggle_button_id: "street-view-tool".to_string(),
            status_id: "street-view-status".to_string(),
            full_map_elements: vec!["top-bar".to_string(), "map-sig".to_string()],
            navigation_policy: NavigationPolicy::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid viewer config")
    }

    pub fn metadata_url(&self, id: &StationId) -> String {
        format!("{}/{}.json", self.metadata_base.trim_end_matches('/'), id)
    }

    pub fn image_url(&self, image: &str) -> String {
        format!(
            "{}/{}.{}",
            self.image_base.trim_end_matches('/'),
            image,
            self.image_extension
        )
    }
}
