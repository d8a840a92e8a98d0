//! Collaborators the engine talks to but does not implement.
//!
//! Front-ends provide these: the browser build wires wgpu, gloo-net and the
//! maplibre mini-map; the native walkthrough reads from disk and logs.

use glam::Mat4;

use crate::error::PanoError;
use crate::geo::{GeoBounds, GeoPoint};
use crate::station::{Station, StationId};

/// Source of station metadata documents.
#[allow(async_fn_in_trait)]
pub trait StationSource {
    async fn fetch_station(&self, id: &StationId) -> Result<Station, PanoError>;
}

/// Decoded equirectangular panorama, tightly packed RGBA8.
#[derive(Clone, PartialEq)]
pub struct PanoramaImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PanoramaImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, PanoError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(PanoError::texture(
                "",
                format!("expected {expected} bytes for {width}x{height}, got {}", rgba.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }
}

impl std::fmt::Debug for PanoramaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanoramaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Fetches and decodes the panorama image for a station.
#[allow(async_fn_in_trait)]
pub trait PanoramaLoader {
    async fn load_panorama(&self, image: &str) -> Result<PanoramaImage, PanoError>;
}

/// Opaque renderer-side handle for one marker mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerInstance {
    pub handle: MeshHandle,
    pub model: Mat4,
    /// In the view frustum. Markers are drawn either way; only visible ones
    /// can be picked.
    pub visible: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct SceneView {
    pub view_proj: Mat4,
    /// Panorama sphere rotation about +Y in radians (the station's texture fix).
    pub sphere_yaw_rad: f32,
    pub markers: Vec<MarkerInstance>,
}

pub trait SceneRenderer {
    fn create_marker(&mut self, target: &StationId) -> MeshHandle;
    fn dispose_marker(&mut self, handle: MeshHandle);
    fn set_panorama(&mut self, image: &PanoramaImage) -> Result<(), PanoError>;
    fn release_panorama(&mut self);
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, view: &SceneView) -> Result<(), PanoError>;
}

/// Overhead mini-map showing the current station and viewing direction.
pub trait MiniMap {
    /// Restrict the selection layer to a single station.
    fn set_selected_station(&mut self, id: &StationId);
    fn set_center(&mut self, center: GeoPoint);
    fn fit_bounds(&mut self, bounds: GeoBounds);
    /// Rotate the selection icon, degrees clockwise from north.
    fn set_icon_rotation(&mut self, degrees: f64);
}
