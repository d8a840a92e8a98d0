//! Panorama scene manager: the camera inside the textured sphere, the
//! direction markers, and pointer/wheel interaction.

use glam::{Vec2, Vec3};
use std::rc::Rc;

use crate::camera::PanoCamera;
use crate::constants::{
    CLICK_DRAG_THRESHOLD_PX, DRAG_LOOK_SENSITIVITY, INITIAL_LOOK_DISTANCE_M, SPHERE_RADIUS,
};
use crate::error::PanoError;
use crate::geo::{local_offset_m, rhumb_bearing, rhumb_destination};
use crate::markers::{Activatable, Command, MarkerSet};
use crate::picking::{px_to_ndc, ray_sphere};
use crate::services::{PanoramaImage, SceneRenderer, SceneView};
use crate::station::{SharedStation, Station, StationId};

/// Where the camera should turn on the next frame. A navigation look-at
/// outranks a drag and blocks new drags until applied.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingLook {
    Navigation(Vec3),
    Drag(Vec3),
}

#[derive(Debug, Default, Clone)]
struct PointerState {
    down_px: Option<Vec2>,
    travel_px: f32,
    pressed: Option<StationId>,
}

pub struct PanoScene {
    pub camera: PanoCamera,
    markers: MarkerSet,
    station: Option<SharedStation>,
    texture_station: Option<StationId>,
    sphere_yaw_rad: f32,
    pending_look: Option<PendingLook>,
    pointer: PointerState,
    viewport: Vec2,
    /// Backing-store pixels per CSS pixel.
    pixel_ratio: f32,
    last_heading: Option<f64>,
}

impl Default for PanoScene {
    fn default() -> Self {
        Self::new()
    }
}

/// Compass bearing the camera faces when a station is opened: towards the
/// first target, else along the capture heading.
pub fn initial_bearing(station: &Station) -> f64 {
    station
        .targets
        .first()
        .map(|t| rhumb_bearing(station.position, t.position))
        .unwrap_or(station.heading)
}

/// Scene-space point `INITIAL_LOOK_DISTANCE_M` away from the station along `bearing_deg`.
pub fn look_point(station: &Station, camera_position: Vec3, bearing_deg: f64) -> Vec3 {
    let dest = rhumb_destination(station.position, INITIAL_LOOK_DISTANCE_M, bearing_deg);
    camera_position + local_offset_m(station.position, dest)
}

impl PanoScene {
    pub fn new() -> Self {
        Self {
            camera: PanoCamera::default(),
            markers: MarkerSet::new(),
            station: None,
            texture_station: None,
            sphere_yaw_rad: 0.0,
            pending_look: None,
            pointer: PointerState::default(),
            viewport: Vec2::new(1.0, 1.0),
            pixel_ratio: 1.0,
            last_heading: None,
        }
    }

    pub fn station(&self) -> Option<&SharedStation> {
        self.station.as_ref()
    }

    pub fn station_id(&self) -> Option<&StationId> {
        self.station.as_ref().map(|s| &s.id)
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Station whose panorama is currently on the sphere.
    pub fn texture_station(&self) -> Option<&StationId> {
        self.texture_station.as_ref()
    }

    pub fn sphere_yaw_rad(&self) -> f32 {
        self.sphere_yaw_rad
    }

    /// Make `station` current: markers of the old station are released before
    /// the new ones exist. When `opening`, the camera is reset to face
    /// `initial_bearing` straight away.
    pub fn show_station<R: SceneRenderer + ?Sized>(
        &mut self,
        station: Station,
        renderer: &mut R,
        opening: bool,
    ) -> SharedStation {
        self.markers.rebuild(&station, renderer);
        let station = Rc::new(station);
        self.station = Some(station.clone());
        self.pointer = PointerState::default();
        if opening {
            let fov = self.camera.fovy_deg;
            let aspect = self.camera.aspect;
            self.camera = PanoCamera {
                fovy_deg: fov,
                aspect,
                ..PanoCamera::default()
            };
            self.pending_look = None;
            self.look_toward(initial_bearing(&station));
            self.apply_pending_look();
        }
        self.markers.layout(&self.camera);
        station
    }

    /// Queue a turn towards a compass bearing from the current station.
    pub fn look_toward(&mut self, bearing_deg: f64) {
        if let Some(st) = &self.station {
            let target = look_point(st, self.camera.position, bearing_deg);
            self.pending_look = Some(PendingLook::Navigation(target));
        }
    }

    pub fn has_navigation_look(&self) -> bool {
        matches!(self.pending_look, Some(PendingLook::Navigation(_)))
    }

    /// Apply and clear the pending look-at; true when the camera turned.
    pub fn apply_pending_look(&mut self) -> bool {
        match self.pending_look.take() {
            Some(PendingLook::Navigation(p)) | Some(PendingLook::Drag(p)) => {
                self.camera.look_at(p);
                true
            }
            None => false,
        }
    }

    /// New heading since the last call, if any.
    pub fn take_heading_change(&mut self) -> Option<f64> {
        let h = self.camera.heading_degrees();
        match self.last_heading {
            Some(prev) if (prev - h).abs() < 1e-9 => None,
            _ => {
                self.last_heading = Some(h);
                Some(h)
            }
        }
    }

    /// Put a decoded panorama on the sphere for `station`. Returns false,
    /// leaving the current texture alone, once `station` is no longer current.
    pub fn swap_texture<R: SceneRenderer + ?Sized>(
        &mut self,
        station: &StationId,
        fix_heading: f64,
        image: &PanoramaImage,
        renderer: &mut R,
    ) -> Result<bool, PanoError> {
        if self.station_id() != Some(station) {
            log::debug!("[scene] dropping stale panorama for {station}");
            return Ok(false);
        }
        renderer.set_panorama(image)?;
        self.sphere_yaw_rad = fix_heading.to_radians() as f32;
        self.texture_station = Some(station.clone());
        Ok(true)
    }

    /// Lay out the markers for the current camera and describe the frame.
    pub fn prepare_view(&mut self) -> SceneView {
        self.markers.layout(&self.camera);
        SceneView {
            view_proj: self.camera.view_projection(),
            sphere_yaw_rad: self.sphere_yaw_rad,
            markers: self.markers.instances(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        self.camera.set_aspect(self.viewport.x, self.viewport.y);
    }

    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        };
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn zoom(&mut self, wheel_delta: f32) -> f32 {
        self.camera.zoom_by(wheel_delta)
    }

    fn marker_at(&self, px: Vec2) -> Option<StationId> {
        let ndc = px_to_ndc(px, self.viewport.x, self.viewport.y);
        let ray = self.camera.ray_through_ndc(ndc);
        self.markers.pick(&ray).map(|m| m.id().clone())
    }

    pub fn pointer_down(&mut self, px: Vec2, primary: bool) {
        if !primary || self.has_navigation_look() {
            return;
        }
        self.pointer = PointerState {
            down_px: Some(px),
            travel_px: 0.0,
            pressed: self.marker_at(px),
        };
    }

    /// Drag-to-look: the offset from the press point, in CSS pixels, steers a
    /// ray that is intersected with the inside of the sphere.
    pub fn pointer_move(&mut self, px: Vec2) {
        let Some(down) = self.pointer.down_px else {
            return;
        };
        self.pointer.travel_px = self.pointer.travel_px.max(down.distance(px));
        if self.has_navigation_look() {
            return;
        }
        let scale = DRAG_LOOK_SENSITIVITY / self.pixel_ratio;
        let offset = Vec2::new((down.x - px.x) * scale, (px.y - down.y) * scale);
        let ray = self.camera.ray_through_ndc(offset);
        if let Some(t) = ray_sphere(ray.origin, ray.dir, Vec3::ZERO, SPHERE_RADIUS) {
            self.pending_look = Some(PendingLook::Drag(ray.at(t)));
        }
    }

    /// Ends the interaction. A press and release on the same marker without
    /// dragging activates it.
    pub fn pointer_up(&mut self, px: Vec2) -> Option<Command> {
        let pointer = std::mem::take(&mut self.pointer);
        let down = pointer.down_px?;
        let travel = pointer.travel_px.max(down.distance(px));
        if self.is_drag_travel(travel) {
            return None;
        }
        let pressed = pointer.pressed?;
        let released = self.marker_at(px)?;
        if pressed != released {
            return None;
        }
        self.markers
            .iter()
            .find(|m| m.id() == &released)
            .map(|m| m.on_activate())
    }

    pub fn is_dragging(&self) -> bool {
        self.pointer.down_px.is_some() && self.is_drag_travel(self.pointer.travel_px)
    }

    fn is_drag_travel(&self, travel_px: f32) -> bool {
        travel_px / self.pixel_ratio > CLICK_DRAG_THRESHOLD_PX
    }

    /// Release every marker mesh and the panorama.
    pub fn teardown<R: SceneRenderer + ?Sized>(&mut self, renderer: &mut R) {
        self.markers.clear(renderer);
        renderer.release_panorama();
        self.station = None;
        self.texture_station = None;
        self.sphere_yaw_rad = 0.0;
        self.pending_look = None;
        self.pointer = PointerState::default();
        self.last_heading = None;
    }
}
