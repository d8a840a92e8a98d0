//! Direction markers: one clickable arrow per outgoing target of the current
//! station, laid out on a fixed ring in front of the camera every frame.

use glam::{Mat3, Mat4, Quat, Vec3};
use smallvec::SmallVec;

use crate::camera::PanoCamera;
use crate::constants::{
    MARKER_DISTANCE, MARKER_RADIUS, MARKER_RING_CENTER_NDC, MARKER_RING_RADIUS_NDC,
    MARKER_UNPROJECT_DEPTH,
};
use crate::geo::{normalize_degrees, rhumb_bearing};
use crate::picking::{ray_disc, Ray};
use crate::services::{MarkerInstance, MeshHandle, SceneRenderer};
use crate::station::{Station, StationId, Target};

/// What activating something in the viewer asks the session to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Open the panorama viewer at a station.
    Open(StationId),
    /// Walk from the current station to another one.
    NavigateTo(StationId),
}

/// Anything the user can click to jump to a station.
pub trait Activatable {
    fn id(&self) -> &StationId;
    fn on_activate(&self) -> Command;
}

#[derive(Clone, Debug)]
pub struct Marker {
    pub target: Target,
    pub handle: MeshHandle,
    /// Rhumb bearing from the station to the target, fixed for the station.
    pub bearing_deg: f64,
    /// Bearing relative to the current view direction, refreshed by layout.
    pub relative_deg: f64,
    pub position: Vec3,
    pub rotation: Quat,
    pub visible: bool,
}

impl Marker {
    pub fn model(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn normal(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

impl Activatable for Marker {
    fn id(&self) -> &StationId {
        &self.target.id
    }

    fn on_activate(&self) -> Command {
        Command::NavigateTo(self.target.id.clone())
    }
}

/// `(bearing + yaw + 360) mod 360`: where a target sits relative to the view.
#[inline]
pub fn relative_bearing(bearing_deg: f64, camera_yaw_deg: f64) -> f64 {
    normalize_degrees(bearing_deg + camera_yaw_deg + 360.0)
}

/// Point on the marker ring for a relative bearing, at unproject depth.
pub fn ring_ndc(relative_deg: f64) -> Vec3 {
    let (sin, cos) = (relative_deg.to_radians() as f32).sin_cos();
    Vec3::new(
        MARKER_RING_CENTER_NDC.x + MARKER_RING_RADIUS_NDC * sin,
        MARKER_RING_CENTER_NDC.y + MARKER_RING_RADIUS_NDC * cos,
        MARKER_UNPROJECT_DEPTH,
    )
}

/// Rotation whose +Z axis points from `from` toward `to`, keeping +Y up.
fn face_toward(from: Vec3, to: Vec3) -> Quat {
    let z = (to - from).normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut x = Vec3::Y.cross(z);
    if x.length_squared() < 1e-12 {
        x = Vec3::X;
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// Position and orientation of a marker for a target at `bearing_deg`.
pub fn marker_pose(camera: &PanoCamera, bearing_deg: f64) -> (Vec3, Quat, f64) {
    let relative = relative_bearing(bearing_deg, camera.yaw_degrees());
    let ndc = ring_ndc(relative);
    let world = camera.unproject(ndc);
    let dir = (world - camera.position).normalize_or_zero();
    let position = camera.position + dir * MARKER_DISTANCE;
    // face the camera, then spin the arrow toward the target
    let rotation =
        face_toward(position, camera.position) * Quat::from_rotation_z(-(relative.to_radians() as f32));
    (position, rotation, relative)
}

/// The markers of the current station. Never holds two stations' markers.
#[derive(Debug, Default)]
pub struct MarkerSet {
    station: Option<StationId>,
    markers: SmallVec<[Marker; 4]>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the markers with the targets of `station`. Old meshes are
    /// disposed before any new mesh is created.
    pub fn rebuild<R: SceneRenderer + ?Sized>(&mut self, station: &Station, renderer: &mut R) {
        self.clear(renderer);
        for target in &station.targets {
            let handle = renderer.create_marker(&target.id);
            self.markers.push(Marker {
                target: target.clone(),
                handle,
                bearing_deg: rhumb_bearing(station.position, target.position),
                relative_deg: 0.0,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                visible: false,
            });
        }
        self.station = Some(station.id.clone());
        log::debug!(
            "[markers] built {} marker(s) for {}",
            self.markers.len(),
            station.id
        );
    }

    pub fn clear<R: SceneRenderer + ?Sized>(&mut self, renderer: &mut R) {
        for m in self.markers.drain(..) {
            renderer.dispose_marker(m.handle);
        }
        self.station = None;
    }

    pub fn layout(&mut self, camera: &PanoCamera) {
        for m in self.markers.iter_mut() {
            let (position, rotation, relative) = marker_pose(camera, m.bearing_deg);
            m.position = position;
            m.rotation = rotation;
            m.relative_deg = relative;
            m.visible = camera.in_frustum(position);
        }
    }

    /// Nearest visible marker hit by the ray.
    pub fn pick(&self, ray: &Ray) -> Option<&Marker> {
        let mut best: Option<(&Marker, f32)> = None;
        for m in self.markers.iter().filter(|m| m.visible) {
            if let Some(t) = ray_disc(ray, m.position, m.normal(), MARKER_RADIUS) {
                match best {
                    Some((_, bt)) if t >= bt => {}
                    _ => best = Some((m, t)),
                }
            }
        }
        best.map(|(m, _)| m)
    }

    pub fn instances(&self) -> Vec<MarkerInstance> {
        self.markers
            .iter()
            .map(|m| MarkerInstance {
                handle: m.handle,
                model: m.model(),
                visible: m.visible,
            })
            .collect()
    }

    pub fn station(&self) -> Option<&StationId> {
        self.station.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{rhumb_destination, GeoPoint};
    use crate::services::{PanoramaImage, SceneView};
    use crate::error::PanoError;

    fn assert_close(a: f32, b: f32, eps: f32) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[derive(Default)]
    struct CountingRenderer {
        next: u32,
        live: Vec<MeshHandle>,
    }

    impl SceneRenderer for CountingRenderer {
        fn create_marker(&mut self, _target: &StationId) -> MeshHandle {
            self.next += 1;
            let h = MeshHandle(self.next);
            self.live.push(h);
            h
        }
        fn dispose_marker(&mut self, handle: MeshHandle) {
            self.live.retain(|h| *h != handle);
        }
        fn set_panorama(&mut self, _image: &PanoramaImage) -> Result<(), PanoError> {
            Ok(())
        }
        fn release_panorama(&mut self) {}
        fn resize(&mut self, _width: u32, _height: u32) {}
        fn draw(&mut self, _view: &SceneView) -> Result<(), PanoError> {
            Ok(())
        }
    }

    fn station(id: &str, bearings: &[f64]) -> Station {
        let position = GeoPoint::new(-22.9, -43.2);
        Station {
            id: StationId::from(id),
            position,
            heading: 0.0,
            fix_heading: 0.0,
            image: id.to_string(),
            targets: bearings
                .iter()
                .enumerate()
                .map(|(i, b)| Target {
                    id: StationId::from(format!("{id}-{i}")),
                    position: rhumb_destination(position, 20.0, *b),
                })
                .collect(),
        }
    }

    #[test]
    fn relative_bearing_wraps() {
        assert_eq!(relative_bearing(350.0, 20.0), 10.0);
        assert_eq!(relative_bearing(0.0, 0.0), 0.0);
        assert!((0.0..360.0).contains(&relative_bearing(-720.0, -0.0)));
    }

    #[test]
    fn straight_ahead_marker_sits_below_centre() {
        let cam = PanoCamera::default();
        let (pos, _rot, relative) = marker_pose(&cam, 0.0);
        assert!(relative.abs() < 1e-9);
        let ndc = cam.project(pos);
        assert_close(ndc.x, 0.0, 1e-3);
        assert_close(ndc.y, -0.4 + 0.315, 1e-3);
        assert_close(pos.distance(cam.position), MARKER_DISTANCE, 1e-4);
    }

    #[test]
    fn placement_is_periodic_in_bearing() {
        let mut cam = PanoCamera::default();
        cam.look_at(cam.position + Vec3::new(3.0, 0.5, -2.0));
        for b in [0.0, 45.0, 123.4, 270.0] {
            let (p0, r0, _) = marker_pose(&cam, b);
            let (p1, r1, _) = marker_pose(&cam, b + 360.0);
            assert!(p0.distance(p1) < 1e-4);
            assert!(r0.angle_between(r1) < 1e-3);
        }
    }

    #[test]
    fn marker_faces_camera_and_arrow_turns_with_bearing() {
        let cam = PanoCamera::default();
        let (pos, rot, _) = marker_pose(&cam, 90.0);
        let to_cam = (cam.position - pos).normalize();
        assert!((rot * Vec3::Z).dot(to_cam) > 0.9999);
        // arrow (+Y) points to screen right for a target on the right
        let arrow = rot * Vec3::Y;
        assert!(arrow.x > 0.8);
    }

    #[test]
    fn rebuild_disposes_before_creating() {
        let mut r = CountingRenderer::default();
        let mut set = MarkerSet::new();
        set.rebuild(&station("A", &[0.0, 90.0, 180.0]), &mut r);
        assert_eq!(r.live.len(), 3);
        set.rebuild(&station("B", &[45.0]), &mut r);
        assert_eq!(r.live.len(), 1);
        assert_eq!(set.station(), Some(&StationId::from("B")));
        assert_eq!(set.iter().next().map(|m| m.id().as_str()), Some("B-0"));
        set.clear(&mut r);
        assert!(r.live.is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn pick_hits_visible_marker_only() {
        let mut r = CountingRenderer::default();
        let mut set = MarkerSet::new();
        let st = station("A", &[0.0, 180.0]);
        set.rebuild(&st, &mut r);
        let cam = PanoCamera::default();
        set.layout(&cam);

        let ahead = set.iter().next().cloned().expect("marker");
        assert!(ahead.visible);
        let ray = Ray {
            origin: cam.position,
            dir: (ahead.position - cam.position).normalize(),
        };
        let hit = set.pick(&ray).expect("hit");
        assert_eq!(hit.on_activate(), Command::NavigateTo(StationId::from("A-0")));

        let away = Ray {
            origin: cam.position,
            dir: Vec3::Z,
        };
        assert!(set.pick(&away).is_none());
    }

    #[test]
    fn hidden_markers_are_drawn_but_not_picked() {
        let mut r = CountingRenderer::default();
        let mut set = MarkerSet::new();
        set.rebuild(&station("A", &[0.0, 90.0]), &mut r);
        let cam = PanoCamera::default();
        set.layout(&cam);
        set.markers[0].visible = false;

        let instances = set.instances();
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().any(|m| !m.visible));

        let hidden = set.markers[0].clone();
        let ray = Ray {
            origin: cam.position,
            dir: (hidden.position - cam.position).normalize(),
        };
        assert!(set.pick(&ray).map(|m| m.id() != hidden.id()).unwrap_or(true));
    }
}
