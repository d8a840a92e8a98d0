use glam::{Vec2, Vec3};

// Shared viewing/interaction tuning constants used by both web and native frontends.

// Panorama sphere
pub const SPHERE_RADIUS: f32 = 500.0; // world units; camera sits at the centre
pub const SPHERE_WIDTH_SEGMENTS: u32 = 60;
pub const SPHERE_HEIGHT_SEGMENTS: u32 = 40;

// Camera
pub const CAMERA_POSITION: [f32; 3] = [0.0, -0.1, 0.0]; // slightly below the sphere centre
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const DEFAULT_FOV_DEG: f32 = 75.0;
pub const MIN_FOV_DEG: f32 = 10.0;
pub const MAX_FOV_DEG: f32 = 75.0;

// Interaction
pub const WHEEL_FOV_SENSITIVITY: f32 = 0.05; // degrees of fov per wheel delta unit
pub const DRAG_LOOK_SENSITIVITY: f32 = 0.00005; // ndc offset per pixel of drag
pub const CLICK_DRAG_THRESHOLD_PX: f32 = 4.0; // pointer travel that turns a click into a drag

// Direction markers
pub const MARKER_RADIUS: f32 = 0.5; // disc radius, also used for picking
pub const MARKER_SEGMENTS: u32 = 70;
pub const MARKER_DISTANCE: f32 = 5.0; // distance from the camera along the unprojected ray
pub const MARKER_RING_CENTER_NDC: Vec2 = Vec2::new(0.0, -0.4);
pub const MARKER_RING_RADIUS_NDC: f32 = 0.315; // 35 km expressed in degrees of arc
pub const MARKER_UNPROJECT_DEPTH: f32 = 0.5;

// Geography
pub const INITIAL_LOOK_DISTANCE_M: f64 = 50.0; // initial look-at point along the start heading
pub const MINIMAP_BUFFER_M: f64 = 40.0; // radius of the box the mini-map fits on station change

#[inline]
pub fn camera_position_vec3() -> Vec3 {
    Vec3::from(CAMERA_POSITION)
}
