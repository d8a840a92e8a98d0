//! Perspective camera sitting inside the panorama sphere.
//!
//! Orientation is kept as yaw/pitch (Y then X, no roll) so the camera can only
//! look around, never tilt. Yaw 0 looks down -Z, which is north in scene axes.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};

use crate::constants::{
    camera_position_vec3, CAMERA_FAR, CAMERA_NEAR, DEFAULT_FOV_DEG, MAX_FOV_DEG, MIN_FOV_DEG,
    WHEEL_FOV_SENSITIVITY,
};
use crate::geo::normalize_degrees;
use crate::picking::Ray;

#[derive(Clone, Debug)]
pub struct PanoCamera {
    pub position: Vec3,
    /// Rotation about +Y in radians.
    pub yaw: f32,
    /// Rotation about the camera's X axis in radians, positive looks up.
    pub pitch: f32,
    pub fovy_deg: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for PanoCamera {
    fn default() -> Self {
        Self {
            position: camera_position_vec3(),
            yaw: 0.0,
            pitch: 0.0,
            fovy_deg: DEFAULT_FOV_DEG,
            aspect: 16.0 / 9.0,
            znear: CAMERA_NEAR,
            zfar: CAMERA_FAR,
        }
    }
}

impl PanoCamera {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Turn to face a world-space point.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
    }

    /// Yaw in degrees wrapped into [0, 360). Counter-clockwise seen from above.
    pub fn yaw_degrees(&self) -> f64 {
        normalize_degrees((self.yaw as f64).to_degrees())
    }

    /// Compass heading of the view direction, clockwise from north in [0, 360).
    pub fn heading_degrees(&self) -> f64 {
        heading_from_yaw(self.yaw as f64)
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width.max(1.0) / height.max(1.0);
    }

    /// Apply a wheel delta to the field of view; returns the new fov.
    pub fn zoom_by(&mut self, wheel_delta: f32) -> f32 {
        self.fovy_deg = clamp_fov(self.fovy_deg + wheel_delta * WHEEL_FOV_SENSITIVITY);
        self.fovy_deg
    }

    /// Compute the clip-space projection matrix (depth range [0, 1]).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_deg.to_radians(), self.aspect, self.znear, self.zfar)
    }

    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Map a point in normalized device coordinates back to world space.
    pub fn unproject(&self, ndc: Vec3) -> Vec3 {
        let p = self.view_projection().inverse() * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
        p.truncate() / p.w
    }

    /// World-space point to normalized device coordinates.
    pub fn project(&self, world: Vec3) -> Vec3 {
        let p = self.view_projection() * world.extend(1.0);
        if p.w.abs() < f32::EPSILON {
            return Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        }
        p.truncate() / p.w
    }

    /// Ray from the eye through an NDC position on the image plane.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Ray {
        let far = self.unproject(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray {
            origin: self.position,
            dir: (far - self.position).normalize_or_zero(),
        }
    }

    /// True when the world point lies inside the view frustum.
    pub fn in_frustum(&self, world: Vec3) -> bool {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return false;
        }
        let ndc = clip.truncate() / clip.w;
        (-1.0..=1.0).contains(&ndc.x) && (-1.0..=1.0).contains(&ndc.y) && (0.0..=1.0).contains(&ndc.z)
    }
}

/// `((-yaw_deg) + 360) mod 360`: camera yaw turned into a compass heading.
pub fn heading_from_yaw(yaw_rad: f64) -> f64 {
    normalize_degrees(-yaw_rad.to_degrees() + 360.0)
}

#[inline]
pub fn clamp_fov(fov_deg: f32) -> f32 {
    if fov_deg.is_nan() {
        return MAX_FOV_DEG;
    }
    fov_deg.clamp(MIN_FOV_DEG, MAX_FOV_DEG)
}
