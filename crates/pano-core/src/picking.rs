use glam::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Distance along the ray to the first sphere crossing in front of the origin.
///
/// Works from outside (near hit) and from inside the sphere (exit hit), which
/// is where the panorama camera lives.
#[inline]
pub fn ray_sphere(ray_origin: Vec3, ray_dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray_origin - center;
    let b = oc.dot(ray_dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t_near = -b - sq;
    if t_near >= 0.0 {
        return Some(t_near);
    }
    let t_far = -b + sq;
    (t_far >= 0.0).then_some(t_far)
}

/// Ray against a flat disc; returns the distance along the ray.
#[inline]
pub fn ray_disc(ray: &Ray, center: Vec3, normal: Vec3, radius: f32) -> Option<f32> {
    let denom = ray.dir.dot(normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (center - ray.origin).dot(normal) / denom;
    if t < 0.0 {
        return None;
    }
    let hit = ray.at(t);
    (hit.distance_squared(center) <= radius * radius).then_some(t)
}

/// Pixel position inside a viewport to normalized device coordinates.
#[inline]
pub fn px_to_ndc(px: Vec2, width: f32, height: f32) -> Vec2 {
    let w = width.max(1.0);
    let h = height.max(1.0);
    Vec2::new(px.x / w * 2.0 - 1.0, -(px.y / h) * 2.0 + 1.0)
}
