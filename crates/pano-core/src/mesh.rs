//! CPU-side geometry for the panorama sphere and the direction markers.
//!
//! UVs have their origin at the bottom left of the image.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

use crate::constants::{
    MARKER_RADIUS, MARKER_SEGMENTS, SPHERE_HEIGHT_SEGMENTS, SPHERE_RADIUS, SPHERE_WIDTH_SEGMENTS,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// UV sphere with x mirrored so the equirectangular image reads correctly
/// from inside. Longitude runs around +Y, u = 0 at +X once mirrored.
pub fn panorama_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
    for y in 0..=hs {
        let v = y as f32 / hs as f32;
        let theta = v * PI;
        for x in 0..=ws {
            let u = x as f32 / ws as f32;
            let phi = u * TAU;
            let px = -radius * phi.cos() * theta.sin();
            let py = radius * theta.cos();
            let pz = radius * phi.sin() * theta.sin();
            vertices.push(Vertex {
                // mirrored on x: the inside of the sphere is the visible face
                position: [-px, py, pz],
                uv: [u, 1.0 - v],
            });
        }
    }

    let row = ws + 1;
    let mut indices = Vec::with_capacity((ws * hs * 6) as usize);
    for y in 0..hs {
        for x in 0..ws {
            let a = y * row + x + 1;
            let b = y * row + x;
            let c = (y + 1) * row + x;
            let d = (y + 1) * row + x + 1;
            if y != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if y != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    MeshData { vertices, indices }
}

/// Flat disc in the XY plane facing +Z; the arrow texture points along +Y.
pub fn marker_disc(radius: f32, segments: u32) -> MeshData {
    let segs = segments.max(3);
    let mut vertices = Vec::with_capacity(segs as usize + 2);
    vertices.push(Vertex {
        position: [0.0, 0.0, 0.0],
        uv: [0.5, 0.5],
    });
    for s in 0..=segs {
        let a = s as f32 / segs as f32 * TAU;
        let (sin, cos) = a.sin_cos();
        vertices.push(Vertex {
            position: [radius * cos, radius * sin, 0.0],
            uv: [(cos + 1.0) * 0.5, (sin + 1.0) * 0.5],
        });
    }
    let mut indices = Vec::with_capacity(segs as usize * 3);
    for i in 1..=segs {
        indices.extend_from_slice(&[i, i + 1, 0]);
    }
    MeshData { vertices, indices }
}

pub fn default_sphere() -> MeshData {
    panorama_sphere(SPHERE_RADIUS, SPHERE_WIDTH_SEGMENTS, SPHERE_HEIGHT_SEGMENTS)
}

pub fn default_marker() -> MeshData {
    marker_disc(MARKER_RADIUS, MARKER_SEGMENTS)
}
