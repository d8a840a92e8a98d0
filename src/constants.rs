//! Browser-side rendering constants.
//!
//! Viewing and interaction tuning lives in `pano_core::constants`; these only
//! concern the GPU surface and image upload.

// Widest panorama uploaded as a texture (default WebGPU limit)
pub const MAX_TEXTURE_WIDTH: u32 = 8192;

// Background behind the sphere before the first panorama arrives
pub const CLEAR_COLOR: [f64; 4] = [0.05, 0.05, 0.06, 1.0];

// Marker tint (rgba multiplier on the arrow texture)
pub const MARKER_TINT: [f32; 4] = [1.0, 1.0, 1.0, 0.95];
