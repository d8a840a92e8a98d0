pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod frame;
pub mod geo;
pub mod markers;
pub mod mesh;
pub mod minimap;
pub mod navigation;
pub mod picking;
pub mod scene;
pub mod services;
pub mod session;
pub mod station;
pub mod tool;
pub static PANORAMA_WGSL: &str = include_str!("../shaders/panorama.wgsl");

pub use camera::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use geo::*;
pub use markers::*;
pub use mesh::*;
pub use minimap::*;
pub use navigation::{NavTicket, PendingTexture, Walker};
pub use picking::*;
pub use scene::*;
pub use services::*;
pub use session::*;
pub use station::*;
pub use tool::*;
