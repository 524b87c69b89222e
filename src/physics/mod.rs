pub mod atmosphere;
pub mod gravity;

pub use atmosphere::Atmosphere;
pub use gravity::{presets, CelestialBody, G0};
