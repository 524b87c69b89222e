pub mod elements;
pub mod maneuvers;

pub use elements::{KeplerianElements, OrbitSummary};
pub use maneuvers::{circular_orbit_speed, delta_v_to_circularize, heading_for_launch_inclination};
