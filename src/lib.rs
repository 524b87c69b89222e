//! Closed-loop gravity-turn ascent guidance.
//!
//! [`gnc::AscentGuidance`] flies one launch attempt a tick at a time from a
//! [`vehicle::VehicleSnapshot`], writing throttle and attitude commands
//! through a [`session::LaunchContext`]. The [`sim`] module is a point-mass
//! reference flight used by the demo binary and the end-to-end tests.

pub mod error;
pub mod physics;
pub mod orbital;
pub mod vehicle;
pub mod params;
pub mod history;
pub mod session;
mod gnc_mod;
pub mod sim;
pub mod io;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use error::{GuidanceError, Result};
