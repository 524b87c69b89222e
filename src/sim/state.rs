use nalgebra::Vector3;

use crate::error::{GuidanceError, Result};

// ---------------------------------------------------------------------------
// Point-mass state: body-centred inertial position, velocity, mass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimState {
    pub time: f64,
    pub pos: Vector3<f64>, // m, from the body centre
    pub vel: Vector3<f64>, // m/s, inertial
    pub mass: f64,         // kg
    pub stage_idx: usize,  // active stage, 0 fires first
}

impl SimState {
    pub fn apply(&self, d: &Deriv, dt: f64) -> SimState {
        SimState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            mass: (self.mass + d.dmass * dt).max(0.0),
            stage_idx: self.stage_idx,
        }
    }

    pub fn radius(&self) -> f64 {
        self.pos.norm()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.pos.try_normalize(1e-9).unwrap_or_else(Vector3::x)
    }
}

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dmass: f64,
}

// ---------------------------------------------------------------------------
// Engine command held constant over a step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ThrustCommand {
    pub throttle: f64,
    /// Unit thrust direction, inertial.
    pub direction: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
    /// Launch site latitude, deg.
    pub latitude: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,         // 50 Hz, the physics rate guidance expects
            max_time: 900.0,  // 15 min
            latitude: 0.0,
        }
    }
}

impl SimConfig {
    /// The step must move time forward or the run never ends.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(GuidanceError::InvalidParameter(format!("time step must be positive, got {}", self.dt)));
        }
        if !self.max_time.is_finite() {
            return Err(GuidanceError::InvalidParameter(format!("time limit must be finite, got {}", self.max_time)));
        }
        Ok(())
    }
}
