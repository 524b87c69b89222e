use nalgebra::Vector3;

use crate::physics::CelestialBody;
use super::state::{Deriv, SimState, ThrustCommand};
use super::vehicle::Rocket;

// ---------------------------------------------------------------------------
// Forces on the point mass
// ---------------------------------------------------------------------------

/// Engine and aerodynamic loads for one state and command.
#[derive(Debug, Clone, Copy)]
pub struct Loads {
    pub thrust: Vector3<f64>,    // N
    pub drag_accel: Vector3<f64>, // m/s^2
    pub mass_flow: f64,          // kg/s
    pub density: f64,            // kg/m^3
    pub dynamic_pressure: f64,   // Pa
    /// Solid motor burning this instant.
    pub solid_burning: bool,
}

pub fn loads(state: &SimState, rocket: &Rocket, body: &CelestialBody, cmd: &ThrustCommand) -> Loads {
    let altitude = state.radius() - body.radius;
    let (density, pressure) = match &body.atmosphere {
        Some(a) => {
            let rho = a.density(altitude);
            (rho, if a.surface_density > 0.0 { rho / a.surface_density } else { 0.0 })
        }
        None => (0.0, 0.0),
    };

    let burning = rocket
        .stages
        .get(state.stage_idx)
        .filter(|_| rocket.propellant_left(state.stage_idx, state.mass) > 0.0);
    // solids ignore the throttle once lit
    let (thrust_mag, mass_flow, solid_burning) = match burning {
        Some(s) if s.solid => (s.thrust_at(pressure), s.mass_flow(), true),
        Some(s) => {
            let t = cmd.throttle.clamp(0.0, 1.0);
            (s.thrust_at(pressure) * t, s.mass_flow() * t, false)
        }
        None => (0.0, 0.0, false),
    };

    let speed = state.vel.norm();
    let dynamic_pressure = 0.5 * density * speed * speed;
    let drag_accel = match (rocket.stages.get(state.stage_idx), state.vel.try_normalize(1e-9)) {
        (Some(s), Some(dir)) if state.mass > 0.0 => -dir * dynamic_pressure * s.cd * s.area / state.mass,
        _ => Vector3::zeros(),
    };

    Loads {
        thrust: cmd.direction * thrust_mag,
        drag_accel,
        mass_flow,
        density,
        dynamic_pressure,
        solid_burning,
    }
}

pub fn derivatives(state: &SimState, rocket: &Rocket, body: &CelestialBody, cmd: &ThrustCommand) -> Deriv {
    let l = loads(state, rocket, body, cmd);
    let thrust_accel = if state.mass > 0.0 { l.thrust / state.mass } else { Vector3::zeros() };
    Deriv {
        dpos: state.vel,
        dvel: body.gravity_accel(&state.pos) + thrust_accel + l.drag_accel,
        dmass: -l.mass_flow,
    }
}

// ---------------------------------------------------------------------------
// RK4 with the command held constant over the step
// ---------------------------------------------------------------------------

pub fn rk4_step(state: &SimState, rocket: &Rocket, body: &CelestialBody, cmd: &ThrustCommand, dt: f64) -> SimState {
    let k1 = derivatives(state, rocket, body, cmd);
    let k2 = derivatives(&state.apply(&k1, dt * 0.5), rocket, body, cmd);
    let k3 = derivatives(&state.apply(&k2, dt * 0.5), rocket, body, cmd);
    let k4 = derivatives(&state.apply(&k3, dt), rocket, body, cmd);

    // never burn into the dry mass
    let floor = rocket
        .stages
        .get(state.stage_idx)
        .map_or(0.0, |s| s.dry_mass + rocket.mass_above(state.stage_idx));
    let mass = state.mass + (k1.dmass + 2.0 * k2.dmass + 2.0 * k3.dmass + k4.dmass) * (dt / 6.0);

    SimState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        mass: mass.max(floor.min(state.mass)),
        stage_idx: state.stage_idx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::presets as bodies;
    use crate::sim::vehicle::presets;

    fn pad(rocket: &Rocket, body: &CelestialBody) -> SimState {
        SimState {
            time: 0.0,
            pos: Vector3::new(body.radius, 0.0, 0.0),
            vel: Vector3::zeros(),
            mass: rocket.total_mass(),
            stage_idx: 0,
        }
    }

    #[test]
    fn full_throttle_lifts_off() {
        let body = bodies::kerbin();
        let r = presets::kestrel();
        let cmd = ThrustCommand { throttle: 1.0, direction: Vector3::x() };
        let mut s = pad(&r, &body);
        for _ in 0..100 {
            s = rk4_step(&s, &r, &body, &cmd, 0.02);
        }
        assert!(s.vel.x > 5.0, "vertical speed {}", s.vel.x);
        assert!(s.mass < r.total_mass());
    }

    #[test]
    fn zero_throttle_burns_nothing() {
        let body = bodies::kerbin();
        let r = presets::kestrel();
        let cmd = ThrustCommand { throttle: 0.0, direction: Vector3::x() };
        let s = rk4_step(&pad(&r, &body), &r, &body, &cmd, 0.02);
        assert_eq!(s.mass, r.total_mass());
        // free fall from rest
        assert!(s.vel.x < 0.0);
    }

    #[test]
    fn solid_ignores_throttle() {
        let body = bodies::kerbin();
        let r = presets::kestrel_srb();
        let cmd = ThrustCommand { throttle: 0.0, direction: Vector3::x() };
        let l = loads(&pad(&r, &body), &r, &body, &cmd);
        assert!(l.solid_burning);
        assert!(l.thrust.norm() > 0.0);
    }

    #[test]
    fn mass_never_drops_below_stage_dry_mass() {
        let body = bodies::kerbin();
        let r = presets::kestrel();
        let mut s = pad(&r, &body);
        s.mass = r.stages[0].dry_mass + r.mass_above(0) + 0.5;
        let cmd = ThrustCommand { throttle: 1.0, direction: Vector3::x() };
        let next = rk4_step(&s, &r, &body, &cmd, 0.5);
        assert!(next.mass >= r.stages[0].dry_mass + r.mass_above(0) - 1e-9);
    }

    #[test]
    fn drag_opposes_velocity() {
        let body = bodies::kerbin();
        let r = presets::kestrel();
        let mut s = pad(&r, &body);
        s.vel = Vector3::new(0.0, 200.0, 0.0);
        let cmd = ThrustCommand { throttle: 0.0, direction: Vector3::x() };
        let l = loads(&s, &r, &body, &cmd);
        assert!(l.drag_accel.y < 0.0);
        assert!((l.dynamic_pressure - 0.5 * 1.225 * 200.0 * 200.0).abs() < 1e-6);
    }
}
