use nalgebra::Vector3;

use crate::orbital::OrbitSummary;

// ---------------------------------------------------------------------------
// Per-tick vehicle facts
// ---------------------------------------------------------------------------

/// Read-only summary of the vehicle and its orbit for one tick.
///
/// Angles named `*pitch` use the attitude-euler convention of the attitude
/// actuator: -90 deg is straight up, 0 deg is level with the horizon.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub time: f64,                      // s, universal simulated time
    pub altitude: f64,                  // m above sea level
    pub altitude_bottom: f64,           // m, lowest vessel point above terrain
    pub vessel_height: f64,             // m
    pub latitude: f64,                  // deg
    pub speed: f64,                     // m/s, surface-relative
    pub mass: f64,                      // kg
    pub drag: f64,                      // m/s^2, aerodynamic deceleration
    pub thrust: f64,                    // N, current thrust magnitude
    pub thrust_vector: Vector3<f64>,    // N
    pub acceleration: Vector3<f64>,     // m/s^2, sensed total acceleration
    pub forward: Vector3<f64>,          // vessel nose direction
    pub up: Vector3<f64>,               // local radial direction
    pub gravity_accel: Vector3<f64>,    // m/s^2
    pub orbital_velocity: Vector3<f64>, // m/s, inertial
    pub orbit: OrbitSummary,
    pub dynamic_pressure: f64,          // Pa
    pub max_dynamic_pressure: f64,      // Pa, running maximum this flight
    pub pitch: f64,                     // deg, vessel nose
    pub surface_prograde_pitch: f64,    // deg
    pub orbital_prograde_pitch: f64,    // deg
    pub angle_of_attack: f64,           // deg
    pub has_active_solid_booster: bool,
    pub critical_heat: f64,             // fraction of the hottest part's limit
    pub landed: bool,
    pub in_stable_orbit: bool,
}

impl VehicleSnapshot {
    /// Vessel pitch above the horizon in degrees (90 = straight up).
    pub fn pitch_above_horizon(&self) -> f64 {
        -self.pitch
    }
}

/// Attitude-euler pitch of a direction relative to local up. A vanishing
/// vector counts as straight up.
pub fn prograde_pitch(velocity: &Vector3<f64>, up: &Vector3<f64>) -> f64 {
    match velocity.try_normalize(1e-9) {
        Some(dir) => -dir.dot(up).clamp(-1.0, 1.0).asin().to_degrees(),
        None => -90.0,
    }
}

// ---------------------------------------------------------------------------
// Snapshot builder
// ---------------------------------------------------------------------------

pub struct SnapshotBuilder {
    snap: VehicleSnapshot,
}

impl SnapshotBuilder {
    pub fn new(time: f64) -> Self {
        Self {
            snap: VehicleSnapshot {
                time,
                altitude: 0.0,
                altitude_bottom: 0.0,
                vessel_height: 10.0,
                latitude: 0.0,
                speed: 0.0,
                mass: 1000.0,
                drag: 0.0,
                thrust: 0.0,
                thrust_vector: Vector3::zeros(),
                acceleration: Vector3::zeros(),
                forward: Vector3::x(),
                up: Vector3::x(),
                gravity_accel: Vector3::new(-9.81, 0.0, 0.0),
                orbital_velocity: Vector3::zeros(),
                orbit: OrbitSummary {
                    apoapsis_altitude: 0.0,
                    periapsis_altitude: -600_000.0,
                    time_to_apoapsis: 0.0,
                    time_to_periapsis: f64::INFINITY,
                    inclination_deg: 0.0,
                    speed_at_apoapsis: 0.0,
                    eccentricity: 1.0,
                },
                dynamic_pressure: 0.0,
                max_dynamic_pressure: 0.0,
                pitch: -90.0,
                surface_prograde_pitch: -90.0,
                orbital_prograde_pitch: -90.0,
                angle_of_attack: 0.0,
                has_active_solid_booster: false,
                critical_heat: 0.0,
                landed: false,
                in_stable_orbit: false,
            },
        }
    }

    pub fn altitude(mut self, v: f64) -> Self {
        self.snap.altitude = v;
        self.snap.altitude_bottom = v;
        self
    }
    pub fn altitude_bottom(mut self, v: f64) -> Self { self.snap.altitude_bottom = v; self }
    pub fn vessel_height(mut self, v: f64) -> Self { self.snap.vessel_height = v; self }
    pub fn latitude(mut self, v: f64) -> Self { self.snap.latitude = v; self }
    pub fn speed(mut self, v: f64) -> Self { self.snap.speed = v; self }
    pub fn mass(mut self, v: f64) -> Self { self.snap.mass = v; self }
    pub fn drag(mut self, v: f64) -> Self { self.snap.drag = v; self }
    pub fn thrust(mut self, v: f64) -> Self { self.snap.thrust = v; self }
    pub fn thrust_vector(mut self, v: Vector3<f64>) -> Self { self.snap.thrust_vector = v; self }
    pub fn acceleration(mut self, v: Vector3<f64>) -> Self { self.snap.acceleration = v; self }
    pub fn forward(mut self, v: Vector3<f64>) -> Self { self.snap.forward = v; self }
    pub fn up(mut self, v: Vector3<f64>) -> Self { self.snap.up = v; self }
    pub fn gravity_accel(mut self, v: Vector3<f64>) -> Self { self.snap.gravity_accel = v; self }
    pub fn orbital_velocity(mut self, v: Vector3<f64>) -> Self { self.snap.orbital_velocity = v; self }
    pub fn orbit(mut self, v: OrbitSummary) -> Self { self.snap.orbit = v; self }
    pub fn apoapsis(mut self, v: f64) -> Self { self.snap.orbit.apoapsis_altitude = v; self }
    pub fn periapsis(mut self, v: f64) -> Self { self.snap.orbit.periapsis_altitude = v; self }
    pub fn time_to_apoapsis(mut self, v: f64) -> Self { self.snap.orbit.time_to_apoapsis = v; self }
    pub fn time_to_periapsis(mut self, v: f64) -> Self { self.snap.orbit.time_to_periapsis = v; self }
    pub fn inclination(mut self, v: f64) -> Self { self.snap.orbit.inclination_deg = v; self }
    pub fn speed_at_apoapsis(mut self, v: f64) -> Self { self.snap.orbit.speed_at_apoapsis = v; self }
    pub fn dynamic_pressure(mut self, q: f64, max_q: f64) -> Self {
        self.snap.dynamic_pressure = q;
        self.snap.max_dynamic_pressure = max_q;
        self
    }
    pub fn pitch(mut self, v: f64) -> Self { self.snap.pitch = v; self }
    /// Sets both surface and orbital prograde pitch.
    pub fn prograde_pitch(mut self, v: f64) -> Self {
        self.snap.surface_prograde_pitch = v;
        self.snap.orbital_prograde_pitch = v;
        self
    }
    pub fn surface_prograde_pitch(mut self, v: f64) -> Self { self.snap.surface_prograde_pitch = v; self }
    pub fn orbital_prograde_pitch(mut self, v: f64) -> Self { self.snap.orbital_prograde_pitch = v; self }
    pub fn angle_of_attack(mut self, v: f64) -> Self { self.snap.angle_of_attack = v; self }
    pub fn solid_booster(mut self, v: bool) -> Self { self.snap.has_active_solid_booster = v; self }
    pub fn critical_heat(mut self, v: f64) -> Self { self.snap.critical_heat = v; self }
    pub fn landed(mut self, v: bool) -> Self { self.snap.landed = v; self }
    pub fn in_stable_orbit(mut self, v: bool) -> Self { self.snap.in_stable_orbit = v; self }

    pub fn build(self) -> VehicleSnapshot {
        self.snap
    }
}
