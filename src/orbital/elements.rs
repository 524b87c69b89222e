use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::physics::CelestialBody;

/// Eccentricities at or above this are treated as radial/escape trajectories.
const RADIAL_ECC: f64 = 1.0 - 1e-9;

/// Classical Keplerian orbital elements.
#[derive(Debug, Clone, Copy)]
pub struct KeplerianElements {
    pub sma: f64,       // semi-major axis, m (negative for hyperbolic)
    pub ecc: f64,       // eccentricity (0 = circular)
    pub inc: f64,       // inclination, rad
    pub true_anom: f64, // true anomaly, rad
    pub energy: f64,    // specific orbital energy, J/kg
}

impl KeplerianElements {
    /// Convert a body-centred inertial state vector to Keplerian elements.
    /// The body's rotation axis is +Z.
    pub fn from_state_vector_mu(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Self {
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(vel);
        let h_mag = h.norm();

        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        let energy = 0.5 * v * v - mu / r;
        let sma = if energy.abs() > 1e-12 { -mu / (2.0 * energy) } else { f64::INFINITY };

        let inc = if h_mag > 1e-9 {
            (h.z / h_mag).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let true_anom = if ecc > 1e-10 {
            let cos_nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0);
            let nu = cos_nu.acos();
            if pos.dot(vel) < 0.0 { TAU - nu } else { nu }
        } else {
            0.0
        };

        KeplerianElements { sma, ecc, inc, true_anom, energy }
    }

    pub fn is_bound(&self) -> bool {
        self.energy < 0.0
    }

    /// Mean motion, rad/s. Only meaningful for bound orbits.
    pub fn mean_motion(&self, mu: f64) -> f64 {
        (mu / self.sma.powi(3)).sqrt()
    }

    /// Mean anomaly in [0, 2pi) for elliptical orbits.
    pub fn mean_anomaly(&self) -> f64 {
        let e = self.ecc;
        let nu = self.true_anom;
        let ecc_anom = ((1.0 - e * e).sqrt() * nu.sin()).atan2(e + nu.cos());
        let ecc_anom = ecc_anom.rem_euclid(TAU);
        (ecc_anom - e * ecc_anom.sin()).rem_euclid(TAU)
    }

    pub fn period(&self, mu: f64) -> f64 {
        TAU / self.mean_motion(mu)
    }
}

/// The orbit facts the guidance consumes each tick.
#[derive(Debug, Clone, Copy)]
pub struct OrbitSummary {
    pub apoapsis_altitude: f64,
    pub periapsis_altitude: f64,
    pub time_to_apoapsis: f64,
    pub time_to_periapsis: f64,
    pub inclination_deg: f64,
    /// Orbital speed the vessel will have when it reaches apoapsis.
    pub speed_at_apoapsis: f64,
    pub eccentricity: f64,
}

impl OrbitSummary {
    pub fn from_state(body: &CelestialBody, pos: &Vector3<f64>, vel: &Vector3<f64>) -> Self {
        let mu = body.mu;
        let el = KeplerianElements::from_state_vector_mu(pos, vel, mu);
        let r = pos.norm();

        if !el.is_bound() {
            return OrbitSummary {
                apoapsis_altitude: f64::INFINITY,
                periapsis_altitude: el.sma.abs() * (el.ecc - 1.0) - body.radius,
                time_to_apoapsis: f64::INFINITY,
                time_to_periapsis: f64::INFINITY,
                inclination_deg: el.inc.to_degrees(),
                speed_at_apoapsis: 0.0,
                eccentricity: el.ecc,
            };
        }

        let ecc = el.ecc.min(1.0);
        let r_ap = el.sma * (1.0 + ecc);
        let r_pe = el.sma * (1.0 - ecc);
        let speed_at_apoapsis = (mu * (2.0 / r_ap - 1.0 / el.sma)).max(0.0).sqrt();

        let (time_to_apoapsis, time_to_periapsis) = if el.ecc >= RADIAL_ECC {
            // Straight up or down: time until vertical speed reaches zero.
            let radial_speed = pos.dot(vel) / r;
            let g = mu / (r * r);
            let t_ap = radial_speed.max(0.0) / g;
            (t_ap, f64::INFINITY)
        } else {
            let n = el.mean_motion(mu);
            let m = el.mean_anomaly();
            ((PI - m).rem_euclid(TAU) / n, (TAU - m).rem_euclid(TAU) / n)
        };

        OrbitSummary {
            apoapsis_altitude: r_ap - body.radius,
            periapsis_altitude: r_pe - body.radius,
            time_to_apoapsis,
            time_to_periapsis,
            inclination_deg: el.inc.to_degrees(),
            speed_at_apoapsis,
            eccentricity: el.ecc,
        }
    }
}
