use serde::Serialize;

use crate::vehicle::VehicleSnapshot;

// ---------------------------------------------------------------------------
// Ascent loss bookkeeping
// ---------------------------------------------------------------------------

/// Totals integrated over one launch attempt. All values in m/s except
/// `horizontal_distance` (m) and `max_heat` (fraction of the part limit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LossReport {
    pub drag_loss: f64,
    pub gravity_drag_loss: f64,
    /// Gravity drag including the speed still to be lost coasting to apoapsis.
    pub gravity_drag_loss_at_apoapsis: f64,
    pub vector_loss: f64,
    pub total_burn: f64,
    pub total_loss: f64,
    pub velocity_lost: f64,
    pub horizontal_distance: f64,
    pub max_heat: f64,
}

impl LossReport {
    /// True when this attempt lost less in total than `other`.
    pub fn better_than(&self, other: &LossReport) -> bool {
        self.total_loss < other.total_loss
    }
}

#[derive(Debug, Clone, Default)]
pub struct LossAccumulator {
    report: LossReport,
    last_time: f64,
    /// Instantaneous rates from the most recent tick, for status display.
    last_drag: f64,
    last_gravity_drag: f64,
    last_vector_drag: f64,
}

impl LossAccumulator {
    pub fn new(start_time: f64) -> Self {
        Self { last_time: start_time, ..Default::default() }
    }

    /// Zero every total and restart the clock at `start_time`.
    pub fn reset(&mut self, start_time: f64) {
        *self = Self::new(start_time);
    }

    pub fn report(&self) -> &LossReport {
        &self.report
    }

    /// Integrate one tick. Ticks with no mass or no elapsed time are skipped.
    pub fn update(&mut self, snap: &VehicleSnapshot) {
        if snap.mass <= 0.0 {
            return;
        }
        let dt = snap.time - self.last_time;
        self.last_time = snap.time;
        if dt <= 0.0 {
            return;
        }

        let v_dir = snap.orbital_velocity.try_normalize(1e-9).unwrap_or_else(|| snap.up);
        let fwd_accel = match snap.forward.try_normalize(1e-9) {
            Some(f) => snap.acceleration.dot(&f),
            None => 0.0,
        };
        let gravity_drag = snap.gravity_accel.dot(&-v_dir);
        let vector_drag = (snap.thrust - snap.thrust_vector.dot(&v_dir)) / snap.mass;
        let thrust_accel = snap.thrust / snap.mass;

        let horizontal = snap.orbital_velocity - snap.up * snap.orbital_velocity.dot(&snap.up);

        let r = &mut self.report;
        r.horizontal_distance += horizontal.norm() * dt;
        r.velocity_lost += (thrust_accel - fwd_accel) * dt;
        r.drag_loss += snap.drag * dt;
        r.gravity_drag_loss += gravity_drag * dt;
        r.vector_loss += vector_drag * dt;
        r.total_burn += thrust_accel * dt;
        r.gravity_drag_loss_at_apoapsis =
            r.gravity_drag_loss + snap.orbital_velocity.norm() - snap.orbit.speed_at_apoapsis;
        r.total_loss = r.drag_loss + r.gravity_drag_loss_at_apoapsis + r.vector_loss;
        r.max_heat = r.max_heat.max(snap.critical_heat);

        self.last_drag = snap.drag;
        self.last_gravity_drag = gravity_drag;
        self.last_vector_drag = vector_drag;
    }

    /// Multi-line summary of the running totals.
    pub fn status_message(&self, snap: &VehicleSnapshot) -> String {
        let r = &self.report;
        format!(
            "Air Drag:\t\t{:.2} m/s²\n\
             GravityDrag:\t{:.2} m/s²\n\
             Thrust Vector Drag:\t{:.2} m/s²\n\
             Air Drag Loss:\t{:.2} m/s\n\
             Gravity Drag Loss:\t{:.2} -> {:.2} m/s @AP\n\n\
             Total Vector Loss:\t{:.2} m/s\n\
             Total Loss:\t{:.2} m/s\n\
             Total Burn:\t\t{:.1}\n\n\
             Apoapsis:\t\t{}\n\
             Periapsis:\t\t{}\n\
             Inclination:\t\t{:.1} °\n",
            self.last_drag,
            self.last_gravity_drag,
            self.last_vector_drag,
            r.drag_loss,
            r.gravity_drag_loss,
            r.gravity_drag_loss_at_apoapsis,
            r.vector_loss,
            r.total_loss,
            r.total_burn,
            format_orbit_point(snap.orbit.apoapsis_altitude, snap.orbit.time_to_apoapsis),
            format_orbit_point(snap.orbit.periapsis_altitude, snap.orbit.time_to_periapsis),
            snap.orbit.inclination_deg,
        )
    }
}

fn format_orbit_point(altitude: f64, eta: f64) -> String {
    if !altitude.is_finite() {
        return "escape".to_string();
    }
    if eta.is_finite() {
        format!("{:.1} km in {:.0} s", altitude / 1000.0, eta)
    } else {
        format!("{:.1} km", altitude / 1000.0)
    }
}
