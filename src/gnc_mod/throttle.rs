use tracing::trace;

use crate::params::ControlParameters;
use crate::vehicle::VehicleSnapshot;
use super::smoothing::SmoothedValue;

/// Shortest tick the time-speed estimate divides by.
const MIN_DT: f64 = 1e-6;

/// Largest pitch bias (deg) allowed at this dynamic pressure and vessel pitch.
///
/// `clamp(100000 / q, 0, 35)`, never more than the nose's tilt from
/// vertical (`90 + pitch`).
pub fn max_angle(dynamic_pressure: f64, vessel_pitch: f64) -> f64 {
    let angle = (100_000.0 / dynamic_pressure).clamp(0.0, 35.0);
    let vertical = (90.0 + vessel_pitch).max(0.0);
    angle.min(vertical)
}

/// Seconds of vertical acceleration needed to go from `start_speed` to the
/// vertical speed that gives `target_ap_time` seconds to apoapsis.
pub fn time_to_reach_ap(gravity_accel: f64, start_speed: f64, target_ap_time: f64, max_vert_accel: f64) -> f64 {
    let target_speed = gravity_accel * target_ap_time;
    (target_speed - start_speed) / max_vert_accel
}

// ---------------------------------------------------------------------------
// Apoapsis-time throttle controller
// ---------------------------------------------------------------------------

/// Holds time-to-apoapsis at `HoldAPTime` by throttling, and pitches the
/// nose up (via a bias) when full throttle is not enough.
#[derive(Debug, Clone)]
pub struct ApoapsisThrottleController {
    throttle: SmoothedValue,
    pitch_adjustment: SmoothedValue,
    neutral_throttle: f64,
    prev_time_to_ap: f64,
    last_time: f64,
    time_speed: f64,
    max_aoa: f64,
}

impl ApoapsisThrottleController {
    pub fn new(start_time: f64) -> Self {
        Self {
            throttle: SmoothedValue::new(10, 1.0),
            pitch_adjustment: SmoothedValue::new(4, 0.0),
            neutral_throttle: 0.5,
            prev_time_to_ap: 0.0,
            last_time: start_time,
            time_speed: 0.0,
            max_aoa: 0.0,
        }
    }

    /// Fresh launch attempt. The smoothed throttle and bias are kept.
    pub fn reset(&mut self, start_time: f64) {
        self.neutral_throttle = 0.5;
        self.prev_time_to_ap = 0.0;
        self.last_time = start_time;
    }

    pub fn throttle(&self) -> f64 {
        self.throttle.value()
    }

    /// Degrees the nose is held above prograde.
    pub fn pitch_adjustment(&self) -> f64 {
        self.pitch_adjustment.value()
    }

    pub fn neutral_throttle(&self) -> f64 {
        self.neutral_throttle
    }

    /// Rate at which time-to-apoapsis is shrinking, s/s.
    pub fn time_speed(&self) -> f64 {
        self.time_speed
    }

    pub fn max_aoa(&self) -> f64 {
        self.max_aoa
    }

    pub fn force_throttle(&mut self, throttle: f64) {
        self.throttle.force(throttle);
    }

    /// One control step. Returns the throttle, in `[Sensitivity, 1]`.
    ///
    /// May rewrite `APTimeStart` while a solid booster is overshooting.
    pub fn update(&mut self, snap: &VehicleSnapshot, params: &mut ControlParameters, stop_height: f64) -> f64 {
        let hold = params.hold_ap_time();
        let dt = snap.time - self.last_time;

        if snap.speed < params.start_speed.value {
            self.throttle.set(1.0);
        } else if dt > MIN_DT {
            // falling toward periapsis first
            let time_to_ap = if snap.orbit.time_to_apoapsis > snap.orbit.time_to_periapsis {
                0.0
            } else {
                snap.orbit.time_to_apoapsis
            };
            let diff = 0.1 * (hold - time_to_ap).abs() * 0.5;
            self.time_speed = (self.prev_time_to_ap - time_to_ap) / dt;
            let eta = (time_to_ap - hold) / self.time_speed;

            if self.time_speed.abs() < 0.02 && self.pitch_adjustment.value() == 0.0 {
                self.neutral_throttle = self.throttle.value();
            }

            if (time_to_ap - hold).abs() < 0.1 {
                if self.pitch_adjustment.value() > 0.0 {
                    self.pitch_adjustment.set(self.pitch_adjustment.value() - 0.1);
                } else {
                    self.throttle.force(self.neutral_throttle);
                }
            } else if time_to_ap < hold {
                if self.throttle.value() >= 1.0 && (time_to_ap < self.prev_time_to_ap || eta > 20.0) {
                    self.neutral_throttle = 1.0;
                    self.pitch_adjustment.set(self.pitch_adjustment.value() + 0.1);
                }
                self.throttle.set(self.throttle.value() + diff);
                if eta > 0.0 && eta < 20.0 {
                    self.pitch_adjustment.set(self.pitch_adjustment.value() - 0.1);
                }
            } else if self.pitch_adjustment.value() > 0.0 {
                self.pitch_adjustment.set(self.pitch_adjustment.value() - 0.1);
            } else {
                self.throttle.set(self.throttle.value() - diff);
            }

            if self.max_aoa.abs() < snap.angle_of_attack.abs() {
                self.max_aoa = snap.angle_of_attack;
            }
            trace!(time_to_ap, time_speed = self.time_speed, hold, "apoapsis throttle");
        }

        let limit = max_angle(snap.dynamic_pressure, snap.pitch);
        let bias = self.pitch_adjustment.value();
        if bias < 0.0 {
            self.pitch_adjustment.force(0.0);
        } else if bias > limit {
            self.pitch_adjustment.force(limit);
        }
        // no pitch correction during the initial lift
        if snap.surface_prograde_pitch < -45.0 {
            self.pitch_adjustment.force(0.0);
        }

        self.prev_time_to_ap = snap.orbit.time_to_apoapsis;
        self.last_time = snap.time;

        let floor = params.sensitivity.value;
        if self.throttle.value() < floor {
            self.throttle.force(floor);
        }
        if self.throttle.value() > 1.0 {
            self.throttle.force(1.0);
        }

        self.adjust_for_solid_booster(snap, params, stop_height);
        self.throttle.value()
    }

    /// Solid boosters cannot throttle down: move `APTimeStart` so the held
    /// time matches what the booster is producing.
    fn adjust_for_solid_booster(&self, snap: &VehicleSnapshot, params: &mut ControlParameters, stop_height: f64) {
        let tta = snap.orbit.time_to_apoapsis;
        if !(snap.has_active_solid_booster && tta > params.hold_ap_time() && self.time_speed < 0.0) {
            return;
        }
        let span = stop_height - snap.altitude;
        if span <= 1.0 {
            return;
        }
        let start = (stop_height * tta - snap.altitude * params.ap_time_finish.value) / span * 0.99;
        if start > 0.0 {
            trace!(start, "AP time start raised for solid booster");
            params.ap_time_start.value = start;
        }
    }
}

// ---------------------------------------------------------------------------
// Yaw correction for target inclination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct YawCorrector {
    yaw: f64,
}

impl YawCorrector {
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Update from the current orbit inclination. Inactive (yaw 0) during the
    /// vertical climb, while prograde is steeper than 45 deg, or for target
    /// inclinations within 2 deg of equatorial.
    pub fn update(&mut self, surface_prograde_pitch: f64, inclination: f64, target_inclination: f64, in_launch: bool) -> f64 {
        if surface_prograde_pitch <= -45.0 || target_inclination.abs() <= 2.0 || in_launch {
            self.yaw = 0.0;
            return self.yaw;
        }
        let mut heading = (target_inclination.signum() * inclination - target_inclination) * 1.2;
        if heading.abs() < 0.3 {
            heading = 0.0;
        } else if self.yaw.abs() > 0.1 {
            heading = (self.yaw * 7.0 + heading) / 8.0;
        }
        if self.yaw.abs() > heading.abs() || self.yaw == 0.0 {
            self.yaw = heading;
        }
        trace!(yaw = self.yaw, "yaw correction");
        self.yaw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::SnapshotBuilder;

    fn params() -> ControlParameters {
        let mut p = ControlParameters::default();
        p.start_speed.value = 100.0;
        p.derive_hold_ap_time(0.0, 70_000.0);
        p
    }

    #[test]
    fn max_angle_caps() {
        assert!((max_angle(0.0, 0.0) - 35.0).abs() < 1e-12);
        assert!((max_angle(10_000.0, 0.0) - 10.0).abs() < 1e-12);
        assert!((max_angle(1_000.0, -80.0) - 10.0).abs() < 1e-12);
        assert_eq!(max_angle(1_000.0, -90.0), 0.0);
    }

    #[test]
    fn time_to_reach_ap_example() {
        let t = time_to_reach_ap(9.81, 100.0, 45.0, 15.0);
        assert!((t - (9.81 * 45.0 - 100.0) / 15.0).abs() < 1e-12);
        assert!((t - 22.77).abs() < 0.01, "got {t}");
    }

    #[test]
    fn below_start_speed_is_full_throttle() {
        let mut c = ApoapsisThrottleController::new(0.0);
        c.force_throttle(0.4);
        let mut p = params();
        for i in 1..=10 {
            let s = SnapshotBuilder::new(i as f64 * 0.1).speed(50.0).build();
            c.update(&s, &mut p, 70_000.0);
        }
        assert!((c.throttle() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overshoot_throttles_down_to_sensitivity() {
        let mut c = ApoapsisThrottleController::new(0.0);
        let mut p = params();
        for i in 1..=200 {
            let s = SnapshotBuilder::new(i as f64 * 0.1)
                .speed(400.0)
                .time_to_apoapsis(90.0)
                .prograde_pitch(-30.0)
                .build();
            let thr = c.update(&s, &mut p, 70_000.0);
            assert!((p.sensitivity.value..=1.0).contains(&thr), "throttle {thr} out of range");
        }
        assert!((c.throttle() - p.sensitivity.value).abs() < 1e-9);
    }

    #[test]
    fn saturated_throttle_raises_bias_within_limit() {
        let mut c = ApoapsisThrottleController::new(0.0);
        let mut p = params();
        let mut tta = 40.0;
        for i in 1..=300 {
            tta -= 0.05;
            let s = SnapshotBuilder::new(i as f64 * 0.1)
                .speed(400.0)
                .pitch(-60.0)
                .time_to_apoapsis(tta)
                .dynamic_pressure(8_000.0, 10_000.0)
                .prograde_pitch(-40.0)
                .build();
            c.update(&s, &mut p, 70_000.0);
            let bias = c.pitch_adjustment();
            let limit = max_angle(8_000.0, -60.0);
            assert!(bias >= 0.0 && bias <= limit + 1e-12, "bias {bias} outside [0, {limit}]");
        }
        assert!(c.pitch_adjustment() > 0.0);
        assert_eq!(c.neutral_throttle(), 1.0);
    }

    #[test]
    fn falling_toward_periapsis_counts_as_zero_time_to_ap() {
        let mut c = ApoapsisThrottleController::new(0.0);
        c.force_throttle(0.5);
        let mut p = params();
        let falling = |t: f64| {
            SnapshotBuilder::new(t)
                .speed(400.0)
                .time_to_apoapsis(3_000.0)
                .time_to_periapsis(100.0)
                .build()
        };
        c.update(&falling(1.0), &mut p, 70_000.0);
        // rate taken from 0, not from 3000
        assert_eq!(c.time_speed(), 0.0);
        assert!(c.throttle() > 0.5, "throttle {}", c.throttle());

        for i in 2..=20 {
            c.update(&falling(i as f64), &mut p, 70_000.0);
        }
        assert!((c.throttle() - 1.0).abs() < 1e-12, "throttle {}", c.throttle());
    }

    #[test]
    fn steep_prograde_forces_zero_bias() {
        let mut c = ApoapsisThrottleController::new(0.0);
        let mut p = params();
        let s = SnapshotBuilder::new(1.0)
            .speed(400.0)
            .pitch(-60.0)
            .time_to_apoapsis(10.0)
            .prograde_pitch(-60.0)
            .build();
        c.update(&s, &mut p, 70_000.0);
        assert_eq!(c.pitch_adjustment(), 0.0);
    }

    #[test]
    fn stale_tick_leaves_time_speed() {
        let mut c = ApoapsisThrottleController::new(0.0);
        let mut p = params();
        let s = SnapshotBuilder::new(1.0).speed(400.0).time_to_apoapsis(30.0).build();
        c.update(&s, &mut p, 70_000.0);
        let ts = c.time_speed();
        c.update(&s, &mut p, 70_000.0);
        assert_eq!(c.time_speed(), ts);
        assert!(c.time_speed().is_finite());
    }

    #[test]
    fn solid_booster_raises_ap_time_start() {
        let mut c = ApoapsisThrottleController::new(0.0);
        let mut p = params();
        let first = SnapshotBuilder::new(1.0).speed(400.0).altitude(10_000.0).time_to_apoapsis(55.0).build();
        c.update(&first, &mut p, 70_000.0);
        let second = SnapshotBuilder::new(2.0)
            .speed(400.0)
            .altitude(10_000.0)
            .time_to_apoapsis(60.0)
            .solid_booster(true)
            .build();
        c.update(&second, &mut p, 70_000.0);
        let expected = (70_000.0 * 60.0 - 10_000.0 * 50.0) / 60_000.0 * 0.99;
        assert!((p.ap_time_start.value - expected).abs() < 1e-9);
    }

    #[test]
    fn yaw_inactive_for_equatorial_target() {
        let mut y = YawCorrector::default();
        assert_eq!(y.update(-20.0, 5.0, 0.0, false), 0.0);
        assert_eq!(y.update(-20.0, 5.0, 30.0, true), 0.0);
        assert_eq!(y.update(-60.0, 5.0, 30.0, false), 0.0);
    }

    #[test]
    fn yaw_deadband_and_hysteresis() {
        let mut y = YawCorrector::default();
        // 0.2 deg error * 1.2 is inside the deadband
        assert_eq!(y.update(-20.0, 30.2, 30.0, false), 0.0);
        let first = y.update(-20.0, 35.0, 30.0, false);
        assert!((first - 6.0).abs() < 1e-12);
        // larger error is blended but not adopted
        let second = y.update(-20.0, 40.0, 30.0, false);
        assert_eq!(second, first);
        // smaller error is blended and adopted
        let third = y.update(-20.0, 31.0, 30.0, false);
        assert!((third - (6.0 * 7.0 + 1.2) / 8.0).abs() < 1e-12);
    }
}
