use crate::physics::G0;

// ---------------------------------------------------------------------------
// Per-stage thrust statistics (produced by the external staging analysis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StageStats {
    pub start_thrust: f64,       // N
    pub start_mass: f64,         // kg
    pub end_mass: f64,           // kg
    pub delta_v: f64,            // m/s
    pub has_solid_engine: bool,
}

impl StageStats {
    /// Thrust-to-weight at ignition on a body with the given surface gravity
    /// (in multiples of G0).
    pub fn start_twr(&self, gee_asl: f64) -> f64 {
        if self.start_mass > 0.0 {
            self.start_thrust / (self.start_mass * G0 * gee_asl)
        } else {
            0.0
        }
    }

    /// Thrust-to-weight at burnout.
    pub fn max_twr(&self, gee_asl: f64) -> f64 {
        if self.end_mass > 0.0 {
            self.start_thrust / (self.end_mass * G0 * gee_asl)
        } else {
            0.0
        }
    }
}

/// Source of atmospheric and vacuum stage statistics.
///
/// Slices are indexed by stage number; the highest index fires first, so
/// callers iterate last-to-first.
pub trait StageStatsProvider {
    fn atmo_stats(&self) -> &[StageStats];
    fn vac_stats(&self) -> &[StageStats];

    /// Recompute statistics now rather than on the next scheduled update.
    fn force_simulation(&mut self) {}
}

/// Fixed statistics, e.g. computed once from a known vehicle.
#[derive(Debug, Clone, Default)]
pub struct StaticStageStats {
    pub atmo: Vec<StageStats>,
    pub vac: Vec<StageStats>,
}

impl StageStatsProvider for StaticStageStats {
    fn atmo_stats(&self) -> &[StageStats] {
        &self.atmo
    }

    fn vac_stats(&self) -> &[StageStats] {
        &self.vac
    }
}

/// Largest ignition thrust across all stages.
pub fn max_start_thrust(stats: &[StageStats]) -> f64 {
    stats.iter().rev().map(|s| s.start_thrust).fold(0.0, f64::max)
}

/// Delta-v weighted average of mid-burn TWR over the earliest stages, until
/// `min_delta_v` worth of stages has been included.
pub fn twr_weighted_average(stats: &[StageStats], gee_asl: f64, min_delta_v: f64) -> f64 {
    let mut twr = 0.0;
    let mut delta_v = 0.0;
    for s in stats.iter().rev() {
        let stage_twr = (s.start_twr(gee_asl) + s.max_twr(gee_asl)) / 2.0;
        if stage_twr > 0.0 {
            twr += stage_twr * s.delta_v;
            delta_v += s.delta_v;
            if delta_v >= min_delta_v {
                break;
            }
        }
    }
    if delta_v > 0.0 { twr / delta_v } else { 0.0 }
}
