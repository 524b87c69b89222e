use tracing::{debug, info};

use crate::session::LaunchContext;

// ---------------------------------------------------------------------------
// Initial settings from TWR and launch history
// ---------------------------------------------------------------------------

/// One-shot heuristic filling the unlocked tunables before a launch.
#[derive(Debug, Clone, Copy, Default)]
pub struct AscentSettingsEstimator {
    /// Prefer the best recorded launch over a guessed next attempt.
    pub use_best: bool,
    /// Wipe launch history and return to hard defaults.
    pub reset: bool,
}

impl AscentSettingsEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_best(mut self, v: bool) -> Self { self.use_best = v; self }
    pub fn reset(mut self, v: bool) -> Self { self.reset = v; self }

    pub fn estimate(&self, ctx: &mut LaunchContext) {
        let base = ctx.body.base_gravity_factor();
        let stable = ctx.body.stable_orbit_height();
        debug!(base, "base turn speed factor");

        if self.reset {
            ctx.history.clear();
            ctx.persist_history();
            let p = &mut ctx.params;
            p.turn_angle.value = 10.0;
            p.start_speed.value = base * 10.0;
            p.destination_height.value = (stable + 10_000.0) / 1000.0;
            info!("launch history and settings reset");
            return;
        }
        debug!(stable, "min orbit height");

        ctx.stage_stats.force_simulation();
        let gee = ctx.body.gee_asl;
        let twr = ctx
            .stage_stats
            .atmo_stats()
            .iter()
            .rev()
            .find_map(|s| {
                let start = s.start_twr(gee);
                if start <= 0.0 {
                    None
                } else if s.has_solid_engine {
                    Some((start + s.max_twr(gee)) / 2.3)
                } else {
                    Some(start)
                }
            })
            .unwrap_or(0.0);

        let p = &mut ctx.params;
        if twr > 1.2 {
            info!(twr, "first guess from TWR");
            let excess = twr - 1.2;
            p.turn_angle.set_unlocked((10.0 + excess * 5.0).clamp(10.0, 80.0));
            let speed = (base * 10.0 - excess * base * 3.0).clamp(base, base * 10.0);
            p.start_speed.set_unlocked(speed.max(10.0));
        }

        let from_history = if self.use_best {
            ctx.history.best_settings().or_else(|| ctx.history.guess_settings())
        } else {
            ctx.history.guess_settings()
        };
        if let Some((turn, speed)) = from_history {
            info!(turn, speed, "settings from launch history");
            p.start_speed.set_unlocked(speed);
            p.turn_angle.set_unlocked(turn);
        }

        p.ap_time_start.set_unlocked(50.0);
        p.ap_time_finish.set_unlocked(50.0);
        p.sensitivity.set_unlocked(0.3);
        p.destination_height.set_unlocked((stable + 10_000.0) / 1000.0);
        p.roll.set_unlocked(0.0);
        p.inclination.set_unlocked(0.0);
        p.pressure_cutoff.set_unlocked(1200.0);
        ctx.save_params();
    }
}
