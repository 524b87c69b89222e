use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::orbital::circular_orbit_speed;
use crate::session::LaunchContext;
use crate::vehicle::{max_start_thrust, twr_weighted_average, VehicleSnapshot};
use super::attitude::{blend_orbit_entry, AttitudeCommandGenerator, AttitudeMode};
use super::controller::{AttitudeCommand, FlightControls};
use super::losses::{LossAccumulator, LossReport};
use super::throttle::{ApoapsisThrottleController, YawCorrector};

// ---------------------------------------------------------------------------
// Phases and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AscentPhase {
    #[default]
    Landed,
    InLaunch,
    InInitialPitch,
    InTurn,
    InInsertion,
    InCoasting,
    InCircularisation,
}

impl AscentPhase {
    /// Short label for status lines.
    pub fn description(self) -> &'static str {
        match self {
            AscentPhase::Landed => "Landed",
            AscentPhase::InLaunch => "Launching",
            AscentPhase::InInitialPitch => "Pitching",
            AscentPhase::InTurn => "Turning",
            AscentPhase::InInsertion => "Insertion",
            AscentPhase::InCoasting => "Coasting",
            AscentPhase::InCircularisation => "Circularising",
        }
    }
}

impl fmt::Display for AscentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Whether guidance is flying, and if so in which phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceState {
    Idle,
    Active(AscentPhase),
    /// Handed off to circularisation.
    Completed,
    Aborted { last_phase: AscentPhase },
}

impl GuidanceState {
    pub fn is_launching(self) -> bool {
        matches!(self, GuidanceState::Active(_))
    }

    /// Phase to show the user. Derived, never fed back into control.
    pub fn display_phase(self) -> AscentPhase {
        match self {
            GuidanceState::Idle => AscentPhase::Landed,
            GuidanceState::Active(p) => p,
            GuidanceState::Completed => AscentPhase::InCircularisation,
            GuidanceState::Aborted { last_phase } => last_phase,
        }
    }
}

/// Result of one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Target apoapsis reached above the stable orbit height.
    Completed,
    Aborted,
    /// Not launched.
    Idle,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Drives one launch attempt: throttle, attitude, phase transitions, losses
/// and time acceleration, one control tick at a time.
#[derive(Debug, Clone)]
pub struct AscentGuidance {
    state: GuidanceState,
    throttle: ApoapsisThrottleController,
    yaw: YawCorrector,
    losses: LossAccumulator,
    pitch_set: bool,
    /// Start of the pitch-over ramp, then of the orbit-frame blend.
    timer: Option<f64>,
    heading_correction_speed: f64,
    max_thrust: f64,
    last_command: Option<AttitudeCommand>,
    message: String,
    preflight_at: Option<f64>,
}

impl Default for AscentGuidance {
    fn default() -> Self {
        Self::new()
    }
}

impl AscentGuidance {
    pub fn new() -> Self {
        Self {
            state: GuidanceState::Idle,
            throttle: ApoapsisThrottleController::new(0.0),
            yaw: YawCorrector::default(),
            losses: LossAccumulator::new(0.0),
            pitch_set: false,
            timer: None,
            heading_correction_speed: 0.0,
            max_thrust: 0.0,
            last_command: None,
            message: String::new(),
            preflight_at: None,
        }
    }

    pub fn state(&self) -> GuidanceState {
        self.state
    }

    pub fn phase(&self) -> AscentPhase {
        self.state.display_phase()
    }

    pub fn is_launching(&self) -> bool {
        self.state.is_launching()
    }

    pub fn losses(&self) -> &LossReport {
        self.losses.report()
    }

    pub fn throttle_controller(&self) -> &ApoapsisThrottleController {
        &self.throttle
    }

    pub fn yaw(&self) -> f64 {
        self.yaw.yaw()
    }

    /// Attitude most recently sent to the actuator.
    pub fn last_command(&self) -> Option<AttitudeCommand> {
        self.last_command
    }

    pub fn heading_correction_speed(&self) -> f64 {
        self.heading_correction_speed
    }

    pub fn max_thrust(&self) -> f64 {
        self.max_thrust
    }

    /// Latest stats or preflight text from `fixed_update`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Reset per-attempt numbers ahead of a launch.
    pub fn initialize(&mut self, ctx: &LaunchContext, snap: &VehicleSnapshot) {
        self.throttle.reset(snap.time);
        self.losses.reset(snap.time);
        self.message.clear();

        let orbit_speed = circular_orbit_speed(&ctx.body, ctx.body.radius + ctx.params.destination_altitude());
        self.heading_correction_speed = orbit_speed / 1.7;
        debug!(orbit_speed, correction = self.heading_correction_speed, "inclination heading correction");

        let stats = if ctx.body.has_atmosphere() && snap.altitude < ctx.body.atmosphere_depth() {
            ctx.stage_stats.atmo_stats()
        } else {
            ctx.stage_stats.vac_stats()
        };
        self.max_thrust = max_start_thrust(stats);
    }

    /// Start flying from the pad.
    pub fn launch(&mut self, ctx: &mut LaunchContext, snap: &VehicleSnapshot) {
        self.initialize(ctx, snap);
        self.pitch_set = false;
        self.timer = None;
        self.state = GuidanceState::Active(AscentPhase::Landed);
        ctx.time_warp.set_enabled(ctx.params.enable_speedup);
        ctx.save_params();
        info!(
            body = %ctx.body.name,
            turn_angle = ctx.params.turn_angle.value,
            start_speed = ctx.params.start_speed.value,
            destination_km = ctx.params.destination_height.value,
            "launch"
        );
    }

    /// Stop flying. The attempt is recorded as unsuccessful; losses are kept.
    pub fn abort(&mut self, ctx: &mut LaunchContext, controls: &mut FlightControls) -> TickOutcome {
        let GuidanceState::Active(last_phase) = self.state else {
            return TickOutcome::Idle;
        };
        info!(phase = %last_phase, "launch aborted");
        self.state = GuidanceState::Aborted { last_phase };
        Self::release(ctx, controls);
        ctx.record_launch(self.losses.report(), false);
        TickOutcome::Aborted
    }

    fn release(ctx: &mut LaunchContext, controls: &mut FlightControls) {
        controls.throttle = 0.0;
        ctx.actuator.set_enabled(false);
    }

    fn set_phase(&mut self, phase: AscentPhase, time: f64) {
        if self.state != GuidanceState::Active(phase) {
            info!(from = %self.state.display_phase(), to = %phase, t = time, "ascent phase");
            self.state = GuidanceState::Active(phase);
        }
    }

    /// One control tick: decide throttle and attitude.
    pub fn fly(&mut self, ctx: &mut LaunchContext, snap: &VehicleSnapshot, controls: &mut FlightControls) -> TickOutcome {
        let phase = match self.state {
            GuidanceState::Active(p) => p,
            GuidanceState::Idle => {
                Self::release(ctx, controls);
                return TickOutcome::Idle;
            }
            GuidanceState::Completed => {
                Self::release(ctx, controls);
                return TickOutcome::Completed;
            }
            GuidanceState::Aborted { .. } => {
                Self::release(ctx, controls);
                return TickOutcome::Aborted;
            }
        };
        ctx.time_warp.set_enabled(ctx.params.enable_speedup);

        let destination = ctx.params.destination_altitude();
        let stable = ctx.body.stable_orbit_height();
        let apoapsis = snap.orbit.apoapsis_altitude;

        if phase != AscentPhase::InCoasting && apoapsis > destination && snap.altitude < stable {
            self.losses.update(snap);
            // coasting losses are not final, record early anyway
            ctx.record_launch(self.losses.report(), true);
            self.set_phase(AscentPhase::InCoasting, snap.time);
            self.throttle.force_throttle(0.0);
            controls.throttle = 0.0;
            debug!(stable, "coasting to the edge of the atmosphere");
            ctx.time_warp.apply(2);
            return TickOutcome::Continue;
        }
        if apoapsis > destination && snap.altitude >= stable {
            self.set_phase(AscentPhase::InCircularisation, snap.time);
            ctx.time_warp.stop();
            ctx.record_launch(self.losses.report(), true);
            if let Some(circularizer) = ctx.circularizer.as_mut() {
                circularizer.circularize_at_apoapsis();
            }
            self.state = GuidanceState::Completed;
            Self::release(ctx, controls);
            return TickOutcome::Completed;
        }

        self.steer(ctx, snap, controls);
        self.losses.update(snap);
        TickOutcome::Continue
    }

    fn steer(&mut self, ctx: &mut LaunchContext, snap: &VehicleSnapshot, controls: &mut FlightControls) {
        let destination = ctx.params.destination_altitude();
        let stable = ctx.body.stable_orbit_height();
        let min_insertion_height = if ctx.body.has_atmosphere() {
            stable / 4.0
        } else {
            (ctx.params.destination_height.value * 667.0).max(stable * 0.667)
        };
        let stop_height = ctx.stop_height();
        ctx.params.derive_hold_ap_time(snap.altitude, stop_height);

        if ctx.params.enable_stage_manager {
            if let Some(stager) = ctx.stage_manager.as_mut() {
                stager.update(snap);
            }
        }

        let phase = self.state.display_phase();
        controls.throttle = if snap.orbit.apoapsis_altitude < destination {
            let throttle = self.throttle.update(snap, &mut ctx.params, stop_height);
            self.yaw.update(
                snap.surface_prograde_pitch,
                snap.orbit.inclination_deg,
                ctx.params.inclination.value,
                phase == AscentPhase::InLaunch,
            );
            throttle
        } else {
            0.0
        };

        let turn_angle = ctx.params.turn_angle.value;
        if phase == AscentPhase::InInitialPitch
            && self.pitch_set
            && snap.orbital_prograde_pitch + 90.0 >= turn_angle - 0.1
        {
            self.timer = None;
            // continue any earlier time warp
            ctx.time_warp.restore();
            ctx.time_warp.apply(1);
            self.set_phase(AscentPhase::InTurn, snap.time);
        }

        let phase = self.state.display_phase();
        let heading = ctx.launch_heading(snap.latitude, self.heading_correction_speed);
        let generator = AttitudeCommandGenerator::new(ctx.params.roll.value);
        let bias = self.throttle.pitch_adjustment();

        let command = if snap.speed < ctx.params.start_speed.value {
            self.set_phase(AscentPhase::InLaunch, snap.time);
            if snap.altitude_bottom > snap.vessel_height {
                generator.command(AttitudeMode::Launch { heading })
            } else {
                generator.command(AttitudeMode::PadVertical)
            }
        } else if matches!(phase, AscentPhase::Landed | AscentPhase::InLaunch | AscentPhase::InInitialPitch) {
            if !self.pitch_set {
                // hold real time while pitching over
                ctx.time_warp.store();
                ctx.time_warp.stop();
                self.pitch_set = true;
                self.timer = Some(snap.time);
            }
            self.set_phase(AscentPhase::InInitialPitch, snap.time);
            let elapsed = snap.time - self.timer.unwrap_or(snap.time);
            generator.command(AttitudeMode::InitialPitch { turn_angle, elapsed, heading })
        } else if snap.dynamic_pressure > snap.max_dynamic_pressure * 0.5
            || snap.dynamic_pressure > ctx.params.pressure_cutoff.value
            || snap.altitude < min_insertion_height
        {
            generator.command(AttitudeMode::ProgradeHold {
                prograde_pitch: snap.orbital_prograde_pitch,
                pitch_adjustment: bias,
                heading,
            })
        } else {
            let target = generator.command(AttitudeMode::Orbital { pitch_adjustment: bias, yaw: self.yaw.yaw() });
            if matches!(phase, AscentPhase::InInsertion | AscentPhase::InCoasting) {
                target
            } else {
                self.blend_into_orbit_frame(ctx, snap, target)
            }
        };

        ctx.actuator.set_enabled(true);
        ctx.actuator.attitude_to(command);
        self.last_command = Some(command);
    }

    /// Ease from surface to orbital steering, then enter insertion.
    fn blend_into_orbit_frame(&mut self, ctx: &mut LaunchContext, snap: &VehicleSnapshot, target: AttitudeCommand) -> AttitudeCommand {
        let started = match self.timer {
            Some(t) => t,
            None => {
                ctx.time_warp.store();
                ctx.time_warp.stop();
                self.timer = Some(snap.time);
                snap.time
            }
        };
        let last_act = ctx.actuator.last_act();
        let command = blend_orbit_entry(target, &last_act);
        let elapsed = snap.time - started;
        if elapsed > 10.0 || (last_act.x > 0.02 && elapsed > 2.0) {
            self.set_phase(AscentPhase::InInsertion, snap.time);
            self.timer = None;
            ctx.time_warp.restore();
            ctx.time_warp.apply(2);
        }
        command
    }

    // -----------------------------------------------------------------------
    // Fixed-step bookkeeping while not flying
    // -----------------------------------------------------------------------

    /// Physics-tick update. While not launching and with stats enabled,
    /// keeps integrating losses for a manually flown ascent and refreshes the
    /// status message.
    pub fn fixed_update(&mut self, ctx: &LaunchContext, snap: &VehicleSnapshot) {
        if self.is_launching() || !ctx.params.enable_stats {
            return;
        }
        if !snap.landed && !snap.in_stable_orbit {
            self.losses.update(snap);
            self.message = self.losses.status_message(snap);
        } else if !snap.landed {
            self.message = self.orbit_message(snap);
        } else if self.preflight_at.map_or(true, |t| snap.time - t > 1.0) {
            self.message = self.preflight_info(ctx, snap);
            self.preflight_at = Some(snap.time);
        }
    }

    fn orbit_message(&self, snap: &VehicleSnapshot) -> String {
        let r = self.losses.report();
        let mut msg = String::new();
        if r.vector_loss > 0.01 {
            msg += &format!(
                "Total Vector Loss:\t{:.2} m/s\nTotal Loss:\t{:.2} m/s\nTotal Burn:\t\t{:.1}\n\n",
                r.vector_loss, r.total_loss, r.total_burn
            );
        }
        msg += &format!(
            "Apoapsis:\t\t{:.1} km\nPeriapsis:\t\t{:.1} km\nInclination:\t\t{:.1} °\n",
            snap.orbit.apoapsis_altitude / 1000.0,
            snap.orbit.periapsis_altitude / 1000.0,
            snap.orbit.inclination_deg
        );
        msg
    }

    /// Pad readout: delta-v weighted surface TWR of the early stages and mass.
    pub fn preflight_info(&self, ctx: &LaunchContext, snap: &VehicleSnapshot) -> String {
        let gee = ctx.body.gee_asl;
        let min_dv = 2.0 * gee * ctx.params.destination_height.value;
        let twr = twr_weighted_average(ctx.stage_stats.atmo_stats(), gee, min_dv);
        format!(
            "Surface TWR:\t{:.2}\nMass:\t\t{:.2} t\nHeight:\t\t{:.1} m\n",
            twr,
            snap.mass / 1000.0,
            snap.vessel_height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::{ManualTimeWarp, RecordingActuator};
    use crate::physics::presets;
    use crate::vehicle::{SnapshotBuilder, StageStats, StaticStageStats};
    use nalgebra::Vector3;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn context() -> LaunchContext {
        LaunchContext::new(presets::kerbin(), Box::new(RecordingActuator::default()), Box::new(ManualTimeWarp::default()))
    }

    /// Ten-tick-per-second scripted climb; fields are overridden per phase.
    fn tick(t: f64) -> SnapshotBuilder {
        SnapshotBuilder::new(t).vessel_height(10.0).dynamic_pressure(0.0, 0.0)
    }

    fn launched() -> (AscentGuidance, LaunchContext) {
        let mut ctx = context();
        let mut g = AscentGuidance::new();
        g.launch(&mut ctx, &tick(0.0).build());
        (g, ctx)
    }

    #[test]
    fn idle_guidance_does_nothing() {
        let mut ctx = context();
        let mut g = AscentGuidance::new();
        let mut controls = FlightControls { throttle: 0.7 };
        assert_eq!(g.fly(&mut ctx, &tick(1.0).build(), &mut controls), TickOutcome::Idle);
        assert_eq!(controls.throttle, 0.0);
        assert_eq!(g.phase(), AscentPhase::Landed);
    }

    #[test]
    fn pad_command_is_vertical_until_clear() {
        let (mut g, mut ctx) = launched();
        let mut controls = FlightControls::default();
        let snap = tick(0.1).speed(5.0).altitude(2.0).build();
        g.fly(&mut ctx, &snap, &mut controls);
        assert_eq!(g.phase(), AscentPhase::InLaunch);
        assert_eq!(controls.throttle, 1.0);
        let nose = crate::gnc::forward(&g.last_command().unwrap().rotation);
        assert!((nose.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn phases_advance_in_order() {
        let (mut g, mut ctx) = launched();
        let mut controls = FlightControls::default();
        let mut seen = vec![g.phase()];
        let mut t = 0.0;
        let mut record = |g: &AscentGuidance| {
            if seen.last() != Some(&g.phase()) {
                seen.push(g.phase());
            }
        };

        // vertical climb below start speed
        for i in 0..50 {
            t += 0.1;
            let s = tick(t).speed(i as f64 * 2.0).altitude(i as f64 * 10.0).apoapsis(i as f64 * 20.0).build();
            g.fly(&mut ctx, &s, &mut controls);
            record(&g);
        }
        // pitch-over: prograde follows once the ramp is done
        for i in 0..100 {
            t += 0.1;
            let prograde = if i < 60 { -89.0 } else { -80.0 };
            let s = tick(t)
                .speed(120.0 + i as f64)
                .altitude(1_000.0 + i as f64 * 20.0)
                .apoapsis(5_000.0)
                .time_to_apoapsis(30.0)
                .prograde_pitch(prograde)
                .build();
            g.fly(&mut ctx, &s, &mut controls);
            record(&g);
        }
        // gravity turn through max q
        for i in 0..100 {
            t += 0.1;
            let s = tick(t)
                .speed(300.0 + i as f64 * 5.0)
                .altitude(3_000.0 + i as f64 * 100.0)
                .apoapsis(10_000.0 + i as f64 * 200.0)
                .time_to_apoapsis(45.0)
                .prograde_pitch(-60.0)
                .dynamic_pressure(15_000.0, 20_000.0)
                .build();
            g.fly(&mut ctx, &s, &mut controls);
            record(&g);
        }
        // thin air above the insertion height: blend, then insert
        for i in 0..150 {
            t += 0.1;
            let s = tick(t)
                .speed(1_500.0 + i as f64 * 5.0)
                .altitude(20_000.0 + i as f64 * 100.0)
                .apoapsis(40_000.0 + i as f64 * 100.0)
                .time_to_apoapsis(50.0)
                .prograde_pitch(-20.0)
                .dynamic_pressure(500.0, 20_000.0)
                .build();
            g.fly(&mut ctx, &s, &mut controls);
            record(&g);
        }
        // target apoapsis reached inside the atmosphere
        t += 0.1;
        let coast = tick(t).speed(2_300.0).altitude(40_000.0).apoapsis(81_000.0).build();
        g.fly(&mut ctx, &coast, &mut controls);
        record(&g);
        assert_eq!(controls.throttle, 0.0);
        // and above it
        t += 0.1;
        let above = tick(t).speed(2_200.0).altitude(70_500.0).apoapsis(81_000.0).build();
        assert_eq!(g.fly(&mut ctx, &above, &mut controls), TickOutcome::Completed);
        record(&g);

        assert_eq!(
            seen,
            vec![
                AscentPhase::Landed,
                AscentPhase::InLaunch,
                AscentPhase::InInitialPitch,
                AscentPhase::InTurn,
                AscentPhase::InInsertion,
                AscentPhase::InCoasting,
                AscentPhase::InCircularisation,
            ]
        );
        assert!(!g.is_launching());
        assert_eq!(ctx.history.best_settings(), Some((10.0, 100.0)));
    }

    #[test]
    fn throttle_stays_in_range_while_below_target() {
        let (mut g, mut ctx) = launched();
        let mut controls = FlightControls::default();
        for i in 1..400 {
            let t = i as f64 * 0.1;
            let s = tick(t)
                .speed(150.0 + i as f64)
                .altitude(i as f64 * 50.0)
                .apoapsis(i as f64 * 100.0)
                .time_to_apoapsis(20.0 + (i % 70) as f64)
                .prograde_pitch(-40.0)
                .pitch(-50.0)
                .dynamic_pressure(12_000.0, 20_000.0)
                .build();
            g.fly(&mut ctx, &s, &mut controls);
            let sens = ctx.params.sensitivity.value;
            assert!(
                (sens..=1.0).contains(&controls.throttle),
                "throttle {} outside [{sens}, 1] at t={t}",
                controls.throttle
            );
            let bias = g.throttle_controller().pitch_adjustment();
            let limit = crate::gnc::max_angle(12_000.0, -50.0);
            assert!((0.0..=limit).contains(&bias), "bias {bias} outside [0, {limit}]");
        }
    }

    #[test]
    fn abort_mid_turn_stops_everything() {
        let (mut g, mut ctx) = launched();
        let mut controls = FlightControls::default();
        // jump straight into the turn
        g.pitch_set = true;
        g.state = GuidanceState::Active(AscentPhase::InTurn);
        let turning = tick(30.0)
            .speed(400.0)
            .altitude(5_000.0)
            .apoapsis(15_000.0)
            .time_to_apoapsis(40.0)
            .prograde_pitch(-60.0)
            .dynamic_pressure(15_000.0, 20_000.0)
            .build();
        g.fly(&mut ctx, &turning, &mut controls);
        assert!(controls.throttle > 0.0);

        assert_eq!(g.abort(&mut ctx, &mut controls), TickOutcome::Aborted);
        assert!(!g.is_launching());
        assert_eq!(controls.throttle, 0.0);
        assert_eq!(g.phase(), AscentPhase::InTurn);
        assert!(!ctx.history.is_empty());

        // even a tick that would complete the ascent changes nothing
        let above = tick(31.0).altitude(75_000.0).apoapsis(90_000.0).build();
        assert_eq!(g.fly(&mut ctx, &above, &mut controls), TickOutcome::Aborted);
        assert_eq!(g.state(), GuidanceState::Aborted { last_phase: AscentPhase::InTurn });
        assert_eq!(controls.throttle, 0.0);
    }

    struct CountingCircularizer(Rc<Cell<u32>>);

    impl crate::gnc::Circularizer for CountingCircularizer {
        fn circularize_at_apoapsis(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn completion_hands_off_to_circularizer() {
        let calls = Rc::new(Cell::new(0));
        let mut ctx = context().with_circularizer(Box::new(CountingCircularizer(calls.clone())));
        let mut g = AscentGuidance::new();
        g.launch(&mut ctx, &tick(0.0).build());
        let mut controls = FlightControls { throttle: 1.0 };
        let above = tick(200.0).altitude(71_000.0).apoapsis(82_000.0).build();
        assert_eq!(g.fly(&mut ctx, &above, &mut controls), TickOutcome::Completed);
        assert_eq!(calls.get(), 1);
        assert_eq!(g.phase(), AscentPhase::InCircularisation);
        assert_eq!(ctx.time_warp.current_rate(), 0);
        assert_eq!(controls.throttle, 0.0);
        // done means done
        assert_eq!(g.fly(&mut ctx, &above, &mut controls), TickOutcome::Completed);
        assert_eq!(calls.get(), 1);
    }

    /// Time warp whose history stays readable after it is boxed into a context.
    struct SharedWarp {
        rate: u32,
        changes: Rc<RefCell<Vec<u32>>>,
    }

    impl crate::gnc::TimeWarp for SharedWarp {
        fn current_rate(&self) -> u32 {
            self.rate
        }

        fn set_rate(&mut self, rate: u32) {
            self.rate = rate;
            self.changes.borrow_mut().push(rate);
        }
    }

    /// High in thin air: steering has left the surface frame.
    fn thin_air(t: f64) -> VehicleSnapshot {
        tick(t)
            .speed(1_500.0)
            .altitude(25_000.0)
            .apoapsis(40_000.0)
            .time_to_apoapsis(50.0)
            .prograde_pitch(-20.0)
            .dynamic_pressure(500.0, 20_000.0)
            .build()
    }

    #[test]
    fn settled_actuator_enters_insertion_early() {
        let actuator = RecordingActuator { act: Vector3::new(0.05, 0.0, 0.0), ..RecordingActuator::default() };
        let mut ctx = LaunchContext::new(presets::kerbin(), Box::new(actuator), Box::new(ManualTimeWarp::default()));
        let mut g = AscentGuidance::new();
        g.launch(&mut ctx, &tick(0.0).build());
        g.pitch_set = true;
        g.state = GuidanceState::Active(AscentPhase::InTurn);
        let mut controls = FlightControls::default();

        for i in 0..=20 {
            g.fly(&mut ctx, &thin_air(10.0 + i as f64 * 0.1), &mut controls);
            assert_eq!(g.phase(), AscentPhase::InTurn, "left the blend after {:.1} s", i as f64 * 0.1);
        }
        g.fly(&mut ctx, &thin_air(10.0 + 21.0 * 0.1), &mut controls);
        assert_eq!(g.phase(), AscentPhase::InInsertion);
    }

    #[test]
    fn time_warp_is_held_through_pitch_over_and_blend() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let warp = SharedWarp { rate: 3, changes: changes.clone() };
        let mut ctx = LaunchContext::new(presets::kerbin(), Box::new(RecordingActuator::default()), Box::new(warp));
        ctx.params.enable_speedup = true;
        let mut g = AscentGuidance::new();
        g.launch(&mut ctx, &tick(0.0).build());
        assert!(changes.borrow().is_empty());
        let mut controls = FlightControls::default();

        let climbing = |t: f64, prograde: f64| {
            tick(t)
                .speed(150.0)
                .altitude(1_000.0)
                .apoapsis(5_000.0)
                .time_to_apoapsis(30.0)
                .prograde_pitch(prograde)
                .build()
        };
        g.fly(&mut ctx, &climbing(0.1, -89.0), &mut controls);
        assert_eq!(g.phase(), AscentPhase::InInitialPitch);
        assert_eq!(*changes.borrow(), vec![0]);

        g.fly(&mut ctx, &climbing(0.2, -80.0), &mut controls);
        assert_eq!(g.phase(), AscentPhase::InTurn);
        assert_eq!(*changes.borrow(), vec![0, 3, 1]);

        // blend starts in real time and times out after ten seconds
        let mut t = 0.3;
        while g.phase() == AscentPhase::InTurn && t < 20.0 {
            g.fly(&mut ctx, &thin_air(t), &mut controls);
            t += 0.1;
        }
        assert_eq!(g.phase(), AscentPhase::InInsertion);
        assert_eq!(*changes.borrow(), vec![0, 3, 1, 0, 1, 2]);
        assert_eq!(ctx.time_warp.current_rate(), 2);
    }

    #[test]
    fn coasting_requests_time_warp_when_enabled() {
        let (mut g, mut ctx) = launched();
        ctx.params.enable_speedup = true;
        let mut controls = FlightControls::default();
        let coast = tick(100.0).altitude(45_000.0).apoapsis(81_000.0).build();
        g.fly(&mut ctx, &coast, &mut controls);
        assert_eq!(g.phase(), AscentPhase::InCoasting);
        assert_eq!(ctx.time_warp.current_rate(), 2);
    }

    #[test]
    fn initialize_computes_heading_correction_and_thrust() {
        let stats = StaticStageStats {
            atmo: vec![StageStats { start_thrust: 200_000.0, ..Default::default() }],
            vac: vec![StageStats { start_thrust: 240_000.0, ..Default::default() }],
        };
        let ctx = context().with_stage_stats(Box::new(stats));
        let mut g = AscentGuidance::new();
        g.initialize(&ctx, &tick(0.0).build());
        let v = circular_orbit_speed(&ctx.body, 680_000.0);
        assert!((g.heading_correction_speed() - v / 1.7).abs() < 1e-9);
        assert_eq!(g.max_thrust(), 200_000.0);
        g.initialize(&ctx, &tick(0.0).altitude(75_000.0).build());
        assert_eq!(g.max_thrust(), 240_000.0);
    }

    #[test]
    fn stats_mode_tracks_manual_flight() {
        let mut ctx = context();
        ctx.params.enable_stats = true;
        let mut g = AscentGuidance::new();
        g.fixed_update(&ctx, &tick(0.0).drag(3.0).build());
        g.fixed_update(&ctx, &tick(1.0).drag(3.0).build());
        assert!((g.losses().drag_loss - 3.0).abs() < 1e-9);
        assert!(g.message().contains("Air Drag Loss"));

        ctx.params.enable_stats = false;
        g.fixed_update(&ctx, &tick(2.0).drag(3.0).build());
        assert!((g.losses().drag_loss - 3.0).abs() < 1e-9);
    }

    #[test]
    fn preflight_info_refreshes_once_a_second() {
        let mut ctx = context();
        ctx.params.enable_stats = true;
        let mut g = AscentGuidance::new();
        g.fixed_update(&ctx, &tick(0.0).landed(true).mass(12_000.0).build());
        assert!(g.message().contains("Mass:\t\t12.00 t"));
        g.fixed_update(&ctx, &tick(0.5).landed(true).mass(14_000.0).build());
        assert!(g.message().contains("12.00 t"));
        g.fixed_update(&ctx, &tick(1.6).landed(true).mass(14_000.0).build());
        assert!(g.message().contains("14.00 t"));
    }

    #[test]
    fn display_phase_is_derived() {
        assert_eq!(GuidanceState::Idle.display_phase(), AscentPhase::Landed);
        assert_eq!(GuidanceState::Completed.display_phase(), AscentPhase::InCircularisation);
        assert!(!GuidanceState::Aborted { last_phase: AscentPhase::InTurn }.is_launching());
        assert_eq!(AscentPhase::InInitialPitch.to_string(), "Pitching");
    }
}
