use nalgebra::Vector3;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::gnc::{
    forward, AscentGuidance, AscentPhase, AttitudeCommand, FlightControls, LossReport, ManualTimeWarp,
    RecordingActuator, ReferenceFrame, TickOutcome,
};
use crate::orbital::{delta_v_to_circularize, OrbitSummary};
use crate::physics::CelestialBody;
use crate::session::LaunchContext;
use crate::vehicle::{prograde_pitch, SnapshotBuilder, VehicleSnapshot};
use super::event::{AltitudeDetector, EventDetector, EventKind, FlightEvent, MaxQDetector, PhaseDetector};
use super::integrator::{loads, rk4_step, Loads};
use super::state::{SimConfig, SimState, ThrustCommand};
use super::vehicle::Rocket;

/// Convective heating scale turning sqrt(rho) * v^3 into a fraction of the
/// skin temperature limit.
const HEAT_FLUX_LIMIT: f64 = 1.0e9;

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// One control tick as seen by guidance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickRecord {
    pub time: f64,
    pub altitude: f64,
    pub speed: f64,
    pub vertical_speed: f64,
    pub throttle: f64,
    pub pitch: f64,
    pub prograde_pitch: f64,
    pub pitch_adjustment: f64,
    pub hold_ap_time: f64,
    pub apoapsis: f64,
    pub periapsis: f64,
    pub time_to_apoapsis: f64,
    pub dynamic_pressure: f64,
    pub mass: f64,
    pub stage: usize,
    pub phase: AscentPhase,
}

#[derive(Debug, Clone)]
pub struct FlightResult {
    pub records: Vec<TickRecord>,
    pub events: Vec<FlightEvent>,
    pub outcome: TickOutcome,
    pub losses: LossReport,
    pub final_state: SimState,
    pub final_orbit: OrbitSummary,
    pub delta_v_to_circularize: f64,
}

impl FlightResult {
    /// Phases in the order they were first entered.
    pub fn phases(&self) -> Vec<AscentPhase> {
        let mut seen: Vec<AscentPhase> = Vec::new();
        for r in &self.records {
            if seen.last() != Some(&r.phase) {
                seen.push(r.phase);
            }
        }
        seen
    }

    pub fn max_altitude(&self) -> f64 {
        self.records.iter().map(|r| r.altitude).fold(0.0, f64::max)
    }

    pub fn max_dynamic_pressure(&self) -> f64 {
        self.records.iter().map(|r| r.dynamic_pressure).fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Reference frames
// ---------------------------------------------------------------------------

/// Local axes of an attitude frame in world coordinates: x right, y up,
/// z forward.
#[derive(Debug, Clone, Copy)]
pub struct FrameBasis {
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
    pub z: Vector3<f64>,
}

fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    (Vector3::x() - v * v.x)
        .try_normalize(1e-9)
        .unwrap_or_else(Vector3::y)
}

impl FrameBasis {
    /// East, up, north. The body spins about world z.
    pub fn surface(up: &Vector3<f64>) -> Self {
        let pole = Vector3::z();
        let north = (pole - up * up.dot(&pole))
            .try_normalize(1e-9)
            .unwrap_or_else(|| perpendicular(up));
        Self { x: north.cross(up), y: *up, z: north }
    }

    /// Prograde forward, radial-out up. Falls back to the surface frame at
    /// rest.
    pub fn orbit(up: &Vector3<f64>, vel: &Vector3<f64>) -> Self {
        let Some(pro) = vel.try_normalize(1e-9) else {
            return Self::surface(up);
        };
        let radial = (up - pro * pro.dot(up))
            .try_normalize(1e-9)
            .unwrap_or_else(|| perpendicular(&pro));
        Self { x: pro.cross(&radial), y: radial, z: pro }
    }

    pub fn to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

/// World-space nose direction for an attitude command. Stands in for a
/// perfect attitude hold.
pub fn command_direction(cmd: &AttitudeCommand, up: &Vector3<f64>, vel: &Vector3<f64>) -> Vector3<f64> {
    let basis = match cmd.frame {
        ReferenceFrame::SurfaceNorth => FrameBasis::surface(up),
        ReferenceFrame::Orbit => FrameBasis::orbit(up, vel),
    };
    basis.to_world(&forward(&cmd.rotation)).try_normalize(1e-9).unwrap_or(*up)
}

// ---------------------------------------------------------------------------
// Snapshot from simulated state
// ---------------------------------------------------------------------------

pub fn build_snapshot(
    state: &SimState,
    rocket: &Rocket,
    body: &CelestialBody,
    l: &Loads,
    command: &ThrustCommand,
    max_q: f64,
    landed: bool,
) -> VehicleSnapshot {
    let up = state.up();
    let altitude = state.radius() - body.radius;
    let speed = state.vel.norm();
    let orbit = OrbitSummary::from_state(body, &state.pos, &state.vel);
    let nose = command.direction;
    let aoa = match state.vel.try_normalize(1e-9) {
        Some(v) => v.dot(&nose).clamp(-1.0, 1.0).acos().to_degrees(),
        None => 0.0,
    };
    let sensed = if state.mass > 0.0 { l.thrust / state.mass + l.drag_accel } else { Vector3::zeros() };

    SnapshotBuilder::new(state.time)
        .altitude(altitude)
        .vessel_height(rocket.height)
        .latitude(up.z.clamp(-1.0, 1.0).asin().to_degrees())
        .speed(speed)
        .mass(state.mass)
        .drag(l.drag_accel.norm())
        .thrust(l.thrust.norm())
        .thrust_vector(l.thrust)
        .acceleration(sensed)
        .forward(nose)
        .up(up)
        .gravity_accel(body.gravity_accel(&state.pos))
        .orbital_velocity(state.vel)
        .orbit(orbit)
        .dynamic_pressure(l.dynamic_pressure, max_q)
        .pitch(prograde_pitch(&nose, &up))
        .prograde_pitch(prograde_pitch(&state.vel, &up))
        .angle_of_attack(aoa)
        .solid_booster(l.solid_burning)
        .critical_heat((l.density.sqrt() * speed.powi(3) / HEAT_FLUX_LIMIT).min(1.0))
        .landed(landed)
        .in_stable_orbit(orbit.periapsis_altitude > body.stable_orbit_height())
        .build()
}

// ---------------------------------------------------------------------------
// Stage separation logic
// ---------------------------------------------------------------------------

/// Drop the active stage once its propellant is gone and another stage
/// remains.
fn check_staging(state: &mut SimState, rocket: &Rocket) -> Option<EventKind> {
    let stage = rocket.stages.get(state.stage_idx)?;
    if rocket.propellant_left(state.stage_idx, state.mass) > 0.01 || state.stage_idx + 1 >= rocket.stages.len() {
        return None;
    }
    let from = state.stage_idx;
    state.mass -= stage.dry_mass;
    state.stage_idx += 1;
    Some(EventKind::Staging { from, to: state.stage_idx })
}

// ---------------------------------------------------------------------------
// Full ascent
// ---------------------------------------------------------------------------

/// Fly `rocket` from the pad under `guidance` until it completes, aborts or
/// runs out of time. Throttle and attitude commands are applied exactly.
pub fn simulate_ascent(
    rocket: &Rocket,
    config: &SimConfig,
    ctx: &mut LaunchContext,
    guidance: &mut AscentGuidance,
) -> FlightResult {
    let body = ctx.body.clone();
    let lat = config.latitude.to_radians();
    let pad_up = Vector3::new(lat.cos(), 0.0, lat.sin());
    let mut state = SimState {
        time: 0.0,
        pos: pad_up * body.radius,
        vel: Vector3::zeros(),
        mass: rocket.total_mass(),
        stage_idx: 0,
    };
    let mut command = ThrustCommand { throttle: 0.0, direction: pad_up };
    let mut controls = FlightControls::default();
    let mut max_q: f64 = 0.0;
    let mut lifted = false;
    let mut burned_out = false;

    let mut detectors: Vec<Box<dyn EventDetector>> = vec![Box::new(PhaseDetector), Box::new(MaxQDetector::default())];
    if body.has_atmosphere() {
        detectors.push(Box::new(AltitudeDetector::new(body.atmosphere_depth(), true)));
    }

    let cap = ((config.max_time / config.dt) as usize + 1).min(200_000);
    let mut records: Vec<TickRecord> = Vec::with_capacity(cap);
    let mut events = Vec::new();

    let l = loads(&state, rocket, &body, &command);
    guidance.launch(ctx, &build_snapshot(&state, rocket, &body, &l, &command, max_q, true));
    let mut outcome = TickOutcome::Continue;

    while state.time < config.max_time {
        let l = loads(&state, rocket, &body, &command);
        max_q = max_q.max(l.dynamic_pressure);
        let snap = build_snapshot(&state, rocket, &body, &l, &command, max_q, !lifted);

        guidance.fixed_update(ctx, &snap);
        outcome = guidance.fly(ctx, &snap, &mut controls);

        let record = TickRecord {
            time: snap.time,
            altitude: snap.altitude,
            speed: snap.speed,
            vertical_speed: state.vel.dot(&snap.up),
            throttle: controls.throttle,
            pitch: snap.pitch,
            prograde_pitch: snap.orbital_prograde_pitch,
            pitch_adjustment: guidance.throttle_controller().pitch_adjustment(),
            hold_ap_time: ctx.params.hold_ap_time(),
            apoapsis: snap.orbit.apoapsis_altitude,
            periapsis: snap.orbit.periapsis_altitude,
            time_to_apoapsis: snap.orbit.time_to_apoapsis,
            dynamic_pressure: snap.dynamic_pressure,
            mass: snap.mass,
            stage: state.stage_idx,
            phase: guidance.phase(),
        };
        if let Some(prev) = records.last() {
            for d in detectors.iter_mut() {
                if let Some(kind) = d.check(prev, &record) {
                    debug!(?kind, t = record.time, "flight event");
                    events.push(FlightEvent::at(&record, kind));
                }
            }
        }

        match outcome {
            TickOutcome::Continue => {}
            TickOutcome::Completed => {
                events.push(FlightEvent::at(&record, EventKind::Completed));
                records.push(record);
                break;
            }
            TickOutcome::Aborted | TickOutcome::Idle => {
                events.push(FlightEvent::at(&record, EventKind::Aborted { reason: "guidance stopped".into() }));
                records.push(record);
                break;
            }
        }
        records.push(record);

        let direction = guidance
            .last_command()
            .map_or(snap.up, |c| command_direction(&c, &snap.up, &state.vel));
        command = ThrustCommand { throttle: controls.throttle, direction };
        state = rk4_step(&state, rocket, &body, &command, config.dt);

        if let Some(kind) = check_staging(&mut state, rocket) {
            info!(?kind, t = state.time, "staging");
            events.push(FlightEvent { time: state.time, altitude: state.radius() - body.radius, kind });
        }
        if !burned_out
            && state.stage_idx + 1 == rocket.stages.len()
            && rocket.propellant_left(state.stage_idx, state.mass) <= 0.01
        {
            burned_out = true;
            events.push(FlightEvent {
                time: state.time,
                altitude: state.radius() - body.radius,
                kind: EventKind::Burnout { stage: state.stage_idx },
            });
        }

        let altitude = state.radius() - body.radius;
        if !lifted && altitude > 1.0 {
            lifted = true;
            events.push(FlightEvent { time: state.time, altitude, kind: EventKind::Liftoff });
        }
        if altitude < 0.0 {
            if lifted {
                warn!(t = state.time, "ground impact");
                outcome = guidance.abort(ctx, &mut controls);
                events.push(FlightEvent { time: state.time, altitude, kind: EventKind::Aborted { reason: "ground impact".into() } });
                break;
            }
            // still sitting on the pad
            state.pos = pad_up * body.radius;
            state.vel = Vector3::zeros();
        }
    }

    if outcome == TickOutcome::Continue {
        warn!(max_time = config.max_time, "time limit reached");
        outcome = guidance.abort(ctx, &mut controls);
        events.push(FlightEvent {
            time: state.time,
            altitude: state.radius() - body.radius,
            kind: EventKind::Aborted { reason: "time limit".into() },
        });
    }

    let final_orbit = OrbitSummary::from_state(&body, &state.pos, &state.vel);
    FlightResult {
        records,
        events,
        outcome,
        losses: *guidance.losses(),
        delta_v_to_circularize: delta_v_to_circularize(&body, &final_orbit),
        final_orbit,
        final_state: state,
    }
}

/// Fly with default parameters, stage statistics taken from the rocket and
/// an in-memory launch history.
pub fn simulate(rocket: &Rocket, body: CelestialBody, config: &SimConfig) -> FlightResult {
    let stats = rocket.stage_stats_for(&body);
    let mut ctx = LaunchContext::new(body, Box::new(RecordingActuator::default()), Box::new(ManualTimeWarp::default()))
        .with_stage_stats(Box::new(stats));
    let mut guidance = AscentGuidance::new();
    simulate_ascent(rocket, config, &mut ctx, &mut guidance)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
