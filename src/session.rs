//! Per-attempt session: everything guidance reads and writes besides the
//! vehicle snapshot.

use tracing::{info, warn};

use crate::gnc::{AttitudeActuator, Circularizer, LossReport, StageManager, TimeAccelerationCoordinator, TimeWarp};
use crate::history::{LaunchHistory, LaunchRecord, MemoryLaunchHistory};
use crate::orbital::heading_for_launch_inclination;
use crate::params::{ControlParameters, Loaded, ParameterStore};
use crate::physics::CelestialBody;
use crate::vehicle::{StageStatsProvider, StaticStageStats};

/// Parameter files on disk for one vessel.
#[derive(Debug, Clone)]
pub struct VesselFiles {
    pub store: ParameterStore,
    pub vessel_id: String,
}

pub struct LaunchContext {
    pub params: ControlParameters,
    pub body: CelestialBody,
    pub actuator: Box<dyn AttitudeActuator>,
    pub circularizer: Option<Box<dyn Circularizer>>,
    pub stage_manager: Option<Box<dyn StageManager>>,
    pub stage_stats: Box<dyn StageStatsProvider>,
    pub time_warp: TimeAccelerationCoordinator,
    pub history: Box<dyn LaunchHistory>,
    pub files: Option<VesselFiles>,
}

impl LaunchContext {
    /// Context with default parameters, no stage statistics and an in-memory
    /// launch history.
    pub fn new(body: CelestialBody, actuator: Box<dyn AttitudeActuator>, warp: Box<dyn TimeWarp>) -> Self {
        let params = ControlParameters::default();
        let time_warp = TimeAccelerationCoordinator::new(warp, params.enable_speedup);
        Self {
            params,
            body,
            actuator,
            circularizer: None,
            stage_manager: None,
            stage_stats: Box::new(StaticStageStats::default()),
            time_warp,
            history: Box::new(MemoryLaunchHistory::default()),
            files: None,
        }
    }

    pub fn with_params(mut self, params: ControlParameters) -> Self {
        self.time_warp.set_enabled(params.enable_speedup);
        self.params = params;
        self
    }
    pub fn with_stage_stats(mut self, stats: Box<dyn StageStatsProvider>) -> Self { self.stage_stats = stats; self }
    pub fn with_history(mut self, history: Box<dyn LaunchHistory>) -> Self { self.history = history; self }
    pub fn with_circularizer(mut self, c: Box<dyn Circularizer>) -> Self { self.circularizer = Some(c); self }
    pub fn with_stage_manager(mut self, s: Box<dyn StageManager>) -> Self { self.stage_manager = Some(s); self }
    pub fn with_files(mut self, store: ParameterStore, vessel_id: impl Into<String>) -> Self {
        self.files = Some(VesselFiles { store, vessel_id: vessel_id.into() });
        self
    }

    /// Altitude over which `HoldAPTime` fades from start to finish: the top
    /// of the atmosphere, or the target apoapsis on airless bodies.
    pub fn stop_height(&self) -> f64 {
        let depth = self.body.atmosphere_depth();
        if depth > 0.0 { depth } else { self.params.destination_altitude() }
    }

    /// Launch heading for the target inclination at this latitude.
    pub fn launch_heading(&self, latitude: f64, correction_speed: f64) -> f64 {
        heading_for_launch_inclination(&self.body, self.params.inclination.value, latitude, correction_speed)
    }

    // -----------------------------------------------------------------------
    // Persistence. Failures are logged and never reach the control loop.
    // -----------------------------------------------------------------------

    /// Load this vessel's parameters. Returns true when nothing vessel
    /// specific was found and the settings estimator should run.
    pub fn load_params(&mut self) -> bool {
        let Some(files) = &self.files else {
            return true;
        };
        let needs_estimate = match files.store.load(&files.vessel_id, &self.body.name) {
            Ok(loaded) => {
                let needs_estimate = loaded.needs_estimate();
                if let Loaded::Vessel(p) | Loaded::Defaults(p) = loaded {
                    self.params = p;
                }
                needs_estimate
            }
            Err(e) => {
                warn!(error = %e, "could not load parameters, keeping current values");
                true
            }
        };
        self.time_warp.set_enabled(self.params.enable_speedup);
        needs_estimate
    }

    pub fn save_params(&self) {
        let Some(files) = &self.files else { return };
        if let Err(e) = self.params.validate() {
            warn!(error = %e, "saving parameters that fail validation");
        }
        if let Err(e) = files.store.save(&self.params, &files.vessel_id, &self.body.name) {
            warn!(error = %e, "could not save parameters");
        }
    }

    pub fn save_defaults(&self) {
        let Some(files) = &self.files else { return };
        if let Err(e) = files.store.save_defaults(&self.params, &self.body.name) {
            warn!(error = %e, "could not save default parameters");
        }
    }

    /// Store the attempt with the current settings and flush the history.
    pub fn record_launch(&mut self, losses: &LossReport, reached_apoapsis: bool) {
        self.history.record_launch(LaunchRecord {
            turn_angle: self.params.turn_angle.value,
            start_speed: self.params.start_speed.value,
            destination_height: self.params.destination_height.value,
            drag_loss: losses.drag_loss,
            gravity_drag_loss: losses.gravity_drag_loss,
            vector_loss: losses.vector_loss,
            total_loss: losses.total_loss,
            max_heat: losses.max_heat,
            reached_apoapsis,
        });
        info!(total_loss = losses.total_loss, reached_apoapsis, "launch recorded");
        self.persist_history();
    }

    pub fn persist_history(&mut self) {
        if let Err(e) = self.history.persist() {
            warn!(error = %e, "could not save launch history");
        }
    }
}
