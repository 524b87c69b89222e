pub mod ascent;
pub mod attitude;
pub mod controller;
pub mod estimator;
pub mod losses;
pub mod smoothing;
pub mod throttle;
pub mod timewarp;

pub use ascent::{AscentGuidance, AscentPhase, GuidanceState, TickOutcome};
pub use attitude::{blend_orbit_entry, euler, forward, initial_pitch_target, roll_rotation, AttitudeCommandGenerator, AttitudeMode};
pub use controller::{
    AttitudeActuator, AttitudeCommand, Circularizer, FlightControls, RecordingActuator, ReferenceFrame, StageManager,
};
pub use estimator::AscentSettingsEstimator;
pub use losses::{LossAccumulator, LossReport};
pub use smoothing::SmoothedValue;
pub use throttle::{max_angle, time_to_reach_ap, ApoapsisThrottleController, YawCorrector};
pub use timewarp::{ManualTimeWarp, TimeAccelerationCoordinator, TimeWarp};
