use nalgebra::{UnitQuaternion, Vector3};

use crate::vehicle::VehicleSnapshot;

/// Frame an attitude command is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFrame {
    /// Local horizon: up, north and east at the vessel.
    SurfaceNorth,
    /// Orbital prograde / normal / radial.
    Orbit,
}

/// Desired vessel orientation for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeCommand {
    pub rotation: UnitQuaternion<f64>,
    pub frame: ReferenceFrame,
}

/// Control outputs written back to the vehicle each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightControls {
    pub throttle: f64,
}

/// Trait for the low-level attitude hold.
///
/// Implement this to plug guidance into whatever turns a desired orientation
/// into control-surface, RCS or gimbal outputs.
pub trait AttitudeActuator {
    /// Hold this orientation until told otherwise.
    fn attitude_to(&mut self, command: AttitudeCommand);

    fn set_enabled(&mut self, enabled: bool);

    /// Most recent actuation per axis, normalised to [-1, 1].
    fn last_act(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Executes the circularisation burn once guidance hands off at the edge of
/// the atmosphere.
pub trait Circularizer {
    fn circularize_at_apoapsis(&mut self);
}

/// Automatic staging, ticked while guidance is flying if enabled.
pub trait StageManager {
    fn update(&mut self, snap: &VehicleSnapshot);
}

/// Actuator that just remembers what it was asked for.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    pub enabled: bool,
    pub last_command: Option<AttitudeCommand>,
    pub act: Vector3<f64>,
}

impl AttitudeActuator for RecordingActuator {
    fn attitude_to(&mut self, command: AttitudeCommand) {
        self.last_command = Some(command);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn last_act(&self) -> Vector3<f64> {
        self.act
    }

    fn name(&self) -> &str {
        "RecordingActuator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_actuator_keeps_last_command() {
        let mut a = RecordingActuator::default();
        assert!(a.last_command.is_none());
        let cmd = AttitudeCommand { rotation: UnitQuaternion::identity(), frame: ReferenceFrame::Orbit };
        a.attitude_to(cmd);
        a.set_enabled(true);
        assert_eq!(a.last_command, Some(cmd));
        assert!(a.enabled);
        assert_eq!(a.name(), "RecordingActuator");
    }
}
