use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use super::controller::{AttitudeCommand, ReferenceFrame};

// ---------------------------------------------------------------------------
// Rotation helpers
// ---------------------------------------------------------------------------
//
// Local frame: x = east (or orbit-normal side), y = up, z = north (or
// prograde). The vessel nose is `rotation * z`. Pitch -90 points straight
// up, 0 is level; heading turns from z toward x.

/// Rotation from (pitch, heading, roll) in degrees, applied roll first, then
/// pitch, then heading.
pub fn euler(pitch: f64, heading: f64, roll: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), heading.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), roll.to_radians())
}

/// Roll about the nose.
pub fn roll_rotation(roll: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), roll.to_radians())
}

/// Nose direction of a rotation in its local frame.
pub fn forward(rotation: &UnitQuaternion<f64>) -> Vector3<f64> {
    rotation * Vector3::z()
}

/// Pitch reached `elapsed` seconds into the initial pitch-over: ramps from
/// 2 deg toward `turn_angle` over 5 s.
pub fn initial_pitch_target(turn_angle: f64, elapsed: f64) -> f64 {
    (turn_angle * elapsed / 5.0 + 2.0).min(turn_angle)
}

// ---------------------------------------------------------------------------
// Command generator
// ---------------------------------------------------------------------------

/// What the state machine wants the nose to do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttitudeMode {
    /// Still on or next to the pad: straight up, no heading or roll.
    PadVertical,
    Launch { heading: f64 },
    InitialPitch { turn_angle: f64, elapsed: f64, heading: f64 },
    /// Follow prograde, nose raised by the pitch bias.
    ProgradeHold { prograde_pitch: f64, pitch_adjustment: f64, heading: f64 },
    /// Orbital-frame prograde with pitch bias and yaw correction.
    Orbital { pitch_adjustment: f64, yaw: f64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttitudeCommandGenerator {
    /// Roll (deg) applied to every command except on the pad.
    pub roll: f64,
}

impl AttitudeCommandGenerator {
    pub fn new(roll: f64) -> Self {
        Self { roll }
    }

    pub fn command(&self, mode: AttitudeMode) -> AttitudeCommand {
        let roll = roll_rotation(self.roll);
        let (rotation, frame) = match mode {
            AttitudeMode::PadVertical => (euler(-90.0, 0.0, 0.0), ReferenceFrame::SurfaceNorth),
            AttitudeMode::Launch { heading } => (euler(-90.0, heading, 0.0) * roll, ReferenceFrame::SurfaceNorth),
            AttitudeMode::InitialPitch { turn_angle, elapsed, heading } => {
                let pitch = -90.0 + initial_pitch_target(turn_angle, elapsed);
                (euler(pitch, heading, 0.0) * roll, ReferenceFrame::SurfaceNorth)
            }
            AttitudeMode::ProgradeHold { prograde_pitch, pitch_adjustment, heading } => (
                euler(prograde_pitch - pitch_adjustment, heading, 0.0) * roll,
                ReferenceFrame::SurfaceNorth,
            ),
            AttitudeMode::Orbital { pitch_adjustment, yaw } => {
                (euler(-pitch_adjustment, yaw, self.roll), ReferenceFrame::Orbit)
            }
        };
        AttitudeCommand { rotation, frame }
    }
}

/// Ease an orbital-frame command in: weight its x component 1:8 against the
/// actuator's last x actuation, then renormalise.
pub fn blend_orbit_entry(command: AttitudeCommand, last_act: &Vector3<f64>) -> AttitudeCommand {
    let q = command.rotation.into_inner();
    let i = (last_act.x * 8.0 + q.i) / 9.0;
    let blended = Quaternion::new(q.w, i, q.j, q.k);
    AttitudeCommand {
        rotation: UnitQuaternion::new_normalize(blended),
        frame: command.frame,
    }
}
