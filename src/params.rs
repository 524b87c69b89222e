//! Tunable ascent parameters and their on-disk TOML form.
//!
//! One file per vessel (`gt_vessel_<id>_<body>.toml`) and one defaults file
//! per body (`gt_vessel_default_<body>.toml`) live in a single directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GuidanceError, Result};

/// A tunable value. `locked` values are never overwritten by the settings
/// estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditableValue {
    pub value: f64,
    pub locked: bool,
}

impl EditableValue {
    pub const fn new(value: f64, locked: bool) -> Self {
        Self { value, locked }
    }

    /// Assign unless locked. Returns whether the value was written.
    pub fn set_unlocked(&mut self, value: f64) -> bool {
        if !self.locked {
            self.value = value;
        }
        !self.locked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ControlParameters {
    pub enable_stage_manager: bool,
    pub enable_speedup: bool,
    pub enable_stats: bool,
    /// Surface speed (m/s) at which the initial pitch-over begins.
    pub start_speed: EditableValue,
    #[serde(rename = "APTimeStart")]
    pub ap_time_start: EditableValue,
    #[serde(rename = "APTimeFinish")]
    pub ap_time_finish: EditableValue,
    /// Pitch (deg from vertical) reached during the initial pitch-over.
    pub turn_angle: EditableValue,
    /// Throttle floor.
    pub sensitivity: EditableValue,
    pub roll: EditableValue,
    /// Target apoapsis, km.
    pub destination_height: EditableValue,
    /// Dynamic pressure (Pa) below which steering switches to the orbital frame.
    pub pressure_cutoff: EditableValue,
    pub inclination: EditableValue,
    // Staging subsystem settings, stored here but not used by guidance.
    pub fairing_pressure: EditableValue,
    pub autostage_post_delay: EditableValue,
    pub autostage_pre_delay: EditableValue,
    pub autostage_limit: EditableValue,
    /// Time-to-apoapsis the throttle controller holds, derived each tick from
    /// the AP time start/finish pair.
    #[serde(skip)]
    pub(crate) hold_ap_time: f64,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            start_speed: EditableValue::new(100.0, false),
            ap_time_start: EditableValue::new(50.0, true),
            ap_time_finish: EditableValue::new(50.0, true),
            turn_angle: EditableValue::new(10.0, false),
            sensitivity: EditableValue::new(0.3, true),
            roll: EditableValue::new(0.0, true),
            destination_height: EditableValue::new(80.0, true),
            pressure_cutoff: EditableValue::new(1200.0, false),
            inclination: EditableValue::new(0.0, true),
            enable_stage_manager: true,
            enable_speedup: false,
            enable_stats: false,
            fairing_pressure: EditableValue::new(1000.0, false),
            autostage_post_delay: EditableValue::new(0.3, false),
            autostage_pre_delay: EditableValue::new(0.7, false),
            autostage_limit: EditableValue::new(0.0, false),
            hold_ap_time: 50.0,
        }
    }
}

impl ControlParameters {
    pub fn hold_ap_time(&self) -> f64 {
        self.hold_ap_time
    }

    /// Target apoapsis in metres.
    pub fn destination_altitude(&self) -> f64 {
        self.destination_height.value * 1000.0
    }

    /// Fade the held time-to-apoapsis from `ap_time_start` on the pad to
    /// `ap_time_finish` at `stop_height`.
    pub fn derive_hold_ap_time(&mut self, altitude: f64, stop_height: f64) {
        let start = self.ap_time_start.value;
        let finish = self.ap_time_finish.value;
        let frac = if stop_height > 0.0 { altitude / stop_height } else { 1.0 };
        let hold = start + frac * (finish - start);
        self.hold_ap_time = hold.clamp(start.min(finish), start.max(finish));
    }

    pub fn validate(&self) -> Result<()> {
        let s = self.sensitivity.value;
        if !(s > 0.0 && s <= 1.0) {
            return Err(GuidanceError::InvalidParameter(format!(
                "sensitivity must be in (0, 1], got {s}"
            )));
        }
        if self.destination_height.value <= 0.0 {
            return Err(GuidanceError::InvalidParameter(
                "destination height must be positive".to_string(),
            ));
        }
        if !(0.0..=90.0).contains(&self.turn_angle.value) {
            return Err(GuidanceError::InvalidParameter(format!(
                "turn angle must be within [0, 90] deg, got {}",
                self.turn_angle.value
            )));
        }
        if self.start_speed.value < 0.0 {
            return Err(GuidanceError::InvalidParameter(
                "start speed must not be negative".to_string(),
            ));
        }
        if self.ap_time_start.value <= 0.0 || self.ap_time_finish.value <= 0.0 {
            return Err(GuidanceError::InvalidParameter(
                "AP time start/finish must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Outcome of looking up the parameter files for a vessel.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A vessel-specific file was found.
    Vessel(ControlParameters),
    /// Only the body defaults were found; settings should still be estimated.
    Defaults(ControlParameters),
    Missing,
}

impl Loaded {
    /// True when the settings estimator should run before launch.
    pub fn needs_estimate(&self) -> bool {
        !matches!(self, Loaded::Vessel(_))
    }
}

#[derive(Debug, Clone)]
pub struct ParameterStore {
    dir: PathBuf,
}

impl ParameterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn vessel_path(&self, vessel_id: &str, body: &str) -> PathBuf {
        self.dir.join(format!("gt_vessel_{vessel_id}_{body}.toml"))
    }

    pub fn defaults_path(&self, body: &str) -> PathBuf {
        self.dir.join(format!("gt_vessel_default_{body}.toml"))
    }

    pub fn load(&self, vessel_id: &str, body: &str) -> Result<Loaded> {
        let vessel = self.vessel_path(vessel_id, body);
        if vessel.exists() {
            debug!(path = %vessel.display(), "loading vessel parameters");
            return Ok(Loaded::Vessel(read_params(&vessel)?));
        }
        let defaults = self.defaults_path(body);
        if defaults.exists() {
            debug!(path = %defaults.display(), "loading body default parameters");
            return Ok(Loaded::Defaults(read_params(&defaults)?));
        }
        Ok(Loaded::Missing)
    }

    pub fn save(&self, params: &ControlParameters, vessel_id: &str, body: &str) -> Result<()> {
        write_params(&self.vessel_path(vessel_id, body), params)
    }

    pub fn save_defaults(&self, params: &ControlParameters, body: &str) -> Result<()> {
        let path = self.defaults_path(body);
        write_params(&path, params)?;
        info!("Defaults saved to {}", path.display());
        Ok(())
    }
}

fn read_params(path: &Path) -> Result<ControlParameters> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn write_params(path: &Path, params: &ControlParameters) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(params)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_time_fades_and_clamps() {
        let mut p = ControlParameters::default();
        p.ap_time_start.value = 40.0;
        p.ap_time_finish.value = 60.0;
        p.derive_hold_ap_time(35_000.0, 70_000.0);
        assert!((p.hold_ap_time() - 50.0).abs() < 1e-9);
        p.derive_hold_ap_time(140_000.0, 70_000.0);
        assert!((p.hold_ap_time() - 60.0).abs() < 1e-9);
        p.derive_hold_ap_time(-10.0, 70_000.0);
        assert!((p.hold_ap_time() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn locked_value_is_not_written() {
        let mut v = EditableValue::new(3.0, true);
        assert!(!v.set_unlocked(7.0));
        assert_eq!(v.value, 3.0);
        v.locked = false;
        assert!(v.set_unlocked(7.0));
        assert_eq!(v.value, 7.0);
    }

    #[test]
    fn validate_rejects_zero_sensitivity() {
        let mut p = ControlParameters::default();
        assert!(p.validate().is_ok());
        p.sensitivity.value = 0.0;
        assert!(matches!(p.validate(), Err(GuidanceError::InvalidParameter(_))));
    }

    #[test]
    fn vessel_file_wins_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::new(dir.path());
        assert_eq!(store.load("abc", "Kerbin").unwrap(), Loaded::Missing);

        let mut defaults = ControlParameters::default();
        defaults.turn_angle.value = 12.0;
        store.save_defaults(&defaults, "Kerbin").unwrap();
        let loaded = store.load("abc", "Kerbin").unwrap();
        assert!(loaded.needs_estimate());
        assert_eq!(loaded, Loaded::Defaults(defaults.clone()));

        let mut vessel = ControlParameters::default();
        vessel.turn_angle = EditableValue::new(17.5, true);
        vessel.enable_speedup = true;
        store.save(&vessel, "abc", "Kerbin").unwrap();
        match store.load("abc", "Kerbin").unwrap() {
            Loaded::Vessel(p) => {
                assert_eq!(p.turn_angle, EditableValue::new(17.5, true));
                assert!(p.enable_speedup);
            }
            other => panic!("expected vessel parameters, got {other:?}"),
        }
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt_vessel_x_Kerbin.toml");
        fs::write(&path, "EnableSpeedup = true\n[TurnAngle]\nvalue = 22.0\nlocked = true\n").unwrap();
        let p = read_params(&path).unwrap();
        assert_eq!(p.turn_angle.value, 22.0);
        assert!(p.enable_speedup);
        assert_eq!(p.start_speed, ControlParameters::default().start_speed);
    }

    #[test]
    fn ap_time_keys_keep_their_capitals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt_vessel_y_Kerbin.toml");
        write_params(&path, &ControlParameters::default()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[APTimeStart]") && text.contains("[APTimeFinish]"), "{text}");
        assert!(!text.contains("ApTime"));

        fs::write(&path, "[APTimeStart]\nvalue = 40.0\nlocked = false\n[APTimeFinish]\nvalue = 60.0\nlocked = true\n")
            .unwrap();
        let p = read_params(&path).unwrap();
        assert_eq!(p.ap_time_start, EditableValue::new(40.0, false));
        assert_eq!(p.ap_time_finish, EditableValue::new(60.0, true));
    }

    #[test]
    fn corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::new(dir.path());
        fs::write(store.vessel_path("v", "Kerbin"), "TurnAngle = [not toml").unwrap();
        assert!(matches!(store.load("v", "Kerbin"), Err(GuidanceError::ParameterDecode(_))));
    }
}
