//! Record of previous launch attempts, used to guess better settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Settings and results of one launch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub turn_angle: f64,
    pub start_speed: f64,
    pub destination_height: f64,
    pub drag_loss: f64,
    pub gravity_drag_loss: f64,
    pub vector_loss: f64,
    pub total_loss: f64,
    pub max_heat: f64,
    /// Whether the apoapsis target was reached before the attempt ended.
    pub reached_apoapsis: bool,
}

impl LaunchRecord {
    fn same_settings(&self, other: &LaunchRecord) -> bool {
        (self.turn_angle - other.turn_angle).abs() < 1e-6
            && (self.start_speed - other.start_speed).abs() < 1e-6
            && (self.destination_height - other.destination_height).abs() < 1e-6
    }
}

/// Historical launch database consumed by the settings estimator and fed by
/// the ascent state machine.
pub trait LaunchHistory {
    /// `(turn_angle, start_speed)` of the best successful launch.
    fn best_settings(&self) -> Option<(f64, f64)>;
    /// `(turn_angle, start_speed)` to try next.
    fn guess_settings(&self) -> Option<(f64, f64)>;
    /// Store an attempt. A record with the same settings replaces the old one.
    fn record_launch(&mut self, record: LaunchRecord);
    fn persist(&mut self) -> Result<()>;
    fn clear(&mut self);
    fn is_empty(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Shared record keeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchLog {
    pub records: Vec<LaunchRecord>,
}

impl LaunchLog {
    fn successes_by_loss(&self) -> Vec<&LaunchRecord> {
        let mut ok: Vec<&LaunchRecord> = self.records.iter().filter(|r| r.reached_apoapsis).collect();
        ok.sort_by(|a, b| a.total_loss.total_cmp(&b.total_loss));
        ok
    }

    pub fn best_settings(&self) -> Option<(f64, f64)> {
        self.successes_by_loss().first().map(|r| (r.turn_angle, r.start_speed))
    }

    pub fn guess_settings(&self) -> Option<(f64, f64)> {
        let ok = self.successes_by_loss();
        let (turn, speed) = match ok.as_slice() {
            [best, second, ..] => (
                best.turn_angle + (best.turn_angle - second.turn_angle) * 0.5,
                best.start_speed + (best.start_speed - second.start_speed) * 0.5,
            ),
            [best] => (best.turn_angle + 1.0, best.start_speed),
            [] => {
                let last = self.records.last()?;
                (last.turn_angle * 0.9, last.start_speed * 1.1)
            }
        };
        Some((turn.clamp(1.0, 80.0), speed.max(10.0)))
    }

    pub fn record(&mut self, record: LaunchRecord) {
        match self.records.iter_mut().find(|r| r.same_settings(&record)) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }
}

/// In-memory history with no backing file.
#[derive(Debug, Clone, Default)]
pub struct MemoryLaunchHistory {
    pub log: LaunchLog,
}

impl LaunchHistory for MemoryLaunchHistory {
    fn best_settings(&self) -> Option<(f64, f64)> {
        self.log.best_settings()
    }

    fn guess_settings(&self) -> Option<(f64, f64)> {
        self.log.guess_settings()
    }

    fn record_launch(&mut self, record: LaunchRecord) {
        self.log.record(record);
    }

    fn persist(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) {
        self.log.records.clear();
    }

    fn is_empty(&self) -> bool {
        self.log.records.is_empty()
    }
}

/// History stored as a JSON file, one per vessel.
#[derive(Debug, Clone)]
pub struct JsonLaunchHistory {
    path: PathBuf,
    log: LaunchLog,
}

impl JsonLaunchHistory {
    /// Open the history at `path`. A missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let log = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            LaunchLog::default()
        };
        debug!(path = %path.display(), records = log.records.len(), "launch history opened");
        Ok(Self { path, log })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.log.records
    }
}

impl LaunchHistory for JsonLaunchHistory {
    fn best_settings(&self) -> Option<(f64, f64)> {
        self.log.best_settings()
    }

    fn guess_settings(&self) -> Option<(f64, f64)> {
        self.log.guess_settings()
    }

    fn record_launch(&mut self, record: LaunchRecord) {
        self.log.record(record);
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.log)?)?;
        info!(path = %self.path.display(), records = self.log.records.len(), "launch history saved");
        Ok(())
    }

    fn clear(&mut self) {
        self.log.records.clear();
    }

    fn is_empty(&self) -> bool {
        self.log.records.is_empty()
    }
}
