use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::gnc::{AscentPhase, LossReport};
use crate::params::ControlParameters;
use crate::physics::CelestialBody;
use crate::sim::{FlightResult, Rocket};

#[derive(Debug, Clone, Serialize)]
pub struct OrbitFacts {
    pub apoapsis_m: f64,
    pub periapsis_m: f64,
    pub inclination_deg: f64,
    pub eccentricity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub time_s: f64,
    pub altitude_m: f64,
    pub event: String,
}

/// Summary of one simulated ascent.
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub vehicle: String,
    pub body: String,
    pub outcome: String,
    pub turn_angle_deg: f64,
    pub start_speed_ms: f64,
    pub destination_km: f64,
    pub flight_time_s: f64,
    pub max_altitude_m: f64,
    pub max_q_pa: f64,
    pub phases: Vec<AscentPhase>,
    pub losses: LossReport,
    pub final_orbit: OrbitFacts,
    pub delta_v_to_circularize_ms: f64,
    pub events: Vec<EventEntry>,
}

impl FlightSummary {
    pub fn new(rocket: &Rocket, body: &CelestialBody, params: &ControlParameters, result: &FlightResult) -> Self {
        let o = &result.final_orbit;
        FlightSummary {
            vehicle: rocket.name.clone(),
            body: body.name.clone(),
            outcome: format!("{:?}", result.outcome),
            turn_angle_deg: params.turn_angle.value,
            start_speed_ms: params.start_speed.value,
            destination_km: params.destination_height.value,
            flight_time_s: result.final_state.time,
            max_altitude_m: result.max_altitude(),
            max_q_pa: result.max_dynamic_pressure(),
            phases: result.phases(),
            losses: result.losses,
            final_orbit: OrbitFacts {
                apoapsis_m: o.apoapsis_altitude,
                periapsis_m: o.periapsis_altitude,
                inclination_deg: o.inclination_deg,
                eccentricity: o.eccentricity,
            },
            delta_v_to_circularize_ms: result.delta_v_to_circularize,
            events: result
                .events
                .iter()
                .map(|e| EventEntry { time_s: e.time, altitude_m: e.altitude, event: format!("{:?}", e.kind) })
                .collect(),
        }
    }
}

/// Write the flight summary as pretty JSON. Non-finite numbers become null.
pub fn write_summary<W: Write>(writer: &mut W, summary: &FlightSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)
}

/// Write flight summary JSON to a file.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &FlightSummary) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_summary(&mut file, summary)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::TickOutcome;
    use crate::orbital::OrbitSummary;
    use crate::physics::presets as bodies;
    use crate::sim::{presets, EventKind, FlightEvent, SimState, TickRecord};
    use nalgebra::Vector3;

    fn result() -> FlightResult {
        FlightResult {
            records: vec![
                TickRecord { altitude: 100.0, phase: AscentPhase::InLaunch, ..TickRecord::default() },
                TickRecord { time: 120.0, altitude: 71_000.0, dynamic_pressure: 2.0, phase: AscentPhase::InCircularisation, ..TickRecord::default() },
            ],
            events: vec![FlightEvent { time: 120.0, altitude: 71_000.0, kind: EventKind::Completed }],
            outcome: TickOutcome::Completed,
            losses: LossReport { total_loss: 950.0, ..LossReport::default() },
            final_state: SimState { time: 120.0, pos: Vector3::zeros(), vel: Vector3::zeros(), mass: 1.0, stage_idx: 1 },
            final_orbit: OrbitSummary {
                apoapsis_altitude: 81_000.0,
                periapsis_altitude: f64::NEG_INFINITY,
                time_to_apoapsis: 20.0,
                time_to_periapsis: f64::INFINITY,
                inclination_deg: 0.0,
                speed_at_apoapsis: 1_900.0,
                eccentricity: 0.3,
            },
            delta_v_to_circularize: 380.0,
        }
    }

    #[test]
    fn summary_round_trips_through_serde_json() {
        let s = FlightSummary::new(&presets::kestrel(), &bodies::kerbin(), &ControlParameters::default(), &result());
        let mut buf = Vec::new();
        write_summary(&mut buf, &s).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(v["vehicle"], "Kestrel");
        assert_eq!(v["outcome"], "Completed");
        assert_eq!(v["max_altitude_m"], 71_000.0);
        assert_eq!(v["losses"]["total_loss"], 950.0);
        assert!(v["final_orbit"]["periapsis_m"].is_null());
        assert_eq!(v["phases"][1], "InCircularisation");
        assert_eq!(v["events"][0]["event"], "Completed");
    }
}
