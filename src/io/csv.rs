use std::io::{self, Write};
use std::path::Path;

use crate::sim::TickRecord;

/// Write per-tick guidance telemetry in CSV format.
///
/// Columns: time, altitude, speed, vertical_speed, throttle, pitch,
///          prograde_pitch, pitch_adjustment, hold_ap_time, apoapsis,
///          periapsis, time_to_apoapsis, dynamic_pressure, mass, stage, phase
pub fn write_telemetry<W: Write>(writer: &mut W, records: &[TickRecord]) -> io::Result<()> {
    writeln!(
        writer,
        "time,altitude,speed,vertical_speed,throttle,pitch,\
         prograde_pitch,pitch_adjustment,hold_ap_time,apoapsis,\
         periapsis,time_to_apoapsis,dynamic_pressure,mass,stage,phase"
    )?;

    for r in records {
        writeln!(
            writer,
            "{:.3},{:.2},{:.3},{:.3},{:.4},{:.3},\
             {:.3},{:.3},{:.3},{:.2},\
             {:.2},{:.3},{:.2},{:.3},{},{:?}",
            r.time, r.altitude, r.speed, r.vertical_speed, r.throttle, r.pitch,
            r.prograde_pitch, r.pitch_adjustment, r.hold_ap_time, r.apoapsis,
            r.periapsis, r.time_to_apoapsis, r.dynamic_pressure, r.mass, r.stage, r.phase,
        )?;
    }

    Ok(())
}

/// Write telemetry to a CSV file at the given path.
pub fn write_telemetry_file(path: impl AsRef<Path>, records: &[TickRecord]) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_telemetry(&mut file, records)?;
    file.flush()
}
