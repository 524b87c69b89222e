use crate::gnc::AscentPhase;
use super::runner::TickRecord;

// ---------------------------------------------------------------------------
// Flight events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Liftoff,
    PhaseChange { from: AscentPhase, to: AscentPhase },
    MaxQ { pressure: f64 },
    Staging { from: usize, to: usize },
    Burnout { stage: usize },
    Altitude { altitude: f64, ascending: bool },
    Completed,
    Aborted { reason: String },
}

/// A discrete event that occurred during the flight.
#[derive(Debug, Clone)]
pub struct FlightEvent {
    pub time: f64,
    pub altitude: f64,
    pub kind: EventKind,
}

impl FlightEvent {
    pub fn at(record: &TickRecord, kind: EventKind) -> Self {
        Self { time: record.time, altitude: record.altitude, kind }
    }
}

/// Passive detector over consecutive tick records.
pub trait EventDetector {
    fn check(&mut self, prev: &TickRecord, current: &TickRecord) -> Option<EventKind>;
}

pub struct PhaseDetector;

impl EventDetector for PhaseDetector {
    fn check(&mut self, prev: &TickRecord, current: &TickRecord) -> Option<EventKind> {
        (prev.phase != current.phase).then_some(EventKind::PhaseChange { from: prev.phase, to: current.phase })
    }
}

/// Fires once, on the first tick after dynamic pressure starts falling.
#[derive(Default)]
pub struct MaxQDetector {
    fired: bool,
}

impl EventDetector for MaxQDetector {
    fn check(&mut self, prev: &TickRecord, current: &TickRecord) -> Option<EventKind> {
        if self.fired || prev.dynamic_pressure <= 0.0 || current.dynamic_pressure >= prev.dynamic_pressure {
            return None;
        }
        self.fired = true;
        Some(EventKind::MaxQ { pressure: prev.dynamic_pressure })
    }
}

/// Detects when altitude crosses a threshold (ascending or descending).
pub struct AltitudeDetector {
    pub altitude: f64,
    pub ascending: bool,
    fired: bool,
}

impl AltitudeDetector {
    pub fn new(altitude: f64, ascending: bool) -> Self {
        Self { altitude, ascending, fired: false }
    }
}

impl EventDetector for AltitudeDetector {
    fn check(&mut self, prev: &TickRecord, current: &TickRecord) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        let crossed = if self.ascending {
            prev.altitude < self.altitude && current.altitude >= self.altitude
        } else {
            prev.altitude > self.altitude && current.altitude <= self.altitude
        };
        if crossed {
            self.fired = true;
            Some(EventKind::Altitude { altitude: self.altitude, ascending: self.ascending })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(alt: f64, q: f64, phase: AscentPhase) -> TickRecord {
        TickRecord { altitude: alt, dynamic_pressure: q, phase, ..TickRecord::default() }
    }

    #[test]
    fn phase_change_reported_once_per_transition() {
        let mut det = PhaseDetector;
        let a = rec(0.0, 0.0, AscentPhase::InLaunch);
        let b = rec(0.0, 0.0, AscentPhase::InInitialPitch);
        assert_eq!(
            det.check(&a, &b),
            Some(EventKind::PhaseChange { from: AscentPhase::InLaunch, to: AscentPhase::InInitialPitch })
        );
        assert_eq!(det.check(&b, &b), None);
    }

    #[test]
    fn max_q_fires_on_first_decrease() {
        let mut det = MaxQDetector::default();
        let rising = rec(0.0, 10_000.0, AscentPhase::InTurn);
        let peak = rec(0.0, 12_000.0, AscentPhase::InTurn);
        let falling = rec(0.0, 11_000.0, AscentPhase::InTurn);
        assert!(det.check(&rising, &peak).is_none());
        assert_eq!(det.check(&peak, &falling), Some(EventKind::MaxQ { pressure: 12_000.0 }));
        assert!(det.check(&peak, &falling).is_none());
    }

    #[test]
    fn altitude_detector_ascending() {
        let mut det = AltitudeDetector::new(70_000.0, true);
        let prev = rec(69_900.0, 0.0, AscentPhase::InCoasting);
        let curr = rec(70_050.0, 0.0, AscentPhase::InCoasting);
        assert!(det.check(&prev, &curr).is_some());
        // Should not fire again
        assert!(det.check(&prev, &curr).is_none());
    }
}
