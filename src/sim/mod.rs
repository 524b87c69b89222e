pub mod event;
pub mod integrator;
pub mod runner;
pub mod state;
pub mod vehicle;

pub use event::{EventKind, FlightEvent};
pub use integrator::rk4_step;
pub use runner::{command_direction, simulate, simulate_ascent, FlightResult, FrameBasis, TickRecord};
pub use state::{SimConfig, SimState, ThrustCommand};
pub use vehicle::{presets, Rocket, RocketBuilder, SimStage, StageBuilder};
