pub mod snapshot;
pub mod stage;

pub use snapshot::{prograde_pitch, SnapshotBuilder, VehicleSnapshot};
pub use stage::{max_start_thrust, twr_weighted_average, StageStats, StageStatsProvider, StaticStageStats};
