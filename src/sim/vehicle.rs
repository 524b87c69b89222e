use crate::physics::{CelestialBody, G0};
use crate::vehicle::{StageStats, StaticStageStats};

// ---------------------------------------------------------------------------
// Stage definition (one stage of the simulated vehicle)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimStage {
    pub name: String,
    pub dry_mass: f64,
    pub propellant_mass: f64,
    pub thrust_vac: f64,  // N
    pub isp_vac: f64,     // s
    pub isp_asl: f64,     // s
    pub cd: f64,
    pub area: f64,        // m^2
    pub solid: bool,
}

impl SimStage {
    /// Propellant flow at full throttle; fixed, so thrust follows Isp.
    pub fn mass_flow(&self) -> f64 {
        if self.isp_vac > 0.0 {
            self.thrust_vac / (self.isp_vac * G0)
        } else {
            0.0
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    /// Isp with `pressure` the ambient density as a fraction of sea level.
    pub fn isp_at(&self, pressure: f64) -> f64 {
        let p = pressure.clamp(0.0, 1.0);
        self.isp_vac + (self.isp_asl - self.isp_vac) * p
    }

    pub fn thrust_at(&self, pressure: f64) -> f64 {
        self.mass_flow() * self.isp_at(pressure) * G0
    }

    fn stats(&self, payload: f64, pressure: f64) -> StageStats {
        let start_mass = self.total_mass() + payload;
        let end_mass = self.dry_mass + payload;
        let delta_v = if end_mass > 0.0 {
            self.isp_at(pressure) * G0 * (start_mass / end_mass).ln()
        } else {
            0.0
        };
        StageStats {
            start_thrust: self.thrust_at(pressure),
            start_mass,
            end_mass,
            delta_v,
            has_solid_engine: self.solid,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    stage: SimStage,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: SimStage {
                name: name.into(),
                dry_mass: 1_000.0,
                propellant_mass: 4_000.0,
                thrust_vac: 100_000.0,
                isp_vac: 320.0,
                isp_asl: 280.0,
                cd: 0.3,
                area: 1.5,
                solid: false,
            },
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.stage.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.stage.propellant_mass = v; self }
    pub fn thrust_vac(mut self, v: f64) -> Self { self.stage.thrust_vac = v; self }
    pub fn isp(mut self, asl: f64, vac: f64) -> Self {
        self.stage.isp_asl = asl;
        self.stage.isp_vac = vac;
        self
    }
    pub fn cd(mut self, v: f64) -> Self { self.stage.cd = v; self }
    pub fn area(mut self, v: f64) -> Self { self.stage.area = v; self }
    pub fn solid(mut self, v: bool) -> Self { self.stage.solid = v; self }

    pub fn build(self) -> SimStage {
        self.stage
    }
}

// ---------------------------------------------------------------------------
// Rocket: stages in firing order plus a payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Rocket {
    pub name: String,
    /// Index 0 fires first.
    pub stages: Vec<SimStage>,
    pub payload_mass: f64,
    pub height: f64, // m
}

impl Rocket {
    pub fn total_mass(&self) -> f64 {
        self.stages.iter().map(|s| s.total_mass()).sum::<f64>() + self.payload_mass
    }

    /// Mass carried above stage `idx`.
    pub fn mass_above(&self, idx: usize) -> f64 {
        self.stages.iter().skip(idx + 1).map(|s| s.total_mass()).sum::<f64>() + self.payload_mass
    }

    /// Propellant left in stage `idx` for a vehicle of total mass `mass`.
    pub fn propellant_left(&self, idx: usize, mass: f64) -> f64 {
        match self.stages.get(idx) {
            Some(stage) => (mass - stage.dry_mass - self.mass_above(idx)).max(0.0),
            None => 0.0,
        }
    }

    pub fn total_delta_v(&self) -> f64 {
        self.stage_stats(0.0).vac.iter().map(|s| s.delta_v).sum()
    }

    /// Stage statistics as a staging analysis would report them: highest
    /// index fires first. `surface_pressure` is the sea-level density ratio
    /// used for the atmospheric set (0 on airless bodies).
    pub fn stage_stats(&self, surface_pressure: f64) -> StaticStageStats {
        let fired_order = |pressure: f64| -> Vec<StageStats> {
            let mut v: Vec<_> = self
                .stages
                .iter()
                .enumerate()
                .map(|(i, s)| s.stats(self.mass_above(i), pressure))
                .collect();
            v.reverse();
            v
        };
        StaticStageStats { atmo: fired_order(surface_pressure), vac: fired_order(0.0) }
    }

    /// Stage statistics for launching from `body`.
    pub fn stage_stats_for(&self, body: &CelestialBody) -> StaticStageStats {
        self.stage_stats(if body.has_atmosphere() { 1.0 } else { 0.0 })
    }
}

pub struct RocketBuilder {
    rocket: Rocket,
}

impl RocketBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            rocket: Rocket { name: name.into(), stages: vec![], payload_mass: 0.0, height: 10.0 },
        }
    }

    pub fn stage(mut self, stage: SimStage) -> Self { self.rocket.stages.push(stage); self }
    pub fn payload_mass(mut self, v: f64) -> Self { self.rocket.payload_mass = v; self }
    pub fn height(mut self, v: f64) -> Self { self.rocket.height = v; self }

    pub fn build(self) -> Rocket {
        self.rocket
    }
}

// ---------------------------------------------------------------------------
// Preset vehicles
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Two-stage liquid orbital launcher sized for an 80 km Kerbin orbit.
    pub fn kestrel() -> Rocket {
        RocketBuilder::new("Kestrel")
            .stage(
                StageBuilder::new("Kestrel lower")
                    .dry_mass(2_000.0)
                    .propellant_mass(12_000.0)
                    .thrust_vac(320_000.0)
                    .isp(280.0, 300.0)
                    .cd(0.3)
                    .area(1.5)
                    .build(),
            )
            .stage(
                StageBuilder::new("Kestrel upper")
                    .dry_mass(800.0)
                    .propellant_mass(4_000.0)
                    .thrust_vac(60_000.0)
                    .isp(250.0, 340.0)
                    .cd(0.3)
                    .area(1.0)
                    .build(),
            )
            .payload_mass(500.0)
            .height(14.0)
            .build()
    }

    /// Kestrel with a solid first stage.
    pub fn kestrel_srb() -> Rocket {
        let mut r = kestrel();
        r.name = "Kestrel SRB".into();
        r.stages[0] = StageBuilder::new("Kestrel booster")
            .dry_mass(2_500.0)
            .propellant_mass(11_500.0)
            .thrust_vac(380_000.0)
            .isp(230.0, 250.0)
            .cd(0.3)
            .area(1.5)
            .solid(true)
            .build();
        r
    }
}
