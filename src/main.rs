use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use gravity_turn::gnc::{AscentGuidance, AscentSettingsEstimator, ManualTimeWarp, RecordingActuator};
use gravity_turn::history::JsonLaunchHistory;
use gravity_turn::io::{write_summary_file, write_telemetry_file, FlightSummary};
use gravity_turn::params::ParameterStore;
use gravity_turn::physics::{self, CelestialBody};
use gravity_turn::session::LaunchContext;
use gravity_turn::sim::{self, Rocket, SimConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fly a reference vehicle to orbit under gravity-turn ascent guidance")]
struct Cli {
    /// Vehicle to fly
    #[arg(long, value_enum, default_value_t = VehicleArg::Kestrel)]
    vehicle: VehicleArg,

    /// Body to launch from
    #[arg(long, value_enum, default_value_t = BodyArg::Kerbin)]
    body: BodyArg,

    /// Vessel id used to name parameter and history files
    #[arg(long)]
    vessel: Option<String>,

    /// Directory holding parameter and launch history files
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Physics step, s
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Give up after this much simulated time, s
    #[arg(long, default_value_t = 900.0)]
    max_time: f64,

    /// Launch site latitude, deg
    #[arg(long, default_value_t = 0.0)]
    latitude: f64,

    /// Run the settings estimator even when saved parameters exist
    #[arg(long)]
    estimate: bool,

    /// Take the best recorded launch instead of a guessed next attempt
    #[arg(long)]
    use_best: bool,

    /// Forget launch history and start over from default settings
    #[arg(long)]
    reset: bool,

    /// Also store the final parameters as this body's defaults
    #[arg(long)]
    save_defaults: bool,

    /// Write per-tick telemetry CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a JSON flight summary
    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VehicleArg {
    Kestrel,
    KestrelSrb,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BodyArg {
    Kerbin,
    Mun,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rocket: Rocket = match cli.vehicle {
        VehicleArg::Kestrel => sim::presets::kestrel(),
        VehicleArg::KestrelSrb => sim::presets::kestrel_srb(),
    };
    let body: CelestialBody = match cli.body {
        BodyArg::Kerbin => physics::presets::kerbin(),
        BodyArg::Mun => physics::presets::mun(),
    };
    let vessel = cli.vessel.clone().unwrap_or_else(|| rocket.name.to_lowercase().replace(' ', "-"));

    let stats = rocket.stage_stats_for(&body);
    let mut ctx = LaunchContext::new(body.clone(), Box::new(RecordingActuator::default()), Box::new(ManualTimeWarp::default()))
        .with_stage_stats(Box::new(stats));
    if let Some(dir) = &cli.config_dir {
        let history_path = dir.join(format!("gt_history_{vessel}_{}.json", body.name));
        let history = JsonLaunchHistory::open(&history_path)
            .with_context(|| format!("reading launch history {}", history_path.display()))?;
        ctx = ctx.with_files(ParameterStore::new(dir), vessel.clone()).with_history(Box::new(history));
    }

    let needs_estimate = ctx.load_params();
    if needs_estimate || cli.estimate || cli.reset || cli.use_best {
        AscentSettingsEstimator::new().use_best(cli.use_best).reset(cli.reset).estimate(&mut ctx);
    }
    ctx.params.validate().context("launch parameters")?;

    let config = SimConfig { dt: cli.dt, max_time: cli.max_time, latitude: cli.latitude };
    config.validate().context("simulation settings")?;
    info!(vehicle = %rocket.name, body = %body.name, dt = config.dt, "starting ascent");
    let mut guidance = AscentGuidance::new();
    let result = sim::simulate_ascent(&rocket, &config, &mut ctx, &mut guidance);

    if cli.save_defaults {
        ctx.save_defaults();
    }

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    let p = &ctx.params;
    let l = &result.losses;
    let o = &result.final_orbit;
    println!();
    println!("====================================================================");
    println!("  GRAVITY TURN ASCENT: {} from {}", rocket.name, body.name);
    println!("====================================================================");
    println!();
    println!("  Settings");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Turn angle:    {:>8.2} deg   Start speed:  {:>8.1} m/s",
        p.turn_angle.value, p.start_speed.value
    );
    println!(
        "  AP time:       {:>5.0} -> {:<5.0}s  Sensitivity:  {:>8.2}",
        p.ap_time_start.value, p.ap_time_finish.value, p.sensitivity.value
    );
    println!(
        "  Destination:   {:>8.1} km    Total dv:     {:>8.0} m/s",
        p.destination_height.value,
        rocket.total_delta_v()
    );
    println!();

    println!("  Flight Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for e in &result.events {
        println!("  t={:>7.1}s   alt={:>9.0}m   {:?}", e.time, e.altitude, e.kind);
    }
    println!();

    println!("  Result: {:?}", result.outcome);
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Apoapsis:      {:>8.1} km    Periapsis:    {:>8.1} km",
        o.apoapsis_altitude / 1000.0,
        o.periapsis_altitude / 1000.0
    );
    println!(
        "  Inclination:   {:>8.2} deg   Circularize:  {:>8.1} m/s",
        o.inclination_deg, result.delta_v_to_circularize
    );
    println!(
        "  Drag loss:     {:>8.1} m/s   Gravity loss: {:>8.1} m/s",
        l.drag_loss, l.gravity_drag_loss_at_apoapsis
    );
    println!(
        "  Steering loss: {:>8.1} m/s   Total loss:   {:>8.1} m/s",
        l.vector_loss, l.total_loss
    );
    println!("  Total burn:    {:>8.1} m/s   Max q:        {:>8.0} Pa", l.total_burn, result.max_dynamic_pressure());
    println!();

    // -----------------------------------------------------------------------
    // Trajectory table (sampled)
    // -----------------------------------------------------------------------
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>8}  {:>6}  {:>7}  {:>9}  {:>6}  {}",
        "t (s)", "alt (m)", "v (m/s)", "thr", "pitch", "ApA (m)", "ttAp", "phase"
    );
    println!("  {}", "─".repeat(66));
    let sample_interval = (result.records.len() / 30).max(1);
    for (i, r) in result.records.iter().enumerate() {
        if i % sample_interval != 0 && i != result.records.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.1}  {:>9.0}  {:>8.1}  {:>6.2}  {:>7.1}  {:>9.0}  {:>6.1}  {}",
            r.time, r.altitude, r.speed, r.throttle, r.pitch, r.apoapsis, r.time_to_apoapsis, r.phase
        );
    }
    println!();
    println!("  Simulation: {} ticks, dt={} s", result.records.len(), config.dt);
    println!("====================================================================");
    println!();

    if let Some(path) = &cli.csv {
        write_telemetry_file(path, &result.records).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "telemetry written");
    }
    if let Some(path) = &cli.json {
        let summary = FlightSummary::new(&rocket, &body, &ctx.params, &result);
        write_summary_file(path, &summary).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }

    Ok(())
}
