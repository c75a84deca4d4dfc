//! Batch trilateration demo: simulates a constant-velocity target observed
//! by three fixed range sensors with ambiguous two-candidate returns, then
//! tracks it with the range-only EKF and reports the position error.

mod config;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::DVector;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing::{debug, info};
use trilat_core::prelude::{get_combinations, Timestamp, TrilatEkf};

#[derive(Parser, Debug)]
#[command(name = "trilat_sim", about = "Range-only trilateration EKF demo")]
struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "trilat_sim/scenarios/drifting_target.toml")]
    scenario: PathBuf,

    /// Override the scenario's RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON metrics summary to this path.
    #[arg(long)]
    metrics: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_scenario(&cli.scenario)?;
    let seed = cli.seed.unwrap_or(cfg.simulation.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut target = scenario::Target::from_config(&cfg.target);
    let sensors = scenario::sensor_matrix(&cfg.sensors);

    // Start the filter on the target's initial position with zero velocity;
    // the velocity estimate is pulled in by the measurements.
    let x_init = DVector::from_row_slice(&[target.position.x, target.position.y, 0.0, 0.0]);
    let mut ekf = TrilatEkf::new(x_init, &sensors, cfg.estimator, 0);

    info!(seed, steps = cfg.simulation.steps, "starting scenario");

    let dt = cfg.simulation.step_ms as f64 / 1000.0;
    let mut timestamp: Timestamp = 0;
    let mut sq_err_sum = 0.0;

    for step in 1..=cfg.simulation.steps {
        timestamp += cfg.simulation.step_ms;
        target.step(dt);

        let detections =
            scenario::ambiguous_detections(&cfg.sensors, &target.position, timestamp, &mut rng);
        let candidates = get_combinations(&detections);
        let best = ekf
            .select_best(&candidates)
            .context("candidate set is empty")?;
        ekf.process_measurements(std::slice::from_ref(&candidates[best]));

        let x = &ekf.state().vector;
        let err = ((x[0] - target.position.x).powi(2) + (x[1] - target.position.y).powi(2)).sqrt();
        sq_err_sum += err * err;
        debug!(step, err, "processed instant");
    }

    let rmse = (sq_err_sum / cfg.simulation.steps as f64).sqrt();
    let x = &ekf.state().vector;
    info!(rmse, px = x[0], py = x[1], vx = x[2], vy = x[3], "scenario finished");

    if let Some(path) = cli.metrics {
        let summary = serde_json::json!({
            "scenario": cli.scenario.display().to_string(),
            "seed": seed,
            "steps": cfg.simulation.steps,
            "rmse": rmse,
            "final_state": x.as_slice(),
        });
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "metrics saved");
    }

    Ok(())
}
