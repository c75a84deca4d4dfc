// trilat_sim/src/config.rs

use anyhow::Context;
use figment::providers::{Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::Path;
use trilat_core::prelude::TrilatParams;
use trilat_core::types::SENSOR_COUNT;

/// The root of the data parsed from a scenario TOML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use defaults if the [simulation] section is missing
    pub simulation: Simulation,
    pub sensors: Vec<SensorConfig>,
    pub target: TargetConfig,
    #[serde(default)]
    pub estimator: TrilatParams,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Seed for the pseudo-random number generator, for determinism.
    pub seed: u64,
    /// Number of measurement instants to simulate.
    pub steps: u64,
    /// Interval between measurement instants, in milliseconds.
    pub step_ms: i64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 200,
            step_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub position: [f64; 2],
    /// Standard deviation of the simulated range noise.
    #[serde(default = "default_range_sigma")]
    pub range_sigma: f64,
}

fn default_range_sigma() -> f64 {
    0.3
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub start: [f64; 2],
    pub velocity: [f64; 2],
}

pub fn load_scenario(path: &Path) -> anyhow::Result<ScenarioConfig> {
    let config: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .extract()
        .with_context(|| format!("failed to load scenario {}", path.display()))?;

    anyhow::ensure!(
        config.sensors.len() == SENSOR_COUNT,
        "scenario must define exactly {} sensors, found {}",
        SENSOR_COUNT,
        config.sensors.len()
    );
    for s in &config.sensors {
        anyhow::ensure!(
            s.range_sigma.is_finite() && s.range_sigma >= 0.0,
            "range_sigma must be finite and non-negative"
        );
    }
    anyhow::ensure!(config.simulation.step_ms > 0, "step_ms must be positive");

    Ok(config)
}
