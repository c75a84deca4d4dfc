// trilat_sim/src/scenario.rs

use crate::config::{SensorConfig, TargetConfig};
use nalgebra::{DMatrix, Vector2};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use trilat_core::prelude::{RawMeasurement, Timestamp};

/// Ground-truth constant-velocity target.
pub struct Target {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
}

impl Target {
    pub fn from_config(cfg: &TargetConfig) -> Self {
        Self {
            position: Vector2::new(cfg.start[0], cfg.start[1]),
            velocity: Vector2::new(cfg.velocity[0], cfg.velocity[1]),
        }
    }

    pub fn step(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }
}

/// The sensor-position matrix the estimator is constructed with.
pub fn sensor_matrix(sensors: &[SensorConfig]) -> DMatrix<f64> {
    DMatrix::from_fn(sensors.len(), 2, |i, j| sensors[i].position[j])
}

/// Produces one instant's detection set: per sensor, the noisy true range
/// plus a decoy return, in sorted-by-sensor order for `get_combinations`.
///
/// The candidate order within a sensor is shuffled so association cannot
/// rely on the true reading coming first.
pub fn ambiguous_detections(
    sensors: &[SensorConfig],
    target: &Vector2<f64>,
    timestamp: Timestamp,
    rng: &mut ChaCha8Rng,
) -> Vec<RawMeasurement> {
    let mut detections = Vec::with_capacity(sensors.len() * 2);
    for s in sensors {
        let sensor_position = Vector2::new(s.position[0], s.position[1]);
        // Sigma is validated at config load.
        let noise = Normal::new(0.0, s.range_sigma).expect("validated sigma");

        let true_range = (target - sensor_position).norm();
        let observed = (true_range + noise.sample(rng)).max(0.0);
        // Decoy: the ghost return of an ambiguous range sensor, well away
        // from the true range.
        let ghost = observed + rng.gen_range(2.0..6.0);

        let mut pair = [observed, ghost];
        if rng.gen_bool(0.5) {
            pair.swap(0, 1);
        }
        for distance in pair {
            detections.push(RawMeasurement {
                timestamp,
                sensor_position,
                distance,
            });
        }
    }
    detections
}
