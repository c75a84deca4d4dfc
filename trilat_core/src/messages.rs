// trilat_core/src/messages.rs

use crate::types::Timestamp;
use nalgebra::{DMatrix, DVector, Vector2};
use serde::{Deserialize, Serialize};

/// One sensor's detection at one instant: the sensor's fixed position and
/// the scalar distance it reports to the tracked object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub timestamp: Timestamp,
    pub sensor_position: Vector2<f64>,
    pub distance: f64,
}

/// One fused observation, ready for a filter update: every sensor's position
/// and reported distance for the same instant, index-aligned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrilatMeasurement {
    pub timestamp: Timestamp,
    /// N x 2 matrix; row `i` is sensor `i`'s position.
    pub sensor_positions: DMatrix<f64>,
    /// Reported distance per sensor, aligned with the `sensor_positions` rows.
    pub distances: DVector<f64>,
}

impl TrilatMeasurement {
    pub fn sensor_count(&self) -> usize {
        self.sensor_positions.nrows()
    }

    /// Row/length invariant: one distance per 2-D sensor row.
    pub fn is_consistent(&self) -> bool {
        self.sensor_positions.nrows() == self.distances.len()
            && self.sensor_positions.ncols() == 2
    }
}

/// Noise magnitudes for the trilateration estimator. Set once at
/// construction, immutable afterward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrilatParams {
    /// Variance of each sensor's range measurement.
    pub range_variance: f64,
    /// Process noise intensity along x.
    pub process_variance_x: f64,
    /// Process noise intensity along y.
    pub process_variance_y: f64,
}

impl Default for TrilatParams {
    fn default() -> Self {
        Self {
            range_variance: 0.1,
            process_variance_x: 5.0,
            process_variance_y: 5.0,
        }
    }
}
