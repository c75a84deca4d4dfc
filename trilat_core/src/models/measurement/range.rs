// trilat_core/src/models/measurement/range.rs

use crate::messages::{TrilatMeasurement, TrilatParams};
use crate::types::{State, MIN_PREDICTED_RANGE, MIN_RANGE_VARIANCE};
use nalgebra::{DMatrix, DVector};

/// Nonlinear range observation model, `z_i = h_i(x) + v_i`, where
/// `h_i(x) = ||x_pos - s_i||` for sensor position `s_i`.
///
/// The Jacobian depends on the current state estimate and has to be
/// recomputed at every filter update; that is what makes the surrounding
/// filter *extended* rather than linear.
#[derive(Clone, Debug)]
pub struct RangeSensorModel {
    // The R matrix for the sensor set.
    noise_covariance: DMatrix<f64>,
}

impl RangeSensorModel {
    /// Builds a diagonal R from the configured range variance. Each entry is
    /// floored at `MIN_RANGE_VARIANCE` so a zero-variance configuration
    /// cannot make the innovation covariance singular.
    pub fn from_params(params: &TrilatParams, sensor_count: usize) -> Self {
        let var = params.range_variance.max(MIN_RANGE_VARIANCE);
        Self {
            noise_covariance: DMatrix::identity(sensor_count, sensor_count) * var,
        }
    }

    /// Returns the measurement noise covariance matrix `R`.
    pub fn r(&self) -> &DMatrix<f64> {
        &self.noise_covariance
    }

    /// Predicts the ideal measurement `z_pred = h(x)`: the distance from the
    /// state's position to each sensor.
    pub fn predict_measurement(
        &self,
        sensor_positions: &DMatrix<f64>,
        x: &State,
    ) -> DVector<f64> {
        DVector::from_fn(sensor_positions.nrows(), |i, _| {
            let dx = x[0] - sensor_positions[(i, 0)];
            let dy = x[1] - sensor_positions[(i, 1)];
            (dx * dx + dy * dy).sqrt()
        })
    }

    /// Calculates the measurement Jacobian `H = ∂h/∂x` at the estimate `x`.
    ///
    /// Row `i` is the unit vector from sensor `i` toward the estimated
    /// position. The velocity columns stay zero since range depends only on
    /// position. The denominator is clamped to `MIN_PREDICTED_RANGE` when
    /// the estimate coincides with a sensor.
    pub fn calculate_jacobian(
        &self,
        sensor_positions: &DMatrix<f64>,
        x: &State,
    ) -> DMatrix<f64> {
        let mut h_jac = DMatrix::zeros(sensor_positions.nrows(), x.len());
        for i in 0..sensor_positions.nrows() {
            let dx = x[0] - sensor_positions[(i, 0)];
            let dy = x[1] - sensor_positions[(i, 1)];
            let range = (dx * dx + dy * dy).sqrt().max(MIN_PREDICTED_RANGE);
            h_jac[(i, 0)] = dx / range;
            h_jac[(i, 1)] = dy / range;
        }
        h_jac
    }

    /// Convenience overload: extracts the geometry from a measurement and
    /// delegates to [`Self::calculate_jacobian`].
    pub fn jacobian_for(&self, m: &TrilatMeasurement, x: &State) -> DMatrix<f64> {
        self.calculate_jacobian(&m.sensor_positions, x)
    }
}
