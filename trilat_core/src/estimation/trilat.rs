// trilat_core/src/estimation/trilat.rs

use crate::estimation::filters::kalman::LinearKalmanFilter;
use crate::estimation::{FilterState, StateFilter};
use crate::messages::{TrilatMeasurement, TrilatParams};
use crate::models::measurement::range::RangeSensorModel;
use crate::types::{timestamp_delta_secs, State, Timestamp, SENSOR_COUNT, STATE_SIZE};
use nalgebra::DMatrix;

/// Covariance scale of a freshly constructed estimator.
const INITIAL_COVARIANCE: f64 = 1.0;

/// Extended Kalman filter for 2-D range-only trilateration.
///
/// Drives the owned filter through a sequence of resolved measurements,
/// rebuilding the time-varying process noise and relinearizing the range
/// observation model at every step. The estimator is the filter's sole
/// owner; the filter's state and covariance are only ever mutated through
/// [`Self::process_measurements`].
#[derive(Clone, Debug)]
pub struct TrilatEkf {
    filter: Box<dyn StateFilter>,
    model: RangeSensorModel,
    /// The measurement Jacobian from the most recent update cycle.
    h_jacobian: DMatrix<f64>,
    params: TrilatParams,
    timestamp_prev: Timestamp,
    state_size: usize,
}

impl TrilatEkf {
    /// Creates an estimator around a fresh constant-velocity filter seeded
    /// with `x_init` and a scaled-identity covariance. `sensor_positions`
    /// fixes the sensor count the measurement noise is sized for;
    /// `timestamp` is the instant `x_init` is valid for.
    pub fn new(
        x_init: State,
        sensor_positions: &DMatrix<f64>,
        params: TrilatParams,
        timestamp: Timestamp,
    ) -> Self {
        assert_eq!(x_init.len(), STATE_SIZE, "state must be [px, py, vx, vy]");
        assert_eq!(sensor_positions.nrows(), SENSOR_COUNT);
        assert_eq!(sensor_positions.ncols(), 2);

        let state_size = x_init.len();
        let sensor_count = sensor_positions.nrows();
        let mut state = FilterState::new(state_size, INITIAL_COVARIANCE);
        state.vector = x_init;

        Self {
            filter: Box::new(LinearKalmanFilter::new(state)),
            model: RangeSensorModel::from_params(&params, sensor_count),
            h_jacobian: DMatrix::zeros(sensor_count, state_size),
            params,
            timestamp_prev: timestamp,
            state_size,
        }
    }

    /// Runs one predict/update cycle per measurement, in arrival order.
    ///
    /// Out-of-order timestamps and malformed measurements are caller
    /// contract violations and fail fast. A singular innovation covariance
    /// skips that measurement's update; the filter continues from its
    /// prediction. An empty batch leaves the estimator untouched.
    pub fn process_measurements(&mut self, measurements: &[TrilatMeasurement]) {
        for m in measurements {
            assert!(m.is_consistent(), "sensor rows and distances misaligned");
            assert!(
                m.timestamp >= self.timestamp_prev,
                "measurements must arrive in timestamp order"
            );

            let dt = timestamp_delta_secs(self.timestamp_prev, m.timestamp);
            let q = self.process_noise(dt);
            self.filter.predict(dt, &q);

            // Relinearize at the predicted state.
            let x_pred = &self.filter.state().vector;
            let z_pred = self.model.predict_measurement(&m.sensor_positions, x_pred);
            self.h_jacobian = self.model.jacobian_for(m, x_pred);

            // A singular S means this measurement cannot refine the state;
            // keep the prediction and move on.
            let _ = self
                .filter
                .update(&m.distances, &z_pred, &self.h_jacobian, self.model.r());

            self.timestamp_prev = m.timestamp;
        }
    }

    /// Residual magnitude of a candidate combination against the ranges the
    /// current state predicts. Lower is a better fit.
    pub fn score_combination(&self, m: &TrilatMeasurement) -> f64 {
        let z_pred = self
            .model
            .predict_measurement(&m.sensor_positions, &self.filter.state().vector);
        (&m.distances - z_pred).norm()
    }

    /// Picks the candidate combination whose distances best match the
    /// current state estimate, resolving the per-sensor candidate ambiguity
    /// enumerated by [`crate::association::get_combinations`]. Returns the
    /// index of the winner, or `None` for an empty slate.
    pub fn select_best(&self, candidates: &[TrilatMeasurement]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                self.score_combination(a).total_cmp(&self.score_combination(b))
            })
            .map(|(idx, _)| idx)
    }

    /// Discretized constant-velocity process noise. Uncertainty grows with
    /// the time elapsed since the previous measurement.
    fn process_noise(&self, dt: f64) -> DMatrix<f64> {
        let qx = self.params.process_variance_x;
        let qy = self.params.process_variance_y;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut q = DMatrix::zeros(self.state_size, self.state_size);
        q[(0, 0)] = dt4 / 4.0 * qx;
        q[(0, 2)] = dt3 / 2.0 * qx;
        q[(1, 1)] = dt4 / 4.0 * qy;
        q[(1, 3)] = dt3 / 2.0 * qy;
        q[(2, 0)] = dt3 / 2.0 * qx;
        q[(2, 2)] = dt2 * qx;
        q[(3, 1)] = dt3 / 2.0 * qy;
        q[(3, 3)] = dt2 * qy;
        q
    }

    /// Current best estimate, as maintained by the owned filter.
    pub fn state(&self) -> &FilterState {
        self.filter.state()
    }

    /// The Jacobian computed during the most recent update cycle.
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.h_jacobian
    }

    pub fn params(&self) -> &TrilatParams {
        &self.params
    }

    /// Timestamp of the last processed measurement.
    pub fn previous_timestamp(&self) -> Timestamp {
        self.timestamp_prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    fn geometry() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 10.0, 0.0, 5.0, 10.0])
    }

    fn exact_measurement(timestamp: Timestamp, px: f64, py: f64) -> TrilatMeasurement {
        let g = geometry();
        let distances = DVector::from_fn(3, |i, _| {
            ((px - g[(i, 0)]).powi(2) + (py - g[(i, 1)]).powi(2)).sqrt()
        });
        TrilatMeasurement {
            timestamp,
            sensor_positions: g,
            distances,
        }
    }

    fn estimator(x: &[f64]) -> TrilatEkf {
        TrilatEkf::new(
            DVector::from_row_slice(x),
            &geometry(),
            TrilatParams::default(),
            0,
        )
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut ekf = estimator(&[4.0, 2.0, 0.0, 0.0]);
        let before = ekf.state().clone();

        ekf.process_measurements(&[]);

        assert_eq!(ekf.previous_timestamp(), 0);
        assert_eq!(ekf.state().vector, before.vector);
        assert_eq!(ekf.state().covariance, before.covariance);
    }

    #[test]
    fn converges_on_a_static_target_from_exact_ranges() {
        let mut ekf = estimator(&[4.0, 2.0, 0.0, 0.0]);

        // Noiseless distances at 1 s steps pull the estimate onto the true
        // position, since the innovation vanishes exactly there.
        for step in 1..=200i64 {
            ekf.process_measurements(&[exact_measurement(step * 1_000, 5.0, 3.0)]);
        }

        let x = &ekf.state().vector;
        assert_abs_diff_eq!(x[0], 5.0, epsilon = 1e-3);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn coinciding_with_a_sensor_keeps_the_filter_finite() {
        // Estimate and truth both sit exactly on sensor 0: the Jacobian
        // clamp engages and the update must stay well-behaved.
        let mut ekf = estimator(&[0.0, 0.0, 0.0, 0.0]);
        ekf.process_measurements(&[exact_measurement(1_000, 0.0, 0.0)]);

        let st = ekf.state();
        assert!(st.vector.iter().all(|v| v.is_finite()));
        assert!(st.covariance.iter().all(|v| v.is_finite()));
        assert!(ekf.jacobian().iter().all(|v| v.is_finite()));

        // Covariance stays symmetric with a non-negative diagonal.
        for i in 0..st.dim() {
            assert!(st.covariance[(i, i)] >= 0.0);
            for j in 0..st.dim() {
                assert_abs_diff_eq!(
                    st.covariance[(i, j)],
                    st.covariance[(j, i)],
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn zero_range_variance_snaps_toward_the_fix() {
        let params = TrilatParams {
            range_variance: 0.0,
            ..Default::default()
        };
        let mut ekf = TrilatEkf::new(
            DVector::from_row_slice(&[4.0, 2.0, 0.0, 0.0]),
            &geometry(),
            params,
            0,
        );

        let err_before = ((4.0f64 - 5.0).powi(2) + (2.0f64 - 3.0).powi(2)).sqrt();
        ekf.process_measurements(&[exact_measurement(1_000, 5.0, 3.0)]);

        let x = &ekf.state().vector;
        assert!(x.iter().all(|v| v.is_finite()));
        let err_after = ((x[0] - 5.0).powi(2) + (x[1] - 3.0).powi(2)).sqrt();
        assert!(
            err_after < err_before * 0.5,
            "fully trusted measurement should pull the estimate in: {err_after} vs {err_before}"
        );
    }

    #[test]
    fn select_best_prefers_the_consistent_combination() {
        let ekf = estimator(&[5.0, 3.0, 0.0, 0.0]);

        let good = exact_measurement(1_000, 5.0, 3.0);
        let mut bad = exact_measurement(1_000, 5.0, 3.0);
        bad.distances[1] += 4.0;

        assert!(ekf.score_combination(&good) < ekf.score_combination(&bad));
        assert_eq!(ekf.select_best(&[bad, good]), Some(1));
        assert_eq!(ekf.select_best(&[]), None);
    }

    #[test]
    #[should_panic]
    fn out_of_order_timestamps_are_rejected() {
        let mut ekf = estimator(&[4.0, 2.0, 0.0, 0.0]);
        ekf.process_measurements(&[
            exact_measurement(2_000, 5.0, 3.0),
            exact_measurement(1_000, 5.0, 3.0),
        ]);
    }
}
