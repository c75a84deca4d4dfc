// trilat_core/src/estimation/filters/kalman.rs

use crate::estimation::{FilterError, FilterState, StateFilter};
use nalgebra::{DMatrix, DVector};

/// Constant-velocity Kalman filter over the state `[px, py, vx, vy]`.
///
/// The transition `F(dt)` is exact for this model, so no numerical
/// integrator is involved. Nonlinearity enters only through the measurement
/// side, which the caller supplies pre-linearized (`z_pred` and the
/// Jacobian `H`).
#[derive(Clone, Debug)]
pub struct LinearKalmanFilter {
    state: FilterState,
}

impl LinearKalmanFilter {
    pub fn new(state: FilterState) -> Self {
        // Ensure P has the correct dimensions.
        assert_eq!(state.vector.len(), state.covariance.nrows());
        assert_eq!(state.vector.len(), state.covariance.ncols());
        Self { state }
    }

    /// State transition for a constant-velocity model: position rows pick
    /// up velocity scaled by `dt`.
    fn transition(&self, dt: f64) -> DMatrix<f64> {
        let dim = self.state.dim();
        let mut f = DMatrix::identity(dim, dim);
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;
        f
    }
}

impl StateFilter for LinearKalmanFilter {
    fn predict(&mut self, dt: f64, process_noise_q: &DMatrix<f64>) {
        if dt <= 0.0 {
            return;
        }

        // x_k+1 = F * x_k, P_k+1 = F * P_k * Fᵀ + Q
        let f = self.transition(dt);
        self.state.vector = &f * &self.state.vector;
        self.state.covariance = &f * &self.state.covariance * f.transpose() + process_noise_q;
    }

    fn update(
        &mut self,
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        h_jacobian: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<(), FilterError> {
        if z.len() != h_jacobian.nrows() {
            return Err(FilterError::DimensionMismatch {
                expected: h_jacobian.nrows(),
                got: z.len(),
            });
        }

        // Innovation and its covariance: y = z - h(x), S = H * P * Hᵀ + R
        let y = z - z_pred;
        let s = h_jacobian * &self.state.covariance * h_jacobian.transpose() + r;

        // A singular S means the measurement is redundant or problematic;
        // report it so the caller can skip the cycle.
        let s_inv = s.try_inverse().ok_or(FilterError::SingularInnovation)?;
        let k_gain = &self.state.covariance * h_jacobian.transpose() * s_inv;

        self.state.vector += &k_gain * y;

        // Joseph form keeps the covariance symmetric positive semi-definite
        // even with a near-saturated gain.
        let i = DMatrix::<f64>::identity(self.state.dim(), self.state.dim());
        let i_kh = i - &k_gain * h_jacobian;
        self.state.covariance = &i_kh * &self.state.covariance * i_kh.transpose()
            + &k_gain * r * k_gain.transpose();
        Ok(())
    }

    fn state(&self) -> &FilterState {
        &self.state
    }
}
