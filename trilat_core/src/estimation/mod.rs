// trilat_core/src/estimation/mod.rs

use crate::types::State;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;
use thiserror::Error;

/// The state estimate bundle shared by filters: mean and covariance.
#[derive(Clone, Debug)]
pub struct FilterState {
    /// The actual numerical data vector `x`.
    pub vector: State,
    /// The covariance matrix `P`.
    pub covariance: DMatrix<f64>,
}

impl FilterState {
    /// Zero mean with a scaled-identity covariance.
    pub fn new(dim: usize, initial_covariance_val: f64) -> Self {
        Self {
            vector: State::zeros(dim),
            covariance: DMatrix::identity(dim, dim) * initial_covariance_val,
        }
    }

    /// Returns the dimension (number of rows) of the state vector.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    /// `S = H P Hᵀ + R` could not be inverted. The caller skips the update
    /// cycle and continues from the prediction.
    #[error("innovation covariance is singular")]
    SingularInnovation,
    #[error("measurement dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// The minimal contract the trilateration estimator needs from a
/// Kalman-type filter: advance in time, fuse a linearized measurement, and
/// expose the current estimate.
pub trait StateFilter: DynClone + Debug + Send + Sync {
    /// Advances mean and covariance by `dt` seconds, adding
    /// `process_noise_q`. A non-positive `dt` is a no-op.
    fn predict(&mut self, dt: f64, process_noise_q: &DMatrix<f64>);

    /// Fuses a measurement `z` given its nonlinear prediction
    /// `z_pred = h(x)`, the Jacobian `h_jacobian = ∂h/∂x`, and the noise
    /// covariance `r`.
    fn update(
        &mut self,
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        h_jacobian: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<(), FilterError>;

    /// Returns the current best estimate of the state.
    fn state(&self) -> &FilterState;
}

// Generates `Clone` for `Box<dyn StateFilter>`, so estimators owning a
// boxed filter can be cloned to branch a track hypothesis.
dyn_clone::clone_trait_object!(StateFilter);

pub mod filters;
pub mod trilat;
