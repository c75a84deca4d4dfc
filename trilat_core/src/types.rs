// trilat_core/src/types.rs

use nalgebra::DVector;

// --- Core Type Aliases ---
pub type State = DVector<f64>;

/// Monotonic measurement time, in milliseconds.
pub type Timestamp = i64;

// --- Core Constants ---

/// Number of fixed range sensors in a trilateration set.
pub const SENSOR_COUNT: usize = 3;

/// Candidate detections each sensor reports per instant. A single range
/// reading is consistent with two mirrored positions, hence two.
pub const CANDIDATES_PER_SENSOR: usize = 2;

/// Constant-velocity state layout: [px, py, vx, vy].
pub const STATE_SIZE: usize = 4;

/// Lower clamp on a predicted range wherever it appears in a denominator.
/// Keeps the measurement Jacobian finite when the estimate sits exactly on
/// a sensor.
pub const MIN_PREDICTED_RANGE: f64 = 1e-6;

/// Floor on each diagonal entry of the measurement noise covariance R.
/// Three range rows only span the two position axes, so with R exactly zero
/// the innovation covariance would be rank-deficient.
pub const MIN_RANGE_VARIANCE: f64 = 1e-9;

/// Elapsed seconds between two millisecond timestamps.
pub fn timestamp_delta_secs(from: Timestamp, to: Timestamp) -> f64 {
    (to - from) as f64 / 1000.0
}
