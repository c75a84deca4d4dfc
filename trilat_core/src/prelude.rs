// trilat_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::{FilterError, FilterState, StateFilter};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::messages::{RawMeasurement, TrilatMeasurement, TrilatParams};
pub use crate::types::{State, Timestamp, SENSOR_COUNT, STATE_SIZE};

// --- Association Combinators ---
pub use crate::association::{get_combinations, to_trilat_measurement};

// --- Concrete Implementations ---
pub use crate::estimation::filters::kalman::LinearKalmanFilter;
pub use crate::estimation::trilat::TrilatEkf;
pub use crate::models::measurement::range::RangeSensorModel;
