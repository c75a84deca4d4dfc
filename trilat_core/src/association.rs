// trilat_core/src/association.rs

//! Pairs raw per-sensor detections into resolved trilateration measurements.
//!
//! A single range reading is consistent with two mirrored positions, so each
//! sensor reports two candidate detections per instant. These combinators
//! enumerate every way of committing to one candidate per sensor; scoring
//! the candidates against the filter's prior is the estimator's concern.

use crate::messages::{RawMeasurement, TrilatMeasurement};
use crate::types::{CANDIDATES_PER_SENSOR, SENSOR_COUNT};
use nalgebra::{DMatrix, DVector};

/// Combines exactly one detection per sensor into a `TrilatMeasurement`.
///
/// Positions and distances are assembled index-aligned in the order the
/// detections are passed. The representative timestamp is the first
/// sensor's; constituents are expected to be closely synchronized upstream,
/// and a divergence is the caller's concern, not an error here.
pub fn to_trilat_measurement(
    m0: &RawMeasurement,
    m1: &RawMeasurement,
    m2: &RawMeasurement,
) -> TrilatMeasurement {
    let mut sensor_positions = DMatrix::zeros(SENSOR_COUNT, 2);
    let mut distances = DVector::zeros(SENSOR_COUNT);
    for (row, m) in [m0, m1, m2].into_iter().enumerate() {
        sensor_positions[(row, 0)] = m.sensor_position.x;
        sensor_positions[(row, 1)] = m.sensor_position.y;
        distances[row] = m.distance;
    }
    TrilatMeasurement {
        timestamp: m0.timestamp,
        sensor_positions,
        distances,
    }
}

/// Enumerates the full cross-product of candidate choices: one
/// `TrilatMeasurement` per way of picking one of each sensor's two
/// candidates (2^3 = 8 for three sensors). No deduplication or scoring
/// happens here.
///
/// The caller guarantees `detections` holds exactly two candidates per
/// sensor, adjacent and sorted by sensor (sensor 0 at indices 0..2,
/// sensor 1 at 2..4, sensor 2 at 4..6). Violations are programming errors
/// and fail fast.
pub fn get_combinations(detections: &[RawMeasurement]) -> Vec<TrilatMeasurement> {
    assert_eq!(
        detections.len(),
        SENSOR_COUNT * CANDIDATES_PER_SENSOR,
        "get_combinations expects {} candidates for each of {} sensors",
        CANDIDATES_PER_SENSOR,
        SENSOR_COUNT
    );

    let mut combinations =
        Vec::with_capacity(CANDIDATES_PER_SENSOR.pow(SENSOR_COUNT as u32));
    for i in 0..CANDIDATES_PER_SENSOR {
        for j in 0..CANDIDATES_PER_SENSOR {
            for k in 0..CANDIDATES_PER_SENSOR {
                combinations.push(to_trilat_measurement(
                    &detections[i],
                    &detections[CANDIDATES_PER_SENSOR + j],
                    &detections[2 * CANDIDATES_PER_SENSOR + k],
                ));
            }
        }
    }
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use std::collections::HashSet;

    fn raw(sensor: usize, candidate: usize) -> RawMeasurement {
        RawMeasurement {
            timestamp: 1_000 + sensor as i64,
            sensor_position: Vector2::new(sensor as f64 * 10.0, 0.0),
            // Encode (sensor, candidate) in the distance so every
            // combination is distinguishable in the assertions below.
            distance: (sensor * 10 + candidate) as f64,
        }
    }

    fn candidate_set() -> Vec<RawMeasurement> {
        vec![
            raw(0, 0),
            raw(0, 1),
            raw(1, 0),
            raw(1, 1),
            raw(2, 0),
            raw(2, 1),
        ]
    }

    #[test]
    fn to_trilat_measurement_preserves_order_and_distances() {
        let m = to_trilat_measurement(&raw(0, 0), &raw(1, 1), &raw(2, 0));
        assert!(m.is_consistent());
        // Representative timestamp comes from the first detection.
        assert_eq!(m.timestamp, 1_000);
        assert_eq!(m.sensor_positions[(0, 0)], 0.0);
        assert_eq!(m.sensor_positions[(1, 0)], 10.0);
        assert_eq!(m.sensor_positions[(2, 0)], 20.0);
        assert_eq!(m.distances[0], 0.0);
        assert_eq!(m.distances[1], 11.0);
        assert_eq!(m.distances[2], 20.0);
    }

    #[test]
    fn combinations_cover_the_full_choice_space() {
        let combos = get_combinations(&candidate_set());
        assert_eq!(combos.len(), 8);

        // Decode each combination back into the per-sensor candidate choice
        // that produced it; all 2^3 assignments must appear exactly once.
        let mut seen = HashSet::new();
        for c in &combos {
            assert_eq!(c.sensor_count(), SENSOR_COUNT);
            assert!(c.is_consistent());
            let choice: Vec<u64> = (0..SENSOR_COUNT)
                .map(|s| (c.distances[s] as u64) % 10)
                .collect();
            assert!(seen.insert(choice), "duplicate combination emitted");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    #[should_panic]
    fn wrong_candidate_count_is_rejected() {
        let set = candidate_set();
        get_combinations(&set[..5]);
    }
}
