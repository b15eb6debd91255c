//! Turning the K nearest samples into one shift estimate.
//!
//! All variants are pure functions over a neighbour list sorted by distance.

pub mod idw;
pub mod shading;

use super::sample::{Neighbor, Shift};
use crate::config::{Algorithm, CalibrationMode};

/// Shift for a query whose nearest samples are `neighbors`.
/// An empty neighbour list yields no correction.
pub fn interpolate(mode: &CalibrationMode, neighbors: &[Neighbor]) -> Shift {
    if neighbors.is_empty() {
        return Shift::ZERO;
    }
    let (x, y) = match mode.algorithm {
        Algorithm::V0 => idw::average(neighbors),
        Algorithm::V1 => shading::shift_v1(mode, neighbors),
        Algorithm::V2 => shading::shift_v2(mode, neighbors),
        Algorithm::No => return Shift::ZERO,
    };
    Shift::from_f64(x, y)
}

#[cfg(test)]
pub(crate) fn neighbor(x: f32, y: f32, query: [f32; 2], shift: Shift) -> Neighbor {
    let offset = vec![query[0] - x, query[1] - y];
    let distance = (offset[0] * offset[0] + offset[1] * offset[1])
        .sqrt()
        .max(super::nn_cache::DISTANCE_EPSILON);
    Neighbor { shift, distance, offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_neighbors_give_zero() {
        for algorithm in [Algorithm::V0, Algorithm::V1, Algorithm::V2, Algorithm::No] {
            let mode = CalibrationMode::for_test(algorithm, 4);
            assert_eq!(interpolate(&mode, &[]), Shift::ZERO);
        }
    }

    #[test]
    fn test_single_neighbor_is_recovered_exactly() {
        let q = [320.0, 240.0];
        let n = [neighbor(320.0, 240.0, q, Shift::new(17, -9))];
        for algorithm in [Algorithm::V0, Algorithm::V1, Algorithm::V2] {
            let mode = CalibrationMode::for_test(algorithm, 1);
            assert_eq!(interpolate(&mode, &n), Shift::new(17, -9), "{:?}", algorithm);
        }
    }

    #[test]
    fn test_no_algorithm_never_corrects() {
        let q = [0.0, 0.0];
        let n = [neighbor(0.0, 0.0, q, Shift::new(5, 5))];
        let mode = CalibrationMode::for_test(Algorithm::No, 1);
        assert_eq!(interpolate(&mode, &n), Shift::ZERO);
    }
}
