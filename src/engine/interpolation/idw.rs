//! Plain inverse-distance weighting.

use crate::engine::sample::Neighbor;

/// Normalized 1/distance weights.
pub fn weights(neighbors: &[Neighbor]) -> Vec<f64> {
    let inverse: Vec<f64> = neighbors.iter().map(|n| 1.0 / n.distance as f64).collect();
    let total: f64 = inverse.iter().sum();
    inverse.into_iter().map(|w| w / total).collect()
}

/// Inverse-distance weighted mean of the neighbours' shifts.
pub fn average(neighbors: &[Neighbor]) -> (f64, f64) {
    if neighbors.is_empty() {
        return (0.0, 0.0);
    }
    weights(neighbors)
        .iter()
        .zip(neighbors)
        .fold((0.0, 0.0), |(x, y), (w, n)| {
            (x + w * n.shift.x as f64, y + w * n.shift.y as f64)
        })
}
