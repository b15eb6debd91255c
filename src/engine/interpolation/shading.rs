//! Angular shading for the V1 and V2 interpolators.
//!
//! Several samples lined up in the same direction from the query describe
//! the same region; counted naively they outvote a lone sample on the other
//! side. Walking the neighbours nearest first, each closer sample casts a
//! shadow on the farther ones: full inside the opaque sector, none in the
//! transparent sector, a linear ramp between, and weaker while the farther
//! sample is still within the shade thickness of the closer one.

use super::idw;
use crate::config::CalibrationMode;
use crate::engine::sample::Neighbor;
use std::f64::consts::PI;

/// Shaded weights at or below this are dropped.
pub const DROP_THRESHOLD: f64 = 0.01;

/// Vectors shorter than this have no usable direction.
const MIN_DIRECTION_LENGTH: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occlusion {
    /// Occluder opacity scaled by the occluder's own remaining weight (V1).
    Weighted,
    /// Occluder opacity applied as is (V2).
    Raw,
}

/// Angle between two vectors in radians. A degenerate vector counts as
/// pointing the same way as anything.
pub fn angle_between(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut len_a, mut len_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        len_a += x * x;
        len_b += y * y;
    }
    let (len_a, len_b) = (len_a.sqrt(), len_b.sqrt());
    if len_a < MIN_DIRECTION_LENGTH || len_b < MIN_DIRECTION_LENGTH {
        return 0.0;
    }
    (dot / (len_a * len_b)).clamp(-1.0, 1.0).acos()
}

/// Shadow that `closer` casts on `farther`, in [0, 1].
pub fn opacity(mode: &CalibrationMode, closer: &Neighbor, farther: &Neighbor) -> f64 {
    let angle_percent = angle_between(&closer.offset, &farther.offset) / PI * 100.0;
    let opaque_until = mode.size_of_opaque_sector_in_percents as f64;
    let transparent_from = 100.0 - mode.size_of_transparent_sector_in_percents as f64;

    let mut opacity = if angle_percent < opaque_until {
        1.0
    } else if angle_percent > transparent_from || transparent_from <= opaque_until {
        0.0
    } else {
        (transparent_from - angle_percent) / (transparent_from - opaque_until)
    };

    let thickness = mode.shade_thickness_in_pixels as f64;
    let gap = (farther.distance - closer.distance) as f64;
    if thickness > 0.0 && gap < thickness {
        opacity *= gap.max(0.0) / thickness;
    }
    opacity
}

/// Shaded weights, renormalized to sum to 1. Dropped neighbours get 0.
pub fn shaded_weights(mode: &CalibrationMode, neighbors: &[Neighbor], occlusion: Occlusion) -> Vec<f64> {
    let mut weights = vec![0.0; neighbors.len()];
    for i in 0..neighbors.len() {
        let mut weight = 1.0;
        for j in 0..i {
            let shadow = opacity(mode, &neighbors[j], &neighbors[i]);
            weight -= match occlusion {
                Occlusion::Weighted => shadow * weights[j],
                Occlusion::Raw => shadow,
            };
        }
        weights[i] = if weight <= DROP_THRESHOLD { 0.0 } else { weight };
    }

    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in weights.iter_mut() {
            *w /= total;
        }
    }
    weights
}

/// Number of neighbours that survive shading.
pub fn surviving_count(weights: &[f64]) -> usize {
    weights.iter().filter(|w| **w > 0.0).count()
}

pub fn shift_v1(mode: &CalibrationMode, neighbors: &[Neighbor]) -> (f64, f64) {
    let weights = shaded_weights(mode, neighbors, Occlusion::Weighted);
    weighted_sum(neighbors, &weights)
}

/// V2 blends the shaded estimate into the plain inverse-distance average as
/// the query moves away (on screen) from the samples backing it.
pub fn shift_v2(mode: &CalibrationMode, neighbors: &[Neighbor]) -> (f64, f64) {
    let (avg_x, avg_y) = idw::average(neighbors);
    let weights = shaded_weights(mode, neighbors, Occlusion::Raw);
    let fade_distance = mode.correction_fade_out_distance as f64;

    let (mut x, mut y, mut total_weight) = (0.0, 0.0, 0.0);
    for (n, w) in neighbors.iter().zip(&weights) {
        let factor = w * fade(n.planar_distance() as f64, fade_distance);
        x += factor * n.shift.x as f64;
        y += factor * n.shift.y as f64;
        total_weight += factor;
    }
    (
        x + avg_x * (1.0 - total_weight),
        y + avg_y * (1.0 - total_weight),
    )
}

/// 1 on top of a sample, falling to 0 at `fade_distance`.
/// A non-positive fade distance disables fading.
pub fn fade(planar_distance: f64, fade_distance: f64) -> f64 {
    if fade_distance <= 0.0 {
        return 1.0;
    }
    let ratio = planar_distance / fade_distance;
    (1.0 - ratio * ratio).max(0.0)
}

fn weighted_sum(neighbors: &[Neighbor], weights: &[f64]) -> (f64, f64) {
    neighbors
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(x, y), (n, w)| {
            (x + w * n.shift.x as f64, y + w * n.shift.y as f64)
        })
}
