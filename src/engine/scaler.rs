//! Per-dimension weighting applied before any distance computation.
//!
//! Weights are laid out in a row padded to a multiple of [`LANES`] so the
//! neighbour cache can run fixed-width chunks with no remainder handling.
//! Padding lanes carry weight zero and never perturb a distance.

use crate::config::CalibrationMode;

pub const LANES: usize = 8;

#[derive(Debug, Clone)]
pub struct CoordinateScaler {
    dimensions: usize,
    weights: Vec<f32>,
}

impl CoordinateScaler {
    pub fn new(weights: &[f32]) -> Self {
        let stride = padded_width(weights.len());
        let mut padded = vec![0.0; stride];
        padded[..weights.len()].copy_from_slice(weights);
        Self {
            dimensions: weights.len(),
            weights: padded,
        }
    }

    pub fn from_mode(mode: &CalibrationMode) -> Self {
        Self::new(&mode.dimension_weights())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Row width in floats, always a multiple of [`LANES`].
    pub fn stride(&self) -> usize {
        self.weights.len()
    }

    /// Write the scaled, padded form of `coordinates` into `out`.
    /// `out` must be exactly one stride long.
    pub fn scale_into(&self, coordinates: &[f32], out: &mut [f32]) {
        debug_assert_eq!(coordinates.len(), self.dimensions);
        debug_assert_eq!(out.len(), self.weights.len());
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = match coordinates.get(i) {
                Some(c) => c * self.weights[i],
                None => 0.0,
            };
        }
    }
}

fn padded_width(dimensions: usize) -> usize {
    dimensions.div_ceil(LANES).max(1) * LANES
}
