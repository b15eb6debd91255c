use serde::{Deserialize, Serialize};

/// Integer pixel shift to apply to a gaze point.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shift {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
}

impl Shift {
    pub const ZERO: Shift = Shift { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round a fractional shift to whole pixels.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }
}

/// One learned correction. Never mutated once stored; replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Screen X,Y first, then the enabled additional dimensions.
    pub coordinates: Vec<f32>,
    pub shift: Shift,
}

impl Sample {
    pub fn new(coordinates: Vec<f32>, shift: Shift) -> Self {
        Self { coordinates, shift }
    }
}

/// A stored sample as seen from a query point.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub shift: Shift,
    /// Distance in scaled space, floored at the cache epsilon.
    pub distance: f32,
    /// Unscaled vector from the sample to the query.
    pub offset: Vec<f32>,
}

impl Neighbor {
    /// Length of the offset projected on screen X,Y.
    pub fn planar_distance(&self) -> f32 {
        let dx = self.offset.first().copied().unwrap_or(0.0);
        let dy = self.offset.get(1).copied().unwrap_or(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// NaN or infinite coordinates never enter the store and never get corrected.
pub fn is_sane(coordinates: &[f32]) -> bool {
    !coordinates.is_empty() && coordinates.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_json_shape() {
        let sample = Sample::new(vec![10.0, 20.5], Shift::new(-3, 7));
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "coordinates": [10.0, 20.5], "shift": { "X": -3, "Y": 7 } })
        );
    }

    #[test]
    fn test_sanity() {
        assert!(is_sane(&[1.0, 2.0]));
        assert!(!is_sane(&[]));
        assert!(!is_sane(&[1.0, f32::NAN]));
        assert!(!is_sane(&[f32::INFINITY, 0.0]));
    }

    #[test]
    fn test_shift_rounding() {
        assert_eq!(Shift::from_f64(2.5, -2.4), Shift::new(3, -2));
    }

    #[test]
    fn test_planar_distance_ignores_extra_dimensions() {
        let n = Neighbor { shift: Shift::ZERO, distance: 1.0, offset: vec![3.0, 4.0, 100.0] };
        assert_eq!(n.planar_distance(), 5.0);
    }
}
