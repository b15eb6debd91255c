use super::sample::Shift;
use crate::config::SmoothingSettings;
use std::collections::VecDeque;

struct Observation {
    coordinates: Vec<f32>,
    shift: Shift,
}

/// Mean of the observations currently in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedObservation {
    pub coordinates: Vec<f32>,
    pub shift: (f64, f64),
}

/// Sliding-window averaging of recent (coordinates, shift) observations.
///
/// The window is bounded by count and by space: once the gaze jumps further
/// than `zone_radius` on any axis, older observations stop contributing, so
/// saccades are followed immediately while fixations are steadied.
pub struct TemporalSmoother {
    window: VecDeque<Observation>,
    points_count: usize,
    zone_radius: f32,
}

impl TemporalSmoother {
    pub fn new(settings: &SmoothingSettings) -> Self {
        let points_count = settings.points_count.max(1);
        Self {
            window: VecDeque::with_capacity(points_count + 1),
            points_count,
            zone_radius: settings.zone_radius,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Forget everything, e.g. when entering or leaving calibration.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Add the newest observation and return the window mean.
    pub fn push(&mut self, coordinates: &[f32], shift: Shift) -> SmoothedObservation {
        self.window.push_front(Observation {
            coordinates: coordinates.to_vec(),
            shift,
        });
        self.window.truncate(self.points_count);

        if let Some(newest) = self.window.pop_front() {
            let radius = self.zone_radius;
            self.window.retain(|old| {
                old.coordinates.len() == newest.coordinates.len()
                    && old
                        .coordinates
                        .iter()
                        .zip(&newest.coordinates)
                        .all(|(a, b)| (a - b).abs() <= radius)
            });
            self.window.push_front(newest);
        }

        self.mean(coordinates.len())
    }

    fn mean(&self, dimensions: usize) -> SmoothedObservation {
        let count = self.window.len() as f64;
        let mut sums = vec![0.0f64; dimensions];
        let (mut shift_x, mut shift_y) = (0.0, 0.0);
        for obs in &self.window {
            for (sum, c) in sums.iter_mut().zip(&obs.coordinates) {
                *sum += *c as f64;
            }
            shift_x += obs.shift.x as f64;
            shift_y += obs.shift.y as f64;
        }
        SmoothedObservation {
            coordinates: sums.into_iter().map(|s| (s / count) as f32).collect(),
            shift: (shift_x / count, shift_y / count),
        }
    }
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(&SmoothingSettings::default())
    }
}
