//! Dense nearest-neighbour cache over scaled sample coordinates.
//!
//! Rows are stored back to back in one flat buffer, each padded to the lane
//! width, so the distance pass is a single branch-free loop over contiguous
//! memory. Removing a row shifts every later row down by one: removals are
//! rare next to per-frame queries, and keeping the buffer dense keeps the
//! hot loop simple.

use super::scaler::{CoordinateScaler, LANES};

/// Distances are floored here so inverse-distance weights stay finite.
pub const DISTANCE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedNeighbor {
    pub index: usize,
    pub distance: f32,
}

/// Index management and distance queries over a sample set.
///
/// Index `i` always mirrors store element `i`: after `free_index(i)` every
/// entry above `i` is renumbered down by one, whatever the layout behind it.
pub trait NeighborIndex {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Append a slot at the end and return its index.
    fn allocate_index(&mut self) -> usize;

    fn free_index(&mut self, index: usize);

    fn set_coordinates(&mut self, index: usize, coordinates: &[f32]);

    /// Recompute every distance from `query` and return the `k` nearest,
    /// ascending by distance.
    fn change_cursor_position(&mut self, query: &[f32], k: usize) -> &[CachedNeighbor];
}

pub struct DenseNeighborCache {
    scaler: CoordinateScaler,
    rows: Vec<f32>,
    len: usize,
    query: Vec<f32>,
    distances: Vec<f32>,
    nearest: Vec<CachedNeighbor>,
}

impl DenseNeighborCache {
    pub fn new(scaler: CoordinateScaler, capacity: usize) -> Self {
        let stride = scaler.stride();
        Self {
            query: vec![0.0; stride],
            rows: Vec::with_capacity(capacity * stride),
            len: 0,
            distances: Vec::with_capacity(capacity),
            nearest: Vec::new(),
            scaler,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.scaler.dimensions()
    }

    /// Distances computed by the last query, one per index.
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Result of the last query.
    pub fn nearest(&self) -> &[CachedNeighbor] {
        &self.nearest
    }

    fn row_range(&self, index: usize) -> std::ops::Range<usize> {
        let stride = self.scaler.stride();
        index * stride..(index + 1) * stride
    }
}

impl NeighborIndex for DenseNeighborCache {
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.distances.clear();
        self.nearest.clear();
        self.len = 0;
    }

    fn allocate_index(&mut self) -> usize {
        let stride = self.scaler.stride();
        self.rows.resize(self.rows.len() + stride, 0.0);
        self.len += 1;
        self.len - 1
    }

    fn free_index(&mut self, index: usize) {
        assert!(index < self.len, "free_index({}) out of range {}", index, self.len);
        let range = self.row_range(index);
        self.rows.drain(range);
        self.len -= 1;
        // Old results refer to pre-shift indices.
        self.distances.clear();
        self.nearest.clear();
    }

    fn set_coordinates(&mut self, index: usize, coordinates: &[f32]) {
        let range = self.row_range(index);
        self.scaler.scale_into(coordinates, &mut self.rows[range]);
    }

    fn change_cursor_position(&mut self, query: &[f32], k: usize) -> &[CachedNeighbor] {
        let Self { scaler, rows, query: scaled_query, distances, nearest, len } = self;
        let stride = scaler.stride();
        scaler.scale_into(query, scaled_query);
        let scaled_query: &[f32] = scaled_query;

        distances.clear();
        distances.extend(rows.chunks_exact(stride).map(|row| lane_distance(row, scaled_query)));

        nearest.clear();
        let k = k.min(*len);
        if k == 0 {
            return nearest;
        }
        if nearest.capacity() < k {
            nearest.reserve(k);
        }

        // Insertion into K running slots; K is small next to N.
        for (index, &distance) in distances.iter().enumerate() {
            if nearest.len() == k {
                if distance >= nearest[k - 1].distance {
                    continue;
                }
                nearest.pop();
            }
            let at = nearest
                .iter()
                .position(|n| distance < n.distance)
                .unwrap_or(nearest.len());
            nearest.insert(at, CachedNeighbor { index, distance });
        }

        for n in nearest.iter_mut() {
            n.distance = n.distance.max(DISTANCE_EPSILON);
        }
        nearest
    }
}

#[inline]
fn lane_distance(row: &[f32], query: &[f32]) -> f32 {
    let mut acc = [0.0f32; LANES];
    for (r, q) in row.chunks_exact(LANES).zip(query.chunks_exact(LANES)) {
        for lane in 0..LANES {
            let d = r[lane] - q[lane];
            acc[lane] += d * d;
        }
    }
    acc.iter().sum::<f32>().sqrt()
}
