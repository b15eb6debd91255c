//! Bounded, spatially deduplicated collection of learned corrections.
//!
//! Samples are kept oldest first. The neighbour cache mirrors them index for
//! index and is updated inside the same call as every insert or removal.

use super::nn_cache::{DenseNeighborCache, NeighborIndex};
use super::sample::{is_sane, Neighbor, Sample, Shift};
use super::scaler::CoordinateScaler;
use crate::config::CalibrationMode;
use crate::storage;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Neighbours requested while inserting, enough for the double collapse.
const COLLAPSE_CANDIDATES: usize = 2;

pub struct SampleStore<C: NeighborIndex = DenseNeighborCache> {
    mode: CalibrationMode,
    dimensions: usize,
    samples: Vec<Sample>,
    cache: C,
    reordered: bool,
    // Result of the last query; offset buffers are reused across queries.
    neighbors: Vec<Neighbor>,
    neighbor_count: usize,
}

impl SampleStore<DenseNeighborCache> {
    /// Empty store; nothing is read from disk.
    pub fn in_memory(mode: &CalibrationMode) -> Self {
        let cache = DenseNeighborCache::new(CoordinateScaler::from_mode(mode), mode.max_zones_count);
        Self::with_index(mode, cache)
    }

    /// Store hydrated from the mode's calibration file in `directory`.
    ///
    /// An unreadable file leaves the store empty and the file in place.
    pub fn load(mode: &CalibrationMode, directory: &Path) -> Self {
        let mut store = Self::in_memory(mode);
        let path = store.file_path(directory);
        match storage::read_samples(&path, store.dimensions) {
            Ok(Some(samples)) => {
                let total = samples.len();
                store.restore(samples);
                log::info!(
                    "Loaded {} samples from {} ({} in file)",
                    store.len(),
                    path.display(),
                    total
                );
            }
            Ok(None) => log::info!("No calibration at {}, starting empty", path.display()),
            Err(e) => log::warn!("Ignoring unreadable calibration, starting empty: {:#}", e),
        }
        store
    }
}

impl<C: NeighborIndex> SampleStore<C> {
    pub fn with_index(mode: &CalibrationMode, mut cache: C) -> Self {
        cache.clear();
        Self {
            dimensions: mode.dimensions_count(),
            mode: mode.clone(),
            samples: Vec::new(),
            cache,
            reordered: false,
            neighbors: Vec::new(),
            neighbor_count: 0,
        }
    }

    pub fn mode(&self) -> &CalibrationMode {
        &self.mode
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.cache.clear();
        self.reordered = false;
        self.neighbor_count = 0;
    }

    /// Learn a correction. Returns false when the input was rejected.
    pub fn add_shift(&mut self, coordinates: &[f32], shift: Shift) -> bool {
        if coordinates.len() != self.dimensions {
            log::warn!(
                "Rejected correction with {} coordinates, expected {}",
                coordinates.len(),
                self.dimensions
            );
            return false;
        }
        if !is_sane(coordinates) {
            log::debug!("Rejected correction at non-finite coordinates");
            return false;
        }
        self.insert(Sample::new(coordinates.to_vec(), shift))
    }

    /// Take saved samples back as they are, oldest first. Only entries of the
    /// wrong width or with non-finite coordinates are skipped, and the oldest
    /// go first beyond capacity. No zone collapsing happens here: a saved
    /// store may legitimately hold samples closer than `zone_size`.
    pub(crate) fn restore(&mut self, samples: Vec<Sample>) {
        self.reset();
        let dimensions = self.dimensions;
        let valid: Vec<Sample> = samples
            .into_iter()
            .filter(|s| s.coordinates.len() == dimensions && is_sane(&s.coordinates))
            .collect();
        let skip = valid.len().saturating_sub(self.mode.max_zones_count);
        for sample in valid.into_iter().skip(skip) {
            self.push(sample);
        }
    }

    /// Insert in order through the regular collapse/eviction policy, for
    /// samples learned under a different zone size.
    pub(crate) fn extend(&mut self, samples: Vec<Sample>) {
        for sample in samples {
            if sample.coordinates.len() == self.dimensions && is_sane(&sample.coordinates) {
                self.insert(sample);
            }
        }
    }

    fn insert(&mut self, sample: Sample) -> bool {
        if self.mode.max_zones_count == 0 {
            log::debug!("Capacity is zero, correction not stored");
            return false;
        }
        let zone_size = self.mode.zone_size;
        let nearest = self
            .cache
            .change_cursor_position(&sample.coordinates, COLLAPSE_CANDIDATES);
        let first = nearest.first().copied();
        let second = nearest.get(1).copied();

        match first {
            Some(closest) if closest.distance < zone_size => {
                self.remove(closest.index);
                if let Some(next) = second.filter(|n| n.distance < zone_size) {
                    let index = if next.index > closest.index {
                        next.index - 1
                    } else {
                        next.index
                    };
                    self.remove(index);
                }
            }
            _ => {
                while !self.samples.is_empty() && self.samples.len() >= self.mode.max_zones_count {
                    self.remove(0);
                }
            }
        }

        self.push(sample);
        true
    }

    fn push(&mut self, sample: Sample) {
        let index = self.cache.allocate_index();
        self.cache.set_coordinates(index, &sample.coordinates);
        self.samples.push(sample);
        debug_assert_eq!(self.cache.len(), self.samples.len());
    }

    fn remove(&mut self, index: usize) -> Sample {
        self.cache.free_index(index);
        self.neighbor_count = 0;
        self.samples.remove(index)
    }

    /// Up to K samples nearest to `query`, ascending by distance.
    ///
    /// The closest one is moved to the recent end so regions the user keeps
    /// looking at outlive age-based eviction.
    pub fn closest_corrections(&mut self, query: &[f32]) -> Option<&[Neighbor]> {
        match self.query_closest(query) {
            0 => None,
            _ => Some(self.last_corrections()),
        }
    }

    /// Same as `closest_corrections`, leaving the result in
    /// `last_corrections`. Returns how many neighbours were found.
    pub fn query_closest(&mut self, query: &[f32]) -> usize {
        self.neighbor_count = 0;
        if self.samples.is_empty() || query.len() != self.dimensions || !is_sane(query) {
            return 0;
        }
        let k = self.mode.considered_zones_count.max(1);
        let nearest = self.cache.change_cursor_position(query, k);

        let count = nearest.len();
        if self.neighbors.len() < count {
            self.neighbors.resize_with(count, || Neighbor {
                shift: Shift::ZERO,
                distance: 0.0,
                offset: Vec::with_capacity(query.len()),
            });
        }
        for (slot, n) in self.neighbors.iter_mut().zip(nearest) {
            let sample = &self.samples[n.index];
            slot.shift = sample.shift;
            slot.distance = n.distance;
            slot.offset.clear();
            slot.offset
                .extend(query.iter().zip(&sample.coordinates).map(|(q, c)| q - c));
        }
        let closest = nearest.first().map(|n| n.index);

        if let Some(index) = closest {
            self.promote(index);
        }
        self.neighbor_count = count;
        count
    }

    /// Neighbours found by the last query, ascending by distance.
    pub fn last_corrections(&self) -> &[Neighbor] {
        &self.neighbors[..self.neighbor_count]
    }

    fn promote(&mut self, index: usize) {
        if index + 1 >= self.samples.len() {
            return;
        }
        let sample = self.remove(index);
        self.push(sample);
        self.reordered = true;
    }

    /// Whether a query changed the recency order since the last call.
    pub fn take_reordered(&mut self) -> bool {
        std::mem::take(&mut self.reordered)
    }

    pub fn file_path(&self, directory: &Path) -> PathBuf {
        directory.join(storage::calibration_file_name(&self.mode))
    }

    /// Write the current samples synchronously. Returns the file written.
    pub fn save_in_directory(&self, directory: &Path) -> Result<PathBuf> {
        let path = self.file_path(directory);
        storage::write_samples(&path, &self.samples)?;
        Ok(path)
    }
}
