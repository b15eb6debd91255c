//! The correction engine as seen by its collaborators.
//!
//! Owns the sample store, picks the interpolator from the calibration mode
//! and hands persistence off to the background writer. Every call here is
//! synchronous and bounded; callers serialize access through one lock.

use super::interpolation;
use super::sample::{Sample, Shift};
use super::store::SampleStore;
use crate::config::{Algorithm, CalibrationMode};
use crate::storage::{self, writer::DebouncedWriter};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Notifications for observers such as a settings window or debug overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SamplesChanged { count: usize },
    DebugWindowToggled(bool),
    Reconfigured,
}

pub struct CorrectionEngine {
    store: SampleStore,
    data_directory: Option<PathBuf>,
    writer: Option<DebouncedWriter>,
    debug_window_enabled: bool,
    observers: Vec<Sender<EngineEvent>>,
}

impl CorrectionEngine {
    /// Engine hydrated from `data_directory`, persisting changes back there.
    pub fn new(mode: &CalibrationMode, data_directory: PathBuf, save_interval: Duration) -> Self {
        log::info!(
            "Correction engine: algorithm {:?}, {} dimensions, data in {}",
            mode.algorithm,
            mode.dimensions_count(),
            data_directory.display()
        );
        Self {
            store: SampleStore::load(mode, &data_directory),
            data_directory: Some(data_directory),
            writer: Some(DebouncedWriter::new(save_interval)),
            debug_window_enabled: false,
            observers: Vec::new(),
        }
    }

    /// In-memory engine: no hydration, no background writes.
    pub fn in_memory(mode: &CalibrationMode) -> Self {
        Self {
            store: SampleStore::in_memory(mode),
            data_directory: None,
            writer: None,
            debug_window_enabled: false,
            observers: Vec::new(),
        }
    }

    pub fn mode(&self) -> &CalibrationMode {
        self.store.mode()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        self.store.samples()
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.samples_changed();
    }

    /// Learn that gaze at `coordinates` should be moved by `shift`.
    /// Malformed input is dropped without error.
    pub fn add_shift(&mut self, coordinates: &[f32], shift: Shift) {
        if self.store.add_shift(coordinates, shift) {
            self.samples_changed();
        }
    }

    /// Estimated shift for gaze at `coordinates`; zero when nothing applies.
    pub fn get_shift(&mut self, coordinates: &[f32]) -> Shift {
        if self.store.mode().algorithm == Algorithm::No {
            return Shift::ZERO;
        }
        if self.store.query_closest(coordinates) == 0 {
            return Shift::ZERO;
        }
        interpolation::interpolate(self.store.mode(), self.store.last_corrections())
    }

    /// Write the samples to `directory` now, bypassing the background writer.
    pub fn save_in_directory(&self, directory: &Path) -> Result<PathBuf> {
        self.store.save_in_directory(directory)
    }

    pub fn is_debug_window_enabled(&self) -> bool {
        self.debug_window_enabled
    }

    pub fn set_debug_window_enabled(&mut self, enabled: bool) {
        if self.debug_window_enabled != enabled {
            self.debug_window_enabled = enabled;
            self.notify(EngineEvent::DebugWindowToggled(enabled));
        }
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Rebuild for a new calibration mode.
    ///
    /// Samples carry over in memory when the dimension layout is unchanged,
    /// re-collapsed only if the zone size changed; otherwise the store is
    /// hydrated from the new layout's file.
    pub fn reconfigure(&mut self, mode: &CalibrationMode) {
        self.flush();
        let same_layout = storage::calibration_file_name(mode)
            == storage::calibration_file_name(self.store.mode());

        let store = if same_layout {
            let mut store = SampleStore::in_memory(mode);
            let samples = self.store.samples().to_vec();
            if mode.zone_size == self.store.mode().zone_size {
                store.restore(samples);
            } else {
                store.extend(samples);
            }
            store
        } else {
            match &self.data_directory {
                Some(dir) => SampleStore::load(mode, dir),
                None => SampleStore::in_memory(mode),
            }
        };
        self.store = store;
        log::info!(
            "Reconfigured: algorithm {:?}, {} samples",
            mode.algorithm,
            self.store.len()
        );
        self.notify(EngineEvent::Reconfigured);
        if same_layout {
            // Capacity or zone changes may have collapsed samples.
            self.schedule_save();
        }
    }

    /// Write any pending samples synchronously, including a recency order
    /// changed by queries since the last save.
    pub fn flush(&mut self) {
        if self.store.take_reordered() {
            self.schedule_save();
        }
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }

    fn samples_changed(&mut self) {
        self.store.take_reordered();
        self.schedule_save();
        self.notify(EngineEvent::SamplesChanged { count: self.store.len() });
    }

    fn schedule_save(&self) {
        if let (Some(writer), Some(dir)) = (&self.writer, &self.data_directory) {
            writer.schedule(self.store.file_path(dir), self.store.samples().to_vec());
        }
    }

    fn notify(&mut self, event: EngineEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for CorrectionEngine {
    fn drop(&mut self) {
        self.flush();
    }
}
