//! Explicit owner of all mutable gaze-correction state.
//!
//! The hardware callback and the calibration key handler both go through a
//! single `SharedContext` lock; nothing in here is global.

use crate::config::{AppSettings, SmoothingSettings};
use crate::engine::corrector::CorrectionEngine;
use crate::engine::sample::{is_sane, Shift};
use crate::engine::smoother::TemporalSmoother;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

pub struct GazeContext {
    engine: CorrectionEngine,
    pre_smoother: TemporalSmoother,
    post_smoother: TemporalSmoother,
    last_gaze: Option<Vec<f32>>,
}

pub type SharedContext = Arc<Mutex<GazeContext>>;

impl GazeContext {
    /// Context whose engine is hydrated from and persisted to the configured
    /// data directory.
    pub fn new(settings: &AppSettings) -> Self {
        let engine = CorrectionEngine::new(
            &settings.calibration_mode,
            settings.persistence.resolve_data_directory(),
            Duration::from_millis(settings.persistence.save_interval_ms),
        );
        Self::with_engine(engine, &settings.smoothing)
    }

    pub fn with_engine(engine: CorrectionEngine, smoothing: &SmoothingSettings) -> Self {
        Self {
            engine,
            pre_smoother: TemporalSmoother::new(smoothing),
            post_smoother: TemporalSmoother::new(smoothing),
            last_gaze: None,
        }
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    pub fn engine(&self) -> &CorrectionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CorrectionEngine {
        &mut self.engine
    }

    /// Smoothed gaze coordinates of the last processed sample.
    pub fn last_gaze(&self) -> Option<&[f32]> {
        self.last_gaze.as_deref()
    }

    /// Raw gaze in, corrected cursor position out.
    pub fn process_gaze(&mut self, raw: &[f32]) -> Option<CursorPosition> {
        if raw.len() < 2 || !is_sane(raw) {
            return None;
        }
        let gaze = self.pre_smoother.push(raw, Shift::ZERO).coordinates;
        let shift = self.engine.get_shift(&gaze);
        let (dx, dy) = self.post_smoother.push(&gaze, shift).shift;

        let position = CursorPosition {
            x: gaze[0] as f64 + dx,
            y: gaze[1] as f64 + dy,
        };
        self.last_gaze = Some(gaze);
        Some(position)
    }

    /// The user says the cursor belongs at `target` for the current gaze.
    /// Returns false when there is no gaze to attach the correction to.
    pub fn calibrate(&mut self, target_x: f64, target_y: f64) -> bool {
        let Some(gaze) = self.last_gaze.as_ref() else {
            log::debug!("Calibration ignored: no gaze yet");
            return false;
        };
        let shift = Shift::from_f64(target_x - gaze[0] as f64, target_y - gaze[1] as f64);
        let before = self.engine.len();
        let gaze = gaze.clone();
        self.engine.add_shift(&gaze, shift);
        log::debug!(
            "Calibrated ({:.0}, {:.0}) by ({}, {}), {} -> {} samples",
            gaze[0],
            gaze[1],
            shift.x,
            shift.y,
            before,
            self.engine.len()
        );
        // The new correction applies from the next sample on, not averaged in.
        self.post_smoother.reset();
        true
    }

    /// Drop smoothing history, e.g. when entering or leaving calibration.
    pub fn reset_smoothing(&mut self) {
        self.pre_smoother.reset();
        self.post_smoother.reset();
        self.last_gaze = None;
    }

    /// Apply new settings: the engine rebuilds, smoothers start over.
    pub fn reconfigure(&mut self, settings: &AppSettings) {
        self.engine.reconfigure(&settings.calibration_mode);
        self.pre_smoother = TemporalSmoother::new(&settings.smoothing);
        self.post_smoother = TemporalSmoother::new(&settings.smoothing);
        self.last_gaze = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, CalibrationMode};

    fn context(algorithm: Algorithm) -> GazeContext {
        let engine = CorrectionEngine::in_memory(&CalibrationMode::for_test(algorithm, 4));
        GazeContext::with_engine(engine, &SmoothingSettings { points_count: 4, zone_radius: 50.0 })
    }

    #[test]
    fn test_uncalibrated_gaze_passes_through_smoothed() {
        let mut ctx = context(Algorithm::V1);
        ctx.process_gaze(&[100.0, 100.0]).unwrap();
        let pos = ctx.process_gaze(&[110.0, 100.0]).unwrap();
        assert_eq!(pos, CursorPosition { x: 105.0, y: 100.0 });
    }

    #[test]
    fn test_rejects_insane_gaze() {
        let mut ctx = context(Algorithm::V1);
        assert!(ctx.process_gaze(&[f32::NAN, 1.0]).is_none());
        assert!(ctx.process_gaze(&[1.0]).is_none());
        assert!(ctx.last_gaze().is_none());
    }

    #[test]
    fn test_calibrate_needs_gaze() {
        let mut ctx = context(Algorithm::V0);
        assert!(!ctx.calibrate(10.0, 10.0));
        assert!(ctx.engine().is_empty());
    }

    #[test]
    fn test_calibration_corrects_following_gaze() {
        let mut ctx = context(Algorithm::V0);
        ctx.process_gaze(&[500.0, 300.0]).unwrap();
        assert!(ctx.calibrate(520.0, 290.0));
        assert_eq!(ctx.engine().samples()[0].shift, Shift::new(20, -10));

        let pos = ctx.process_gaze(&[500.0, 300.0]).unwrap();
        assert_eq!(pos, CursorPosition { x: 520.0, y: 290.0 });
    }

    #[test]
    fn test_shared_context_across_threads() {
        let shared = context(Algorithm::V0).into_shared();
        let producer = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    let mut ctx = shared.lock().unwrap();
                    ctx.process_gaze(&[i as f32, 0.0]);
                }
            })
        };
        for i in 0..20 {
            let mut ctx = shared.lock().unwrap();
            ctx.engine_mut().add_shift(&[i as f32 * 50.0, 0.0], Shift::new(1, 1));
        }
        producer.join().unwrap();
        assert_eq!(shared.lock().unwrap().engine().len(), 20);
    }

    #[test]
    fn test_reconfigure_resets_smoothing() {
        let mut ctx = context(Algorithm::V0);
        ctx.process_gaze(&[1.0, 1.0]);
        let mut settings = AppSettings::default();
        settings.calibration_mode = CalibrationMode::for_test(Algorithm::V2, 4);
        ctx.reconfigure(&settings);
        assert!(ctx.last_gaze().is_none());
        assert_eq!(ctx.engine().mode().algorithm, Algorithm::V2);
    }
}
