pub mod defaults;
pub mod tunables;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub calibration_mode: CalibrationMode,
    #[serde(default)]
    pub smoothing: SmoothingSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

/// Interpolation algorithm used to turn nearby samples into a shift.
///
/// Serialized by name. An unknown name fails to deserialize, which aborts
/// settings loading: a corrupted calibration mode has no safe fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Algorithm {
    /// Plain inverse-distance weighting.
    V0,
    /// Angular shading, occluders weighted by their own surviving weight.
    V1,
    /// Angular shading with raw occlusion plus fade-out blending.
    V2,
    /// Learn samples but never correct.
    #[serde(rename = "NO")]
    No,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::V1
    }
}

/// Calibration configuration. Read-only for the engine; a change means the
/// engine gets rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationMode {
    /// Two samples closer than this (in scaled space) are collapsed.
    pub zone_size: f32,
    pub max_zones_count: usize,
    /// K, the number of nearest samples handed to the interpolator.
    pub considered_zones_count: usize,
    pub algorithm: Algorithm,
    pub size_of_opaque_sector_in_percents: f32,
    pub size_of_transparent_sector_in_percents: f32,
    pub shade_thickness_in_pixels: f32,
    /// V2 only.
    #[serde(default = "default_fade_out_distance")]
    pub correction_fade_out_distance: f32,
    #[serde(default)]
    pub additional_dimensions: AdditionalDimensions,
}

fn default_fade_out_distance() -> f32 { 200.0 }

/// Optional body/eye/head features appended after screen X,Y.
/// Each enabled group carries one scale percentage per dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdditionalDimensions {
    #[serde(default)]
    pub left_eye: Option<[f32; 3]>,
    #[serde(default)]
    pub right_eye: Option<[f32; 3]>,
    #[serde(default)]
    pub angle_between_eyes: Option<[f32; 2]>,
    #[serde(default)]
    pub head_position: Option<[f32; 3]>,
    #[serde(default)]
    pub head_direction: Option<[f32; 3]>,
}

impl AdditionalDimensions {
    /// Enabled groups in their fixed coordinate order, as (name, percents).
    pub fn enabled_groups(&self) -> Vec<(&'static str, &[f32])> {
        let groups: [(&'static str, Option<&[f32]>); 5] = [
            ("left_eye", self.left_eye.as_ref().map(|v| v.as_slice())),
            ("right_eye", self.right_eye.as_ref().map(|v| v.as_slice())),
            ("angle_between_eyes", self.angle_between_eyes.as_ref().map(|v| v.as_slice())),
            ("head_position", self.head_position.as_ref().map(|v| v.as_slice())),
            ("head_direction", self.head_direction.as_ref().map(|v| v.as_slice())),
        ];
        groups
            .into_iter()
            .filter_map(|(name, scales)| scales.map(|s| (name, s)))
            .collect()
    }
}

impl CalibrationMode {
    /// Screen X,Y plus every enabled additional dimension.
    pub fn dimensions_count(&self) -> usize {
        2 + self
            .additional_dimensions
            .enabled_groups()
            .iter()
            .map(|(_, scales)| scales.len())
            .sum::<usize>()
    }

    /// Per-dimension weights. Screen axes are never rescaled.
    pub fn dimension_weights(&self) -> Vec<f32> {
        let mut weights = vec![1.0, 1.0];
        for (_, scales) in self.additional_dimensions.enabled_groups() {
            weights.extend(scales.iter().map(|pct| pct / 100.0));
        }
        weights
    }
}

/// Sliding-window jitter suppression around the interpolator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmoothingSettings {
    #[serde(default = "default_points_count")]
    pub points_count: usize,
    /// Entries further than this from the newest one (in any dimension) are dropped.
    #[serde(default = "default_zone_radius")]
    pub zone_radius: f32,
}

fn default_points_count() -> usize { 10 }
fn default_zone_radius() -> f32 { 100.0 }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceSettings {
    /// Directory holding calibration files. None means the platform data dir.
    #[serde(default)]
    pub data_directory: Option<String>,
    /// Minimum time between two background writes.
    #[serde(default = "default_save_interval_ms")]
    pub save_interval_ms: u64,
}

fn default_save_interval_ms() -> u64 { 2000 }

impl PersistenceSettings {
    pub fn resolve_data_directory(&self) -> PathBuf {
        match &self.data_directory {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("gazeshift"),
        }
    }
}

pub fn load_settings(path: &Path) -> Result<AppSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    let settings: AppSettings = serde_json::from_str(&content)
        .with_context(|| format!("parsing settings {}", path.display()))?;
    settings.calibration_mode.validate()?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_follow_enabled_groups() {
        let mut mode = CalibrationMode::default();
        assert_eq!(mode.dimensions_count(), 2);

        mode.additional_dimensions.head_position = Some([50.0, 50.0, 25.0]);
        mode.additional_dimensions.angle_between_eyes = Some([200.0, 10.0]);
        assert_eq!(mode.dimensions_count(), 7);
        // angle_between_eyes precedes head_position
        assert_eq!(mode.dimension_weights(), vec![1.0, 1.0, 2.0, 0.1, 0.5, 0.5, 0.25]);
    }

    #[test]
    fn test_algorithm_names() {
        let mode: Algorithm = serde_json::from_str("\"V2\"").unwrap();
        assert_eq!(mode, Algorithm::V2);
        assert_eq!(serde_json::to_string(&Algorithm::No).unwrap(), "\"NO\"");
        assert!(serde_json::from_str::<Algorithm>("\"V3\"").is_err());
    }

    #[test]
    fn test_unknown_algorithm_fails_settings_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut json = serde_json::to_value(AppSettings::default()).unwrap();
        json["calibration_mode"]["algorithm"] = serde_json::Value::from("V9");
        std::fs::write(&path, json.to_string()).unwrap();

        assert!(load_settings(&path).is_err());
    }

    #[test]
    fn test_settings_roundtrip_with_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.calibration_mode.algorithm = Algorithm::V0;
        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.calibration_mode, settings.calibration_mode);

        // smoothing/persistence sections are optional
        let minimal = serde_json::json!({
            "calibration_mode": serde_json::to_value(&settings.calibration_mode).unwrap()
        });
        std::fs::write(&path, minimal.to_string()).unwrap();
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.smoothing, SmoothingSettings::default());
        assert_eq!(loaded.persistence.save_interval_ms, 2000);
    }
}
