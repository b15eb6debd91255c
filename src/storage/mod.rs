//! Calibration files on disk.
//!
//! One file per dimension layout, so enabling or disabling an additional
//! dimension group never feeds samples of the wrong width into a store.

pub mod writer;

use crate::config::CalibrationMode;
use crate::engine::sample::Sample;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Deterministic file name for the mode's enabled dimension groups.
pub fn calibration_file_name(mode: &CalibrationMode) -> String {
    let mut name = String::from("calibration");
    for (group, _) in mode.additional_dimensions.enabled_groups() {
        name.push('_');
        name.push_str(group);
    }
    name.push_str(".json");
    name
}

/// Read samples from `path`, keeping only those with `dimensions` coordinates.
///
/// A missing file is not an error and yields `None`. A file that fails to
/// parse is an error; it is left on disk untouched.
pub fn read_samples(path: &Path, dimensions: usize) -> Result<Option<Vec<Sample>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading calibration {}", path.display()))?;
    let samples: Vec<Sample> = serde_json::from_str(&content)
        .with_context(|| format!("parsing calibration {}", path.display()))?;

    let total = samples.len();
    let samples: Vec<Sample> = samples
        .into_iter()
        .filter(|s| s.coordinates.len() == dimensions)
        .collect();
    if samples.len() != total {
        log::warn!(
            "Dropped {} of {} samples from {}: expected {} coordinates per sample",
            total - samples.len(),
            total,
            path.display(),
            dimensions
        );
    }
    Ok(Some(samples))
}

/// Write samples through a temp file in the same directory, then rename over
/// `path`. Readers never observe a half-written file.
pub fn write_samples(path: &Path, samples: &[Sample]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_string_pretty(samples)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    log::debug!("Saved {} samples to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sample::Shift;

    #[test]
    fn test_file_name_encodes_enabled_groups() {
        let mut mode = CalibrationMode::default();
        assert_eq!(calibration_file_name(&mode), "calibration.json");

        mode.additional_dimensions.head_direction = Some([10.0, 10.0, 10.0]);
        mode.additional_dimensions.left_eye = Some([10.0, 10.0, 10.0]);
        assert_eq!(calibration_file_name(&mode), "calibration_left_eye_head_direction.json");

        // scale values do not affect the layout
        mode.additional_dimensions.left_eye = Some([99.0, 1.0, 0.0]);
        assert_eq!(calibration_file_name(&mode), "calibration_left_eye_head_direction.json");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_samples(&dir.path().join("nope.json"), 2).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calibration.json");
        let samples = vec![
            Sample::new(vec![3.0, 1.0], Shift::new(1, 2)),
            Sample::new(vec![1.0, 3.0], Shift::new(-4, 0)),
        ];
        write_samples(&path, &samples).unwrap();
        assert_eq!(read_samples(&path, 2).unwrap().unwrap(), samples);
    }

    #[test]
    fn test_mismatched_dimensions_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let samples = vec![
            Sample::new(vec![1.0, 1.0], Shift::new(1, 1)),
            Sample::new(vec![1.0, 1.0, 5.0], Shift::new(2, 2)),
            Sample::new(vec![2.0, 2.0], Shift::new(3, 3)),
        ];
        write_samples(&path, &samples).unwrap();
        let loaded = read_samples(&path, 2).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].shift, Shift::new(3, 3));
    }

    #[test]
    fn test_corrupt_file_errors_and_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, "[{\"coordinates\": [1.0,").unwrap();
        assert!(read_samples(&path, 2).is_err());
        assert!(path.exists());
    }
}
