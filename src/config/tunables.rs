//! Static accessor table over the numeric calibration fields.
//!
//! Parameter search and command-line overrides walk this table instead of
//! matching on field names by hand.

use super::CalibrationMode;
use anyhow::{bail, Result};

pub struct TunableField {
    pub name: &'static str,
    pub get: fn(&CalibrationMode) -> f32,
    pub set: fn(&mut CalibrationMode, f32),
    pub min: f32,
    pub max: f32,
}

pub static TUNABLE_FIELDS: &[TunableField] = &[
    TunableField {
        name: "zone_size",
        get: |m| m.zone_size,
        set: |m, v| m.zone_size = v,
        min: 0.0,
        max: 1000.0,
    },
    TunableField {
        name: "max_zones_count",
        get: |m| m.max_zones_count as f32,
        set: |m, v| m.max_zones_count = v.round() as usize,
        min: 1.0,
        max: 10_000.0,
    },
    TunableField {
        name: "considered_zones_count",
        get: |m| m.considered_zones_count as f32,
        set: |m, v| m.considered_zones_count = v.round() as usize,
        min: 1.0,
        max: 64.0,
    },
    TunableField {
        name: "size_of_opaque_sector_in_percents",
        get: |m| m.size_of_opaque_sector_in_percents,
        set: |m, v| m.size_of_opaque_sector_in_percents = v,
        min: 0.0,
        max: 100.0,
    },
    TunableField {
        name: "size_of_transparent_sector_in_percents",
        get: |m| m.size_of_transparent_sector_in_percents,
        set: |m, v| m.size_of_transparent_sector_in_percents = v,
        min: 0.0,
        max: 100.0,
    },
    TunableField {
        name: "shade_thickness_in_pixels",
        get: |m| m.shade_thickness_in_pixels,
        set: |m, v| m.shade_thickness_in_pixels = v,
        min: 0.0,
        max: 1000.0,
    },
    TunableField {
        name: "correction_fade_out_distance",
        get: |m| m.correction_fade_out_distance,
        set: |m, v| m.correction_fade_out_distance = v,
        min: 0.0,
        max: 5000.0,
    },
];

pub fn find_tunable(name: &str) -> Option<&'static TunableField> {
    TUNABLE_FIELDS.iter().find(|field| field.name == name)
}

impl CalibrationMode {
    /// Set a tunable field by name, clamped into its range.
    pub fn set_tunable(&mut self, name: &str, value: f32) -> Result<()> {
        let Some(field) = find_tunable(name) else {
            bail!("unknown calibration field '{}'", name);
        };
        if !value.is_finite() {
            bail!("value for '{}' must be finite, got {}", name, value);
        }
        (field.set)(self, value.clamp(field.min, field.max));
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for field in TUNABLE_FIELDS {
            let value = (field.get)(self);
            if !(field.min..=field.max).contains(&value) {
                bail!(
                    "calibration field '{}' = {} is outside [{}, {}]",
                    field.name,
                    value,
                    field.min,
                    field.max
                );
            }
        }
        if self.size_of_opaque_sector_in_percents + self.size_of_transparent_sector_in_percents > 100.0 {
            bail!("opaque and transparent sectors overlap (sum above 100%)");
        }
        Ok(())
    }
}
