use super::*;

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            calibration_mode: CalibrationMode::default(),
            smoothing: SmoothingSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }
}

impl Default for CalibrationMode {
    fn default() -> Self {
        Self {
            zone_size: 150.0,
            max_zones_count: 2000,
            considered_zones_count: 6,
            algorithm: Algorithm::V1,
            size_of_opaque_sector_in_percents: 30.0,
            size_of_transparent_sector_in_percents: 30.0,
            shade_thickness_in_pixels: 50.0,
            correction_fade_out_distance: default_fade_out_distance(),
            additional_dimensions: AdditionalDimensions::default(),
        }
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            points_count: default_points_count(),
            zone_radius: default_zone_radius(),
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            data_directory: None,
            save_interval_ms: default_save_interval_ms(),
        }
    }
}

impl CalibrationMode {
    /// Test preset: no zone collapsing, room for a thousand samples.
    #[cfg(test)]
    pub fn for_test(algorithm: Algorithm, considered_zones_count: usize) -> Self {
        Self {
            zone_size: 0.0,
            max_zones_count: 1000,
            considered_zones_count,
            algorithm,
            ..Self::default()
        }
    }
}
