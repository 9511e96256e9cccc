//! Engine configuration: zoom bounds, gesture thresholds and raster scales.
//!
//! Configuration can be loaded from a TOML file, environment variables, or
//! created programmatically.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Tunable constants shared by the viewer, the interaction layer and report mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower zoom bound
    pub min_zoom: f32,
    /// Upper zoom bound
    pub max_zoom: f32,
    /// Increment used by zoom in / zoom out
    pub zoom_step: f32,
    /// Zoom delta applied per wheel tick
    pub wheel_zoom_step: f32,
    /// Minimum normalized width and height of a committed rectangle
    pub min_draw_size: f32,
    /// Marker glyph hit radius in screen pixels, independent of zoom
    pub marker_hit_radius_px: f32,
    /// Pointer travel at or below which a press counts as a click
    pub click_tolerance_px: f32,
    /// Layout pixels per PDF point at zoom 1
    pub base_scale: f32,
    /// Raster density multiplier
    pub device_pixel_ratio: f32,
    /// Fixed zoom used when burning anchors into report pages
    pub export_scale: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 4.0,
            zoom_step: 0.25,
            wheel_zoom_step: 0.1,
            min_draw_size: 0.01,
            marker_hit_radius_px: 15.0,
            click_tolerance_px: 3.0,
            base_scale: 1.0,
            device_pixel_ratio: 1.0,
            export_scale: 2.0,
        }
    }
}

impl EngineConfig {
    /// Sets both zoom bounds.
    pub fn with_zoom_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    pub fn with_zoom_step(mut self, step: f32) -> Self {
        self.zoom_step = step;
        self
    }

    pub fn with_min_draw_size(mut self, size: f32) -> Self {
        self.min_draw_size = size;
        self
    }

    pub fn with_marker_hit_radius(mut self, radius_px: f32) -> Self {
        self.marker_hit_radius_px = radius_px;
        self
    }

    pub fn with_click_tolerance(mut self, tolerance_px: f32) -> Self {
        self.click_tolerance_px = tolerance_px;
        self
    }

    pub fn with_base_scale(mut self, scale: f32) -> Self {
        self.base_scale = scale;
        self
    }

    pub fn with_device_pixel_ratio(mut self, dpr: f32) -> Self {
        self.device_pixel_ratio = dpr;
        self
    }

    pub fn with_export_scale(mut self, scale: f32) -> Self {
        self.export_scale = scale;
        self
    }

    /// Returns the default config file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/blueprint/engine.toml
    /// - Linux: ~/.config/blueprint/engine.toml
    /// - Windows: %APPDATA%\blueprint\engine.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("blueprint").join("engine.toml")
        } else {
            PathBuf::from("blueprint.toml")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BLUEPRINT_MIN_ZOOM`: lower zoom bound (default: 0.5)
    /// - `BLUEPRINT_MAX_ZOOM`: upper zoom bound (default: 4.0)
    /// - `BLUEPRINT_ZOOM_STEP`: zoom in/out increment (default: 0.25)
    /// - `BLUEPRINT_DPR`: device pixel ratio (default: 1.0)
    /// - `BLUEPRINT_EXPORT_SCALE`: report export zoom (default: 2.0)
    /// - `BLUEPRINT_MARKER_HIT_RADIUS`: marker hit radius in px (default: 15)
    ///
    /// # Errors
    /// Returns an error if any variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let vars: [(&str, &mut f32); 6] = [
            ("BLUEPRINT_MIN_ZOOM", &mut config.min_zoom),
            ("BLUEPRINT_MAX_ZOOM", &mut config.max_zoom),
            ("BLUEPRINT_ZOOM_STEP", &mut config.zoom_step),
            ("BLUEPRINT_DPR", &mut config.device_pixel_ratio),
            ("BLUEPRINT_EXPORT_SCALE", &mut config.export_scale),
            ("BLUEPRINT_MARKER_HIT_RADIUS", &mut config.marker_hit_radius_px),
        ];

        for (name, slot) in vars {
            if let Ok(val) = std::env::var(name) {
                *slot = val
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| ConfigError::InvalidValue(name.to_string()))?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format (every key optional):
    /// ```toml
    /// min_zoom = 0.5
    /// max_zoom = 4.0
    /// zoom_step = 0.25
    /// export_scale = 2.0
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded engine config");
        Ok(config)
    }

    /// Parses configuration from a TOML string; missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Rejects non-finite or non-positive values and inverted zoom bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("zoom_step", self.zoom_step),
            ("wheel_zoom_step", self.wheel_zoom_step),
            ("min_draw_size", self.min_draw_size),
            ("marker_hit_radius_px", self.marker_hit_radius_px),
            ("base_scale", self.base_scale),
            ("device_pixel_ratio", self.device_pixel_ratio),
            ("export_scale", self.export_scale),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue(key.to_string()));
            }
        }

        if !self.click_tolerance_px.is_finite() || self.click_tolerance_px < 0.0 {
            return Err(ConfigError::InvalidValue("click_tolerance_px".to_string()));
        }

        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvalidValue("min_zoom > max_zoom".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),

    /// I/O error reading or writing the configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_VARS: [&str; 6] = [
        "BLUEPRINT_MIN_ZOOM",
        "BLUEPRINT_MAX_ZOOM",
        "BLUEPRINT_ZOOM_STEP",
        "BLUEPRINT_DPR",
        "BLUEPRINT_EXPORT_SCALE",
        "BLUEPRINT_MARKER_HIT_RADIUS",
    ];

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.zoom_step, 0.25);
        assert_eq!(config.min_draw_size, 0.01);
        assert_eq!(config.marker_hit_radius_px, 15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = EngineConfig::default()
            .with_zoom_bounds(0.25, 8.0)
            .with_export_scale(3.0)
            .with_device_pixel_ratio(2.0);

        assert_eq!(config.min_zoom, 0.25);
        assert_eq!(config.max_zoom, 8.0);
        assert_eq!(config.export_scale, 3.0);
        assert_eq!(config.device_pixel_ratio, 2.0);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = EngineConfig::default().with_zoom_bounds(3.0, 1.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let config = EngineConfig::default().with_export_scale(f32::NAN);
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_min_draw_size(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&ENV_VARS);
        for name in ENV_VARS {
            env::remove_var(name);
        }

        env::set_var("BLUEPRINT_MAX_ZOOM", "6");
        env::set_var("BLUEPRINT_DPR", "2.0");
        env::set_var("BLUEPRINT_MARKER_HIT_RADIUS", " 20 ");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.max_zoom, 6.0);
        assert_eq!(config.device_pixel_ratio, 2.0);
        assert_eq!(config.marker_hit_radius_px, 20.0);
        assert_eq!(config.min_zoom, 0.5); // default
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&ENV_VARS);
        for name in ENV_VARS {
            env::remove_var(name);
        }

        env::set_var("BLUEPRINT_ZOOM_STEP", "fast");
        let result = EngineConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "BLUEPRINT_ZOOM_STEP"));
    }

    #[test]
    #[serial]
    fn test_from_env_validates() {
        let _guard = EnvGuard::new(&ENV_VARS);
        for name in ENV_VARS {
            env::remove_var(name);
        }

        env::set_var("BLUEPRINT_MIN_ZOOM", "5");
        assert!(EngineConfig::from_env().is_err());
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
            # Blueprint viewer
            max_zoom = 8.0
            export_scale = 1.5
        "#;

        let config = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(config.max_zoom, 8.0);
        assert_eq!(config.export_scale, 1.5);
        assert_eq!(config.zoom_step, 0.25); // default
    }

    #[test]
    fn test_from_toml_malformed() {
        assert!(matches!(
            EngineConfig::from_toml("max_zoom = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default().with_zoom_bounds(0.25, 6.0);
        let toml = config.to_toml().unwrap();
        let parsed = EngineConfig::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_file_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("engine.toml");

        let config = EngineConfig::default().with_export_scale(3.0);
        config.save_to_file(&config_path).unwrap();

        let loaded = EngineConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
