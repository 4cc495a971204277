use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Layout and input tuning for a viewer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Widths strictly below this many pixels are treated as mobile.
    pub mobile_breakpoint: u32,
    pub page_width: u32,
    pub page_height: u32,
    pub mobile_scroll_width: u32,
    pub scroll_width_ratio: f32,
    pub page_gap: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
    pub mobile_scale: f32,
    pub desktop_scale: f32,
    pub drag_multiplier: f32,
    pub show_cover: bool,
    pub fade_millis: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768,
            page_width: 450,
            page_height: 636,
            mobile_scroll_width: 320,
            scroll_width_ratio: 0.9,
            page_gap: 16,
            min_scale: 0.5,
            max_scale: 2.5,
            zoom_step: 0.1,
            mobile_scale: 0.8,
            desktop_scale: 1.0,
            drag_multiplier: 2.0,
            show_cover: true,
            fade_millis: 200,
        }
    }
}

impl ViewerConfig {
    /// Loads a config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path.to_path_buf())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, PathBuf::from("<inline>"))
    }

    fn parse(raw: &str, path: PathBuf) -> Result<Self, ConfigError> {
        let config: ViewerConfig =
            toml::from_str(raw).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale < self.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "scale bounds must satisfy 0 < min_scale < max_scale (got {} and {})",
                self.min_scale, self.max_scale
            )));
        }
        for (name, value) in [
            ("mobile_scale", self.mobile_scale),
            ("desktop_scale", self.desktop_scale),
        ] {
            if value < self.min_scale || value > self.max_scale {
                return Err(ConfigError::Invalid(format!(
                    "{name} {value} lies outside [{}, {}]",
                    self.min_scale, self.max_scale
                )));
            }
        }
        if self.page_width == 0 || self.page_height == 0 {
            return Err(ConfigError::Invalid("page box must be non-empty".into()));
        }
        if !(self.scroll_width_ratio > 0.0) {
            return Err(ConfigError::Invalid(
                "scroll_width_ratio must be positive".into(),
            ));
        }
        if !(self.drag_multiplier > 0.0) {
            return Err(ConfigError::Invalid("drag_multiplier must be positive".into()));
        }
        if !(self.zoom_step > 0.0) {
            return Err(ConfigError::Invalid("zoom_step must be positive".into()));
        }
        Ok(())
    }

    /// Height of a page rendered at `width`, keeping the page box aspect ratio.
    pub fn page_height_for_width(&self, width: f32) -> f32 {
        width * self.page_height as f32 / self.page_width as f32
    }
}
