#![forbid(unsafe_code)]

//! Overlay configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Values are range-checked by [`OverlayConfig::validate`]; loading from JSON
//! validates automatically.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `THREADSHEET_DEFAULT_HEIGHT` | `sheet.default_visible_height` |
//! | `THREADSHEET_BACKDROP_OPACITY` | `sheet.max_backdrop_opacity` |
//!
//! Unparseable values are ignored with a warning.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use threadsheet_core::SheetMetrics;
use threadsheet_core::animation::SpringConfig;

/// Env var overriding the Default posture's visible height.
pub const ENV_DEFAULT_HEIGHT: &str = "THREADSHEET_DEFAULT_HEIGHT";
/// Env var overriding the maximum backdrop opacity.
pub const ENV_BACKDROP_OPACITY: &str = "THREADSHEET_BACKDROP_OPACITY";

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    Parse(String),
    /// A field is out of range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid overlay config: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Spring tuning as plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringTuning {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl Default for SpringTuning {
    fn default() -> Self {
        let spring = SpringConfig::default();
        Self {
            stiffness: spring.stiffness,
            damping: spring.damping,
            mass: spring.mass,
        }
    }
}

impl SpringTuning {
    fn to_spring(self) -> SpringConfig {
        SpringConfig {
            stiffness: self.stiffness,
            damping: self.damping,
            mass: self.mass,
            ..SpringConfig::default()
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let ok = [self.stiffness, self.damping, self.mass]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                field,
                reason: "stiffness, damping and mass must be positive".into(),
            })
        }
    }
}

/// Sheet geometry and motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetMetricsConfig {
    /// Visible height of the Default posture.
    pub default_visible_height: f32,
    /// Backdrop opacity at Full, in `[0, 1]`.
    pub max_backdrop_opacity: f32,
    /// Downward travel before the content area claims a drag.
    pub content_drag_threshold: f32,
    pub compose_bar_height: f32,
    pub close_duration_ms: u64,
    /// Spring for the programmatic open.
    pub open_spring: SpringTuning,
    /// Spring for snapping back open after a release.
    pub snap_spring: SpringTuning,
}

impl Default for SheetMetricsConfig {
    fn default() -> Self {
        let base = SheetMetrics::new(0.0, 0.0);
        Self {
            default_visible_height: 520.0,
            max_backdrop_opacity: base.max_backdrop_opacity,
            content_drag_threshold: base.content_drag_threshold,
            compose_bar_height: base.compose_bar_height,
            close_duration_ms: u64::try_from(base.close_duration.as_millis()).unwrap_or(250),
            open_spring: SpringTuning {
                stiffness: base.open_spring.stiffness,
                damping: base.open_spring.damping,
                mass: base.open_spring.mass,
            },
            snap_spring: SpringTuning::default(),
        }
    }
}

impl SheetMetricsConfig {
    /// Concrete metrics for a viewport.
    #[must_use]
    pub fn metrics(&self, viewport_height: f32) -> SheetMetrics {
        SheetMetrics {
            max_backdrop_opacity: self.max_backdrop_opacity,
            content_drag_threshold: self.content_drag_threshold,
            compose_bar_height: self.compose_bar_height,
            close_duration: Duration::from_millis(self.close_duration_ms),
            open_spring: self.open_spring.to_spring(),
            snap_spring: self.snap_spring.to_spring(),
            ..SheetMetrics::new(viewport_height, self.default_visible_height)
        }
    }
}

/// Configuration for a [`crate::CommentOverlay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub sheet: SheetMetricsConfig,
    /// Frame interval hosts should tick the overlay at.
    pub frame_interval_ms: u64,
    /// Show `5m`-style ages instead of absolute timestamps.
    pub relative_time: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            sheet: SheetMetricsConfig::default(),
            frame_interval_ms: 16,
            relative_time: true,
        }
    }
}

impl OverlayConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field's range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sheet = &self.sheet;
        if !sheet.default_visible_height.is_finite() || sheet.default_visible_height < 0.0 {
            return Err(ConfigError::Invalid {
                field: "sheet.default_visible_height",
                reason: "must be a non-negative number".into(),
            });
        }
        if !(0.0..=1.0).contains(&sheet.max_backdrop_opacity) {
            return Err(ConfigError::Invalid {
                field: "sheet.max_backdrop_opacity",
                reason: "must be within 0..=1".into(),
            });
        }
        if !sheet.content_drag_threshold.is_finite() || sheet.content_drag_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "sheet.content_drag_threshold",
                reason: "must be a non-negative number".into(),
            });
        }
        if !sheet.compose_bar_height.is_finite() || sheet.compose_bar_height < 0.0 {
            return Err(ConfigError::Invalid {
                field: "sheet.compose_bar_height",
                reason: "must be a non-negative number".into(),
            });
        }
        sheet.open_spring.validate("sheet.open_spring")?;
        sheet.snap_spring.validate("sheet.snap_spring")?;
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "frame_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Apply `THREADSHEET_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom environment lookup (for tests).
    #[must_use]
    pub fn with_env_overrides_from<F>(mut self, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(height) = parse_env(&get_env, ENV_DEFAULT_HEIGHT, |v| v >= 0.0) {
            self.sheet.default_visible_height = height;
        }
        if let Some(opacity) = parse_env(&get_env, ENV_BACKDROP_OPACITY, |v| (0.0..=1.0).contains(&v)) {
            self.sheet.max_backdrop_opacity = opacity;
        }
        self
    }

    /// Frame interval as a duration.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

fn parse_env<F>(get_env: &F, key: &str, in_range: impl Fn(f32) -> bool) -> Option<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get_env(key)?;
    match raw.trim().parse::<f32>() {
        Ok(value) if value.is_finite() && in_range(value) => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid env override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config = OverlayConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            OverlayConfig::from_json_str(r#"{ "sheet": { "default_visible_height": 400 } }"#).unwrap();
        assert_eq!(config.sheet.default_visible_height, 400.0);
        assert_eq!(config.sheet.compose_bar_height, 64.0);
        assert_eq!(config.frame_interval_ms, 16);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            OverlayConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn out_of_range_opacity_is_rejected() {
        let err = OverlayConfig::from_json_str(r#"{ "sheet": { "max_backdrop_opacity": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "sheet.max_backdrop_opacity", .. }
        ));
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let config = OverlayConfig::default().with_env_overrides_from(|key| match key {
            ENV_DEFAULT_HEIGHT => Some("300".into()),
            ENV_BACKDROP_OPACITY => Some("loud".into()),
            _ => None,
        });
        assert_eq!(config.sheet.default_visible_height, 300.0);
        assert_eq!(config.sheet.max_backdrop_opacity, 0.5);
    }

    #[test]
    fn metrics_carry_tuning() {
        let mut config = OverlayConfig::default();
        config.sheet.close_duration_ms = 400;
        let metrics = config.sheet.metrics(844.0);
        assert_eq!(metrics.default_offset(), 324.0);
        assert_eq!(metrics.close_duration, Duration::from_millis(400));
        assert_eq!(metrics.open_spring.stiffness, 120.0);
    }
}
