//! Viewer configuration.
//!
//! Every tunable has a default matching the reference scene. A few optional
//! developer overrides are read from the environment (`SEASCAPE_ASSETS`,
//! `SEASCAPE_WINDOW`, `SEASCAPE_MAX_FRAME_DELTA`); only those exact keys are
//! consulted, and with none of them set the defaults are used unchanged.

use std::env;
use std::path::PathBuf;

use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Point the camera initially looks at.
    pub target: Vec3,
    /// Requested start position, pulled towards `target` to `max_distance`.
    pub position: Vec3,
    pub max_distance: f32,
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            z_near: 1.0,
            z_far: 20000.0,
            target: Vec3::new(0.0, 10.0, 8900.0),
            position: Vec3::new(0.0, 200.0, 1_000_000.0),
            max_distance: 200.0,
            move_speed: 10.0,
            look_sensitivity: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Directory that holds `model/` and `textures/`.
    pub asset_root: PathBuf,
    pub camera: CameraConfig,
    /// Added to the water time uniform once per frame.
    pub water_time_step: f32,
    /// Upper bound on the frame delta; `None` keeps raw wall-clock deltas.
    pub max_frame_delta: Option<f32>,
    pub environment_width: u32,
    pub environment_height: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Seascape".to_string(),
            window_width: 1280,
            window_height: 720,
            asset_root: PathBuf::from("."),
            camera: CameraConfig::default(),
            water_time_step: 1.0 / 60.0,
            max_frame_delta: None,
            environment_width: 64,
            environment_height: 32,
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Apply overrides looked up through `lookup`; invalid values are logged and skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(root) = lookup("SEASCAPE_ASSETS") {
            self.asset_root = PathBuf::from(root);
        }

        if let Some(size) = lookup("SEASCAPE_WINDOW") {
            match parse_window_size(&size) {
                Some((w, h)) => {
                    self.window_width = w;
                    self.window_height = h;
                }
                None => tracing::warn!("ignoring SEASCAPE_WINDOW={size:?}, expected WIDTHxHEIGHT"),
            }
        }

        if let Some(cap) = lookup("SEASCAPE_MAX_FRAME_DELTA") {
            match cap.trim().parse::<f32>() {
                Ok(v) if v > 0.0 && v.is_finite() => self.max_frame_delta = Some(v),
                _ => tracing::warn!("ignoring SEASCAPE_MAX_FRAME_DELTA={cap:?}, expected positive seconds"),
            }
        }
    }
}

fn parse_window_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.move_speed, 10.0);
        assert_eq!(config.water_time_step, 1.0 / 60.0);
        assert_eq!(config.camera.z_far, 20000.0);
        assert_eq!(config.max_frame_delta, None);
    }

    #[test]
    fn test_overrides() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(lookup_from(&[
            ("SEASCAPE_ASSETS", "/srv/ocean"),
            ("SEASCAPE_WINDOW", "1920x1080"),
            ("SEASCAPE_MAX_FRAME_DELTA", "0.1"),
        ]));
        assert_eq!(config.asset_root, PathBuf::from("/srv/ocean"));
        assert_eq!((config.window_width, config.window_height), (1920, 1080));
        assert_eq!(config.max_frame_delta, Some(0.1));
    }

    #[test]
    fn test_unset_or_blank_overrides_keep_defaults() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(lookup_from(&[
            ("RUST_LOG", "debug"),
            ("SEASCAPE_ASSETS", ""),
            ("SEASCAPE_WINDOW", "  "),
            ("ASSETS", "/srv/ocean"),
        ]));
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(lookup_from(&[
            ("SEASCAPE_WINDOW", "wide"),
            ("SEASCAPE_MAX_FRAME_DELTA", "-3"),
        ]));
        assert_eq!(config, ViewerConfig::default());
    }
}
