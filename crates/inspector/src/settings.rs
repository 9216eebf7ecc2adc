//! Viewport settings

use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::{TransformMode, TransformSpace};

/// Grid helper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Show grid
    pub visible: bool,
    /// Grid extent in world units
    pub size: f32,
    /// Number of cells along each side
    pub divisions: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            visible: true,
            size: 30.0,
            divisions: 1,
        }
    }
}

/// Selection highlight settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Highlight box color RGB
    pub color: [u8; 3],
    /// Draw the highlight with depth testing
    pub depth_test: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            color: [0x1f, 0xaa, 0xf2],
            depth_test: false,
        }
    }
}

/// Transform gizmo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoSettings {
    pub mode: TransformMode,
    pub space: TransformSpace,
    /// Translation snap increment
    pub translation_snap: Option<f32>,
    /// Handle length as a fraction of the camera distance
    pub size: f32,
}

impl Default for GizmoSettings {
    fn default() -> Self {
        Self {
            mode: TransformMode::Translate,
            space: TransformSpace::World,
            translation_snap: None,
            size: 0.15,
        }
    }
}

/// Edit camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Orbit distance at startup
    pub initial_distance: f32,
    /// Focus distance as a multiple of the framed bounds radius
    pub focus_distance_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 0.1,
            far: 1000.0,
            initial_distance: 10.0,
            focus_distance_factor: 3.0,
        }
    }
}

/// Telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// Minimum interval between throttled events
    pub throttle_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            throttle_ms: 3000,
        }
    }
}

/// All viewport settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub grid: GridSettings,
    pub selection: SelectionSettings,
    pub gizmo: GizmoSettings,
    pub camera: CameraSettings,
    pub telemetry: TelemetrySettings,
}

impl ViewportSettings {
    /// Load settings from the config dir, or return defaults if not found
    pub fn load() -> Self {
        if let Some(dirs) = directories::ProjectDirs::from("com", "scene-inspector", "scene-inspector") {
            let config_path = dirs.config_dir().join("settings.json");
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }
        Self::default()
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Cannot read settings {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to the config dir
    pub fn save(&self) {
        if let Some(dirs) = directories::ProjectDirs::from("com", "scene-inspector", "scene-inspector") {
            let config_dir = dirs.config_dir();
            if std::fs::create_dir_all(config_dir).is_ok() {
                self.save_to(&config_dir.join("settings.json"));
            }
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(path, json) {
                tracing::warn!("Cannot write settings {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ViewportSettings::default();
        assert!(s.grid.visible);
        assert_eq!(s.grid.size, 30.0);
        assert_eq!(s.selection.color, [0x1f, 0xaa, 0xf2]);
        assert_eq!(s.gizmo.mode, TransformMode::Translate);
        assert_eq!(s.telemetry.throttle_ms, 3000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"gizmo": {"mode": "rotate", "translation_snap": 0.5}}"#;
        let s: ViewportSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.gizmo.mode, TransformMode::Rotate);
        assert_eq!(s.gizmo.translation_snap, Some(0.5));
        assert_eq!(s.gizmo.space, TransformSpace::World);
        assert_eq!(s.camera.fov_degrees, 50.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("scene-inspector-{}.json", std::process::id()));
        let mut s = ViewportSettings::default();
        s.grid.visible = false;
        s.save_to(&path);

        let loaded = ViewportSettings::load_from(&path);
        assert!(!loaded.grid.visible);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let loaded = ViewportSettings::load_from(Path::new("/nonexistent/settings.json"));
        assert!(loaded.grid.visible);
    }
}
