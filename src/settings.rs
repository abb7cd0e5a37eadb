//! Settings management for Camera Trails
//!
//! Handles loading/saving of the XML settings file. Missing fields fall
//! back to defaults, so a partial file only overrides what it names.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::effects::color_trip::{DEFAULT_TINT_BRIGHTNESS, DEFAULT_TINT_SATURATION};
use crate::effects::EffectType;
use crate::ml::{SegmentationConfig, DEFAULT_SEGMENTATION_THRESHOLD};

/// Sketch settings stored in `settings.xml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "CameraTrailsSettings", default)]
pub struct TrailSettings {
    /// Camera device index
    #[serde(rename = "cameraIndex")]
    pub camera_index: u32,

    /// Video width the camera feed is conformed to
    #[serde(rename = "videoWidth")]
    pub video_width: u32,

    /// Video height the camera feed is conformed to
    #[serde(rename = "videoHeight")]
    pub video_height: u32,

    /// Initial window width
    #[serde(rename = "windowWidth")]
    pub window_width: u32,

    /// Initial window height
    #[serde(rename = "windowHeight")]
    pub window_height: u32,

    /// Target frame rate (24-240)
    #[serde(rename = "targetFps")]
    pub target_fps: u32,

    /// Effect shown at startup
    #[serde(rename = "initialEffect")]
    pub initial_effect: EffectType,

    /// Body Trails capture interval in frames
    #[serde(rename = "bodyTrailsFrameSkip")]
    pub body_trails_frame_skip: u32,

    /// Color Trip capture interval in frames
    #[serde(rename = "colorTripFrameSkip")]
    pub color_trip_frame_skip: u32,

    /// Natural Layers capture interval in frames
    #[serde(rename = "naturalFrameSkip")]
    pub natural_frame_skip: u32,

    /// Hue advance per frame in degrees
    #[serde(rename = "hueStep")]
    pub hue_step: f32,

    /// Color Trip tint saturation (0-100)
    #[serde(rename = "tintSaturation")]
    pub tint_saturation: f32,

    /// Color Trip tint brightness (0-100)
    #[serde(rename = "tintBrightness")]
    pub tint_brightness: f32,

    /// Person probability threshold (0-1)
    #[serde(rename = "segmentationThreshold")]
    pub segmentation_threshold: f32,

    /// Mirror the segmentation mask after inference
    #[serde(rename = "flipHorizontal")]
    pub flip_horizontal: bool,

    /// Draw video mirrored (selfie view)
    #[serde(rename = "mirror")]
    pub mirror: bool,

    /// Segmentation model file
    #[serde(rename = "modelPath", skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Directory snapshots are written to (working directory when unset)
    #[serde(rename = "snapshotDir", skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<String>,

    /// Snapshot file stem
    #[serde(rename = "snapshotName")]
    pub snapshot_name: String,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            video_width: 640,
            video_height: 480,
            window_width: 1280,
            window_height: 720,
            target_fps: 60,
            initial_effect: EffectType::BodyTrails,
            body_trails_frame_skip: EffectType::BodyTrails.default_settings().frame_skip,
            color_trip_frame_skip: EffectType::ColorTrip.default_settings().frame_skip,
            natural_frame_skip: EffectType::Natural.default_settings().frame_skip,
            hue_step: 0.5,
            tint_saturation: DEFAULT_TINT_SATURATION,
            tint_brightness: DEFAULT_TINT_BRIGHTNESS,
            segmentation_threshold: DEFAULT_SEGMENTATION_THRESHOLD,
            flip_horizontal: false,
            mirror: true,
            model_path: None,
            snapshot_dir: None,
            snapshot_name: "trails-artwork".to_string(),
        }
    }
}

impl TrailSettings {
    /// Clamp values into their valid ranges
    pub fn normalize(&mut self) {
        self.target_fps = self.target_fps.clamp(24, 240);
        self.video_width = self.video_width.max(1);
        self.video_height = self.video_height.max(1);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self.body_trails_frame_skip = self.body_trails_frame_skip.max(1);
        self.color_trip_frame_skip = self.color_trip_frame_skip.max(1);
        self.natural_frame_skip = self.natural_frame_skip.max(1);
        self.tint_saturation = self.tint_saturation.clamp(0.0, 100.0);
        self.tint_brightness = self.tint_brightness.clamp(0.0, 100.0);
        self.segmentation_threshold = self.segmentation_threshold.clamp(0.0, 1.0);
        if self.snapshot_name.trim().is_empty() {
            self.snapshot_name = Self::default().snapshot_name;
        }
    }

    /// Capture interval for an effect
    pub fn frame_skip(&self, effect: EffectType) -> u32 {
        match effect {
            EffectType::BodyTrails => self.body_trails_frame_skip,
            EffectType::ColorTrip => self.color_trip_frame_skip,
            EffectType::Natural => self.natural_frame_skip,
        }
    }

    /// Segmentation options derived from these settings
    pub fn segmentation_config(&self) -> SegmentationConfig {
        SegmentationConfig {
            threshold: self.segmentation_threshold,
            flip_horizontal: self.flip_horizontal,
            model_path: self.model_path.as_ref().map(PathBuf::from),
        }
    }

    /// Directory snapshots are saved to
    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("CameraTrails");
            p.push("settings.xml");
            p
        })
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        settings.normalize();
        Ok(settings)
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from_file(&path)
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(SettingsError::Io)?;
            }
        }

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::default_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
    NoConfigDir,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
            SettingsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TrailSettings::default();
        assert_eq!(settings.video_width, 640);
        assert_eq!(settings.video_height, 480);
        assert_eq!(settings.initial_effect, EffectType::BodyTrails);
        assert_eq!(settings.frame_skip(EffectType::BodyTrails), 15);
        assert_eq!(settings.frame_skip(EffectType::ColorTrip), 1);
        assert_eq!(settings.frame_skip(EffectType::Natural), 12);
        assert!((settings.segmentation_threshold - 0.7).abs() < f32::EPSILON);
        assert!(settings.mirror);
        assert!(!settings.flip_horizontal);
    }

    #[test]
    fn test_normalize() {
        let mut settings = TrailSettings {
            target_fps: 500,
            natural_frame_skip: 0,
            segmentation_threshold: 1.5,
            tint_saturation: -3.0,
            snapshot_name: "  ".to_string(),
            ..Default::default()
        };
        settings.normalize();
        assert_eq!(settings.target_fps, 240);
        assert_eq!(settings.natural_frame_skip, 1);
        assert_eq!(settings.segmentation_threshold, 1.0);
        assert_eq!(settings.tint_saturation, 0.0);
        assert_eq!(settings.snapshot_name, "trails-artwork");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.xml");

        let settings = TrailSettings {
            initial_effect: EffectType::ColorTrip,
            camera_index: 2,
            model_path: Some("/opt/models/selfie.onnx".to_string()),
            hue_step: 1.25,
            ..Default::default()
        };
        settings.save_to_file(&path).unwrap();

        let loaded = TrailSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");
        fs::write(
            &path,
            "<CameraTrailsSettings><initialEffect>natural</initialEffect><naturalFrameSkip>6</naturalFrameSkip></CameraTrailsSettings>",
        )
        .unwrap();

        let loaded = TrailSettings::load(Some(&path)).unwrap();
        assert_eq!(loaded.initial_effect, EffectType::Natural);
        assert_eq!(loaded.natural_frame_skip, 6);
        assert_eq!(loaded.body_trails_frame_skip, 15);
        assert_eq!(loaded.snapshot_name, "trails-artwork");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TrailSettings::load(Some(&dir.path().join("absent.xml"))).unwrap();
        assert_eq!(loaded, TrailSettings::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");
        fs::write(&path, "<CameraTrailsSettings><targetFps>fast</targetFps></CameraTrailsSettings>").unwrap();
        assert!(matches!(TrailSettings::load(Some(&path)), Err(SettingsError::XmlParse(_))));
    }
}
