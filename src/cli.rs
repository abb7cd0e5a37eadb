use std::path::PathBuf;

use clap::Parser;

use crate::effects::EffectType;
use crate::settings::TrailSettings;
use crate::telemetry::LogConfig;

#[derive(Parser, Debug)]
#[command(name = "camera-trails")]
#[command(about = "Webcam trail and ghosting effects with person segmentation")]
#[command(long_about = "Composites a live webcam feed into a persistent trail canvas. Body Trails stamps segmented silhouettes, Color Trip lightens hue-tinted frames, Natural Layers lightens plain frames at intervals. Press C to clear, S to save a snapshot, 1-3 to switch effects.")]
pub struct Args {
    #[arg(long = "settings", help = "Path to settings.xml (defaults to the user config directory)")]
    pub settings: Option<PathBuf>,

    #[arg(
        short = 'e',
        long = "effect",
        help = "Initial effect: trails2, colortrip or natural"
    )]
    pub effect: Option<EffectType>,

    #[arg(short = 'c', long = "camera", help = "Camera device index")]
    pub camera: Option<u32>,

    #[arg(short = 'm', long = "model", help = "Path to the ONNX segmentation model file")]
    pub model_path: Option<PathBuf>,

    #[arg(long = "snapshot-dir", help = "Directory snapshots are saved to")]
    pub snapshot_dir: Option<PathBuf>,

    #[arg(long = "fps", help = "Target frames per second (24-240)")]
    pub fps: Option<u32>,

    #[arg(long = "no-mirror", help = "Draw the video unmirrored")]
    pub no_mirror: bool,

    #[arg(long = "list-cameras", help = "List available cameras and exit")]
    pub list_cameras: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase verbosity level (use multiple times for more verbose output)"
    )]
    pub verbose: u8,

    #[arg(long = "log-json", help = "Emit JSON log lines")]
    pub log_json: bool,

    #[arg(long = "log-file", help = "Also write logs to this file")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Override settings with values given on the command line
    pub fn apply_to(&self, settings: &mut TrailSettings) {
        if let Some(effect) = self.effect {
            settings.initial_effect = effect;
        }
        if let Some(camera) = self.camera {
            settings.camera_index = camera;
        }
        if let Some(path) = &self.model_path {
            settings.model_path = Some(path.to_string_lossy().into_owned());
        }
        if let Some(dir) = &self.snapshot_dir {
            settings.snapshot_dir = Some(dir.to_string_lossy().into_owned());
        }
        if let Some(fps) = self.fps {
            settings.target_fps = fps;
        }
        if self.no_mirror {
            settings.mirror = false;
        }
        settings.normalize();
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            json_format: self.log_json,
            file_path: self.log_file.clone(),
            ..LogConfig::default()
        }
        .with_verbosity(self.verbose)
    }
}
