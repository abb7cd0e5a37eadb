//! ONNX Runtime person segmentation
//!
//! Runs a MediaPipe-style selfie segmentation model (256x256 NHWC input,
//! single-channel probability output).

use std::path::{Path, PathBuf};

use ndarray::Array4;

use super::{MlError, PersonMask, SegmentationConfig, SegmentationModel};
use crate::compositor::PixelBuffer;

/// Model file looked up in the models directory
pub const MODEL_FILE_NAME: &str = "selfie_segmentation.onnx";

const SEG_WIDTH: u32 = 256;
const SEG_HEIGHT: u32 = 256;

/// Selfie segmentation through ONNX Runtime
pub struct OnnxSegmenter {
    session: ort::session::Session,
    threshold: f32,
    flip_horizontal: bool,
    /// Reused NHWC input buffer
    input: Vec<f32>,
}

impl OnnxSegmenter {
    /// Load the model named by `config`, or search the usual model directories
    pub fn load(config: &SegmentationConfig) -> Result<Self, MlError> {
        let model_path = match &config.model_path {
            Some(path) => path.clone(),
            None => find_model_dir()?.join(MODEL_FILE_NAME),
        };
        if !model_path.exists() {
            return Err(MlError::ModelNotFound(model_path));
        }

        let session = ort::session::Session::builder()
            .map_err(|e| MlError::Runtime(format!("Failed to create session builder: {}", e)))?
            .with_intra_threads(2)
            .map_err(|e| MlError::Runtime(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| MlError::Runtime(format!("Failed to load segmentation model: {}", e)))?;

        tracing::info!(path = %model_path.display(), "Loaded segmentation model");

        Ok(Self {
            session,
            threshold: config.threshold,
            flip_horizontal: config.flip_horizontal,
            input: vec![0.0; (SEG_WIDTH * SEG_HEIGHT * 3) as usize],
        })
    }

    /// Resize to the model input and convert to NHWC RGB floats in [0, 1]
    fn preprocess(&mut self, frame: &PixelBuffer) {
        let data = frame.as_bytes();
        let x_ratio = frame.width() as f32 / SEG_WIDTH as f32;
        let y_ratio = frame.height() as f32 / SEG_HEIGHT as f32;

        for y in 0..SEG_HEIGHT {
            for x in 0..SEG_WIDTH {
                let src_x = ((x as f32 * x_ratio) as u32).min(frame.width() - 1);
                let src_y = ((y as f32 * y_ratio) as u32).min(frame.height() - 1);
                let src_idx = ((src_y * frame.width() + src_x) * 4) as usize;

                // HWC format: [y][x][channel]
                let out_idx = ((y * SEG_WIDTH + x) * 3) as usize;
                self.input[out_idx] = data[src_idx] as f32 / 255.0;
                self.input[out_idx + 1] = data[src_idx + 1] as f32 / 255.0;
                self.input[out_idx + 2] = data[src_idx + 2] as f32 / 255.0;
            }
        }
    }
}

impl SegmentationModel for OnnxSegmenter {
    fn segment(&mut self, frame: &PixelBuffer) -> Result<PersonMask, MlError> {
        self.preprocess(frame);

        let input_array = Array4::from_shape_vec(
            (1, SEG_HEIGHT as usize, SEG_WIDTH as usize, 3),
            self.input.clone(),
        )
        .map_err(|e| MlError::Runtime(format!("Failed to create input array: {}", e)))?;

        let input_tensor = ort::value::Tensor::from_array(input_array)
            .map_err(|e| MlError::Runtime(format!("Failed to create tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| MlError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| MlError::Runtime("No output from segmentation model".to_string()))?;

        let (_shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| MlError::Runtime(format!("Failed to extract output: {}", e)))?;

        let mut mask = PersonMask::from_probabilities(data, SEG_WIDTH, SEG_HEIGHT, self.threshold)
            .resample(frame.width(), frame.height());
        if self.flip_horizontal {
            mask.flip_horizontal();
        }

        Ok(mask)
    }
}

/// Find the models directory
///
/// Looks next to the executable and up to three ancestors (covers
/// `target/<profile>`), then in the working directory.
pub fn find_model_dir() -> Result<PathBuf, MlError> {
    if let Ok(exe_path) = std::env::current_exe() {
        for dir in exe_path.ancestors().skip(1).take(4) {
            let model_dir = dir.join("models");
            if model_dir.exists() {
                return Ok(model_dir);
            }
        }
    }

    let cwd = std::env::current_dir().map_err(|e| MlError::Runtime(e.to_string()))?;
    let model_dir = cwd.join("models");
    if model_dir.exists() {
        return Ok(model_dir);
    }

    Err(MlError::ModelNotFound(Path::new("models").join(MODEL_FILE_NAME)))
}
