//! ML inference module
//!
//! Person segmentation behind the `SegmentationModel` trait. The model is a
//! black box: it turns a video frame into a per-pixel person/background
//! mask. `OnnxSegmenter` runs a selfie-segmentation ONNX model and
//! `SegmentationEngine` keeps inference off the render thread.

mod engine;
mod onnx;

pub use engine::{ModelStatus, SegmentationEngine};
pub use onnx::{find_model_dir, OnnxSegmenter, MODEL_FILE_NAME};

use std::path::PathBuf;

use crate::compositor::PixelBuffer;

/// Default probability above which a pixel counts as person
pub const DEFAULT_SEGMENTATION_THRESHOLD: f32 = 0.7;

/// ML errors
#[derive(Debug)]
pub enum MlError {
    /// No model file at the given location
    ModelNotFound(PathBuf),
    /// Model loading or inference failed inside the runtime
    Runtime(String),
    /// The inference thread could not be started
    Thread(std::io::Error),
}

impl std::fmt::Display for MlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MlError::ModelNotFound(path) => write!(f, "Segmentation model not found: {:?}", path),
            MlError::Runtime(msg) => write!(f, "{}", msg),
            MlError::Thread(e) => write!(f, "Failed to spawn inference thread: {}", e),
        }
    }
}

impl std::error::Error for MlError {}

/// Binary person segmentation mask (1 = person, 0 = background)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonMask {
    /// One byte per pixel, row-major
    pub data: Vec<u8>,
    /// Mask width
    pub width: u32,
    /// Mask height
    pub height: u32,
}

impl PersonMask {
    /// All-background mask
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Threshold a probability map. Values at or above `threshold` are person.
    pub fn from_probabilities(probabilities: &[f32], width: u32, height: u32, threshold: f32) -> Self {
        let len = width as usize * height as usize;
        let mut data: Vec<u8> = probabilities
            .iter()
            .take(len)
            .map(|&p| u8::from(p >= threshold))
            .collect();
        data.resize(len, 0);
        Self { data, width, height }
    }

    /// Whether the pixel at (x, y) is person
    pub fn is_person(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .is_some_and(|&v| v == 1)
    }

    /// Nearest-neighbour rescale
    pub fn resample(&self, width: u32, height: u32) -> Self {
        if self.width == width && self.height == height {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Self::empty(width, height);
        }

        let mut data = vec![0u8; width as usize * height as usize];
        let x_ratio = self.width as f32 / width as f32;
        let y_ratio = self.height as f32 / height as f32;

        for y in 0..height {
            let src_y = ((y as f32 * y_ratio) as u32).min(self.height - 1);
            for x in 0..width {
                let src_x = ((x as f32 * x_ratio) as u32).min(self.width - 1);
                data[y as usize * width as usize + x as usize] =
                    self.data[src_y as usize * self.width as usize + src_x as usize];
            }
        }

        Self { data, width, height }
    }

    /// Mirror the mask left-to-right
    pub fn flip_horizontal(&mut self) {
        let width = self.width as usize;
        if width == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(width) {
            row.reverse();
        }
    }

    /// Fraction of pixels classified as person
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let person = self.data.iter().filter(|&&v| v == 1).count();
        person as f32 / self.data.len() as f32
    }
}

/// Segmentation options
#[derive(Clone, Debug)]
pub struct SegmentationConfig {
    /// Probability threshold for the person class
    pub threshold: f32,
    /// Mirror the mask horizontally after inference
    pub flip_horizontal: bool,
    /// Explicit model file; searched for when `None`
    pub model_path: Option<PathBuf>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SEGMENTATION_THRESHOLD,
            flip_horizontal: false,
            model_path: None,
        }
    }
}

/// A person segmentation model
pub trait SegmentationModel: Send {
    /// Segment `frame`, returning a mask with the frame's dimensions
    fn segment(&mut self, frame: &PixelBuffer) -> Result<PersonMask, MlError>;
}
