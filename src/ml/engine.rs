//! Background segmentation engine
//!
//! Loads the model and runs inference on a dedicated thread. The render
//! loop submits frames without blocking and reads back the most recent
//! mask. A failed inference keeps the previous mask.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::{MlError, OnnxSegmenter, PersonMask, SegmentationConfig, SegmentationModel};
use crate::compositor::PixelBuffer;

/// Model lifecycle as seen by the render loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    /// Model is still loading
    Loading,
    /// Model loaded, inference available
    Ready,
    /// Model failed to load
    Failed(String),
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

/// Most recent inference result
#[derive(Clone, Default)]
struct LatestMask {
    mask: Option<PersonMask>,
    frame_number: u64,
}

/// Frame to be segmented
struct FrameData {
    frame: PixelBuffer,
    frame_number: u64,
}

/// Segmentation engine running on its own thread
pub struct SegmentationEngine {
    /// Latest result from inference thread
    latest: Arc<Mutex<LatestMask>>,
    /// Model status shared with the inference thread
    status: Arc<Mutex<ModelStatus>>,
    /// Channel to send frames to inference thread
    frame_sender: Option<Sender<FrameData>>,
    /// Inference thread handle
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl SegmentationEngine {
    /// Start an engine backed by the ONNX selfie segmentation model
    pub fn start_onnx(config: SegmentationConfig) -> Result<Self, MlError> {
        Self::start(move || {
            OnnxSegmenter::load(&config).map(|s| Box::new(s) as Box<dyn SegmentationModel>)
        })
    }

    /// Start an engine, loading the model with `loader` on the inference thread
    pub fn start<F>(loader: F) -> Result<Self, MlError>
    where
        F: FnOnce() -> Result<Box<dyn SegmentationModel>, MlError> + Send + 'static,
    {
        let latest = Arc::new(Mutex::new(LatestMask::default()));
        let status = Arc::new(Mutex::new(ModelStatus::Loading));

        let (frame_sender, frame_receiver) = crossbeam_channel::bounded::<FrameData>(2);

        let latest_clone = latest.clone();
        let status_clone = status.clone();

        let thread_handle = std::thread::Builder::new()
            .name("segmentation".to_string())
            .spawn(move || {
                Self::inference_thread(loader, frame_receiver, latest_clone, status_clone);
            })
            .map_err(MlError::Thread)?;

        Ok(Self {
            latest,
            status,
            frame_sender: Some(frame_sender),
            thread_handle: Some(thread_handle),
        })
    }

    /// Inference thread main loop
    fn inference_thread<F>(
        loader: F,
        frame_receiver: Receiver<FrameData>,
        latest: Arc<Mutex<LatestMask>>,
        status: Arc<Mutex<ModelStatus>>,
    ) where
        F: FnOnce() -> Result<Box<dyn SegmentationModel>, MlError>,
    {
        tracing::info!("Segmentation thread started");

        let mut model = match loader() {
            Ok(model) => {
                *status.lock() = ModelStatus::Ready;
                tracing::info!("Segmentation model ready");
                model
            }
            Err(e) => {
                tracing::warn!("Failed to load segmentation model: {}. Body trails disabled.", e);
                *status.lock() = ModelStatus::Failed(e.to_string());
                return;
            }
        };

        while let Ok(frame) = frame_receiver.recv() {
            match model.segment(&frame.frame) {
                Ok(mask) => {
                    *latest.lock() = LatestMask {
                        mask: Some(mask),
                        frame_number: frame.frame_number,
                    };
                }
                Err(e) => {
                    // Keep previous mask
                    tracing::warn!("Inference error: {}", e);
                }
            }
        }

        tracing::info!("Segmentation thread stopped");
    }

    /// Send a frame for segmentation (non-blocking, dropped when busy)
    pub fn submit(&self, frame: &PixelBuffer, frame_number: u64) {
        if !self.status().is_ready() {
            return;
        }
        if let Some(ref sender) = self.frame_sender {
            let _ = sender.try_send(FrameData {
                frame: frame.clone(),
                frame_number,
            });
        }
    }

    /// Latest mask and the camera frame number it was computed from
    pub fn latest(&self) -> Option<(PersonMask, u64)> {
        let latest = self.latest.lock();
        latest.mask.clone().map(|m| (m, latest.frame_number))
    }

    /// Current model status
    pub fn status(&self) -> ModelStatus {
        self.status.lock().clone()
    }

    /// Stop the inference thread
    pub fn stop(&mut self) {
        // Drop sender to signal thread to stop
        self.frame_sender = None;

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SegmentationEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Marks every pixel brighter than mid-gray as person; fails on odd calls
    struct BrightnessModel {
        calls: u32,
        fail_odd: bool,
    }

    impl SegmentationModel for BrightnessModel {
        fn segment(&mut self, frame: &PixelBuffer) -> Result<PersonMask, MlError> {
            self.calls += 1;
            if self.fail_odd && self.calls % 2 == 1 {
                return Err(MlError::Runtime("flaky".to_string()));
            }
            let data = frame
                .as_bytes()
                .chunks_exact(4)
                .map(|p| u8::from(p[0] > 128))
                .collect();
            Ok(PersonMask {
                data,
                width: frame.width(),
                height: frame.height(),
            })
        }
    }

    fn wait_for<T>(mut f: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(v) = f() {
                return Some(v);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_engine_produces_mask() {
        let engine = SegmentationEngine::start(|| {
            Ok(Box::new(BrightnessModel { calls: 0, fail_odd: false }) as Box<dyn SegmentationModel>)
        })
        .unwrap();

        let ready = wait_for(|| engine.status().is_ready().then_some(()));
        assert!(ready.is_some());

        let mut frame = PixelBuffer::new(2, 1);
        frame.put_pixel(1, 0, [255, 255, 255, 255]);

        let result = wait_for(|| {
            engine.submit(&frame, 7);
            engine.latest()
        });
        let (mask, frame_number) = result.expect("no mask produced");
        assert_eq!(mask.data, vec![0, 1]);
        assert_eq!(frame_number, 7);
    }

    #[test]
    fn test_engine_reports_load_failure() {
        let engine = SegmentationEngine::start(|| Err(MlError::Runtime("no model".to_string()))).unwrap();

        let status = wait_for(|| match engine.status() {
            ModelStatus::Loading => None,
            other => Some(other),
        });
        assert_eq!(status, Some(ModelStatus::Failed("no model".to_string())));

        // Submitting to a failed engine is a no-op
        engine.submit(&PixelBuffer::new(1, 1), 1);
        assert!(engine.latest().is_none());
    }

    #[test]
    fn test_inference_error_keeps_previous_mask() {
        let engine = SegmentationEngine::start(|| {
            Ok(Box::new(BrightnessModel { calls: 0, fail_odd: true }) as Box<dyn SegmentationModel>)
        })
        .unwrap();
        wait_for(|| engine.status().is_ready().then_some(()));

        let frame = PixelBuffer::filled(1, 1, [255, 255, 255, 255]);
        let first = wait_for(|| {
            engine.submit(&frame, 1);
            engine.latest()
        });
        assert!(first.is_some());

        // Errors never clear the stored mask
        for n in 2..6 {
            engine.submit(&PixelBuffer::new(1, 1), n);
            std::thread::sleep(Duration::from_millis(2));
            assert!(engine.latest().is_some());
        }
    }
}
