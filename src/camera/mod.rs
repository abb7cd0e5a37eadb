//! Camera capture module
//!
//! Provides cross-platform camera capture using the nokhwa crate.
//! Captures frames on a background thread and provides the latest frame
//! to the main render thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use parking_lot::Mutex;

use crate::compositor::PixelBuffer;

/// Camera frame data
#[derive(Clone)]
pub struct CameraFrame {
    /// RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame number
    pub frame_number: u64,
}

impl CameraFrame {
    /// Conform the frame to the sketch's video size (nearest-neighbour)
    pub fn to_pixel_buffer(&self, target_width: u32, target_height: u32) -> PixelBuffer {
        let mut output = PixelBuffer::new(target_width, target_height);
        let (target_width, target_height) = (output.width(), output.height());

        if self.width == 0 || self.height == 0 {
            return output;
        }

        let x_ratio = self.width as f32 / target_width as f32;
        let y_ratio = self.height as f32 / target_height as f32;
        let out = output.as_bytes_mut();

        for y in 0..target_height {
            for x in 0..target_width {
                let src_x = ((x as f32 * x_ratio) as u32).min(self.width - 1);
                let src_y = ((y as f32 * y_ratio) as u32).min(self.height - 1);
                let src_idx = ((src_y * self.width + src_x) * 4) as usize;
                let dst_idx = ((y * target_width + x) * 4) as usize;

                if src_idx + 3 < self.data.len() {
                    out[dst_idx..dst_idx + 4].copy_from_slice(&self.data[src_idx..src_idx + 4]);
                }
            }
        }

        output
    }
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// Camera capture interface
pub struct CameraCapture {
    /// Current frame (latest captured) - triple buffered
    frames: [Arc<Mutex<Option<CameraFrame>>>; 3],
    /// Index of the latest complete frame
    latest_frame_idx: Arc<AtomicU64>,
    /// Whether capture is running
    running: Arc<AtomicBool>,
    /// Capture thread handle
    thread_handle: Option<std::thread::JoinHandle<()>>,
    /// Requested resolution
    width: u32,
    height: u32,
    /// Frame counter
    frame_count: Arc<AtomicU64>,
}

impl CameraCapture {
    /// List available cameras
    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(camera_list) => camera_list
                .iter()
                .enumerate()
                .map(|(idx, info)| CameraInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Create a new camera capture instance
    ///
    /// # Arguments
    /// * `camera_index` - The camera index to use (0 for default)
    /// * `width` - Requested frame width
    /// * `height` - Requested frame height
    pub fn new(camera_index: u32, width: u32, height: u32) -> Result<Self, String> {
        let frames: [Arc<Mutex<Option<CameraFrame>>>; 3] = [
            Arc::new(Mutex::new(None)),
            Arc::new(Mutex::new(None)),
            Arc::new(Mutex::new(None)),
        ];
        let latest_frame_idx = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let frame_count = Arc::new(AtomicU64::new(0));

        let frames_clone = frames.clone();
        let latest_frame_idx_clone = latest_frame_idx.clone();
        let running_clone = running.clone();
        let frame_count_clone = frame_count.clone();

        let thread_handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                Self::capture_thread(
                    camera_index,
                    width,
                    height,
                    frames_clone,
                    latest_frame_idx_clone,
                    running_clone,
                    frame_count_clone,
                );
            })
            .map_err(|e| format!("Failed to spawn capture thread: {}", e))?;

        Ok(Self {
            frames,
            latest_frame_idx,
            running,
            thread_handle: Some(thread_handle),
            width,
            height,
            frame_count,
        })
    }

    /// Open the camera, preferring the requested resolution
    fn open_camera(camera_index: u32, width: u32, height: u32) -> Option<Camera> {
        let index = CameraIndex::Index(camera_index);

        let attempts = [
            RequestedFormatType::HighestResolution(nokhwa::utils::Resolution::new(width, height)),
            RequestedFormatType::AbsoluteHighestResolution,
            RequestedFormatType::None,
        ];

        for requested_type in attempts {
            let label = format!("{:?}", requested_type);
            let requested = RequestedFormat::new::<RgbAFormat>(requested_type);
            match Camera::new(index.clone(), requested) {
                Ok(camera) => return Some(camera),
                Err(e) => tracing::warn!("Failed to open camera with {}: {:?}", label, e),
            }
        }

        tracing::error!("Failed to open camera {} with all format attempts", camera_index);
        None
    }

    /// Camera capture thread
    fn capture_thread(
        camera_index: u32,
        width: u32,
        height: u32,
        frames: [Arc<Mutex<Option<CameraFrame>>>; 3],
        latest_frame_idx: Arc<AtomicU64>,
        running: Arc<AtomicBool>,
        frame_count: Arc<AtomicU64>,
    ) {
        tracing::info!("Starting camera capture thread (camera {})", camera_index);

        let Some(mut camera) = Self::open_camera(camera_index, width, height) else {
            running.store(false, Ordering::Release);
            return;
        };

        if let Err(e) = camera.open_stream() {
            tracing::error!("Failed to open camera stream: {:?}", e);
            running.store(false, Ordering::Release);
            return;
        }

        tracing::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        let mut write_idx: u64 = 0;

        while running.load(Ordering::Acquire) {
            match camera.frame() {
                Ok(frame) => match frame.decode_image::<RgbAFormat>() {
                    Ok(image) => {
                        let frame_num = frame_count.fetch_add(1, Ordering::Relaxed) + 1;

                        let camera_frame = CameraFrame {
                            width: image.width(),
                            height: image.height(),
                            data: image.into_raw(),
                            frame_number: frame_num,
                        };

                        // Write to the next buffer slot
                        let slot = (write_idx % 3) as usize;
                        *frames[slot].lock() = Some(camera_frame);

                        latest_frame_idx.store(write_idx, Ordering::Release);
                        write_idx = write_idx.wrapping_add(1);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to decode frame: {:?}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to capture frame: {:?}", e);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }

        let _ = camera.stop_stream();
        tracing::info!("Camera capture thread stopped");
    }

    /// Get the latest captured frame
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        let idx = self.latest_frame_idx.load(Ordering::Acquire);
        let slot = (idx % 3) as usize;
        self.frames[slot].lock().clone()
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get the requested resolution
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
