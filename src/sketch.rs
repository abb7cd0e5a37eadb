//! Per-frame render callback
//!
//! `Sketch` owns the visible canvas and the persistent trail buffer, and
//! runs the selected effect once per redraw. The host loop feeds it video
//! frames and segmentation results; it never blocks on either.

use std::path::{Path, PathBuf};

use crate::compositor::buffer::OPAQUE_BLACK;
use crate::compositor::{BufferError, PixelBuffer, Placement};
use crate::effects::{BodyTrailsEffect, ColorTripEffect, EffectType, FrameContext, NaturalEffect, TrailEffect};
use crate::ml::{ModelStatus, PersonMask};
use crate::settings::TrailSettings;

/// Outcome of a single `draw`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SketchStatus {
    /// Effect needs the segmentation model, which is still loading
    Loading,
    /// Effect needs the segmentation model, which failed to load
    ModelFailed(String),
    /// Effect ran and the canvas holds a new frame
    Rendered,
}

/// Errors from snapshot export
#[derive(Debug)]
pub enum SnapshotError {
    /// Snapshot directory could not be created
    Io(std::io::Error),
    /// Canvas could not be encoded
    Encode(BufferError),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "snapshot IO error: {}", e),
            SnapshotError::Encode(e) => write!(f, "snapshot encode error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Webcam trails sketch
pub struct Sketch {
    canvas: PixelBuffer,
    trail: PixelBuffer,
    video_width: u32,
    video_height: u32,

    body_trails: BodyTrailsEffect,
    color_trip: ColorTripEffect,
    natural: NaturalEffect,
    effect: EffectType,

    frame_count: u64,
    hue: f32,
    hue_step: f32,
    placement: Placement,

    mask: Option<PersonMask>,
    model_status: ModelStatus,
    snapshot_name: String,
}

impl Sketch {
    /// Create a sketch with default effect parameters
    pub fn new(width: u32, height: u32, video_width: u32, video_height: u32) -> Self {
        let video_width = video_width.max(1);
        let video_height = video_height.max(1);
        Self {
            canvas: PixelBuffer::filled(width, height, OPAQUE_BLACK),
            trail: PixelBuffer::filled(width, height, OPAQUE_BLACK),
            video_width,
            video_height,
            body_trails: BodyTrailsEffect::new(
                EffectType::BodyTrails.default_settings().frame_skip,
                video_width,
                video_height,
            ),
            color_trip: ColorTripEffect::default(),
            natural: NaturalEffect::default(),
            effect: EffectType::default(),
            frame_count: 0,
            hue: 0.0,
            hue_step: 0.5,
            placement: Placement::MIRRORED,
            mask: None,
            model_status: ModelStatus::Loading,
            snapshot_name: "trails-artwork".to_string(),
        }
    }

    /// Create a sketch sized to the window and configured from settings
    pub fn from_settings(settings: &TrailSettings, width: u32, height: u32) -> Self {
        let mut sketch = Self::new(width, height, settings.video_width, settings.video_height);
        sketch
            .body_trails
            .set_frame_skip(settings.frame_skip(EffectType::BodyTrails));
        sketch
            .color_trip
            .set_frame_skip(settings.frame_skip(EffectType::ColorTrip));
        sketch
            .color_trip
            .set_tint(settings.tint_saturation, settings.tint_brightness);
        sketch
            .natural
            .set_frame_skip(settings.frame_skip(EffectType::Natural));
        sketch.effect = settings.initial_effect;
        sketch.hue_step = settings.hue_step;
        sketch.placement = Placement {
            mirror_x: settings.mirror,
        };
        sketch.snapshot_name = settings.snapshot_name.clone();
        sketch
    }

    /// Render one frame.
    ///
    /// `video` must already be conformed to the sketch's video size.
    pub fn draw(&mut self, video: Option<&PixelBuffer>) -> SketchStatus {
        self.frame_count += 1;
        self.hue = (self.hue + self.hue_step).rem_euclid(360.0);

        if self.effect.needs_segmentation() {
            match &self.model_status {
                ModelStatus::Ready => {}
                ModelStatus::Loading => {
                    self.canvas.fill(OPAQUE_BLACK);
                    return SketchStatus::Loading;
                }
                ModelStatus::Failed(msg) => {
                    self.canvas.fill(OPAQUE_BLACK);
                    return SketchStatus::ModelFailed(msg.clone());
                }
            }
        }

        let ctx = FrameContext {
            frame_count: self.frame_count,
            hue: self.hue,
            video,
            mask: self.mask.as_ref(),
            placement: self.placement,
        };

        let effect: &mut dyn TrailEffect = match self.effect {
            EffectType::BodyTrails => &mut self.body_trails,
            EffectType::ColorTrip => &mut self.color_trip,
            EffectType::Natural => &mut self.natural,
        };
        effect.draw(&ctx, &mut self.trail, &mut self.canvas);

        SketchStatus::Rendered
    }

    /// Replace the person mask. `None` keeps the previous one.
    pub fn set_mask(&mut self, mask: Option<PersonMask>) {
        if let Some(mask) = mask {
            self.mask = Some(mask);
        }
    }

    /// Update the segmentation model status
    pub fn set_model_status(&mut self, status: ModelStatus) {
        if status != self.model_status {
            tracing::debug!(?status, "Segmentation model status changed");
            self.model_status = status;
        }
    }

    /// Switch effect. The trail is cleared.
    pub fn select_effect(&mut self, effect: EffectType) {
        tracing::info!(effect = effect.id(), "Switching effect");
        self.effect = effect;
        self.clear_trails();
    }

    /// Reset the trail to opaque black
    pub fn clear_trails(&mut self) {
        self.trail.fill(OPAQUE_BLACK);
    }

    /// Reallocate canvas and trail for a new window size
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.canvas.width() && height == self.canvas.height() {
            return;
        }
        self.canvas = PixelBuffer::filled(width, height, OPAQUE_BLACK);
        self.trail = PixelBuffer::filled(width, height, OPAQUE_BLACK);
    }

    /// Write the canvas as a PNG into `dir` without overwriting earlier
    /// snapshots. Returns the written path.
    pub fn save_snapshot(&self, dir: &Path) -> Result<PathBuf, SnapshotError> {
        std::fs::create_dir_all(dir).map_err(SnapshotError::Io)?;
        let path = unique_snapshot_path(dir, &self.snapshot_name);
        self.canvas.save_png(&path).map_err(SnapshotError::Encode)?;
        tracing::info!(path = %path.display(), "Saved snapshot");
        Ok(path)
    }

    pub fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    pub fn trail(&self) -> &PixelBuffer {
        &self.trail
    }

    pub fn effect(&self) -> EffectType {
        self.effect
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current hue in degrees
    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn model_status(&self) -> &ModelStatus {
        &self.model_status
    }

    /// Size video frames must be conformed to before `draw`
    pub fn video_size(&self) -> (u32, u32) {
        (self.video_width, self.video_height)
    }

    /// Silhouettes captured by Body Trails since startup
    pub fn body_captures(&self) -> u64 {
        self.body_trails.captures()
    }
}

/// `<name>.png`, or `<name>-N.png` for the first N not yet taken
fn unique_snapshot_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(format!("{}.png", name));
    if !first.exists() {
        return first;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}.png", name, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn ready_sketch(effect: EffectType) -> Sketch {
        let mut sketch = Sketch::new(4, 2, 4, 2);
        sketch.set_model_status(ModelStatus::Ready);
        sketch.select_effect(effect);
        sketch
    }

    #[test]
    fn test_frame_count_and_hue_advance() {
        let mut sketch = Sketch::new(2, 2, 2, 2);
        sketch.draw(None);
        sketch.draw(None);
        assert_eq!(sketch.frame_count(), 2);
        assert!((sketch.hue() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hue_wraps() {
        let mut sketch = Sketch::new(1, 1, 1, 1);
        sketch.hue_step = 100.0;
        for _ in 0..4 {
            sketch.draw(None);
        }
        assert!((sketch.hue() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_loading_blanks_canvas() {
        let mut sketch = Sketch::new(2, 2, 2, 2);
        let video = PixelBuffer::filled(2, 2, WHITE);

        assert_eq!(sketch.draw(Some(&video)), SketchStatus::Loading);
        assert_eq!(sketch.canvas(), &PixelBuffer::filled(2, 2, OPAQUE_BLACK));
        // Counters still advance while loading
        assert_eq!(sketch.frame_count(), 1);
    }

    #[test]
    fn test_model_failure_reported() {
        let mut sketch = Sketch::new(2, 2, 2, 2);
        sketch.set_model_status(ModelStatus::Failed("no model".to_string()));
        assert_eq!(
            sketch.draw(None),
            SketchStatus::ModelFailed("no model".to_string())
        );
    }

    #[test]
    fn test_effects_without_model_render_while_loading() {
        let mut sketch = Sketch::new(2, 2, 2, 2);
        sketch.select_effect(EffectType::ColorTrip);
        let video = PixelBuffer::filled(2, 2, WHITE);

        assert_eq!(sketch.draw(Some(&video)), SketchStatus::Rendered);
        assert_ne!(sketch.canvas().pixel(0, 0), Some(OPAQUE_BLACK));
    }

    #[test]
    fn test_select_effect_clears_trail() {
        let mut sketch = ready_sketch(EffectType::ColorTrip);
        let video = PixelBuffer::filled(4, 2, WHITE);
        sketch.draw(Some(&video));
        assert_ne!(sketch.trail().pixel(0, 0), Some(OPAQUE_BLACK));

        sketch.select_effect(EffectType::Natural);
        assert_eq!(sketch.effect(), EffectType::Natural);
        assert_eq!(sketch.trail(), &PixelBuffer::filled(4, 2, OPAQUE_BLACK));
    }

    #[test]
    fn test_clear_trails() {
        let mut sketch = ready_sketch(EffectType::ColorTrip);
        sketch.draw(Some(&PixelBuffer::filled(4, 2, WHITE)));
        sketch.clear_trails();
        assert_eq!(sketch.trail(), &PixelBuffer::filled(4, 2, OPAQUE_BLACK));
    }

    #[test]
    fn test_body_trails_uses_latest_mask() {
        let mut sketch = ready_sketch(EffectType::BodyTrails);
        let video = PixelBuffer::filled(4, 2, WHITE);
        let mut mask = PersonMask::empty(4, 2);
        mask.data.iter_mut().for_each(|m| *m = 1);
        sketch.set_mask(Some(mask));
        // A missing update keeps the previous mask
        sketch.set_mask(None);

        assert_eq!(sketch.draw(Some(&video)), SketchStatus::Rendered);
        assert_eq!(sketch.canvas(), &PixelBuffer::filled(4, 2, WHITE));
        // Frame 1 is not a capture frame
        assert_eq!(sketch.body_captures(), 0);
        assert_eq!(sketch.trail(), &PixelBuffer::filled(4, 2, OPAQUE_BLACK));
    }

    #[test]
    fn test_body_trails_capture_interval() {
        let mut sketch = ready_sketch(EffectType::BodyTrails);
        let video = PixelBuffer::filled(4, 2, WHITE);
        let mut mask = PersonMask::empty(4, 2);
        mask.data.iter_mut().for_each(|m| *m = 1);
        sketch.set_mask(Some(mask));

        for _ in 0..30 {
            sketch.draw(Some(&video));
        }
        assert_eq!(sketch.body_captures(), 2);
        assert_eq!(sketch.trail(), &PixelBuffer::filled(4, 2, WHITE));
    }

    #[test]
    fn test_resize_reallocates_black() {
        let mut sketch = ready_sketch(EffectType::ColorTrip);
        sketch.draw(Some(&PixelBuffer::filled(4, 2, WHITE)));

        sketch.resize(0, 3);
        assert_eq!(sketch.canvas().width(), 1);
        assert_eq!(sketch.canvas().height(), 3);
        assert_eq!(sketch.trail(), &PixelBuffer::filled(1, 3, OPAQUE_BLACK));
        assert_eq!(sketch.video_size(), (4, 2));
    }

    #[test]
    fn test_from_settings() {
        let settings = TrailSettings {
            initial_effect: EffectType::Natural,
            natural_frame_skip: 2,
            mirror: false,
            snapshot_name: "piece".to_string(),
            ..Default::default()
        };
        let mut sketch = Sketch::from_settings(&settings, 8, 6);
        assert_eq!(sketch.effect(), EffectType::Natural);
        assert_eq!(sketch.video_size(), (640, 480));
        assert_eq!(sketch.canvas().width(), 8);

        let video = PixelBuffer::filled(640, 480, WHITE);
        sketch.draw(Some(&video));
        assert_eq!(sketch.trail().pixel(0, 0), Some(OPAQUE_BLACK));
        sketch.draw(Some(&video));
        assert_eq!(sketch.trail().pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_snapshot_names_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let sketch = Sketch::new(3, 2, 3, 2);

        let first = sketch.save_snapshot(dir.path()).unwrap();
        let second = sketch.save_snapshot(dir.path()).unwrap();
        let third = sketch.save_snapshot(dir.path()).unwrap();

        assert_eq!(first.file_name().unwrap(), "trails-artwork.png");
        assert_eq!(second.file_name().unwrap(), "trails-artwork-1.png");
        assert_eq!(third.file_name().unwrap(), "trails-artwork-2.png");

        let image = image::open(&first).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, OPAQUE_BLACK);
    }

    #[test]
    fn test_snapshot_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("shots").join("today");
        let sketch = Sketch::new(1, 1, 1, 1);

        let path = sketch.save_snapshot(&nested).unwrap();
        assert!(path.exists());
    }
}
