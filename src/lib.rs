//! Camera Trails - webcam trail and ghosting effects
//!
//! Captures a live camera feed, optionally masks it with an ML person
//! segmentation, and accumulates frames into a persistent trail buffer
//! with switchable effect modes.

pub mod app;
pub mod camera;
pub mod cli;
pub mod compositor;
pub mod effects;
pub mod ml;
pub mod settings;
pub mod sketch;
pub mod telemetry;
pub mod ui;

pub use app::App;
pub use sketch::{Sketch, SketchStatus};
