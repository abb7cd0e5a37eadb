//! CPU compositing
//!
//! Pixel buffers and the fixed-function operations the effects are built
//! from: blend modes, tints, scaled/mirrored draws and segmentation masking.

pub mod blend;
pub mod buffer;
pub mod color;
pub mod draw;
pub mod mask;

pub use blend::BlendMode;
pub use buffer::{BufferError, PixelBuffer};
pub use color::Tint;
pub use draw::{copy_onto, draw_image, Placement};
pub use mask::{apply_person_mask, masked_frame};
