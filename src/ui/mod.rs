//! egui overlay
//!
//! Drawn over the canvas each frame: effect buttons, model status,
//! FPS and key hints. The overlay never touches the sketch directly;
//! it reports what the user asked for through `UiActions`.

use crate::effects::EffectType;
use crate::sketch::SketchStatus;
use crate::telemetry::FrameStats;

/// Text shown while the segmentation model loads
pub const LOADING_MESSAGE: &str = "Loading AI model...";

/// Key hints shown at the bottom of the window
pub const KEY_HINTS: &str = "C clear   S save   1-3 effects   F11 fullscreen   Esc quit";

/// Snapshot for one overlay frame
pub struct OverlayState<'a> {
    pub effect: EffectType,
    pub status: &'a SketchStatus,
    pub fps: f64,
    pub target_fps: u32,
    pub frame_stats: &'a FrameStats,
    /// Duration of the most recent frame in milliseconds
    pub last_frame_ms: f64,
    /// Camera description, or `None` when no camera is open
    pub camera: Option<&'a str>,
    /// Transient message such as a saved snapshot path
    pub notice: Option<&'a str>,
}

/// User requests collected from the overlay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiActions {
    pub select_effect: Option<EffectType>,
    pub clear_trails: bool,
    pub save_snapshot: bool,
}

impl UiActions {
    pub fn is_empty(&self) -> bool {
        self.select_effect.is_none() && !self.clear_trails && !self.save_snapshot
    }
}

/// Actions for a typed character.
///
/// Matches the text the key produces rather than its position, so the
/// shortcuts follow the active keyboard layout. Letters ignore case.
pub fn shortcut_actions(text: &str) -> UiActions {
    let mut actions = UiActions::default();
    let mut chars = text.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return actions;
    };

    match c.to_ascii_lowercase() {
        'c' => actions.clear_trails = true,
        's' => actions.save_snapshot = true,
        '1'..='9' => {
            let index = c as usize - '1' as usize;
            actions.select_effect = EffectType::from_index(index);
        }
        _ => {}
    }
    actions
}

/// Overlay label for an open camera
pub fn camera_label(name: &str, (width, height): (u32, u32)) -> String {
    format!("{} ({}x{})", name, width, height)
}

/// Message for the center of the screen, if any
pub fn status_message(status: &SketchStatus) -> Option<String> {
    match status {
        SketchStatus::Loading => Some(LOADING_MESSAGE.to_string()),
        SketchStatus::ModelFailed(msg) => Some(format!("Segmentation model unavailable: {}", msg)),
        SketchStatus::Rendered => None,
    }
}

/// Draw the overlay and collect actions
pub fn draw_overlay(ctx: &egui::Context, state: &OverlayState<'_>) -> UiActions {
    let mut actions = UiActions::default();

    egui::TopBottomPanel::top("effects_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Camera Trails").strong());
            ui.separator();

            for (index, effect) in EffectType::all().iter().enumerate() {
                let label = format!("{} {}", index + 1, effect.display_name());
                if ui.selectable_label(*effect == state.effect, label).clicked() {
                    actions.select_effect = Some(*effect);
                }
            }

            ui.separator();
            if ui.button("Clear").clicked() {
                actions.clear_trails = true;
            }
            if ui.button("Save").clicked() {
                actions.save_snapshot = true;
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!("{:.1} fps", state.fps))
                        .color(fps_color(state.fps, state.target_fps))
                        .monospace(),
                )
                .on_hover_text(format!(
                    "last {:.2} ms  avg {:.2} ms  p95 {:.2} ms  p99 {:.2} ms",
                    state.last_frame_ms,
                    state.frame_stats.avg_ms,
                    state.frame_stats.p95_ms,
                    state.frame_stats.p99_ms
                ));
                ui.separator();
                ui.label(state.camera.unwrap_or("No camera"));
            });
        });
    });

    egui::TopBottomPanel::bottom("hints_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(KEY_HINTS).small().color(egui::Color32::GRAY));
            if let Some(notice) = state.notice {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(notice).small());
                });
            }
        });
    });

    if let Some(message) = status_message(state.status) {
        egui::Area::new(egui::Id::new("status_message"))
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(message)
                        .color(egui::Color32::WHITE)
                        .size(24.0),
                );
            });
    }

    actions
}

/// FPS label color relative to the target
fn fps_color(fps: f64, target_fps: u32) -> egui::Color32 {
    let ratio = fps / f64::from(target_fps.max(1));

    if ratio >= 0.95 {
        egui::Color32::from_rgb(100, 255, 100)
    } else if ratio >= 0.8 {
        egui::Color32::from_rgb(255, 230, 100)
    } else if ratio >= 0.5 {
        egui::Color32::from_rgb(255, 150, 80)
    } else {
        egui::Color32::from_rgb(255, 80, 80)
    }
}
