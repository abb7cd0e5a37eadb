//! Camera Trails - Main Entry Point

use std::sync::Arc;
use std::time::{Duration, Instant};

use camera_trails::camera::CameraCapture;
use camera_trails::cli::Args;
use camera_trails::effects::EffectType;
use camera_trails::settings::TrailSettings;
use camera_trails::telemetry::init_logging;
use camera_trails::ui::shortcut_actions;
use camera_trails::App;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, KeyCode, NamedKey, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Camera Trails";

/// Application state machine
enum AppState {
    /// Initial state before window is created
    Uninitialized,
    /// Window and graphics context are ready
    Running { window: Arc<Window>, app: App },
}

/// winit handler driving the sketch at the target frame rate
struct CameraTrailsApp {
    state: AppState,
    settings: TrailSettings,
    frame_duration: Duration,
    next_redraw_at: Instant,
}

impl CameraTrailsApp {
    fn new(settings: TrailSettings) -> Self {
        let frame_duration = Duration::from_nanos(1_000_000_000u64 / u64::from(settings.target_fps.max(1)));
        Self {
            state: AppState::Uninitialized,
            settings,
            frame_duration,
            next_redraw_at: Instant::now(),
        }
    }
}

impl ApplicationHandler for CameraTrailsApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Uninitialized) {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(
                self.settings.window_width,
                self.settings.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        tracing::info!(
            width = window.inner_size().width,
            height = window.inner_size().height,
            "Window created"
        );

        match pollster::block_on(App::new(window.clone(), &self.settings)) {
            Ok(app) => {
                tracing::info!(effect = self.settings.initial_effect.id(), "Camera Trails ready");
                self.state = AppState::Running { window, app };
            }
            Err(e) => {
                tracing::error!("Failed to initialize graphics: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running { window, app } = &mut self.state else {
            return;
        };

        // Let egui handle the event first
        let egui_consumed = app.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !egui_consumed => match logical_key {
                Key::Named(NamedKey::Escape) => {
                    tracing::info!("Escape pressed, exiting...");
                    event_loop.exit();
                }
                Key::Named(NamedKey::F11) => {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                    } else {
                        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                    }
                }
                Key::Character(text) => {
                    let mut actions = shortcut_actions(text.as_str());
                    // Digit row on layouts where it types symbols unshifted
                    if actions.is_empty() {
                        actions.select_effect = match physical_key {
                            PhysicalKey::Code(KeyCode::Digit1) => Some(EffectType::BodyTrails),
                            PhysicalKey::Code(KeyCode::Digit2) => Some(EffectType::ColorTrip),
                            PhysicalKey::Code(KeyCode::Digit3) => Some(EffectType::Natural),
                            _ => None,
                        };
                    }
                    app.apply_actions(&actions);
                }
                _ => {}
            },

            WindowEvent::Resized(physical_size) => {
                app.resize(physical_size);
            }

            WindowEvent::RedrawRequested => {
                app.update_camera();
                app.update_segmentation();
                app.draw_frame();

                match app.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        tracing::warn!("Surface lost, reconfiguring...");
                        app.resize(app.size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(e) => {
                        tracing::warn!("Surface error: {:?}", e);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running { window, .. } = &self.state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        let now = Instant::now();
        if now >= self.next_redraw_at {
            window.request_redraw();
            self.next_redraw_at += self.frame_duration;

            // Reset if too far behind
            if now > self.next_redraw_at + self.frame_duration * 2 {
                self.next_redraw_at = now + self.frame_duration;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_redraw_at));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _log_guard = match init_logging(&args.log_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if args.list_cameras {
        for camera in CameraCapture::list_cameras() {
            println!("{}: {}", camera.index, camera.name);
        }
        return Ok(());
    }

    let mut settings = match TrailSettings::load(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings: {}. Using defaults.", e);
            TrailSettings::default()
        }
    };
    args.apply_to(&mut settings);

    tracing::info!(
        effect = settings.initial_effect.id(),
        camera = settings.camera_index,
        fps = settings.target_fps,
        "Starting Camera Trails"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut handler = CameraTrailsApp::new(settings);
    event_loop.run_app(&mut handler)?;

    Ok(())
}
