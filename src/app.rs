//! Application state holding the wgpu graphics context
//!
//! The sketch composites on the CPU; this module owns the window surface,
//! uploads the finished canvas each frame and draws the egui overlay on top.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::camera::CameraCapture;
use crate::compositor::PixelBuffer;
use crate::effects::EffectType;
use crate::ml::{ModelStatus, SegmentationEngine};
use crate::settings::TrailSettings;
use crate::sketch::{Sketch, SketchStatus};
use crate::telemetry::FrameProfiler;
use crate::ui::{self, OverlayState, UiActions};

/// How long a notice (e.g. a saved snapshot) stays on screen
const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Canvas texture and its bind group, recreated on resize
struct CanvasTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Main application state
pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    // Canvas presentation
    canvas: CanvasTexture,
    present_pipeline: wgpu::RenderPipeline,
    present_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    // Inputs
    camera: Option<CameraCapture>,
    camera_label: Option<String>,
    last_camera_frame: u64,
    video: Option<PixelBuffer>,
    segmentation: Option<SegmentationEngine>,
    last_mask_frame: u64,

    // Sketch
    sketch: Sketch,
    status: SketchStatus,
    snapshot_dir: PathBuf,
    target_fps: u32,

    // egui integration
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    profiler: FrameProfiler,
    notice: Option<(String, Instant)>,
}

impl App {
    /// Create the graphics context, open the camera and start segmentation
    pub async fn new(window: Arc<Window>, settings: &TrailSettings) -> Result<Self, String> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| "Failed to find suitable GPU adapter".to_string())?;

        tracing::info!(
            gpu = %adapter.get_info().name,
            backend = ?adapter.get_info().backend,
            "Using GPU"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Camera Trails Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to create device: {}", e))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| "Surface reports no formats".to_string())?;

        let present_mode = if surface_caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };

        tracing::debug!(?surface_format, ?present_mode, "Configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        // Nearest sampling keeps the pixel look of noSmooth
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Passthrough Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/passthrough.wgsl").into()),
        });

        let present_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas Pipeline Layout"),
            bind_group_layouts: &[&present_bind_group_layout],
            push_constant_ranges: &[],
        });

        let present_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Canvas Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sketch = Sketch::from_settings(settings, config.width, config.height);
        let canvas = create_canvas_texture(
            &device,
            &present_bind_group_layout,
            &sampler,
            config.width,
            config.height,
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        let mut app = Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            canvas,
            present_pipeline,
            present_bind_group_layout,
            sampler,
            camera: None,
            camera_label: None,
            last_camera_frame: 0,
            video: None,
            segmentation: None,
            last_mask_frame: 0,
            sketch,
            status: SketchStatus::Loading,
            snapshot_dir: settings.snapshot_dir(),
            target_fps: settings.target_fps,
            egui_ctx,
            egui_state,
            egui_renderer,
            profiler: FrameProfiler::default(),
            notice: None,
        };

        app.connect_camera(settings.camera_index, settings.video_width, settings.video_height);
        app.start_segmentation(settings);

        Ok(app)
    }

    /// Open a camera. Failure leaves the sketch running on the trail alone.
    pub fn connect_camera(&mut self, camera_index: u32, width: u32, height: u32) {
        tracing::info!(camera_index, width, height, "Connecting to camera");

        match CameraCapture::new(camera_index, width, height) {
            Ok(capture) => {
                let name = CameraCapture::list_cameras()
                    .into_iter()
                    .find(|c| c.index == camera_index)
                    .map(|c| c.name)
                    .unwrap_or_else(|| format!("Camera {}", camera_index));
                self.camera_label = Some(ui::camera_label(&name, capture.resolution()));
                self.camera = Some(capture);
                self.last_camera_frame = 0;
            }
            Err(e) => {
                tracing::error!("Failed to connect camera: {}", e);
                self.camera_label = None;
            }
        }
    }

    /// Start loading the segmentation model in the background
    fn start_segmentation(&mut self, settings: &TrailSettings) {
        match SegmentationEngine::start_onnx(settings.segmentation_config()) {
            Ok(engine) => self.segmentation = Some(engine),
            Err(e) => {
                tracing::warn!("Failed to start segmentation: {}", e);
                self.sketch.set_model_status(ModelStatus::Failed(e.to_string()));
            }
        }
    }

    /// Handle a window event, returning true if egui consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        response.consumed
    }

    /// Resize the surface, the sketch buffers and the canvas texture
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.sketch.resize(new_size.width, new_size.height);
        self.canvas = create_canvas_texture(
            &self.device,
            &self.present_bind_group_layout,
            &self.sampler,
            new_size.width,
            new_size.height,
        );
        tracing::debug!(width = new_size.width, height = new_size.height, "Resized canvas");
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Poll the camera and conform a new frame to the video size
    pub fn update_camera(&mut self) {
        let Some(camera) = &self.camera else { return };
        let Some(frame) = camera.latest_frame() else { return };

        if frame.frame_number <= self.last_camera_frame {
            return;
        }
        self.last_camera_frame = frame.frame_number;

        let (width, height) = self.sketch.video_size();
        let video = frame.to_pixel_buffer(width, height);

        if let Some(engine) = &self.segmentation {
            engine.submit(&video, frame.frame_number);
        }
        self.video = Some(video);
    }

    /// Pull model status and the newest mask into the sketch
    pub fn update_segmentation(&mut self) {
        let Some(engine) = &self.segmentation else { return };

        self.sketch.set_model_status(engine.status());

        if let Some((mask, frame_number)) = engine.latest() {
            if frame_number != self.last_mask_frame {
                self.last_mask_frame = frame_number;
                self.sketch.set_mask(Some(mask));
            }
        }
    }

    /// Run the sketch for one frame
    pub fn draw_frame(&mut self) {
        self.profiler.begin_frame();
        self.status = self.sketch.draw(self.video.as_ref());
    }

    pub fn clear_trails(&mut self) {
        tracing::info!("Clearing trails");
        self.sketch.clear_trails();
    }

    /// Export the canvas as a PNG
    pub fn save_snapshot(&mut self) {
        match self.sketch.save_snapshot(&self.snapshot_dir) {
            Ok(path) => self.show_notice(format!("Saved {}", path.display())),
            Err(e) => {
                tracing::warn!("Failed to save snapshot: {}", e);
                self.show_notice(format!("Snapshot failed: {}", e));
            }
        }
    }

    pub fn select_effect(&mut self, effect: EffectType) {
        self.sketch.select_effect(effect);
    }

    /// Apply actions from the overlay or a keyboard shortcut
    pub fn apply_actions(&mut self, actions: &UiActions) {
        if let Some(effect) = actions.select_effect {
            self.select_effect(effect);
        }
        if actions.clear_trails {
            self.clear_trails();
        }
        if actions.save_snapshot {
            self.save_snapshot();
        }
    }

    fn show_notice(&mut self, message: String) {
        self.notice = Some((message, Instant::now()));
    }

    /// Upload the canvas, present it and draw the overlay
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.upload_canvas();

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.present_pipeline);
            render_pass.set_bind_group(0, &self.canvas.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.render_ui(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn upload_canvas(&self) {
        let canvas = self.sketch.canvas();
        let size = self.canvas.texture.size();
        if canvas.width() != size.width || canvas.height() != size.height {
            tracing::warn!("Canvas and texture sizes differ, skipping upload");
            return;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.canvas.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            canvas.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(canvas.width() * 4),
                rows_per_image: Some(canvas.height()),
            },
            size,
        );
    }

    fn render_ui(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        if let Some((_, shown_at)) = &self.notice {
            if shown_at.elapsed() > NOTICE_DURATION {
                self.notice = None;
            }
        }

        let frame_stats = self.profiler.stats();
        let state = OverlayState {
            effect: self.sketch.effect(),
            status: &self.status,
            fps: self.profiler.fps(),
            target_fps: self.target_fps,
            frame_stats: &frame_stats,
            last_frame_ms: self.profiler.last_frame_time_ms(),
            camera: self.camera_label.as_deref(),
            notice: self.notice.as_ref().map(|(msg, _)| msg.as_str()),
        };

        let mut actions = UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            actions = ui::draw_overlay(ctx, &state);
        });
        self.apply_actions(&actions);

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        if let Some(mut engine) = self.segmentation.take() {
            engine.stop();
        }
    }
}

fn create_canvas_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
) -> CanvasTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Canvas Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Canvas Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    CanvasTexture { texture, bind_group }
}
