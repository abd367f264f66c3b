//! Bladefield - streaming blade field demo
//!
//! Drives the viewer forward through an endless strip of grass cells.
//! Cells stream in ahead and out behind, movement cuts a swath through the
//! blades, and cut state survives the cells leaving and coming back.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowId},
};

use bladefield::core::config::FieldConfig;
use bladefield::core::events::{BladeCutEvent, EventBus};
use bladefield::core::logging;
use bladefield::core::session::SessionState;
use bladefield::field::{BladeField, CellStreamer, CutEngine};
use bladefield::render::context::GpuContext;
use bladefield::render::mesh::BladeMesh;
use bladefield::render::pipeline::draw::{create_depth_texture, DrawPipeline};

use glam::{Mat4, Vec3};

/// How fast the viewer travels down the field, in units per second.
const VIEWER_SPEED: f32 = 4.0;

struct FieldResources {
    field: BladeField,
    cutter: CutEngine,
    streamer: CellStreamer,
    mesh: BladeMesh,
    draw_pipeline: DrawPipeline,
    depth_view: wgpu::TextureView,
    bus: EventBus,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    resources: Option<FieldResources>,
    config: FieldConfig,
    viewer: Vec3,
    session: SessionState,
    last_frame: Instant,
}

impl App {
    fn new(config: FieldConfig) -> Self {
        // Start in the middle of the first row, at mower height.
        let viewer = Vec3::new(config.cell_width * 0.5, 0.5, 0.0);
        Self {
            window: None,
            gpu: None,
            resources: None,
            config,
            viewer,
            session: SessionState::Playing,
            last_frame: Instant::now(),
        }
    }

    fn view_proj(&self, width: u32, height: u32) -> Mat4 {
        let eye = self.viewer + Vec3::new(0.0, 7.0, -9.0);
        let target = self.viewer + Vec3::new(0.0, 0.0, 6.0);
        let aspect = width as f32 / height.max(1) as f32;
        let proj = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 300.0);
        proj * Mat4::look_at_rh(eye, target, Vec3::Y)
    }

    fn toggle_pause(&mut self) {
        self.session = match self.session {
            SessionState::Playing => SessionState::Paused,
            _ => SessionState::Playing,
        };
        if let Some(resources) = &mut self.resources {
            resources.cutter.set_session(self.session);
        }
        log::info!("Session: {:?}", self.session);
    }

    fn update_and_render(&mut self) {
        let Some(gpu) = &self.gpu else { return };

        let dt = self.last_frame.elapsed().as_secs_f32().min(0.1);
        self.last_frame = Instant::now();

        if self.session == SessionState::Playing {
            self.viewer.z += VIEWER_SPEED * dt;
        }

        let (width, height) = gpu.size();
        let view_proj = self.view_proj(width, height);
        let Some(resources) = &mut self.resources else { return };

        // Stream the window, rebuild if anything changed, then cut.
        resources.streamer.advance_gpu(
            self.viewer,
            &mut resources.field,
            &resources.bus,
            &gpu.device,
            &gpu.queue,
        );
        let bounds = resources
            .field
            .tick(&gpu.device, &gpu.queue, resources.mesh.index_count());
        resources.cutter.on_position_update(
            self.viewer,
            &gpu.device,
            &gpu.queue,
            resources.field.buffers(),
            &resources.bus,
        );
        log::trace!("field bounds {:?}", bounds);

        resources
            .draw_pipeline
            .update_camera(&gpu.queue, view_proj);

        let output = match gpu.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                log::error!("Failed to get surface texture: {}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        resources.draw_pipeline.render(
            &gpu.device,
            &mut encoder,
            &view,
            &resources.depth_view,
            &resources.mesh,
            resources.field.buffers(),
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if let Some(window) = &self.window {
            window.set_title(&format!(
                "Bladefield - {} blades, {} cells | Space=pause, Esc=quit",
                resources.field.blade_count(),
                resources.field.active_count(),
            ));
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Bladefield")
            .with_inner_size(PhysicalSize::new(1280, 720));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let gpu = pollster::block_on(GpuContext::new(window.clone()))
            .expect("Failed to create GPU context");

        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);
        log::info!("GPU: {}", gpu.adapter.get_info().name);

        let mesh = BladeMesh::new(&gpu.device, &gpu.queue);
        let draw_pipeline = DrawPipeline::new(&gpu.device, gpu.format());
        let depth_view = create_depth_texture(&gpu.device, size.width, size.height);

        let mut cutter = CutEngine::new(&gpu.device, &self.config);
        cutter.set_session(self.session);

        let mut bus = EventBus::new();
        bus.subscribe::<BladeCutEvent>(|e| {
            log::info!(
                "cut at ({:.1}, {:.1}, {:.1}), ~{} blades",
                e.position.x,
                e.position.y,
                e.position.z,
                e.estimated_blades
            );
        });

        let mut field = BladeField::new(self.config.clone());
        let mut streamer = CellStreamer::new(&self.config);
        streamer.advance(self.viewer, &mut field, &bus);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.resources = Some(FieldResources {
            field,
            cutter,
            streamer,
            mesh,
            draw_pipeline,
            depth_view,
            bus,
        });
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.resize(size.width, size.height);
                        if let Some(resources) = &mut self.resources {
                            resources.depth_view =
                                create_depth_texture(&gpu.device, size.width, size.height);
                        }
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    if let winit::keyboard::PhysicalKey::Code(code) = event.physical_key {
                        match code {
                            KeyCode::Escape => event_loop.exit(),
                            KeyCode::Space => self.toggle_pause(),
                            _ => {}
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.update_and_render();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();
    log::info!("Bladefield starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => match FieldConfig::load_sync(std::path::Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded field config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}, using defaults", path, e);
                FieldConfig::default()
            }
        },
        None => FieldConfig::default(),
    };

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = App::new(config);

    event_loop.run_app(&mut app).expect("Event loop error");
}
