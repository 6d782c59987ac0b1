use std::sync::Arc;

use anyhow::Context as _;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::Window,
};

// Import from the library crate
use seascape::{
    assets::{self, AssetPipeline, FileAssetSource},
    config::ViewerConfig,
    controller::{FrameLoopContext, InputEvent},
    logging, ui,
    view::{render::UiFrame, GpuContext, RenderState},
};

struct App {
    window: Arc<Window>,
    render_state: RenderState,
    context: FrameLoopContext,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Mouse look
    dragging: bool,
    last_cursor: Option<(f64, f64)>,

    last_dt: f32,
}

impl App {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new(&instance, surface, size.width, size.height).await?;

        let water_normals = assets::texture::water_normals_or_flat(&config.asset_root);
        let pipeline = AssetPipeline::new(Arc::new(FileAssetSource::new(config.asset_root.clone())));
        let mut context = FrameLoopContext::new(config, pipeline);
        context.camera.set_aspect(size.width.max(1), size.height.max(1));
        context.issue_loads(assets::default_manifest());

        let render_state = RenderState::new(gpu, &water_normals, context.scene.water.extent);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            render_state,
            context,
            egui_state,
            egui_ctx,
            dragging: false,
            last_cursor: None,
            last_dt: 0.0,
        })
    }

    /// Translate a window event into viewer input.
    fn input(&mut self, event: &WindowEvent) {
        // First let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key, .. }, .. } => {
                let PhysicalKey::Code(code) = physical_key else {
                    return;
                };
                match state {
                    ElementState::Pressed if !egui_captured => self.context.push_event(InputEvent::KeyDown(*code)),
                    ElementState::Pressed => {}
                    // key-ups always go through so movement never sticks
                    ElementState::Released => self.context.push_event(InputEvent::KeyUp(*code)),
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                match state {
                    ElementState::Pressed => {
                        self.dragging = !egui_captured && !self.egui_ctx.is_pointer_over_area();
                    }
                    ElementState::Released => self.dragging = false,
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging {
                    if let Some((lx, ly)) = self.last_cursor {
                        self.context.push_event(InputEvent::Look {
                            dx: (position.x - lx) as f32,
                            dy: (position.y - ly) as f32,
                        });
                    }
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::Focused(false) => {
                self.dragging = false;
                self.context.push_event(InputEvent::FocusLost);
            }
            WindowEvent::Resized(size) => {
                self.context.push_event(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            _ => {}
        }
    }

    fn render_ui(&mut self) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let snapshot = ui::UiSnapshot {
            sun: self.context.sun(),
            submarine: self.context.submarine_pose(),
            camera_eye: self.context.camera.eye,
            loads: self.context.load_counts(),
            dt: self.last_dt,
        };
        let (output, events) = ui::build_ui(&self.egui_ctx, raw_input, &snapshot);
        for event in events {
            self.context.push_event(event);
        }

        self.egui_state.handle_platform_output(&self.window, output.platform_output);
        let primitives = self.egui_ctx.tessellate(output.shapes, output.pixels_per_point);
        self.render_state.set_ui(UiFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        });
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        self.render_ui();
        self.last_dt = self.context.frame(&mut self.render_state)?;
        Ok(())
    }
}

#[allow(deprecated)]
fn main() -> anyhow::Result<()> {
    logging::init();
    let config = ViewerConfig::from_env();
    tracing::info!("asset root: {}", config.asset_root.display());

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window.clone(), &config)).context("failed to initialise renderer")?;

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::RedrawRequested => {
                        if let Err(e) = app.redraw() {
                            tracing::error!("render failed: {e:#}");
                            elwt.exit();
                        }
                    }
                    _ => app.input(event),
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
