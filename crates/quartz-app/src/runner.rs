//! Application runner and event loop.

use std::path::PathBuf;
use std::sync::Arc;

use quartz_gpu::{GpuContext, GpuContextBuilder};
use quartz_platform::{create_window, WindowConfig};
use quartz_render::Renderer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Window settings.
    pub window: WindowConfig,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Directory holding the compiled SPIR-V shaders.
    pub shader_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("res/shaders"),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given window title.
    pub fn new(title: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.window.title = title.into();
        config
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the shader directory.
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }
}

/// Run the client with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and runs the
/// event loop until the window closes.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.window.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        state: None,
    };

    if let Err(e) = event_loop.run_app(&mut runner) {
        error!("Event loop error: {e}");
    }

    Ok(())
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
}

/// Internal application state.
struct AppState {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else { return };
                match state.render_frame() {
                    Ok(()) => state.window.request_redraw(),
                    // Anything but out-of-date is fatal; stop rendering
                    // rather than retrying a dead device every frame.
                    Err(e) => {
                        error!("Render error: {e}");
                        self.shutdown(event_loop);
                    }
                }
            }
            WindowEvent::Resized(size) => {
                let Some(state) = &mut self.state else { return };
                if let Err(e) = state.handle_resize(size) {
                    error!("Resize error: {e}");
                    self.shutdown(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppRunner {
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
        event_loop.exit();
    }

    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_config = &self.config.window;
        let window = Arc::new(create_window(event_loop, window_config)?);
        let size = window.inner_size();

        let gpu = GpuContextBuilder::new()
            .app_name(&window_config.title)
            .validation(self.config.validation)
            .build(window.as_ref())?;

        let renderer = Renderer::new(&gpu, size.width, size.height, &self.config.shader_dir)?;

        Ok(AppState {
            window,
            gpu,
            renderer,
        })
    }
}

impl AppState {
    fn render_frame(&mut self) -> anyhow::Result<()> {
        match self.renderer.draw_frame(&self.gpu) {
            Ok(()) => Ok(()),
            Err(e) if e.is_swapchain_out_of_date() => {
                warn!("Swapchain out of date, recreating");
                let size = self.window.inner_size();
                self.renderer.recreate(&self.gpu, size.width, size.height)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<()> {
        if size.width == 0 || size.height == 0 {
            // Minimized; nothing to present until a real size comes back
            return Ok(());
        }

        self.renderer.recreate(&self.gpu, size.width, size.height)?;
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.renderer.destroy(&self.gpu) {
            error!("Shutdown error: {e}");
        }
    }
}
