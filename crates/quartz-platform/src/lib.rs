//! Platform abstraction for the Quartz client.
//!
//! Provides window configuration and creation via winit.

use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Quartz".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Create a window from a configuration on a running event loop.
pub fn create_window(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Window> {
    let attrs = Window::default_attributes()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    event_loop
        .create_window(attrs)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_resizable_720p() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.resizable);
    }
}
