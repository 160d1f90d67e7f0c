//! Quartz game client.
//!
//! Brings up the Vulkan renderer and draws the interpolated triangle until
//! the window closes.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p quartz-client
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use quartz_app::{run_app, AppConfig};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    run_app(
        AppConfig::new("Quartz Client")
            .with_size(WIDTH, HEIGHT)
            // The build script compiles the GLSL sources into OUT_DIR.
            .with_shader_dir(env!("OUT_DIR")),
    )
}
