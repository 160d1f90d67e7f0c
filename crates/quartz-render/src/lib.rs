//! Rendering layer for the Quartz client.
//!
//! Builds on `quartz-gpu` to provide:
//! - Render pass and graphics pipeline construction
//! - Vertex formats and vertex buffers
//! - The frame renderer driving acquire, record, submit, present

pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod vertex;
pub mod vertex_buffer;

pub use error::{RenderError, Result};
pub use pipeline::TrianglePipeline;
pub use renderer::Renderer;
pub use vertex::{Vertex, TRIANGLE};
pub use vertex_buffer::VertexBuffer;
