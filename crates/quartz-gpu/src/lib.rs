//! Vulkan abstraction layer for the Quartz client.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - Physical device scoring and queue-role resolution
//! - Swapchain negotiation and management
//! - Memory allocation via gpu-allocator
//! - Command buffer and synchronization helpers
//! - SPIR-V shader loading

pub mod command;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod memory;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use context::{GpuContext, GpuContextBuilder};
pub use device::{DeviceCandidate, QueueFamilyIndices, QueueRole};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer};
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::{create_semaphore, FrameSync};
