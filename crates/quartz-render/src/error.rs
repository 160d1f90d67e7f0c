//! Renderer error types.

use ash::vk;
use quartz_gpu::GpuError;
use thiserror::Error;

/// Renderer-level errors.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Error from the GPU abstraction layer.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

impl RenderError {
    /// True when the failure means the swapchain must be recreated rather
    /// than the process aborted.
    pub fn is_swapchain_out_of_date(&self) -> bool {
        matches!(self, Self::Gpu(GpuError::SwapchainOutOfDate))
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_date_is_the_only_recoverable_error() {
        let recoverable = RenderError::from(GpuError::SwapchainOutOfDate);
        assert!(recoverable.is_swapchain_out_of_date());

        // Device loss and surface loss must stay fatal so the frame loop
        // stops instead of retrying them forever.
        let device_lost = RenderError::from(vk::Result::ERROR_DEVICE_LOST);
        assert!(!device_lost.is_swapchain_out_of_date());

        let surface_lost = RenderError::from(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR));
        assert!(!surface_lost.is_swapchain_out_of_date());

        let gone = RenderError::from(GpuError::InvalidState(
            "Swapchain resources are gone".to_string(),
        ));
        assert!(!gone.is_swapchain_out_of_date());
    }
}
