//! Synchronization primitives.

use crate::error::Result;
use ash::vk;

/// Create a binary semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
    Ok(semaphore)
}

/// Single-buffered frame synchronization pair.
///
/// One set suffices because at most one frame is ever in flight: the
/// renderer waits for the presentation queue to drain after every present.
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is available.
    pub image_available: vk::Semaphore,
    /// Signaled when rendering to the image has finished.
    pub render_finished: vk::Semaphore,
}

impl FrameSync {
    /// Create the semaphore pair.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: unsafe { create_semaphore(device)? },
            render_finished: unsafe { create_semaphore(device)? },
        })
    }

    /// Destroy both semaphores.
    ///
    /// # Safety
    /// The device must be valid and the semaphores must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
        }
    }
}
