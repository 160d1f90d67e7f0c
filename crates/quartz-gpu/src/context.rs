//! GPU context management.
//!
//! The [`GpuContext`] is the explicit owner of every device-wide Vulkan
//! object: instance, debug messenger, surface, selected physical device,
//! logical device, queues, and the allocator. It is constructed once at
//! startup and dropped at shutdown; nothing renderer-wide lives in global
//! state.

use crate::debug::DebugMessenger;
use crate::device::{
    create_device, select_physical_device, DeviceCandidate, QueueFamilyIndices, QueueRole,
};
use crate::error::{GpuError, Result};
use crate::instance::create_instance;
use crate::memory::GpuAllocator;
use crate::surface::{SurfaceCapabilities, SurfaceContext};
use crate::swapchain::{calculate_extent, select_present_mode, select_surface_format, Swapchain};
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) debug: Option<DebugMessenger>,
    pub(crate) surface: SurfaceContext,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) allocator: Mutex<GpuAllocator>,

    // Queue families and queues
    pub(crate) graphics_queue_family: QueueFamilyIndices,
    pub(crate) presentation_queue_family: QueueFamilyIndices,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) presentation_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the physical device memory properties.
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the presentation queue.
    pub fn presentation_queue(&self) -> vk::Queue {
        self.presentation_queue
    }

    /// Get the resolved family indices for a queue role.
    pub fn queue_family(&self, role: QueueRole) -> QueueFamilyIndices {
        match role {
            QueueRole::Graphics => self.graphics_queue_family,
            QueueRole::Presentation => self.presentation_queue_family,
        }
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the swapchain extension loader.
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Query the surface capabilities for the selected physical device.
    pub fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        self.surface.capabilities(self.physical_device)
    }

    /// Negotiate and create a swapchain for the current surface state.
    ///
    /// # Safety
    /// The device must be valid and any previous swapchain for this surface
    /// must have been destroyed.
    pub unsafe fn create_swapchain(&self, window_width: u32, window_height: u32) -> Result<Swapchain> {
        let caps = self.surface_capabilities()?;

        let surface_format = select_surface_format(&caps.formats);
        let present_mode = select_present_mode(&caps.present_modes);
        let extent = calculate_extent(&caps.capabilities, window_width, window_height);

        unsafe {
            Swapchain::new(
                self.device(),
                &self.swapchain_loader,
                self.surface.surface,
                &caps.capabilities,
                surface_format,
                present_mode,
                extent,
                self.graphics_queue_family.family,
                self.presentation_queue_family.family,
            )
        }
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }

    /// Wait for the presentation queue to drain.
    pub fn wait_presentation_idle(&self) -> Result<()> {
        unsafe {
            self.device.queue_wait_idle(self.presentation_queue)?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Shutdown allocator BEFORE destroying device
            // This frees all VkDeviceMemory allocations
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            self.surface.destroy();
            if let Some(debug) = &self.debug {
                debug.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Quartz".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Build the GPU context against a window.
    ///
    /// Device selection needs the presentation surface, so the window must
    /// exist before the context.
    pub fn build<W>(self, window: &W) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // Load Vulkan entry point
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        // Create Vulkan instance
        let instance = unsafe { create_instance(&entry, &self.app_name, self.enable_validation) }?;

        let debug = if self.enable_validation {
            Some(unsafe { DebugMessenger::new(&entry, &instance)? })
        } else {
            None
        };

        // Create the presentation surface
        let surface = unsafe { SurfaceContext::new(&entry, &instance, window)? };

        // Select best physical device for this surface
        let candidate = unsafe {
            select_physical_device(&instance, &surface.surface_loader, surface.surface)?
        };

        // Create logical device and fetch per-role queues
        let (device, device_queues) = unsafe { create_device(&instance, &candidate)? };
        let device = Arc::new(device);

        let DeviceCandidate {
            device: physical_device,
            memory_properties,
            queues,
            ..
        } = candidate;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        // Create GPU allocator
        let allocator =
            unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) }?;

        // Suitability guarantees both roles resolved.
        let graphics_queue_family = queues
            .get(QueueRole::Graphics)
            .ok_or(GpuError::NoSuitableDevice)?;
        let presentation_queue_family = queues
            .get(QueueRole::Presentation)
            .ok_or(GpuError::NoSuitableDevice)?;

        Ok(GpuContext {
            entry,
            instance,
            debug,
            surface,
            physical_device,
            memory_properties,
            device,
            swapchain_loader,
            allocator: Mutex::new(allocator),
            graphics_queue_family,
            presentation_queue_family,
            graphics_queue: device_queues.graphics,
            presentation_queue: device_queues.presentation,
        })
    }
}
