//! Swapchain negotiation and management.

use crate::error::{GpuError, Result};
use ash::vk;

/// The format requested when the surface offers it: 8-bit BGRA sRGB.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Select the surface format: prefer 8-bit BGRA sRGB, else the first entry.
///
/// A presentable surface always reports at least one format; an empty list
/// falls back to the preferred format rather than panicking.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    for format in available {
        if format.format == PREFERRED_SURFACE_FORMAT.format
            && format.color_space == PREFERRED_SURFACE_FORMAT.color_space
        {
            return *format;
        }
    }

    available.first().copied().unwrap_or(PREFERRED_SURFACE_FORMAT)
}

/// Select the present mode: prefer mailbox, else FIFO (always available).
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    for &mode in available {
        if mode == vk::PresentModeKHR::MAILBOX {
            return mode;
        }
    }

    vk::PresentModeKHR::FIFO
}

/// Calculate the swapchain extent.
///
/// A current-extent width of `u32::MAX` means the surface lets the client
/// decide; in that case the window size is clamped into the surface bounds.
/// Otherwise the surface-reported extent is used verbatim.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_width: u32,
    window_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Request one image beyond the surface minimum, respecting the maximum
/// when the surface reports one (zero means unbounded).
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

/// Decide the image sharing mode between the graphics and presentation
/// families. Differing families share concurrently across both indices;
/// a shared family uses exclusive access.
pub fn select_sharing_mode(
    graphics_family: u32,
    presentation_family: u32,
) -> (vk::SharingMode, Vec<u32>) {
    if graphics_family == presentation_family {
        (vk::SharingMode::EXCLUSIVE, vec![])
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![graphics_family, presentation_family],
        )
    }
}

/// Swapchain wrapper owning the per-image views.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain and derive one 2D color view per image.
    ///
    /// # Safety
    /// All handles must be valid.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        surface_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        extent: vk::Extent2D,
        graphics_family: u32,
        presentation_family: u32,
    ) -> Result<Self> {
        let image_count = select_image_count(surface_capabilities);
        let (sharing_mode, queue_families) =
            select_sharing_mode(graphics_family, presentation_family);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&queue_families)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain)? };

        let image_views: Vec<_> = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    );

                unsafe { device.create_image_view(&view_info, None) }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
        })
    }

    /// Acquire the next image, signaled by `semaphore`.
    ///
    /// Returns the image index. An out-of-date swapchain surfaces as the
    /// recoverable [`GpuError::SwapchainOutOfDate`]; the caller must
    /// recreate before acquiring again.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire_next_image(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<u32> {
        let result = unsafe {
            swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, _suboptimal)) => Ok(index),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GpuError::SwapchainOutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an image on the given queue.
    ///
    /// # Safety
    /// All handles must be valid and the image must have been acquired.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<()> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { swapchain_loader.queue_present(queue, &present_info) };

        match result {
            Ok(_suboptimal) => Ok(()),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GpuError::SwapchainOutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Destroy the image views only. The views are index-aligned with the
    /// images; both go away together.
    ///
    /// # Safety
    /// The views must not be in use.
    pub unsafe fn destroy_views(&self, device: &ash::Device) {
        for &view in &self.image_views {
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    /// Destroy the views and the swapchain handle.
    ///
    /// # Safety
    /// All handles must be valid and the swapchain must not be in use.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        unsafe {
            self.destroy_views(device);
            swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFERRED: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    const RGBA_SRGB: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    fn caps(
        min_count: u32,
        max_count: u32,
        current: (u32, u32),
        min_extent: (u32, u32),
        max_extent: (u32, u32),
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min_extent.0,
                height: min_extent.1,
            },
            max_image_extent: vk::Extent2D {
                width: max_extent.0,
                height: max_extent.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn preferred_format_is_chosen_when_present() {
        let chosen = select_surface_format(&[RGBA_SRGB, PREFERRED]);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn first_format_is_the_fallback() {
        let chosen = select_surface_format(&[
            RGBA_SRGB,
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ]);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn empty_format_list_yields_the_preferred_format() {
        let chosen = select_surface_format(&[]);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn mailbox_preferred_else_fifo() {
        assert_eq!(
            select_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn bounded_current_extent_is_used_verbatim() {
        let caps = caps(2, 0, (800, 600), (1, 1), (4096, 4096));
        let extent = calculate_extent(&caps, 1280, 720);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn sentinel_extent_clamps_window_size() {
        let caps = caps(2, 0, (u32::MAX, u32::MAX), (320, 240), (1024, 768));
        let extent = calculate_extent(&caps, 1280, 100);
        assert_eq!((extent.width, extent.height), (1024, 240));
    }

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(select_image_count(&caps(2, 0, (1, 1), (1, 1), (1, 1))), 3);
        assert_eq!(select_image_count(&caps(3, 8, (1, 1), (1, 1), (1, 1))), 4);
    }

    #[test]
    fn image_count_respects_surface_maximum() {
        assert_eq!(select_image_count(&caps(3, 3, (1, 1), (1, 1), (1, 1))), 3);
    }

    #[test]
    fn distinct_families_share_concurrently() {
        let (mode, families) = select_sharing_mode(0, 2);
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(families, vec![0, 2]);
    }

    #[test]
    fn shared_family_is_exclusive() {
        let (mode, families) = select_sharing_mode(1, 1);
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(families.is_empty());
    }
}
