//! Vulkan instance creation.

use crate::error::Result;
use ash::vk;
use std::ffi::{CStr, CString};

/// Required instance extensions for the client.
///
/// Debug configurations additionally request the debug-utils extension so
/// validation messages can be routed through the messenger.
pub fn required_instance_extensions(enable_validation: bool) -> Vec<&'static CStr> {
    let mut extensions = vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ];

    if enable_validation {
        extensions.push(ash::ext::debug_utils::NAME);
    }

    extensions
}

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Check whether a layer name appears in the enumerated layer list.
fn is_layer_present(name: &CStr, available: &[vk::LayerProperties]) -> bool {
    available.iter().any(|props| {
        // SAFETY: layer_name is a null-terminated string provided by the driver.
        let available_name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
        available_name == name
    })
}

/// Create a Vulkan instance.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name).unwrap_or_else(|_| c"Quartz".to_owned());
    let engine_name = c"Quartz";

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let extension_names: Vec<*const i8> = required_instance_extensions(enable_validation)
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    // Request the validation layer only when it is actually installed.
    let mut layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };

    let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
    layers.retain(|layer| {
        let found = is_layer_present(layer, &available_layers);
        if !found {
            tracing::warn!("Validation layer {:?} not available", layer);
        }
        found
    });

    let layer_names: Vec<*const i8> = layers.iter().map(|l| l.as_ptr()).collect();

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = unsafe { entry.create_instance(&create_info, None)? };

    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_props(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, src) in props.layer_name.iter_mut().zip(name.to_bytes_with_nul()) {
            *dst = *src as i8;
        }
        props
    }

    #[test]
    fn layer_lookup_is_exact() {
        let available = [
            layer_props(c"VK_LAYER_MESA_overlay"),
            layer_props(c"VK_LAYER_KHRONOS_validation"),
        ];
        assert!(is_layer_present(c"VK_LAYER_KHRONOS_validation", &available));
        assert!(!is_layer_present(c"VK_LAYER_KHRONOS_valid", &available));
    }

    #[test]
    fn debug_utils_only_requested_with_validation() {
        assert!(required_instance_extensions(true).contains(&ash::ext::debug_utils::NAME));
        assert!(!required_instance_extensions(false).contains(&ash::ext::debug_utils::NAME));
    }
}
