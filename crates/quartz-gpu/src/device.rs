//! Physical device selection and logical device creation.
//!
//! Every enumerated GPU is wrapped in a [`DeviceCandidate`] that caches its
//! properties, resolves queue roles against the presentation surface, and
//! carries a type-based score. Selection keeps the highest-scoring suitable
//! candidate; ties keep the first in enumeration order.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{CStr, CString};

/// Roles a queue family can fill for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    Graphics,
    Presentation,
}

/// Resolved (family, queue) location of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub family: u32,
    pub index: u32,
}

/// Mapping from queue role to its resolved family, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueRoleMap {
    graphics: Option<QueueFamilyIndices>,
    presentation: Option<QueueFamilyIndices>,
}

impl QueueRoleMap {
    /// Get the resolved indices for a role.
    pub fn get(&self, role: QueueRole) -> Option<QueueFamilyIndices> {
        match role {
            QueueRole::Graphics => self.graphics,
            QueueRole::Presentation => self.presentation,
        }
    }

    /// True once every role has a family assigned.
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.presentation.is_some()
    }

    /// Family indices used by the roles, deduplicated, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        for indices in [self.graphics, self.presentation].into_iter().flatten() {
            if !families.contains(&indices.family) {
                families.push(indices.family);
            }
        }
        families
    }
}

/// Score a device type for selection. Higher is preferred.
pub fn score_device_type(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::CPU => 2,
        _ => 1,
    }
}

/// Resolve queue roles by scanning families in index order.
///
/// The first graphics-capable family takes the graphics role and the first
/// family the surface-support predicate accepts takes the presentation role;
/// a single family may fill both. The scan stops early once both roles are
/// resolved.
pub fn resolve_queue_roles<F>(
    families: &[vk::QueueFamilyProperties],
    mut surface_support: F,
) -> Result<QueueRoleMap>
where
    F: FnMut(u32) -> Result<bool>,
{
    let mut roles = QueueRoleMap::default();

    for (i, family) in families.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let i = i as u32;

        if roles.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            roles.graphics = Some(QueueFamilyIndices { family: i, index: 0 });
        }

        if roles.presentation.is_none() && surface_support(i)? {
            roles.presentation = Some(QueueFamilyIndices { family: i, index: 0 });
        }

        if roles.is_complete() {
            break;
        }
    }

    Ok(roles)
}

/// Required device extensions.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// True iff every required extension name appears in the available list.
/// Names are compared byte-for-byte.
pub fn extensions_supported(required: &[&CStr], available: &[CString]) -> bool {
    required
        .iter()
        .all(|req| available.iter().any(|avail| avail.as_c_str() == *req))
}

/// A scored physical device with cached metadata.
pub struct DeviceCandidate {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queues: QueueRoleMap,
    pub score: u32,
    pub extensions_supported: bool,
}

impl DeviceCandidate {
    /// Evaluate a physical device against the surface.
    ///
    /// # Safety
    /// The instance, surface loader, and surface must be valid.
    pub unsafe fn evaluate(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        let (properties, memory_properties, families, available_extensions) = unsafe {
            (
                instance.get_physical_device_properties(device),
                instance.get_physical_device_memory_properties(device),
                instance.get_physical_device_queue_family_properties(device),
                instance.enumerate_device_extension_properties(device)?,
            )
        };

        let available_names: Vec<CString> = available_extensions
            .iter()
            .map(|ext| {
                // SAFETY: extension_name is null-terminated per Vulkan.
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }.to_owned()
            })
            .collect();

        let queues = resolve_queue_roles(&families, |family| {
            let supported = unsafe {
                surface_loader.get_physical_device_surface_support(device, family, surface)?
            };
            Ok(supported)
        })?;

        Ok(Self {
            device,
            properties,
            memory_properties,
            queues,
            score: score_device_type(properties.device_type),
            extensions_supported: extensions_supported(
                &required_device_extensions(),
                &available_names,
            ),
        })
    }

    /// A candidate is suitable iff both queue roles resolved and all
    /// required extensions are present.
    pub fn is_suitable(&self) -> bool {
        self.queues.is_complete() && self.extensions_supported
    }

    /// Device name for logging.
    pub fn name(&self) -> String {
        // SAFETY: device_name is null-terminated per Vulkan.
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Pick the highest-scoring suitable candidate; first encountered wins ties.
pub fn pick_best(candidates: Vec<DeviceCandidate>) -> Result<DeviceCandidate> {
    let mut best: Option<DeviceCandidate> = None;
    for candidate in candidates {
        if !candidate.is_suitable() {
            continue;
        }
        match &best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best.ok_or(GpuError::NoSuitableDevice)
}

/// Enumerate, evaluate, and select the best physical device.
///
/// # Safety
/// The instance, surface loader, and surface must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<DeviceCandidate> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    let mut candidates = Vec::with_capacity(devices.len());
    for device in devices {
        candidates
            .push(unsafe { DeviceCandidate::evaluate(instance, device, surface_loader, surface)? });
    }

    let best = pick_best(candidates)?;
    tracing::info!("Selected \"{}\" for rendering", best.name());
    Ok(best)
}

/// Queue handles fetched from the logical device.
pub struct DeviceQueues {
    pub graphics: vk::Queue,
    pub presentation: vk::Queue,
}

/// Create the logical device and fetch one queue handle per role.
///
/// One queue-create-info is built per unique family index used by either
/// role, each requesting a single queue at priority 1.0.
///
/// # Safety
/// The instance must be valid and the candidate suitable.
pub unsafe fn create_device(
    instance: &ash::Instance,
    candidate: &DeviceCandidate,
) -> Result<(ash::Device, DeviceQueues)> {
    let graphics = candidate
        .queues
        .get(QueueRole::Graphics)
        .ok_or(GpuError::NoSuitableDevice)?;
    let presentation = candidate
        .queues
        .get(QueueRole::Presentation)
        .ok_or(GpuError::NoSuitableDevice)?;

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = candidate
        .queues
        .unique_families()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extensions = required_device_extensions();
    let extension_names: Vec<*const i8> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(candidate.device, &device_create_info, None)? };

    // The selected families are guaranteed to expose at least one queue.
    let queues = unsafe {
        DeviceQueues {
            graphics: device.get_device_queue(graphics.family, graphics.index),
            presentation: device.get_device_queue(presentation.family, presentation.index),
        }
    };

    Ok((device, queues))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(count: u32, flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_count: count,
            queue_flags: flags,
            ..Default::default()
        }
    }

    fn candidate(score: u32, suitable: bool, marker: u32) -> DeviceCandidate {
        let mut queues = QueueRoleMap::default();
        if suitable {
            queues.graphics = Some(QueueFamilyIndices { family: 0, index: 0 });
            queues.presentation = Some(QueueFamilyIndices { family: 0, index: 0 });
        }
        let mut properties = vk::PhysicalDeviceProperties::default();
        // Smuggle an identity through an otherwise unused field.
        properties.vendor_id = marker;
        DeviceCandidate {
            device: vk::PhysicalDevice::null(),
            properties,
            memory_properties: vk::PhysicalDeviceMemoryProperties::default(),
            queues,
            score,
            extensions_supported: suitable,
        }
    }

    #[test]
    fn scores_follow_device_type_ranking() {
        assert_eq!(score_device_type(vk::PhysicalDeviceType::DISCRETE_GPU), 4);
        assert_eq!(score_device_type(vk::PhysicalDeviceType::INTEGRATED_GPU), 3);
        assert_eq!(score_device_type(vk::PhysicalDeviceType::CPU), 2);
        assert_eq!(score_device_type(vk::PhysicalDeviceType::VIRTUAL_GPU), 1);
        assert_eq!(score_device_type(vk::PhysicalDeviceType::OTHER), 1);
    }

    #[test]
    fn discrete_beats_integrated() {
        let picked = pick_best(vec![candidate(3, true, 1), candidate(4, true, 2)]).unwrap();
        assert_eq!(picked.score, 4);
        assert_eq!(picked.properties.vendor_id, 2);
    }

    #[test]
    fn unsuitable_devices_are_skipped_regardless_of_score() {
        let picked = pick_best(vec![candidate(4, false, 1), candidate(3, true, 2)]).unwrap();
        assert_eq!(picked.properties.vendor_id, 2);
    }

    #[test]
    fn tie_keeps_first_enumerated() {
        let picked = pick_best(vec![candidate(4, true, 1), candidate(4, true, 2)]).unwrap();
        assert_eq!(picked.properties.vendor_id, 1);
    }

    #[test]
    fn no_suitable_device_is_an_error() {
        assert!(matches!(
            pick_best(vec![candidate(4, false, 1)]),
            Err(GpuError::NoSuitableDevice)
        ));
        assert!(matches!(pick_best(vec![]), Err(GpuError::NoSuitableDevice)));
    }

    #[test]
    fn first_matching_family_takes_each_role() {
        let families = [
            family(1, vk::QueueFlags::TRANSFER),
            family(1, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(1, vk::QueueFlags::GRAPHICS),
        ];
        // Presentation only on the last family.
        let roles = resolve_queue_roles(&families, |i| Ok(i == 2)).unwrap();
        assert_eq!(roles.get(QueueRole::Graphics).unwrap().family, 1);
        assert_eq!(roles.get(QueueRole::Presentation).unwrap().family, 2);
        assert_eq!(roles.unique_families(), vec![1, 2]);
    }

    #[test]
    fn single_family_serves_both_roles() {
        let families = [family(1, vk::QueueFlags::GRAPHICS)];
        let roles = resolve_queue_roles(&families, |_| Ok(true)).unwrap();
        assert!(roles.is_complete());
        assert_eq!(roles.unique_families(), vec![0]);
    }

    #[test]
    fn zero_queue_families_are_skipped() {
        let families = [
            family(0, vk::QueueFlags::GRAPHICS),
            family(1, vk::QueueFlags::GRAPHICS),
        ];
        let roles = resolve_queue_roles(&families, |_| Ok(true)).unwrap();
        assert_eq!(roles.get(QueueRole::Graphics).unwrap().family, 1);
        assert_eq!(roles.get(QueueRole::Presentation).unwrap().family, 1);
    }

    #[test]
    fn incomplete_resolution_is_not_suitable() {
        let families = [family(1, vk::QueueFlags::GRAPHICS)];
        let roles = resolve_queue_roles(&families, |_| Ok(false)).unwrap();
        assert!(!roles.is_complete());
    }

    #[test]
    fn extension_match_is_exact() {
        let available = vec![
            CString::new("VK_KHR_swapchain").unwrap(),
            CString::new("VK_EXT_robustness2").unwrap(),
        ];
        assert!(extensions_supported(&[c"VK_KHR_swapchain"], &available));
        assert!(!extensions_supported(&[c"VK_KHR_swap"], &available));
        assert!(!extensions_supported(
            &[c"VK_KHR_swapchain", c"VK_KHR_missing"],
            &available
        ));
    }
}
