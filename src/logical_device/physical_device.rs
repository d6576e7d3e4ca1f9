use std::{collections::HashSet, ffi::CString};

use anyhow::Result;
use ash::vk::{
    self, PhysicalDevice, PhysicalDeviceFeatures, PhysicalDeviceMemoryProperties,
    PhysicalDeviceProperties, PhysicalDeviceType,
};
use tracing::{debug, info};

use super::queue_families::QueueFamilyIndices;
use crate::{
    error::EngineError, swapchain::SwapchainSupportDetails, Instance, Surface,
    REQUIRED_DEVICE_EXTENSIONS,
};

/// Score of an adapter that misses a hard requirement
pub const UNSUITABLE_SCORE: i64 = -1;
const DISCRETE_GPU_BONUS: i64 = 1000;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Everything device selection needs to know about one adapter, queried once.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub physical_device: PhysicalDevice,
    pub properties: PhysicalDeviceProperties,
    pub features: PhysicalDeviceFeatures,
    pub memory_properties: PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
    pub supports_required_extensions: bool,
    pub swapchain_support: SwapchainSupportDetails,
}

impl AdapterInfo {
    pub fn query(
        instance: &Instance,
        surface: &Surface,
        physical_device: PhysicalDevice,
    ) -> Result<Self> {
        let (properties, features, memory_properties, family_properties) = unsafe {
            (
                instance.get_physical_device_properties(physical_device),
                instance.get_physical_device_features(physical_device),
                instance.get_physical_device_memory_properties(physical_device),
                instance.get_physical_device_queue_family_properties(physical_device),
            )
        };
        let queue_families = QueueFamilyIndices::resolve(&family_properties, |index| {
            surface.supports_present(physical_device, index)
        })?;
        let supports_required_extensions =
            check_device_extensions_supported(instance, physical_device)?;
        // surface queries are only meaningful once the swapchain extension is known to exist
        let swapchain_support = if supports_required_extensions {
            surface.query_swapchain_support(physical_device)?
        } else {
            SwapchainSupportDetails::default()
        };

        Ok(Self {
            physical_device,
            properties,
            features,
            memory_properties,
            queue_families,
            supports_required_extensions,
            swapchain_support,
        })
    }

    pub fn name(&self) -> String {
        self.properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from("<unnamed adapter>"))
    }
}

/// Rates an adapter. Adapters missing a hard requirement get `UNSUITABLE_SCORE`, every other
/// adapter scores at least zero.
pub fn score_suitability(adapter: &AdapterInfo) -> i64 {
    let meets_requirements = adapter.queue_families.is_complete()
        && adapter.supports_required_extensions
        && adapter.features.sampler_anisotropy == vk::TRUE
        && adapter.swapchain_support.is_adequate();
    if !meets_requirements {
        return UNSUITABLE_SCORE;
    }

    let mut score = 0i64;
    if adapter.properties.device_type == PhysicalDeviceType::DISCRETE_GPU {
        score += DISCRETE_GPU_BONUS;
    }
    let heap_count = adapter.memory_properties.memory_heap_count as usize;
    let heap_megabytes: u64 = adapter.memory_properties.memory_heaps[..heap_count]
        .iter()
        .map(|heap| heap.size / BYTES_PER_MB)
        .sum();
    score += heap_megabytes as i64;
    score += i64::from(adapter.properties.limits.max_image_dimension2_d);
    score
}

/// Picks the highest scoring adapter. Ties keep the first enumerated adapter.
pub fn select_adapter(adapters: Vec<AdapterInfo>) -> Result<AdapterInfo> {
    if adapters.is_empty() {
        return Err(EngineError::NoAdapters.into());
    }

    let mut best: Option<(i64, AdapterInfo)> = None;
    for adapter in adapters {
        let score = score_suitability(&adapter);
        info!("Adapter {} scored {}", adapter.name(), score);
        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, adapter));
        }
    }

    match best {
        Some((score, adapter)) if score > UNSUITABLE_SCORE => Ok(adapter),
        _ => Err(EngineError::NoSuitableAdapter.into()),
    }
}

/// Queries the system for the available physical devices, and picks the most appropriate one
/// for use.
pub fn pick_physical_device(instance: &Instance, surface: &Surface) -> Result<AdapterInfo> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };
    debug!("Found {} physical devices", physical_devices.len());
    let adapters = physical_devices
        .into_iter()
        .map(|physical_device| AdapterInfo::query(instance, surface, physical_device))
        .collect::<Result<Vec<_>>>()?;
    let adapter = select_adapter(adapters)?;
    info!("Selected adapter {}", adapter.name());
    Ok(adapter)
}

/// Checks to see if the physical device supports all required device extensions
fn check_device_extensions_supported(
    instance: &Instance,
    physical_device: PhysicalDevice,
) -> Result<bool> {
    let device_extension_properties =
        unsafe { instance.enumerate_device_extension_properties(physical_device)? };

    let mut device_extension_names = HashSet::new();
    for device_extension in device_extension_properties {
        let extension_name = device_extension.extension_name_as_c_str()?;
        device_extension_names.insert(extension_name.to_owned());
    }

    Ok(REQUIRED_DEVICE_EXTENSIONS.iter().all(|required_extension| {
        let required_extension_name: CString = (*required_extension).to_owned();
        device_extension_names.contains(&required_extension_name)
    }))
}

#[cfg(test)]
mod tests {
    use ash::vk::{
        MemoryHeap, MemoryHeapFlags, PresentModeKHR, QueueFamilyProperties, QueueFlags,
        SurfaceFormatKHR,
    };

    use super::*;
    use crate::error::EngineError;

    fn suitable_adapter(device_type: PhysicalDeviceType, heap_mb: u64, max_dim: u32) -> AdapterInfo {
        let families = [QueueFamilyProperties {
            queue_flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
            queue_count: 1,
            ..Default::default()
        }];
        let mut properties = PhysicalDeviceProperties {
            device_type,
            ..Default::default()
        };
        properties.limits.max_image_dimension2_d = max_dim;
        let mut memory_properties = PhysicalDeviceMemoryProperties {
            memory_heap_count: 1,
            ..Default::default()
        };
        memory_properties.memory_heaps[0] = MemoryHeap {
            size: heap_mb * BYTES_PER_MB,
            flags: MemoryHeapFlags::DEVICE_LOCAL,
        };

        AdapterInfo {
            physical_device: PhysicalDevice::null(),
            properties,
            features: PhysicalDeviceFeatures {
                sampler_anisotropy: vk::TRUE,
                ..Default::default()
            },
            memory_properties,
            queue_families: QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap(),
            supports_required_extensions: true,
            swapchain_support: SwapchainSupportDetails {
                formats: vec![SurfaceFormatKHR::default()],
                present_modes: vec![PresentModeKHR::FIFO],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_score_adds_soft_criteria() {
        let adapter = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 4096, 16384);
        assert_eq!(score_suitability(&adapter), 1000 + 4096 + 16384);

        let adapter = suitable_adapter(PhysicalDeviceType::INTEGRATED_GPU, 2048, 8192);
        assert_eq!(score_suitability(&adapter), 2048 + 8192);
    }

    #[test]
    fn test_missing_requirements_are_unsuitable() {
        let mut missing_queue = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        missing_queue.queue_families.present = None;

        let mut missing_extension = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        missing_extension.supports_required_extensions = false;

        let mut missing_feature = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        missing_feature.features.sampler_anisotropy = vk::FALSE;

        let mut missing_formats = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        missing_formats.swapchain_support.formats.clear();

        let mut missing_present_modes = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        missing_present_modes.swapchain_support.present_modes.clear();

        for adapter in [
            missing_queue,
            missing_extension,
            missing_feature,
            missing_formats,
            missing_present_modes,
        ] {
            assert_eq!(score_suitability(&adapter), UNSUITABLE_SCORE);
        }
    }

    #[test]
    fn test_select_never_picks_unsuitable_adapter() {
        let mut unsuitable = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 65536, 32768);
        unsuitable.supports_required_extensions = false;
        let valid = suitable_adapter(PhysicalDeviceType::CPU, 0, 0);

        let selected = select_adapter(vec![unsuitable, valid]).unwrap();
        assert_eq!(selected.properties.device_type, PhysicalDeviceType::CPU);
    }

    #[test]
    fn test_select_prefers_highest_score() {
        let integrated = suitable_adapter(PhysicalDeviceType::INTEGRATED_GPU, 2048, 8192);
        let discrete = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 2048, 8192);

        let selected = select_adapter(vec![integrated, discrete]).unwrap();
        assert_eq!(selected.properties.device_type, PhysicalDeviceType::DISCRETE_GPU);
    }

    #[test]
    fn test_select_fails_without_adapters() {
        let err = select_adapter(vec![]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::NoAdapters)
        ));
    }

    #[test]
    fn test_select_fails_when_all_unsuitable() {
        let mut adapter = suitable_adapter(PhysicalDeviceType::DISCRETE_GPU, 1, 1);
        adapter.features.sampler_anisotropy = vk::FALSE;

        let err = select_adapter(vec![adapter]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::NoSuitableAdapter)
        ));
    }
}
