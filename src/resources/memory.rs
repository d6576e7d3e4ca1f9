use anyhow::Result;
use ash::vk::{
    DeviceMemory, MemoryAllocateInfo, MemoryPropertyFlags, MemoryRequirements,
    PhysicalDeviceMemoryProperties,
};

use crate::{error::EngineError, LogicalDevice};

/// Index of the first memory type allowed by `type_filter` whose properties include all of
/// `required`.
pub fn find_memory_type(
    memory_properties: &PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required: MemoryPropertyFlags,
) -> Result<u32> {
    let type_count = memory_properties.memory_type_count as usize;
    memory_properties.memory_types[..type_count]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_filter & (1u32 << *index) != 0 && memory_type.property_flags.contains(required)
        })
        .map(|(index, _)| index as u32)
        .ok_or_else(|| {
            EngineError::NoSuitableMemoryType {
                type_filter,
                properties: required,
            }
            .into()
        })
}

/// Allocates memory satisfying `requirements`. Returns the memory and its type index.
pub fn allocate(
    logical_device: &LogicalDevice,
    requirements: &MemoryRequirements,
    properties: MemoryPropertyFlags,
) -> Result<(DeviceMemory, u32)> {
    let memory_type_index = find_memory_type(
        logical_device.get_memory_properties(),
        requirements.memory_type_bits,
        properties,
    )?;
    let allocate_info = MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);
    let memory = unsafe { logical_device.allocate_memory(&allocate_info, None)? };
    Ok((memory, memory_type_index))
}

#[cfg(test)]
mod tests {
    use ash::vk::MemoryType;

    use super::*;

    fn memory_properties(types: &[MemoryPropertyFlags]) -> PhysicalDeviceMemoryProperties {
        let mut properties = PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            memory_heap_count: 1,
            ..Default::default()
        };
        for (index, flags) in types.iter().enumerate() {
            properties.memory_types[index] = MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn test_staging_buffer_memory_type() {
        // a 256 byte transfer source asks for host visible + coherent memory
        let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
        let properties = memory_properties(&[
            MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryPropertyFlags::HOST_VISIBLE,
            host | MemoryPropertyFlags::HOST_CACHED,
        ]);
        let requirements = MemoryRequirements {
            size: 256,
            alignment: 64,
            memory_type_bits: 0b111,
        };

        let index = find_memory_type(&properties, requirements.memory_type_bits, host).unwrap();
        assert_eq!(index, 2);
        assert!(properties.memory_types[index as usize]
            .property_flags
            .contains(host));
    }

    #[test]
    fn test_type_filter_is_respected() {
        let properties = memory_properties(&[
            MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        let index =
            find_memory_type(&properties, 0b10, MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_types_past_count_are_ignored() {
        let mut properties = memory_properties(&[MemoryPropertyFlags::DEVICE_LOCAL]);
        properties.memory_types[1].property_flags = MemoryPropertyFlags::HOST_VISIBLE;

        let err = find_memory_type(&properties, u32::MAX, MemoryPropertyFlags::HOST_VISIBLE)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::NoSuitableMemoryType { type_filter: u32::MAX, .. })
        ));
    }
}
