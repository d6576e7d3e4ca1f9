pub mod physical_device;
pub mod queue_families;

use std::{ops::Deref, rc::Rc};

use anyhow::{anyhow, Result};
use ash::{
    vk::{
        self, DeviceCreateInfo, DeviceQueueCreateInfo, PhysicalDevice, PhysicalDeviceFeatures,
        PhysicalDeviceLimits, PhysicalDeviceMemoryProperties, Queue,
    },
    Device,
};
use tracing::debug;

use crate::{Instance, REQUIRED_DEVICE_EXTENSIONS};

use self::{
    physical_device::AdapterInfo,
    queue_families::{ResolvedQueueFamilies, SharingConfig},
};

/// Handles to the queues created along with the logical device. Roles that share a family
/// share the queue handle.
#[derive(Debug, Clone, Copy)]
pub struct Queues {
    pub graphics: Queue,
    pub compute: Queue,
    pub transfer: Queue,
    pub present: Queue,
}

/// The logical device and everything about the selected adapter that later stages need.
pub struct LogicalDevice {
    device: Device,
    physical_device: PhysicalDevice,
    queue_families: ResolvedQueueFamilies,
    queues: Queues,
    memory_properties: PhysicalDeviceMemoryProperties,
    limits: PhysicalDeviceLimits,
    // references to make sure we are dropped before these
    instance: Rc<Instance>,
}

impl LogicalDevice {
    /// Creates the logical device for the selected adapter. Each distinct queue family gets one
    /// queue, and anisotropic sampling is enabled.
    pub fn new(instance: &Rc<Instance>, adapter: &AdapterInfo) -> Result<Self> {
        let queue_families = adapter
            .queue_families
            .complete()
            .ok_or_else(|| anyhow!("selected adapter has unresolved queue families"))?;

        let queue_priorities = [1.0f32];
        let device_queue_creation_infos = queue_families
            .unique()
            .into_iter()
            .map(|queue_family_index| {
                DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_family_index)
                    .queue_priorities(&queue_priorities)
            })
            .collect::<Vec<_>>();

        let physical_device_features = PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        let extension_names = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();

        let device_create_info = DeviceCreateInfo::default()
            .queue_create_infos(&device_queue_creation_infos)
            .enabled_features(&physical_device_features)
            .enabled_extension_names(&extension_names);

        debug!("Creating logical device for {:?}", queue_families);
        let device = unsafe {
            instance.create_device(adapter.physical_device, &device_create_info, None)?
        };

        let queues = unsafe {
            Queues {
                graphics: device.get_device_queue(queue_families.graphics, 0),
                compute: device.get_device_queue(queue_families.compute, 0),
                transfer: device.get_device_queue(queue_families.transfer, 0),
                present: device.get_device_queue(queue_families.present, 0),
            }
        };

        Ok(Self {
            device,
            physical_device: adapter.physical_device,
            queue_families,
            queues,
            memory_properties: adapter.memory_properties,
            limits: adapter.properties.limits,
            instance: Rc::clone(instance),
        })
    }

    pub fn get_queues(&self) -> &Queues {
        &self.queues
    }

    pub fn get_queue_families(&self) -> &ResolvedQueueFamilies {
        &self.queue_families
    }

    pub fn get_physical_device(&self) -> PhysicalDevice {
        self.physical_device
    }

    pub fn get_memory_properties(&self) -> &PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub fn get_limits(&self) -> &PhysicalDeviceLimits {
        &self.limits
    }

    pub fn get_instance(&self) -> &Rc<Instance> {
        &self.instance
    }

    /// Sharing for buffers written by the transfer queue and read by the graphics queue
    pub fn transfer_sharing(&self) -> SharingConfig {
        SharingConfig::between(&[self.queue_families.graphics, self.queue_families.transfer])
    }

    /// Properties of `format` on the selected adapter
    pub fn get_format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        debug!("Dropping logical device");
        unsafe {
            self.device.destroy_device(None);
        }
    }
}

impl Deref for LogicalDevice {
    type Target = Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}
