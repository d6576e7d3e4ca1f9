use std::{mem, ops::Deref, ptr, rc::Rc};

use anyhow::{ensure, Result};
use ash::vk::{
    self, BufferCreateInfo, BufferUsageFlags, DeviceMemory, DeviceSize, MemoryMapFlags,
    MemoryPropertyFlags,
};
use bytemuck::Pod;
use tracing::debug;

use super::{memory, UploadContext};
use crate::{logical_device::queue_families::SharingConfig, LogicalDevice};

/// A buffer together with the memory bound to it.
pub struct Buffer {
    buffer: vk::Buffer,
    memory: DeviceMemory,
    size: DeviceSize,
    memory_type_index: u32,
    logical_device: Rc<LogicalDevice>,
}

impl Buffer {
    /// Creates the buffer, then allocates and binds memory of a type matching `properties`.
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        size: DeviceSize,
        usage: BufferUsageFlags,
        properties: MemoryPropertyFlags,
        sharing: &SharingConfig,
    ) -> Result<Self> {
        let buffer_create_info = BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(sharing.mode)
            .queue_family_indices(&sharing.queue_family_indices);
        let buffer = unsafe { logical_device.create_buffer(&buffer_create_info, None)? };

        let requirements = unsafe { logical_device.get_buffer_memory_requirements(buffer) };
        let (memory, memory_type_index) =
            match memory::allocate(logical_device, &requirements, properties) {
                Ok(allocation) => allocation,
                Err(err) => {
                    unsafe { logical_device.destroy_buffer(buffer, None) };
                    return Err(err);
                }
            };
        // wrap first so both handles are released if binding fails
        let buffer = Self {
            buffer,
            memory,
            size,
            memory_type_index,
            logical_device: Rc::clone(logical_device),
        };
        unsafe { logical_device.bind_buffer_memory(buffer.buffer, buffer.memory, 0)? };
        debug!("Created {} byte buffer for {:?}", size, usage);
        Ok(buffer)
    }

    /// Creates a device local buffer holding `data`, copied in through a staging buffer.
    pub fn staged<T: Pod>(
        upload: &UploadContext,
        usage: BufferUsageFlags,
        data: &[T],
    ) -> Result<Self> {
        let logical_device = upload.logical_device();
        let size = mem::size_of_val(data) as DeviceSize;

        let staging = Self::new(
            logical_device,
            size,
            BufferUsageFlags::TRANSFER_SRC,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
            &SharingConfig::exclusive(),
        )?;
        staging.write(data)?;

        let buffer = Self::new(
            logical_device,
            size,
            usage | BufferUsageFlags::TRANSFER_DST,
            MemoryPropertyFlags::DEVICE_LOCAL,
            &logical_device.transfer_sharing(),
        )?;
        upload.copy_buffer(&staging, &buffer, size)?;
        Ok(buffer)
    }

    /// Copies `data` to the start of the buffer. Only valid for host visible, coherent memory.
    pub fn write<T: Pod>(&self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        ensure!(
            bytes.len() as DeviceSize <= self.size,
            "writing {} bytes into a {} byte buffer",
            bytes.len(),
            self.size
        );
        unsafe {
            let mapped = self.logical_device.map_memory(
                self.memory,
                0,
                bytes.len() as DeviceSize,
                MemoryMapFlags::empty(),
            )?;
            ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());
            self.logical_device.unmap_memory(self.memory);
        }
        Ok(())
    }

    pub fn size(&self) -> DeviceSize {
        self.size
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        debug!("Dropping {} byte buffer", self.size);
        unsafe {
            self.logical_device.destroy_buffer(self.buffer, None);
            self.logical_device.free_memory(self.memory, None);
        }
    }
}

impl Deref for Buffer {
    type Target = vk::Buffer;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}
