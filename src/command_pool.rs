use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, CommandBuffer, CommandBufferAllocateInfo, CommandBufferLevel, CommandPoolCreateFlags,
    CommandPoolCreateInfo,
};
use tracing::debug;

use crate::LogicalDevice;

/// A command pool bound to one queue family.
pub struct CommandPool {
    command_pool: vk::CommandPool,
    queue_family_index: u32,
    logical_device: Rc<LogicalDevice>,
}

impl CommandPool {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        queue_family_index: u32,
        flags: CommandPoolCreateFlags,
    ) -> Result<Rc<Self>> {
        debug!("Creating command pool for queue family {}", queue_family_index);
        let create_command_pool = CommandPoolCreateInfo::default()
            .flags(flags)
            .queue_family_index(queue_family_index);
        let command_pool =
            unsafe { logical_device.create_command_pool(&create_command_pool, None)? };

        Ok(Rc::new(Self {
            command_pool,
            queue_family_index,
            logical_device: Rc::clone(logical_device),
        }))
    }

    /// Allocates `count` primary command buffers, freed back to this pool on drop
    pub fn allocate(self: &Rc<Self>, count: u32) -> Result<CommandBuffers> {
        debug!("Allocating {} command buffers", count);
        let allocate_info = CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers =
            unsafe { self.logical_device.allocate_command_buffers(&allocate_info)? };

        Ok(CommandBuffers {
            command_buffers,
            command_pool: Rc::clone(self),
        })
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        debug!("Dropping command pool for queue family {}", self.queue_family_index);
        unsafe {
            self.logical_device
                .destroy_command_pool(self.command_pool, None)
        }
    }
}

/// Command buffers that go back to their pool when dropped.
pub struct CommandBuffers {
    command_buffers: Vec<CommandBuffer>,
    command_pool: Rc<CommandPool>,
}

impl Drop for CommandBuffers {
    fn drop(&mut self) {
        debug!("Dropping {} command buffers", self.command_buffers.len());
        if self.command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.command_pool.logical_device.free_command_buffers(
                self.command_pool.command_pool,
                &self.command_buffers,
            )
        }
    }
}

impl Deref for CommandBuffers {
    type Target = [CommandBuffer];

    fn deref(&self) -> &Self::Target {
        &self.command_buffers
    }
}
