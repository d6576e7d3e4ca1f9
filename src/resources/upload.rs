use std::rc::Rc;

use anyhow::Result;
use ash::vk::{
    self, BufferCopy, BufferImageCopy, CommandBuffer, CommandBufferBeginInfo,
    CommandBufferUsageFlags, CommandPoolCreateFlags, DependencyFlags, DeviceSize, Extent3D,
    ImageLayout, ImageMemoryBarrier, ImageSubresourceLayers, ImageSubresourceRange, SubmitInfo,
};

use super::{layout, Buffer, Image2D};
use crate::{command_pool::CommandPool, LogicalDevice};

/// Which queue a one-shot submission runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    Graphics,
    Transfer,
}

/// Records and submits one-shot command buffers for staged uploads. Buffer copies run on the
/// transfer queue, image work on the graphics queue.
pub struct UploadContext {
    graphics_pool: Rc<CommandPool>,
    transfer_pool: Rc<CommandPool>,
    logical_device: Rc<LogicalDevice>,
}

impl UploadContext {
    pub fn new(logical_device: &Rc<LogicalDevice>) -> Result<Self> {
        let queue_families = logical_device.get_queue_families();
        Ok(Self {
            graphics_pool: CommandPool::new(
                logical_device,
                queue_families.graphics,
                CommandPoolCreateFlags::TRANSIENT,
            )?,
            transfer_pool: CommandPool::new(
                logical_device,
                queue_families.transfer,
                CommandPoolCreateFlags::TRANSIENT,
            )?,
            logical_device: Rc::clone(logical_device),
        })
    }

    pub fn logical_device(&self) -> &Rc<LogicalDevice> {
        &self.logical_device
    }

    /// Records commands through `record`, submits them and blocks until the queue is idle.
    pub fn submit_single_use(
        &self,
        role: QueueRole,
        record: impl FnOnce(&LogicalDevice, CommandBuffer),
    ) -> Result<()> {
        let queues = self.logical_device.get_queues();
        let (command_pool, queue) = match role {
            QueueRole::Graphics => (&self.graphics_pool, queues.graphics),
            QueueRole::Transfer => (&self.transfer_pool, queues.transfer),
        };
        let command_buffers = command_pool.allocate(1)?;
        let command_buffer = command_buffers[0];

        let begin_info =
            CommandBufferBeginInfo::default().flags(CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.logical_device
                .begin_command_buffer(command_buffer, &begin_info)?
        };
        record(&self.logical_device, command_buffer);
        unsafe { self.logical_device.end_command_buffer(command_buffer)? };

        let submit_info = [SubmitInfo::default().command_buffers(&command_buffers)];
        unsafe {
            self.logical_device
                .queue_submit(queue, &submit_info, vk::Fence::null())?;
            self.logical_device.queue_wait_idle(queue)?;
        }
        Ok(())
    }

    pub fn copy_buffer(&self, src: &Buffer, dst: &Buffer, size: DeviceSize) -> Result<()> {
        let regions = [BufferCopy::default().size(size)];
        self.submit_single_use(QueueRole::Transfer, |device, command_buffer| unsafe {
            device.cmd_copy_buffer(command_buffer, **src, **dst, &regions)
        })
    }

    /// Copies tightly packed pixels from `src` into the whole of `image`, which must be in
    /// TRANSFER_DST_OPTIMAL layout.
    pub fn copy_buffer_to_image(&self, src: &Buffer, image: &Image2D) -> Result<()> {
        let extent = image.extent();
        let regions = [BufferImageCopy::default()
            .buffer_offset(0)
            // zero row length and height mean tightly packed
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(
                ImageSubresourceLayers::default()
                    .aspect_mask(layout::aspect_mask(image.format()))
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .image_extent(Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })];
        self.submit_single_use(QueueRole::Graphics, |device, command_buffer| unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                **src,
                **image,
                ImageLayout::TRANSFER_DST_OPTIMAL,
                &regions,
            )
        })
    }

    /// Moves `image` between layouts with the barrier masks from the transition table.
    pub fn transition_image_layout(
        &self,
        image: &Image2D,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        let transition = layout::layout_transition(old_layout, new_layout)?;
        let barriers = [ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            // not transferring queue family ownership
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(**image)
            .subresource_range(
                ImageSubresourceRange::default()
                    .aspect_mask(layout::aspect_mask(image.format()))
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .src_access_mask(transition.src_access)
            .dst_access_mask(transition.dst_access)];
        self.submit_single_use(QueueRole::Graphics, |device, command_buffer| unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                transition.src_stage,
                transition.dst_stage,
                DependencyFlags::empty(),
                &[],
                &[],
                &barriers,
            )
        })
    }
}
