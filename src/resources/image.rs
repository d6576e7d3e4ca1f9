use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, DeviceMemory, Extent2D, Extent3D, Format, ImageCreateInfo, ImageLayout, ImageTiling,
    ImageType, ImageUsageFlags, MemoryPropertyFlags, SampleCountFlags, SharingMode,
};
use tracing::debug;

use super::{layout, memory};

use crate::{ImageView, LogicalDevice};

/// A single mip, single layer 2D image and its memory.
pub struct Image2D {
    image: vk::Image,
    memory: DeviceMemory,
    format: Format,
    extent: Extent2D,
    logical_device: Rc<LogicalDevice>,
}

impl Image2D {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        extent: Extent2D,
        format: Format,
        tiling: ImageTiling,
        usage: ImageUsageFlags,
        properties: MemoryPropertyFlags,
    ) -> Result<Self> {
        debug!("Creating {:?} image {}x{}", format, extent.width, extent.height);
        let image_create_info = ImageCreateInfo::default()
            .image_type(ImageType::TYPE_2D)
            .extent(Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(tiling)
            // contents are discarded by the first transition anyway
            .initial_layout(ImageLayout::UNDEFINED)
            .usage(usage)
            // only ever touched by the graphics queue
            .sharing_mode(SharingMode::EXCLUSIVE)
            .samples(SampleCountFlags::TYPE_1);
        let image = unsafe { logical_device.create_image(&image_create_info, None)? };

        let requirements = unsafe { logical_device.get_image_memory_requirements(image) };
        let (memory, _) = match memory::allocate(logical_device, &requirements, properties) {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { logical_device.destroy_image(image, None) };
                return Err(err);
            }
        };
        let image = Self {
            image,
            memory,
            format,
            extent,
            logical_device: Rc::clone(logical_device),
        };
        unsafe { logical_device.bind_image_memory(image.image, image.memory, 0)? };
        Ok(image)
    }

    pub fn create_view(&self) -> Result<ImageView> {
        ImageView::new(
            &self.logical_device,
            self.image,
            self.format,
            layout::aspect_mask(self.format),
        )
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for Image2D {
    fn drop(&mut self) {
        debug!("Dropping {:?} image", self.format);
        unsafe {
            self.logical_device.destroy_image(self.image, None);
            self.logical_device.free_memory(self.memory, None);
        }
    }
}

impl Deref for Image2D {
    type Target = vk::Image;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}
