use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, ComponentMapping, Format, Image, ImageAspectFlags, ImageSubresourceRange,
    ImageViewCreateInfo, ImageViewType,
};
use tracing::debug;

use crate::LogicalDevice;

/// A single mip, single layer 2D view.
pub struct ImageView {
    logical_device: Rc<LogicalDevice>,
    image_view: vk::ImageView,
}

impl ImageView {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        image: Image,
        format: Format,
        aspect_mask: ImageAspectFlags,
    ) -> Result<Self> {
        debug!("Creating {:?} image view", format);
        let image_view_create_info = ImageViewCreateInfo::default()
            .image(image)
            .view_type(ImageViewType::TYPE_2D)
            .format(format)
            // identity swizzle on every channel
            .components(ComponentMapping::default())
            .subresource_range(
                ImageSubresourceRange::default()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let image_view =
            unsafe { logical_device.create_image_view(&image_view_create_info, None)? };

        Ok(Self {
            logical_device: Rc::clone(logical_device),
            image_view,
        })
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        debug!("Dropping image view");
        unsafe {
            self.logical_device
                .destroy_image_view(self.image_view, None)
        }
    }
}

impl Deref for ImageView {
    type Target = vk::ImageView;

    fn deref(&self) -> &Self::Target {
        &self.image_view
    }
}
