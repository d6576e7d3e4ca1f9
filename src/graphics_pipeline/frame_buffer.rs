use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{self, Extent2D, FramebufferCreateInfo};
use tracing::debug;

use super::render_pass::RenderPass;

use crate::{ImageView, LogicalDevice};

/// Binds a swapchain image view and the depth view to the render pass.
pub struct Framebuffer {
    framebuffer: vk::Framebuffer,
    logical_device: Rc<LogicalDevice>,
    // render pass must outlive us
    _render_pass: Rc<RenderPass>,
}

impl Framebuffer {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        render_pass: &Rc<RenderPass>,
        extent: Extent2D,
        color_view: &ImageView,
        depth_view: &ImageView,
    ) -> Result<Self> {
        debug!("Creating framebuffer {}x{}", extent.width, extent.height);
        // order matches the render pass attachments
        let attachments = [**color_view, **depth_view];
        let create_info = FramebufferCreateInfo::default()
            .render_pass(***render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { logical_device.create_framebuffer(&create_info, None)? };

        Ok(Self {
            framebuffer,
            logical_device: Rc::clone(logical_device),
            _render_pass: Rc::clone(render_pass),
        })
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        debug!("Dropping framebuffer");
        unsafe {
            self.logical_device
                .destroy_framebuffer(self.framebuffer, None)
        }
    }
}

impl Deref for Framebuffer {
    type Target = vk::Framebuffer;

    fn deref(&self) -> &Self::Target {
        &self.framebuffer
    }
}
