use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, AccessFlags, AttachmentDescription, AttachmentLoadOp, AttachmentReference,
    AttachmentStoreOp, Format, ImageLayout, PipelineBindPoint, PipelineStageFlags,
    RenderPassCreateInfo, SampleCountFlags, SubpassDependency, SubpassDescription,
    SUBPASS_EXTERNAL,
};
use tracing::debug;

use crate::LogicalDevice;

/// A single subpass drawing into a presentable color attachment and a depth attachment.
pub struct RenderPass {
    render_pass: vk::RenderPass,
    logical_device: Rc<LogicalDevice>,
}

impl RenderPass {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        color_format: Format,
        depth_format: Format,
    ) -> Result<Self> {
        debug!("Creating render pass");
        let attachment_descriptions = [
            AttachmentDescription::default()
                // matches the swapchain images
                .format(color_format)
                .samples(SampleCountFlags::TYPE_1)
                // cleared every frame, so the previous layout doesn't matter
                .load_op(AttachmentLoadOp::CLEAR)
                .initial_layout(ImageLayout::UNDEFINED)
                .store_op(AttachmentStoreOp::STORE)
                .final_layout(ImageLayout::PRESENT_SRC_KHR)
                .stencil_load_op(AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(AttachmentStoreOp::DONT_CARE),
            AttachmentDescription::default()
                .format(depth_format)
                .samples(SampleCountFlags::TYPE_1)
                .load_op(AttachmentLoadOp::CLEAR)
                .initial_layout(ImageLayout::UNDEFINED)
                .store_op(AttachmentStoreOp::STORE)
                .final_layout(ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .stencil_load_op(AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(AttachmentStoreOp::DONT_CARE),
        ];

        let color_attachment_refs = [AttachmentReference::default()
            .attachment(0)
            .layout(ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_attachment_ref = AttachmentReference::default()
            .attachment(1)
            .layout(ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass_descriptions = [SubpassDescription::default()
            .pipeline_bind_point(PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachment_refs)
            .depth_stencil_attachment(&depth_attachment_ref)];

        // some drivers don't insert this barrier on their own
        let subpass_dependencies = [SubpassDependency::default()
            .src_subpass(SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .src_access_mask(AccessFlags::empty())
            .dst_stage_mask(
                PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                AccessFlags::COLOR_ATTACHMENT_WRITE
                    | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )];

        let render_pass_create_info = RenderPassCreateInfo::default()
            .attachments(&attachment_descriptions)
            .subpasses(&subpass_descriptions)
            .dependencies(&subpass_dependencies);

        let render_pass =
            unsafe { logical_device.create_render_pass(&render_pass_create_info, None)? };

        Ok(Self {
            render_pass,
            logical_device: Rc::clone(logical_device),
        })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        debug!("Dropping render pass");
        unsafe {
            self.logical_device
                .destroy_render_pass(self.render_pass, None)
        }
    }
}

impl Deref for RenderPass {
    type Target = vk::RenderPass;

    fn deref(&self) -> &Self::Target {
        &self.render_pass
    }
}
