pub mod depth;
pub mod descriptor;
pub mod frame_buffer;
pub mod pipeline_layout;
pub mod render_pass;

use std::{ffi::CStr, ops::Deref, rc::Rc};

use anyhow::{anyhow, Result};
use ash::vk::{
    self, ColorComponentFlags, CompareOp, CullModeFlags, Extent2D, FrontFace,
    GraphicsPipelineCreateInfo, PipelineCache, PipelineColorBlendAttachmentState,
    PipelineColorBlendStateCreateInfo, PipelineDepthStencilStateCreateInfo,
    PipelineInputAssemblyStateCreateInfo, PipelineMultisampleStateCreateInfo,
    PipelineRasterizationStateCreateInfo, PipelineVertexInputStateCreateInfo,
    PipelineViewportStateCreateInfo, PolygonMode, PrimitiveTopology, Rect2D, SampleCountFlags,
    Viewport,
};
use tracing::debug;

use crate::{scene::Vertex, shader::Shader, LogicalDevice};

use self::{
    pipeline_layout::{DescriptorSetLayout, PipelineLayout},
    render_pass::RenderPass,
};

/// The one graphics pipeline the scene is drawn with. Viewport and scissor are baked in, so the
/// pipeline is rebuilt along with the swapchain.
pub struct GraphicsPipeline {
    pipeline: vk::Pipeline,
    layout: PipelineLayout,
    logical_device: Rc<LogicalDevice>,
    _render_pass: Rc<RenderPass>,
}

impl GraphicsPipeline {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        render_pass: &Rc<RenderPass>,
        descriptor_set_layout: &Rc<DescriptorSetLayout>,
        shader: &Shader,
        extent: Extent2D,
    ) -> Result<Self> {
        debug!(
            "Creating graphics pipeline for {}x{}",
            extent.width, extent.height
        );
        let layout = PipelineLayout::new(logical_device, descriptor_set_layout)?;

        let entry_point = CStr::from_bytes_with_nul(b"main\0")?;
        let shader_stages = shader.stages(entry_point);

        let binding_descriptions = [Vertex::binding_description()];
        let attribute_descriptions = Vertex::attribute_descriptions();
        let vertex_input_state = PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly_state = PipelineInputAssemblyStateCreateInfo::default()
            .topology(PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // covers the whole swapchain image
        let viewports = [Viewport::default()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0)];
        let scissors = [Rect2D::default().extent(extent)];
        let viewport_state = PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(CullModeFlags::BACK)
            // scene triangles wind counter-clockwise once the projection has flipped Y
            .front_face(FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(SampleCountFlags::TYPE_1);

        // nearer fragments win, no stencil
        let depth_stencil_state = PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        // fragment output is written through as is
        let color_blend_attachments = [PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(ColorComponentFlags::RGBA)];
        let color_blend_state = PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let create_infos = [GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .layout(*layout)
            .render_pass(***render_pass)
            .subpass(0)];

        let pipelines = unsafe {
            logical_device.create_graphics_pipelines(PipelineCache::null(), &create_infos, None)
        }
        .map_err(|(_, r)| r)?;
        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("driver returned no graphics pipeline"))?;

        Ok(Self {
            pipeline,
            layout,
            logical_device: Rc::clone(logical_device),
            _render_pass: Rc::clone(render_pass),
        })
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        debug!("Dropping graphics pipeline");
        unsafe { self.logical_device.destroy_pipeline(self.pipeline, None) }
    }
}

impl Deref for GraphicsPipeline {
    type Target = vk::Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}
