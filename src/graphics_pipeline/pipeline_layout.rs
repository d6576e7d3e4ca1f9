use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo, DescriptorType,
    PipelineLayoutCreateInfo, ShaderStageFlags,
};
use tracing::debug;

use crate::LogicalDevice;

pub const UNIFORM_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;

/// Layout of the one descriptor set the pipeline reads: the transforms for the vertex stage
/// and the texture for the fragment stage.
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    logical_device: Rc<LogicalDevice>,
}

impl DescriptorSetLayout {
    pub fn new(logical_device: &Rc<LogicalDevice>) -> Result<Rc<Self>> {
        debug!("Creating descriptor set layout");
        let bindings = [
            DescriptorSetLayoutBinding::default()
                .binding(UNIFORM_BINDING)
                .descriptor_type(DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(ShaderStageFlags::VERTEX),
            DescriptorSetLayoutBinding::default()
                .binding(SAMPLER_BINDING)
                .descriptor_type(DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(ShaderStageFlags::FRAGMENT),
        ];
        let create_info = DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe { logical_device.create_descriptor_set_layout(&create_info, None)? };
        Ok(Rc::new(Self {
            layout,
            logical_device: Rc::clone(logical_device),
        }))
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        debug!("Dropping descriptor set layout");
        unsafe {
            self.logical_device
                .destroy_descriptor_set_layout(self.layout, None)
        }
    }
}

impl Deref for DescriptorSetLayout {
    type Target = vk::DescriptorSetLayout;

    fn deref(&self) -> &Self::Target {
        &self.layout
    }
}

pub struct PipelineLayout {
    pipeline_layout: vk::PipelineLayout,
    logical_device: Rc<LogicalDevice>,
    _descriptor_set_layout: Rc<DescriptorSetLayout>,
}

impl PipelineLayout {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        descriptor_set_layout: &Rc<DescriptorSetLayout>,
    ) -> Result<Self> {
        debug!("Creating pipeline layout");
        let set_layouts = [***descriptor_set_layout];
        let create_info = PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let pipeline_layout =
            unsafe { logical_device.create_pipeline_layout(&create_info, None)? };
        Ok(Self {
            pipeline_layout,
            logical_device: Rc::clone(logical_device),
            _descriptor_set_layout: Rc::clone(descriptor_set_layout),
        })
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        debug!("Dropping pipeline layout");
        unsafe {
            self.logical_device
                .destroy_pipeline_layout(self.pipeline_layout, None)
        }
    }
}

impl Deref for PipelineLayout {
    type Target = vk::PipelineLayout;

    fn deref(&self) -> &Self::Target {
        &self.pipeline_layout
    }
}
