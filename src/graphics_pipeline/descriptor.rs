use std::{mem, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, DescriptorBufferInfo, DescriptorImageInfo, DescriptorPoolCreateInfo,
    DescriptorPoolSize, DescriptorSet, DescriptorSetAllocateInfo, DescriptorType, ImageLayout,
    WriteDescriptorSet,
};
use tracing::debug;

use super::pipeline_layout::{DescriptorSetLayout, SAMPLER_BINDING, UNIFORM_BINDING};
use crate::{resources::Buffer, resources::Texture, scene::UniformBufferObject, LogicalDevice};

/// One descriptor set per swapchain image, each pointing at that image's uniform buffer and the
/// shared texture. The sets go away with the pool.
pub struct DescriptorSets {
    sets: Vec<DescriptorSet>,
    pool: vk::DescriptorPool,
    logical_device: Rc<LogicalDevice>,
}

impl DescriptorSets {
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        layout: &DescriptorSetLayout,
        uniform_buffers: &[Buffer],
        texture: &Texture,
    ) -> Result<Self> {
        let count = uniform_buffers.len() as u32;
        debug!("Creating {} descriptor sets", count);
        let pool_sizes = [
            DescriptorPoolSize::default()
                .ty(DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(count),
            DescriptorPoolSize::default()
                .ty(DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(count),
        ];
        let pool_create_info = DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(count);
        let pool = unsafe { logical_device.create_descriptor_pool(&pool_create_info, None)? };
        // wrapped right away so the pool is released on any later failure
        let mut descriptor_sets = Self {
            sets: Vec::new(),
            pool,
            logical_device: Rc::clone(logical_device),
        };

        let layouts = vec![**layout; uniform_buffers.len()];
        let allocate_info = DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        descriptor_sets.sets = unsafe { logical_device.allocate_descriptor_sets(&allocate_info)? };

        let image_infos = [DescriptorImageInfo::default()
            .image_layout(ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .image_view(**texture.view())
            .sampler(***texture.sampler())];
        for (set, uniform_buffer) in descriptor_sets.sets.iter().zip(uniform_buffers) {
            let buffer_infos = [DescriptorBufferInfo::default()
                .buffer(**uniform_buffer)
                .offset(0)
                .range(mem::size_of::<UniformBufferObject>() as u64)];
            let writes = [
                WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(UNIFORM_BINDING)
                    .dst_array_element(0)
                    .descriptor_type(DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_infos),
                WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(SAMPLER_BINDING)
                    .dst_array_element(0)
                    .descriptor_type(DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_infos),
            ];
            unsafe { logical_device.update_descriptor_sets(&writes, &[]) };
        }
        Ok(descriptor_sets)
    }

    pub fn get(&self, image_index: usize) -> Option<DescriptorSet> {
        self.sets.get(image_index).copied()
    }
}

impl Drop for DescriptorSets {
    fn drop(&mut self) {
        debug!("Dropping {} descriptor sets", self.sets.len());
        unsafe {
            self.logical_device
                .destroy_descriptor_pool(self.pool, None)
        }
    }
}
