use std::{mem, rc::Rc};

use anyhow::Result;
use ash::vk::{
    BufferUsageFlags, ClearColorValue, ClearDepthStencilValue, ClearValue, CommandBufferBeginInfo,
    Extent2D, Format, IndexType, MemoryPropertyFlags, PipelineBindPoint, Rect2D,
    RenderPassBeginInfo, SubpassContents,
};
use tracing::debug;

use crate::{
    command_pool::{CommandBuffers, CommandPool},
    config::PresentModePolicy,
    error::EngineError,
    graphics_pipeline::{
        depth::DepthBuffer, descriptor::DescriptorSets, frame_buffer::Framebuffer,
        pipeline_layout::DescriptorSetLayout, render_pass::RenderPass, GraphicsPipeline,
    },
    logical_device::queue_families::SharingConfig,
    resources::{Buffer, Texture, UploadContext},
    scene::UniformBufferObject,
    shader::Shader,
    LogicalDevice, Surface, Swapchain,
};

/// Holds at most one value at a time. A rebuild drops the old value before building the new
/// one, so the two never coexist.
#[derive(Debug)]
pub struct Generation<T> {
    current: Option<T>,
    generation: u64,
}

impl<T> Generation<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }

    pub fn current(&self) -> Result<&T> {
        self.current
            .as_ref()
            .ok_or_else(|| EngineError::SwapchainUnavailable.into())
    }

    /// Replaces the held value. If `build` fails the slot stays empty.
    pub fn rebuild(&mut self, build: impl FnOnce() -> Result<T>) -> Result<&T> {
        self.current = None;
        let value = build()?;
        self.generation += 1;
        Ok(self.current.insert(value))
    }

    /// Number of successful builds so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Default for Generation<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that outlives a swapchain and is needed to build the objects tied to it.
pub struct SceneBindings<'a> {
    pub logical_device: &'a Rc<LogicalDevice>,
    pub surface: &'a Rc<Surface>,
    pub upload: &'a UploadContext,
    pub command_pool: &'a Rc<CommandPool>,
    pub descriptor_set_layout: &'a Rc<DescriptorSetLayout>,
    pub shader: &'a Shader,
    pub texture: &'a Texture,
    pub vertex_buffer: &'a Buffer,
    pub index_buffer: &'a Buffer,
    pub index_count: u32,
    pub depth_format: Format,
}

/// The swapchain and every object sized or counted by it. Fields drop top to bottom, which is
/// the reverse of the order they are built in.
pub struct PresentationResources {
    command_buffers: CommandBuffers,
    descriptor_sets: DescriptorSets,
    uniform_buffers: Vec<Buffer>,
    framebuffers: Vec<Framebuffer>,
    pipeline: GraphicsPipeline,
    render_pass: Rc<RenderPass>,
    _depth: DepthBuffer,
    swapchain: Swapchain,
}

impl PresentationResources {
    pub fn new(
        scene: &SceneBindings,
        window_size: Extent2D,
        policy: PresentModePolicy,
    ) -> Result<Self> {
        let logical_device = scene.logical_device;
        let swapchain = Swapchain::new(logical_device, scene.surface, window_size, policy)?;
        let extent = swapchain.get_extent();
        let image_count = swapchain.image_count();

        let depth = DepthBuffer::new(scene.upload, scene.depth_format, extent)?;
        let render_pass = Rc::new(RenderPass::new(
            logical_device,
            swapchain.get_surface_format().format,
            depth.format(),
        )?);
        let pipeline = GraphicsPipeline::new(
            logical_device,
            &render_pass,
            scene.descriptor_set_layout,
            scene.shader,
            extent,
        )?;
        let framebuffers = swapchain
            .get_image_views()
            .iter()
            .map(|color_view| {
                Framebuffer::new(logical_device, &render_pass, extent, color_view, depth.view())
            })
            .collect::<Result<Vec<_>>>()?;

        let uniform_buffers = (0..image_count)
            .map(|_| {
                Buffer::new(
                    logical_device,
                    mem::size_of::<UniformBufferObject>() as u64,
                    BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
                    &SharingConfig::exclusive(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let descriptor_sets = DescriptorSets::new(
            logical_device,
            scene.descriptor_set_layout,
            &uniform_buffers,
            scene.texture,
        )?;

        let command_buffers = scene.command_pool.allocate(image_count as u32)?;
        let resources = Self {
            command_buffers,
            descriptor_sets,
            uniform_buffers,
            framebuffers,
            pipeline,
            render_pass,
            _depth: depth,
            swapchain,
        };
        resources.record_command_buffers(logical_device, scene)?;
        debug!("Recorded {} command buffers", image_count);
        Ok(resources)
    }

    /// Records the whole scene once per swapchain image.
    fn record_command_buffers(
        &self,
        logical_device: &LogicalDevice,
        scene: &SceneBindings,
    ) -> Result<()> {
        let extent = self.swapchain.get_extent();
        let clear_values = [
            ClearValue {
                color: ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            ClearValue {
                depth_stencil: ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        for (image_index, &command_buffer) in self.command_buffers.iter().enumerate() {
            let descriptor_sets = [self
                .descriptor_sets
                .get(image_index)
                .ok_or(EngineError::SwapchainUnavailable)?];
            let render_pass_begin_info = RenderPassBeginInfo::default()
                .render_pass(**self.render_pass)
                .framebuffer(*self.framebuffers[image_index])
                .render_area(Rect2D::default().extent(extent))
                .clear_values(&clear_values);
            let vertex_buffers = [**scene.vertex_buffer];
            let offsets = [0];

            unsafe {
                logical_device
                    .begin_command_buffer(command_buffer, &CommandBufferBeginInfo::default())?;
                logical_device.cmd_begin_render_pass(
                    command_buffer,
                    &render_pass_begin_info,
                    SubpassContents::INLINE,
                );
                logical_device.cmd_bind_pipeline(
                    command_buffer,
                    PipelineBindPoint::GRAPHICS,
                    *self.pipeline,
                );
                logical_device.cmd_bind_vertex_buffers(command_buffer, 0, &vertex_buffers, &offsets);
                logical_device.cmd_bind_index_buffer(
                    command_buffer,
                    **scene.index_buffer,
                    0,
                    IndexType::UINT32,
                );
                logical_device.cmd_bind_descriptor_sets(
                    command_buffer,
                    PipelineBindPoint::GRAPHICS,
                    **self.pipeline.layout(),
                    0,
                    &descriptor_sets,
                    &[],
                );
                logical_device.cmd_draw_indexed(command_buffer, scene.index_count, 1, 0, 0, 0);
                logical_device.cmd_end_render_pass(command_buffer);
                logical_device.end_command_buffer(command_buffer)?;
            }
        }
        Ok(())
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn command_buffers(&self) -> &CommandBuffers {
        &self.command_buffers
    }

    pub fn uniform_buffer(&self, image_index: usize) -> Option<&Buffer> {
        self.uniform_buffers.get(image_index)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;

    struct Tracked<'a> {
        live: &'a Cell<i32>,
        id: u32,
    }

    impl<'a> Tracked<'a> {
        fn new(live: &'a Cell<i32>, id: u32) -> Self {
            live.set(live.get() + 1);
            Self { live, id }
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn test_generation_starts_empty() {
        let generation: Generation<u32> = Generation::new();
        assert_eq!(generation.generation(), 0);
        let err = generation.current().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::SwapchainUnavailable)
        ));
    }

    #[test]
    fn test_generation_rebuilds_do_not_leak() {
        let live = Cell::new(0);
        let mut generation = Generation::new();
        for id in 0..10 {
            generation
                .rebuild(|| {
                    // the previous value is already gone when the next one is built
                    assert_eq!(live.get(), 0);
                    Ok(Tracked::new(&live, id))
                })
                .unwrap();
            assert_eq!(live.get(), 1);
        }
        assert_eq!(generation.generation(), 10);
        assert_eq!(generation.current().unwrap().id, 9);
        drop(generation);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_generation_failed_rebuild_leaves_nothing() {
        let live = Cell::new(0);
        let mut generation = Generation::new();
        generation.rebuild(|| Ok(Tracked::new(&live, 1))).unwrap();

        let result = generation.rebuild(|| Err(anyhow!("surface lost")));
        assert!(result.is_err());
        assert_eq!(live.get(), 0);
        assert!(generation.current().is_err());
        assert_eq!(generation.generation(), 1);

        generation.rebuild(|| Ok(Tracked::new(&live, 2))).unwrap();
        assert_eq!(generation.current().unwrap().id, 2);
        assert_eq!(generation.generation(), 2);
    }
}
