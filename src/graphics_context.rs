use std::{rc::Rc, time::Instant};

use anyhow::{anyhow, Result};
use ash::{
    vk::{self, BufferUsageFlags, CommandPoolCreateFlags, PipelineStageFlags, SubmitInfo},
    Entry,
};
use tracing::{debug, info};
use winit::window::Window;

use crate::{
    cache::{SamplerCache, ShaderCache, TextureCache},
    command_pool::CommandPool,
    config::RendererConfig,
    debug_utils::DebugUtils,
    error::EngineError,
    frame::FrameSlot,
    frame_scheduler::{AcquireOutcome, FrameBackend, PresentOutcome},
    graphics_pipeline::{depth::find_depth_format, pipeline_layout::DescriptorSetLayout},
    logical_device::physical_device::pick_physical_device,
    presentation::{Generation, PresentationResources, SceneBindings},
    resources::{Buffer, Sampler, SamplerSettings, Texture, UploadContext},
    scene::{UniformBufferObject, INDICES, VERTICES},
    shader::Shader,
    swapchain::is_zero_area,
    window::{framebuffer_extent, required_extensions},
    Instance, LogicalDevice, Surface,
};

/// Owns the device and every GPU object the renderer uses. Long lived objects are built once,
/// swapchain dependent ones live in `presentation` and are rebuilt on demand.
pub struct GraphicsContext {
    presentation: Generation<PresentationResources>,
    frames: Vec<FrameSlot>,
    index_buffer: Buffer,
    vertex_buffer: Buffer,
    texture: Rc<Texture>,
    shader: Rc<Shader>,
    texture_cache: TextureCache,
    shader_cache: ShaderCache,
    sampler_cache: SamplerCache,
    descriptor_set_layout: Rc<DescriptorSetLayout>,
    command_pool: Rc<CommandPool>,
    upload: UploadContext,
    depth_format: vk::Format,
    logical_device: Rc<LogicalDevice>,
    surface: Rc<Surface>,
    _debug_utils: Option<DebugUtils>,
    _instance: Rc<Instance>,
    window: Rc<Window>,
    config: RendererConfig,
    started: Instant,
}

impl GraphicsContext {
    pub fn new(window: &Rc<Window>, config: RendererConfig) -> Result<Self> {
        let entry = unsafe { Entry::load()? };
        let window_extensions = required_extensions(&**window)?;
        let instance = Rc::new(Instance::new(
            entry,
            &window_extensions,
            config.enable_validations,
        )?);
        let debug_utils = if instance.validations_enabled() {
            Some(DebugUtils::new(&instance)?)
        } else {
            None
        };
        let surface = Rc::new(Surface::new(&instance, window)?);
        let adapter = pick_physical_device(&instance, &surface)?;
        let logical_device = Rc::new(LogicalDevice::new(&instance, &adapter)?);
        let depth_format = find_depth_format(&logical_device)?;
        debug!("Using depth format {:?}", depth_format);

        let upload = UploadContext::new(&logical_device)?;
        let command_pool = CommandPool::new(
            &logical_device,
            logical_device.get_queue_families().graphics,
            CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;
        let descriptor_set_layout = DescriptorSetLayout::new(&logical_device)?;

        let mut shader_cache = ShaderCache::new();
        let mut texture_cache = TextureCache::new();
        let mut sampler_cache = SamplerCache::new();

        let shader_key = (config.vertex_shader.clone(), config.fragment_shader.clone());
        let shader = shader_cache.get_or_try_insert_with(shader_key, || {
            Shader::load(&logical_device, &config.vertex_shader, &config.fragment_shader)
        })?;
        let sampler_settings = SamplerSettings::default();
        let sampler = sampler_cache.get_or_try_insert_with(sampler_settings, || {
            Sampler::new(&logical_device, sampler_settings)
        })?;
        let texture = texture_cache.get_or_try_insert_with(config.texture.clone(), || {
            Texture::load(&upload, &config.texture, sampler)
        })?;

        let vertex_buffer = Buffer::staged(&upload, BufferUsageFlags::VERTEX_BUFFER, &VERTICES)?;
        let index_buffer = Buffer::staged(&upload, BufferUsageFlags::INDEX_BUFFER, &INDICES)?;

        let frames = FrameSlot::ring(&logical_device, config.max_frames_in_flight.max(1))?;

        let mut context = Self {
            presentation: Generation::new(),
            frames,
            index_buffer,
            vertex_buffer,
            texture,
            shader,
            texture_cache,
            shader_cache,
            sampler_cache,
            descriptor_set_layout,
            command_pool,
            upload,
            depth_format,
            logical_device,
            surface,
            _debug_utils: debug_utils,
            _instance: instance,
            window: Rc::clone(window),
            config,
            started: Instant::now(),
        };
        // a minimized window gets its swapchain on the first frame it has area
        if context.surface_is_presentable() {
            context.rebuild_presentation()?;
        }
        Ok(context)
    }

    /// Image count of the current swapchain, zero when there is none.
    pub fn image_count(&self) -> usize {
        self.presentation
            .current()
            .map_or(0, |presentation| presentation.swapchain().image_count())
    }

    pub fn logical_device(&self) -> &Rc<LogicalDevice> {
        &self.logical_device
    }

    pub fn window(&self) -> &Rc<Window> {
        &self.window
    }

    /// Blocks until the GPU has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.logical_device.device_wait_idle()? };
        Ok(())
    }

    /// Returns the new image count, or `None` if the surface currently has no area.
    fn rebuild_presentation(&mut self) -> Result<Option<usize>> {
        let window_size = framebuffer_extent(&self.window);
        let scene = SceneBindings {
            logical_device: &self.logical_device,
            surface: &self.surface,
            upload: &self.upload,
            command_pool: &self.command_pool,
            descriptor_set_layout: &self.descriptor_set_layout,
            shader: &self.shader,
            texture: &self.texture,
            vertex_buffer: &self.vertex_buffer,
            index_buffer: &self.index_buffer,
            index_count: INDICES.len() as u32,
            depth_format: self.depth_format,
        };
        let present_mode = self.config.present_mode;
        let built = self
            .presentation
            .rebuild(|| PresentationResources::new(&scene, window_size, present_mode))
            .map(|presentation| {
                let swapchain = presentation.swapchain();
                (swapchain.get_extent(), swapchain.image_count())
            });
        let (extent, image_count) = match built {
            Ok(built) => built,
            Err(err)
                if matches!(
                    err.downcast_ref::<EngineError>(),
                    Some(EngineError::ZeroAreaSurface)
                ) =>
            {
                debug!("Surface extent has zero area, swapchain not built");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        info!(
            "Swapchain generation {} built: {}x{}, {} images",
            self.presentation.generation(),
            extent.width,
            extent.height,
            image_count
        );
        Ok(Some(image_count))
    }

    fn frame(&self, slot: usize) -> Result<&FrameSlot> {
        self.frames
            .get(slot)
            .ok_or_else(|| anyhow!("no frame slot {}", slot))
    }
}

impl FrameBackend for GraphicsContext {
    type Fence = vk::Fence;

    fn frame_fence(&self, slot: usize) -> vk::Fence {
        self.frames
            .get(slot)
            .map_or_else(vk::Fence::null, |frame| *frame.in_flight)
    }

    fn wait_for_fence(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.logical_device
                .wait_for_fences(&[fence], true, u64::MAX)?
        };
        Ok(())
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let image_available = *self.frame(slot)?.image_available;
        match self.presentation.current() {
            Ok(presentation) => presentation.swapchain().acquire_next_image(image_available),
            // never built, treat like a stale swapchain so it gets built
            Err(_) => Ok(AcquireOutcome::OutOfDate),
        }
    }

    fn update_frame_data(&mut self, image_index: u32) -> Result<()> {
        let presentation = self.presentation.current()?;
        let ubo = UniformBufferObject::at(
            self.started.elapsed().as_secs_f32(),
            presentation.swapchain().get_extent(),
        );
        presentation
            .uniform_buffer(image_index as usize)
            .ok_or(EngineError::SwapchainUnavailable)?
            .write(&[ubo])
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe { self.logical_device.reset_fences(&[fence])? };
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let frame = self.frame(slot)?;
        let presentation = self.presentation.current()?;
        let command_buffers = [*presentation
            .command_buffers()
            .get(image_index as usize)
            .ok_or(EngineError::SwapchainUnavailable)?];
        let wait_semaphores = [*frame.image_available];
        // color output is the first stage that touches the swapchain image
        let wait_stages = [PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [*frame.render_finished];
        let submit_info = [SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)];
        unsafe {
            self.logical_device.queue_submit(
                self.logical_device.get_queues().graphics,
                &submit_info,
                *frame.in_flight,
            )?
        };
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let render_finished = *self.frame(slot)?.render_finished;
        self.presentation.current()?.swapchain().present(
            self.logical_device.get_queues().present,
            render_finished,
            image_index,
        )
    }

    fn surface_is_presentable(&self) -> bool {
        !is_zero_area(framebuffer_extent(&self.window))
    }

    fn recreate_swapchain(&mut self) -> Result<Option<usize>> {
        self.wait_idle()?;
        self.rebuild_presentation()
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        debug!(
            "Dropping graphics context ({} shaders, {} textures, {} samplers cached)",
            self.shader_cache.len(),
            self.texture_cache.len(),
            self.sampler_cache.len()
        );
    }
}
