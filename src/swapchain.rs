mod support;

use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::{
    khr::swapchain,
    vk::{
        self, CompositeAlphaFlagsKHR, Extent2D, Fence, Image, ImageAspectFlags, ImageUsageFlags,
        PresentInfoKHR, PresentModeKHR, Queue, Semaphore, SurfaceFormatKHR,
        SwapchainCreateInfoKHR, SwapchainKHR,
    },
};
use tracing::{debug, info};

pub use self::support::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, is_zero_area,
    SwapchainSupportDetails,
};
use crate::{
    config::PresentModePolicy,
    error::EngineError,
    frame_scheduler::{AcquireOutcome, PresentOutcome},
    logical_device::queue_families::SharingConfig,
    ImageView, LogicalDevice, Surface,
};

/// The presentable images negotiated with the surface, along with a view per image.
pub struct Swapchain {
    image_views: Vec<ImageView>,
    images: Vec<Image>,
    swapchain_fn: swapchain::Device,
    swapchain_ptr: SwapchainKHR,
    extent: Extent2D,
    surface_format: SurfaceFormatKHR,
    present_mode: PresentModeKHR,
    // references we need to keep to ensure
    // we are cleaned up before they are
    _surface: Rc<Surface>,
    _logical_device: Rc<LogicalDevice>,
}

impl Swapchain {
    /// Builds a swapchain for `window_size`. Fails with `EngineError::ZeroAreaSurface` when the
    /// extent clamped to the surface's limits has no area.
    pub fn new(
        logical_device: &Rc<LogicalDevice>,
        surface: &Rc<Surface>,
        window_size: Extent2D,
        policy: PresentModePolicy,
    ) -> Result<Self> {
        let support = surface.query_swapchain_support(logical_device.get_physical_device())?;
        let surface_format = choose_surface_format(&support.formats)?;
        let present_mode = choose_present_mode(&support.present_modes, policy);
        let extent = choose_extent(&support.capabilities, window_size);
        if is_zero_area(extent) {
            return Err(EngineError::ZeroAreaSurface.into());
        }
        let image_count = choose_image_count(&support.capabilities, policy);

        let queue_families = logical_device.get_queue_families();
        let sharing = SharingConfig::between(&[queue_families.graphics, queue_families.present]);

        let swapchain_create_info = SwapchainCreateInfoKHR::default()
            .surface(***surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .present_mode(present_mode)
            // always 1 unless doing stereoscopic 3D
            .image_array_layers(1)
            // images are only rendered to as color attachments
            .image_usage(ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing.mode)
            .queue_family_indices(&sharing.queue_family_indices)
            // no transform
            .pre_transform(support.capabilities.current_transform)
            // ignore alpha channel
            .composite_alpha(CompositeAlphaFlagsKHR::OPAQUE)
            // discard pixels that aren't visible
            .clipped(true)
            .old_swapchain(SwapchainKHR::null());

        let swapchain_fn = swapchain::Device::new(logical_device.get_instance(), logical_device);
        let swapchain_ptr = unsafe { swapchain_fn.create_swapchain(&swapchain_create_info, None)? };
        let images = unsafe { swapchain_fn.get_swapchain_images(swapchain_ptr)? };

        let image_views = images
            .iter()
            .map(|image| {
                ImageView::new(
                    logical_device,
                    *image,
                    surface_format.format,
                    ImageAspectFlags::COLOR,
                )
            })
            .collect::<Result<Vec<_>>>();
        let image_views = match image_views {
            Ok(image_views) => image_views,
            Err(err) => {
                unsafe { swapchain_fn.destroy_swapchain(swapchain_ptr, None) };
                return Err(err);
            }
        };

        info!(
            "Swapchain created: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            images.len(),
            present_mode
        );

        Ok(Self {
            image_views,
            images,
            swapchain_fn,
            swapchain_ptr,
            extent,
            surface_format,
            present_mode,
            _surface: Rc::clone(surface),
            _logical_device: Rc::clone(logical_device),
        })
    }

    /// Acquires the next image, signaling `signal_semaphore` once it's ready for use. A stale
    /// surface is reported as an outcome rather than an error.
    pub fn acquire_next_image(&self, signal_semaphore: Semaphore) -> Result<AcquireOutcome> {
        let result = unsafe {
            self.swapchain_fn.acquire_next_image(
                self.swapchain_ptr,
                u64::MAX,
                signal_semaphore,
                Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(err) => Err(err.into()),
        }
    }

    /// Queues `image_index` for presentation once `wait_semaphore` is signaled.
    pub fn present(
        &self,
        present_queue: Queue,
        wait_semaphore: Semaphore,
        image_index: u32,
    ) -> Result<PresentOutcome> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain_ptr];
        let image_indices = [image_index];
        let present_info = PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let result = unsafe { self.swapchain_fn.queue_present(present_queue, &present_info) };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            // suboptimal
            Ok(true) => Ok(PresentOutcome::Stale),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_extent(&self) -> Extent2D {
        self.extent
    }

    pub fn get_surface_format(&self) -> SurfaceFormatKHR {
        self.surface_format
    }

    pub fn get_present_mode(&self) -> PresentModeKHR {
        self.present_mode
    }

    pub fn get_image_views(&self) -> &[ImageView] {
        &self.image_views
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        debug!("Dropping swapchain");
        // views must go before the images they look at
        self.image_views.clear();
        unsafe {
            self.swapchain_fn
                .destroy_swapchain(self.swapchain_ptr, None)
        }
    }
}

impl Deref for Swapchain {
    type Target = SwapchainKHR;

    fn deref(&self) -> &Self::Target {
        &self.swapchain_ptr
    }
}
