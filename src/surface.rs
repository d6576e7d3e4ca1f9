use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::{
    khr::surface,
    vk::{PhysicalDevice, SurfaceKHR},
};
use tracing::debug;
use winit::{
    raw_window_handle::{HasDisplayHandle, HasWindowHandle},
    window::Window,
};

use crate::{swapchain::SwapchainSupportDetails, Instance};

/// The presentable surface of the application window.
pub struct Surface {
    surface_fn: surface::Instance,
    surface_ptr: SurfaceKHR,
    // references to make sure we are dropped before these
    _window: Rc<Window>,
    _instance: Rc<Instance>,
}

impl Surface {
    pub fn new(instance: &Rc<Instance>, window: &Rc<Window>) -> Result<Self> {
        debug!("Creating window surface");
        let surface_fn = surface::Instance::new(instance.get_entry(), instance);
        let surface_ptr = unsafe {
            ash_window::create_surface(
                instance.get_entry(),
                instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?
        };
        Ok(Self {
            surface_fn,
            surface_ptr,
            _window: Rc::clone(window),
            _instance: Rc::clone(instance),
        })
    }

    /// Queries what the swapchain may look like for this surface on the given device. The
    /// capabilities change with the window, so this is repeated for every swapchain build.
    pub fn query_swapchain_support(
        &self,
        physical_device: PhysicalDevice,
    ) -> Result<SwapchainSupportDetails> {
        let (capabilities, formats, present_modes) = unsafe {
            (
                self.surface_fn
                    .get_physical_device_surface_capabilities(physical_device, self.surface_ptr)?,
                self.surface_fn
                    .get_physical_device_surface_formats(physical_device, self.surface_ptr)?,
                self.surface_fn
                    .get_physical_device_surface_present_modes(physical_device, self.surface_ptr)?,
            )
        };
        Ok(SwapchainSupportDetails {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Whether queues of the given family can present to this surface
    pub fn supports_present(
        &self,
        physical_device: PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool> {
        let supported = unsafe {
            self.surface_fn.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                self.surface_ptr,
            )
        }?;
        Ok(supported)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        debug!("Dropping window surface");
        unsafe { self.surface_fn.destroy_surface(self.surface_ptr, None) }
    }
}

impl Deref for Surface {
    type Target = SurfaceKHR;

    fn deref(&self) -> &Self::Target {
        &self.surface_ptr
    }
}
