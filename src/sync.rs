use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{self, FenceCreateFlags, FenceCreateInfo, SemaphoreCreateInfo};
use tracing::debug;

use crate::LogicalDevice;

pub struct Fence {
    fence: vk::Fence,
    logical_device: Rc<LogicalDevice>,
}

impl Fence {
    pub fn new(logical_device: &Rc<LogicalDevice>, start_signaled: bool) -> Result<Self> {
        debug!("Creating fence (signaled: {})", start_signaled);
        let mut fence_create_info = FenceCreateInfo::default();
        if start_signaled {
            fence_create_info = fence_create_info.flags(FenceCreateFlags::SIGNALED);
        }
        let fence = unsafe { logical_device.create_fence(&fence_create_info, None) }?;
        Ok(Self {
            fence,
            logical_device: Rc::clone(logical_device),
        })
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        debug!("Dropping fence");
        unsafe { self.logical_device.destroy_fence(self.fence, None) }
    }
}

impl Deref for Fence {
    type Target = vk::Fence;

    fn deref(&self) -> &Self::Target {
        &self.fence
    }
}

pub struct Semaphore {
    semaphore: vk::Semaphore,
    logical_device: Rc<LogicalDevice>,
}

impl Semaphore {
    pub fn new(logical_device: &Rc<LogicalDevice>) -> Result<Self> {
        debug!("Creating semaphore");
        let create_info = SemaphoreCreateInfo::default();
        let semaphore = unsafe { logical_device.create_semaphore(&create_info, None) }?;
        Ok(Self {
            semaphore,
            logical_device: Rc::clone(logical_device),
        })
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        debug!("Dropping semaphore");
        unsafe { self.logical_device.destroy_semaphore(self.semaphore, None) }
    }
}

impl Deref for Semaphore {
    type Target = vk::Semaphore;

    fn deref(&self) -> &Self::Target {
        &self.semaphore
    }
}
