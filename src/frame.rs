use std::rc::Rc;

use anyhow::Result;

use crate::{
    sync::{Fence, Semaphore},
    LogicalDevice,
};

/// One slot of the in-flight ring. Holds the synchronization objects for a frame the CPU
/// may prepare while the GPU still works on earlier ones.
pub struct FrameSlot {
    /// Semaphore for when the image is available to be used from the
    /// swapchain
    pub image_available: Semaphore,
    /// Semaphore for when the rendering has finished
    pub render_finished: Semaphore,
    /// Signaled when the GPU is done with this slot's submission. Starts signaled so the
    /// first wait returns immediately.
    pub in_flight: Fence,
}

impl FrameSlot {
    pub fn new(logical_device: &Rc<LogicalDevice>) -> Result<Self> {
        Ok(Self {
            image_available: Semaphore::new(logical_device)?,
            render_finished: Semaphore::new(logical_device)?,
            in_flight: Fence::new(logical_device, true)?,
        })
    }

    pub fn ring(logical_device: &Rc<LogicalDevice>, count: usize) -> Result<Vec<Self>> {
        (0..count).map(|_| Self::new(logical_device)).collect()
    }
}
