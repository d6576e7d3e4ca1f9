use std::rc::Rc;

use anyhow::Result;
use ash::vk;
use tracing::{debug, error};
use winit::window::Window;

use crate::{
    config::RendererConfig,
    frame_scheduler::{FrameOutcome, FrameScheduler},
    graphics_context::GraphicsContext,
};

/// The public face of the engine: draws frames and hears about resizes.
pub struct Renderer {
    scheduler: FrameScheduler<vk::Fence>,
    context: GraphicsContext,
}

impl Renderer {
    pub fn new(window: &Rc<Window>, config: RendererConfig) -> Result<Self> {
        let max_frames_in_flight = config.max_frames_in_flight;
        let context = GraphicsContext::new(window, config)?;
        let scheduler = FrameScheduler::new(max_frames_in_flight, context.image_count());
        debug!(
            "Renderer ready with {} frames in flight",
            max_frames_in_flight
        );
        Ok(Self { scheduler, context })
    }

    pub fn draw_frame(&mut self) -> Result<FrameOutcome> {
        self.scheduler.draw_frame(&mut self.context)
    }

    /// Asks for the swapchain to be rebuilt at the end of the next frame.
    pub fn notify_resized(&mut self) {
        self.scheduler.notify_resized();
    }

    pub fn window(&self) -> &Rc<Window> {
        self.context.window()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // nothing may be released while the GPU still uses it
        if let Err(err) = self.context.wait_idle() {
            error!("Failed to wait for the device to go idle: {:?}", err);
        }
    }
}
