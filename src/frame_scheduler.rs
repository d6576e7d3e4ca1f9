use anyhow::{ensure, Result};
use tracing::{debug, trace};

/// Result of asking the swapchain for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    /// The surface changed and the swapchain can no longer be used
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out of date or suboptimal, the swapchain should be rebuilt
    Stale,
}

/// What happened during one call to `FrameScheduler::draw_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The frame was abandoned and the swapchain rebuilt
    SwapchainRecreated,
    /// The window has no area, nothing was acquired or rebuilt
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// The GPU side of the frame loop. The scheduler decides the order of these calls, the
/// backend carries them out.
pub trait FrameBackend {
    type Fence: Copy + PartialEq;

    /// The in-flight fence owned by frame slot `slot`
    fn frame_fence(&self, slot: usize) -> Self::Fence;
    fn wait_for_fence(&mut self, fence: Self::Fence) -> Result<()>;
    /// Acquires an image, signaling the slot's image available semaphore
    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome>;
    /// Writes per frame data, such as transforms, for the acquired image
    fn update_frame_data(&mut self, image_index: u32) -> Result<()>;
    fn reset_fence(&mut self, fence: Self::Fence) -> Result<()>;
    /// Submits the image's commands, signaling the slot's fence on completion
    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()>;
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;
    /// False while the window has zero area
    fn surface_is_presentable(&self) -> bool;
    /// Rebuilds every swapchain dependent resource, returning the new image count. `None` when
    /// the surface's clamped extent has no area and nothing was built.
    fn recreate_swapchain(&mut self) -> Result<Option<usize>>;
}

/// Tracks, per swapchain image, the fence of the frame that last rendered to it.
#[derive(Debug, Clone)]
pub struct ImagesInFlight<F> {
    fences: Vec<Option<F>>,
}

impl<F: Copy + PartialEq> ImagesInFlight<F> {
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![None; image_count],
        }
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    pub fn fence_for(&self, image_index: usize) -> Option<F> {
        self.fences.get(image_index).copied().flatten()
    }

    /// Marks `image_index` as written by `fence`. Returns the fence that previously claimed the
    /// image if it differs, which must be waited on before the image is reused.
    pub fn claim(&mut self, image_index: usize, fence: F) -> Option<F> {
        let previous = self.fences.get_mut(image_index)?.replace(fence);
        previous.filter(|previous| *previous != fence)
    }

    /// Forgets every claim, sized for a new swapchain
    pub fn reset(&mut self, image_count: usize) {
        self.fences.clear();
        self.fences.resize(image_count, None);
    }
}

/// Drives the per frame protocol over a ring of `max_frames_in_flight` slots.
#[derive(Debug)]
pub struct FrameScheduler<F> {
    max_frames_in_flight: usize,
    current_slot: usize,
    images_in_flight: ImagesInFlight<F>,
    resize_requested: bool,
    recreate_pending: bool,
    state: FrameState,
}

impl<F: Copy + PartialEq> FrameScheduler<F> {
    pub fn new(max_frames_in_flight: usize, image_count: usize) -> Self {
        Self {
            max_frames_in_flight: max_frames_in_flight.max(1),
            current_slot: 0,
            images_in_flight: ImagesInFlight::new(image_count),
            resize_requested: false,
            recreate_pending: false,
            state: FrameState::Idle,
        }
    }

    /// Requests a swapchain rebuild after the next present
    pub fn notify_resized(&mut self) {
        self.resize_requested = true;
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn images_in_flight(&self) -> &ImagesInFlight<F> {
        &self.images_in_flight
    }

    pub fn recreate_pending(&self) -> bool {
        self.recreate_pending
    }

    pub fn draw_frame<B>(&mut self, backend: &mut B) -> Result<FrameOutcome>
    where
        B: FrameBackend<Fence = F>,
    {
        // a rebuild deferred by a minimized window has to happen before the next acquire
        if self.recreate_pending && !self.recreate(backend)? {
            return Ok(FrameOutcome::Suspended);
        }

        let slot = self.current_slot;
        let fence = backend.frame_fence(slot);
        // bounds the number of frames the CPU runs ahead
        backend.wait_for_fence(fence)?;

        self.set_state(FrameState::Acquiring);
        let image_index = match backend.acquire_next_image(slot)? {
            AcquireOutcome::Acquired { image_index, .. } => image_index,
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date on acquire");
                self.set_state(FrameState::Idle);
                self.recreate_pending = true;
                return Ok(if self.recreate(backend)? {
                    FrameOutcome::SwapchainRecreated
                } else {
                    FrameOutcome::Suspended
                });
            }
        };
        trace!("Frame slot {} acquired image {}", slot, image_index);

        self.set_state(FrameState::Recording);
        ensure!(
            (image_index as usize) < self.images_in_flight.len(),
            "acquired image {} but the swapchain has {} images",
            image_index,
            self.images_in_flight.len()
        );
        if let Some(previous) = self.images_in_flight.claim(image_index as usize, fence) {
            backend.wait_for_fence(previous)?;
        }
        backend.update_frame_data(image_index)?;

        // only reset right before the submit that signals it again
        backend.reset_fence(fence)?;
        backend.submit(slot, image_index)?;
        // the slot's fence is now in flight, the slot advances even if presenting fails
        self.set_state(FrameState::Submitted);
        self.current_slot = (slot + 1) % self.max_frames_in_flight;

        self.set_state(FrameState::Presenting);
        let present_outcome = backend.present(slot, image_index)?;
        self.set_state(FrameState::Idle);

        let resized = std::mem::take(&mut self.resize_requested);
        if present_outcome == PresentOutcome::Stale || resized {
            debug!("Swapchain stale after present (resized: {})", resized);
            self.recreate_pending = true;
            if self.recreate(backend)? {
                return Ok(FrameOutcome::SwapchainRecreated);
            }
        }
        Ok(FrameOutcome::Presented)
    }

    fn set_state(&mut self, state: FrameState) {
        trace!("Frame state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Rebuilds the swapchain unless the window or the surface extent has zero area, in which
    /// case the rebuild stays pending. Returns whether it ran.
    fn recreate<B>(&mut self, backend: &mut B) -> Result<bool>
    where
        B: FrameBackend<Fence = F>,
    {
        if !backend.surface_is_presentable() {
            trace!("Surface has zero area, deferring swapchain rebuild");
            return Ok(false);
        }
        let Some(image_count) = backend.recreate_swapchain()? else {
            trace!("Surface extent has zero area, deferring swapchain rebuild");
            return Ok(false);
        };
        self.images_in_flight.reset(image_count);
        self.recreate_pending = false;
        self.resize_requested = false;
        Ok(true)
    }
}
