use std::ffi::CStr;

use anyhow::Result;
use ash::vk::Extent2D;
use winit::{
    dpi::PhysicalSize,
    event_loop::EventLoop,
    raw_window_handle::HasDisplayHandle,
    window::{Window, WindowBuilder},
};

use crate::config::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};

/// Creates the resizable application window.
pub fn create_window<T>(event_loop: &EventLoop<T>) -> Result<Window> {
    let window = WindowBuilder::new()
        .with_inner_size(PhysicalSize::<u32>::from((WINDOW_WIDTH, WINDOW_HEIGHT)))
        .with_resizable(true)
        .with_active(true)
        .with_title(WINDOW_TITLE)
        .build(event_loop)?;
    Ok(window)
}

/// Current drawable size in pixels. Zero while minimized on some platforms.
pub fn framebuffer_extent(window: &Window) -> Extent2D {
    let size = window.inner_size();
    Extent2D {
        width: size.width,
        height: size.height,
    }
}

/// Instance extensions the platform needs to present to a window.
pub fn required_extensions(display: &impl HasDisplayHandle) -> Result<Vec<&'static CStr>> {
    let extensions = ash_window::enumerate_required_extensions(display.display_handle()?.as_raw())?
        .iter()
        .map(|extension| unsafe { CStr::from_ptr(*extension) })
        .collect();
    Ok(extensions)
}
