pub mod cache;
pub mod command_pool;
pub mod config;
pub mod debug_utils;
pub mod error;
pub mod frame;
pub mod frame_scheduler;
pub mod graphics_context;
pub mod graphics_pipeline;
mod image_view;
mod instance;
pub mod layers;
pub mod logging;
pub mod logical_device;
pub mod presentation;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
mod surface;
pub mod swapchain;
pub mod sync;
pub mod timer;
pub mod window;

use std::ffi::CStr;

pub use crate::{
    config::RendererConfig,
    error::EngineError,
    frame_scheduler::FrameOutcome,
    image_view::ImageView,
    instance::{required_instance_extensions, Instance},
    logical_device::LogicalDevice,
    renderer::Renderer,
    surface::Surface,
    swapchain::Swapchain,
};

/// Device extensions every selected adapter must support
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];
