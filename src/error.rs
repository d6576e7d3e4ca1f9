use std::path::PathBuf;

use ash::vk::{ImageLayout, MemoryPropertyFlags};
use thiserror::Error;

/// Unrecoverable conditions. These are carried inside `anyhow::Error` up to
/// `main`, which reports them and exits with a failure code.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no Vulkan capable adapters were found")]
    NoAdapters,
    #[error("no adapter satisfies the renderer's requirements")]
    NoSuitableAdapter,
    #[error("validation layer {0} is not available")]
    MissingValidationLayer(String),
    #[error("no memory type matches filter {type_filter:#b} with properties {properties:?}")]
    NoSuitableMemoryType {
        type_filter: u32,
        properties: MemoryPropertyFlags,
    },
    #[error("unsupported image layout transition {old:?} -> {new:?}")]
    UnsupportedLayoutTransition { old: ImageLayout, new: ImageLayout },
    #[error("none of the candidate formats are supported")]
    UnsupportedFormat,
    #[error("the surface reports no formats")]
    NoSurfaceFormats,
    #[error("shader code at {} is not a whole number of 32 bit words", path.display())]
    InvalidShaderCode { path: PathBuf },
    #[error("swapchain resources are not built")]
    SwapchainUnavailable,
    #[error("the surface extent has zero area")]
    ZeroAreaSurface,
}
