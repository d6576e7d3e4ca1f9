//! GPU buffers and images, and the staged uploads that fill them.

pub mod buffer;
pub mod image;
pub mod layout;
pub mod memory;
pub mod sampler;
pub mod texture;
pub mod upload;

pub use self::{
    buffer::Buffer,
    image::Image2D,
    sampler::{Sampler, SamplerSettings},
    texture::Texture,
    upload::UploadContext,
};
