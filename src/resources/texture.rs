use std::{path::Path, rc::Rc};

use anyhow::{ensure, Context, Result};
use ash::vk::{
    BufferUsageFlags, Extent2D, Format, ImageLayout, ImageTiling, ImageUsageFlags,
    MemoryPropertyFlags,
};
use tracing::debug;

use super::{Buffer, Image2D, Sampler, UploadContext};
use crate::{logical_device::queue_families::SharingConfig, ImageView};

pub const TEXTURE_FORMAT: Format = Format::R8G8B8A8_SRGB;
const BYTES_PER_PIXEL: usize = 4;

/// A sampled, shader readable image.
pub struct Texture {
    view: ImageView,
    image: Image2D,
    sampler: Rc<Sampler>,
}

impl Texture {
    /// Decodes the image at `path` and uploads it. Decode failures are fatal to the caller.
    pub fn load(upload: &UploadContext, path: &Path, sampler: Rc<Sampler>) -> Result<Self> {
        debug!("Loading texture {}", path.display());
        let decoded = ::image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(upload, width, height, decoded.as_raw(), sampler)
    }

    /// Uploads tightly packed RGBA8 pixels through a staging buffer.
    pub fn from_rgba(
        upload: &UploadContext,
        width: u32,
        height: u32,
        pixels: &[u8],
        sampler: Rc<Sampler>,
    ) -> Result<Self> {
        ensure!(
            pixels.len() == width as usize * height as usize * BYTES_PER_PIXEL,
            "{}x{} texture needs {} bytes, got {}",
            width,
            height,
            width as usize * height as usize * BYTES_PER_PIXEL,
            pixels.len()
        );
        let logical_device = upload.logical_device();

        let staging = Buffer::new(
            logical_device,
            pixels.len() as u64,
            BufferUsageFlags::TRANSFER_SRC,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
            &SharingConfig::exclusive(),
        )?;
        staging.write(pixels)?;

        let image = Image2D::new(
            logical_device,
            Extent2D { width, height },
            TEXTURE_FORMAT,
            ImageTiling::OPTIMAL,
            ImageUsageFlags::TRANSFER_DST | ImageUsageFlags::SAMPLED,
            MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        upload.transition_image_layout(
            &image,
            ImageLayout::UNDEFINED,
            ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;
        upload.copy_buffer_to_image(&staging, &image)?;
        upload.transition_image_layout(
            &image,
            ImageLayout::TRANSFER_DST_OPTIMAL,
            ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        let view = image.create_view()?;
        Ok(Self {
            view,
            image,
            sampler,
        })
    }

    pub fn view(&self) -> &ImageView {
        &self.view
    }

    pub fn sampler(&self) -> &Rc<Sampler> {
        &self.sampler
    }

    pub fn extent(&self) -> Extent2D {
        self.image.extent()
    }
}
