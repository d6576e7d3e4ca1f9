use std::rc::Rc;

use anyhow::Result;
use ash::vk::{
    Extent2D, Format, FormatFeatureFlags, FormatProperties, ImageLayout, ImageTiling,
    ImageUsageFlags, MemoryPropertyFlags,
};
use tracing::debug;

use crate::{
    error::EngineError,
    resources::{Image2D, UploadContext},
    ImageView, LogicalDevice,
};

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [Format; 3] = [
    Format::D32_SFLOAT,
    Format::D32_SFLOAT_S8_UINT,
    Format::D24_UNORM_S8_UINT,
];

/// First of `candidates` whose properties for `tiling` contain all of `features`.
pub fn select_supported_format(
    candidates: &[Format],
    tiling: ImageTiling,
    features: FormatFeatureFlags,
    mut properties_of: impl FnMut(Format) -> FormatProperties,
) -> Result<Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| {
            let properties = properties_of(format);
            match tiling {
                ImageTiling::LINEAR => properties.linear_tiling_features.contains(features),
                ImageTiling::OPTIMAL => properties.optimal_tiling_features.contains(features),
                _ => false,
            }
        })
        .ok_or_else(|| EngineError::UnsupportedFormat.into())
}

pub fn find_depth_format(logical_device: &LogicalDevice) -> Result<Format> {
    select_supported_format(
        &DEPTH_FORMAT_CANDIDATES,
        ImageTiling::OPTIMAL,
        FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        |format| logical_device.get_format_properties(format),
    )
}

/// Depth attachment sized to the swapchain.
pub struct DepthBuffer {
    // view goes before the image
    view: ImageView,
    image: Image2D,
}

impl DepthBuffer {
    pub fn new(upload: &UploadContext, format: Format, extent: Extent2D) -> Result<Self> {
        debug!(
            "Creating {:?} depth buffer {}x{}",
            format, extent.width, extent.height
        );
        let logical_device: &Rc<LogicalDevice> = upload.logical_device();
        let image = Image2D::new(
            logical_device,
            extent,
            format,
            ImageTiling::OPTIMAL,
            ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let view = image.create_view()?;
        upload.transition_image_layout(
            &image,
            ImageLayout::UNDEFINED,
            ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )?;
        Ok(Self { view, image })
    }

    pub fn view(&self) -> &ImageView {
        &self.view
    }

    pub fn format(&self) -> Format {
        self.image.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimal(features: FormatFeatureFlags) -> FormatProperties {
        FormatProperties {
            optimal_tiling_features: features,
            ..Default::default()
        }
    }

    #[test]
    fn test_select_supported_format_prefers_first_candidate() {
        let format = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            ImageTiling::OPTIMAL,
            FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| optimal(FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
        )
        .unwrap();
        assert_eq!(format, Format::D32_SFLOAT);
    }

    #[test]
    fn test_select_supported_format_skips_unsupported() {
        let format = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            ImageTiling::OPTIMAL,
            FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |format| {
                if format == Format::D24_UNORM_S8_UINT {
                    optimal(FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
                } else {
                    FormatProperties::default()
                }
            },
        )
        .unwrap();
        assert_eq!(format, Format::D24_UNORM_S8_UINT);
    }

    #[test]
    fn test_select_supported_format_checks_requested_tiling() {
        let linear_only = FormatProperties {
            linear_tiling_features: FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        };
        let result = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            ImageTiling::OPTIMAL,
            FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| linear_only,
        );
        assert!(result.is_err());

        let format = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            ImageTiling::LINEAR,
            FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| linear_only,
        )
        .unwrap();
        assert_eq!(format, Format::D32_SFLOAT);
    }

    #[test]
    fn test_select_supported_format_none_supported() {
        let err = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            ImageTiling::OPTIMAL,
            FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| FormatProperties::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::UnsupportedFormat)
        ));
    }
}
