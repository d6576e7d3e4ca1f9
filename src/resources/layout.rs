use anyhow::Result;
use ash::vk::{AccessFlags, Format, ImageAspectFlags, ImageLayout, PipelineStageFlags};

use crate::error::EngineError;

/// Access and stage masks for the barrier of one layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
}

/// Looks up the barrier masks for a supported `(old, new)` pair.
pub fn layout_transition(old: ImageLayout, new: ImageLayout) -> Result<LayoutTransition> {
    let transition = match (old, new) {
        (ImageLayout::UNDEFINED, ImageLayout::TRANSFER_DST_OPTIMAL) => LayoutTransition {
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::TRANSFER_WRITE,
            src_stage: PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: PipelineStageFlags::TRANSFER,
        },
        (ImageLayout::TRANSFER_DST_OPTIMAL, ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            LayoutTransition {
                src_access: AccessFlags::TRANSFER_WRITE,
                dst_access: AccessFlags::SHADER_READ,
                src_stage: PipelineStageFlags::TRANSFER,
                dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
            }
        }
        (ImageLayout::UNDEFINED, ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => {
            LayoutTransition {
                src_access: AccessFlags::empty(),
                dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage: PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            }
        }
        _ => return Err(EngineError::UnsupportedLayoutTransition { old, new }.into()),
    };
    Ok(transition)
}

pub fn has_stencil_component(format: Format) -> bool {
    matches!(format, Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT)
}

/// Aspect of `format` touched by barriers and views
pub fn aspect_mask(format: Format) -> ImageAspectFlags {
    match format {
        Format::D32_SFLOAT | Format::D16_UNORM => ImageAspectFlags::DEPTH,
        format if has_stencil_component(format) => {
            ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
        }
        _ => ImageAspectFlags::COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions() {
        let before_copy =
            layout_transition(ImageLayout::UNDEFINED, ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(before_copy.src_access, AccessFlags::empty());
        assert_eq!(before_copy.dst_access, AccessFlags::TRANSFER_WRITE);
        assert_eq!(before_copy.src_stage, PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(before_copy.dst_stage, PipelineStageFlags::TRANSFER);

        let after_copy = layout_transition(
            ImageLayout::TRANSFER_DST_OPTIMAL,
            ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(after_copy.src_access, AccessFlags::TRANSFER_WRITE);
        assert_eq!(after_copy.dst_access, AccessFlags::SHADER_READ);
        assert_eq!(after_copy.src_stage, PipelineStageFlags::TRANSFER);
        assert_eq!(after_copy.dst_stage, PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_depth_transition() {
        let transition = layout_transition(
            ImageLayout::UNDEFINED,
            ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )
        .unwrap();
        assert!(transition
            .dst_access
            .contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
        assert_eq!(transition.dst_stage, PipelineStageFlags::EARLY_FRAGMENT_TESTS);
    }

    #[test]
    fn test_unknown_transition_is_error() {
        let err = layout_transition(
            ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::UnsupportedLayoutTransition {
                old: ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                new: ImageLayout::TRANSFER_DST_OPTIMAL,
            })
        ));
    }

    #[test]
    fn test_aspect_mask() {
        assert_eq!(aspect_mask(Format::R8G8B8A8_SRGB), ImageAspectFlags::COLOR);
        assert_eq!(aspect_mask(Format::D32_SFLOAT), ImageAspectFlags::DEPTH);
        assert_eq!(
            aspect_mask(Format::D24_UNORM_S8_UINT),
            ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
        );
    }
}
