use anyhow::Result;
use ash::vk::{
    ColorSpaceKHR, Extent2D, Format, PresentModeKHR, SurfaceCapabilitiesKHR, SurfaceFormatKHR,
};
use tracing::warn;

use crate::{config::PresentModePolicy, error::EngineError};

const PREFERRED_FORMAT: Format = Format::B8G8R8A8_SRGB;
const PREFERRED_COLOR_SPACE: ColorSpaceKHR = ColorSpaceKHR::SRGB_NONLINEAR;

#[derive(Debug, Clone, Default)]
/// Details about what features the swap chain supports
/// for a given surface
pub struct SwapchainSupportDetails {
    pub capabilities: SurfaceCapabilitiesKHR,
    /// The formats (color depth settings) available to use.
    pub formats: Vec<SurfaceFormatKHR>,
    pub present_modes: Vec<PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// A swapchain can only be built with at least one format and present mode
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Picks the sRGB BGRA8 format when offered, otherwise the first format the surface lists.
pub fn choose_surface_format(formats: &[SurfaceFormatKHR]) -> Result<SurfaceFormatKHR> {
    if let Some(preferred) = formats.iter().find(|surface_format| {
        surface_format.format == PREFERRED_FORMAT
            && surface_format.color_space == PREFERRED_COLOR_SPACE
    }) {
        return Ok(*preferred);
    }
    let fallback = formats.first().ok_or(EngineError::NoSurfaceFormats)?;
    warn!(
        "Ideal swapchain format unavailable, using {:?} / {:?}",
        fallback.format, fallback.color_space
    );
    Ok(*fallback)
}

/// Maps the configured policy to a present mode, falling back to FIFO which every surface
/// must support.
pub fn choose_present_mode(
    present_modes: &[PresentModeKHR],
    policy: PresentModePolicy,
) -> PresentModeKHR {
    let desired = match policy {
        // if we render faster than the screen presents, the queued image gets replaced
        PresentModePolicy::TripleBuffer => PresentModeKHR::MAILBOX,
        PresentModePolicy::DoubleBuffer => PresentModeKHR::FIFO,
        PresentModePolicy::VsyncOff => {
            warn!("Present mode policy VsyncOff is not implemented, using FIFO");
            PresentModeKHR::FIFO
        }
    };
    if present_modes.contains(&desired) {
        return desired;
    }
    warn!("Present mode {:?} unavailable, using FIFO", desired);
    PresentModeKHR::FIFO
}

/// Returns the resolution of the swapchain images *in pixels*: the window size clamped into
/// what the surface accepts.
pub fn choose_extent(capabilities: &SurfaceCapabilitiesKHR, window_size: Extent2D) -> Extent2D {
    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    Extent2D {
        width: window_size.width.max(min.width).min(max.width),
        height: window_size.height.max(min.height).min(max.height),
    }
}

/// Number of swapchain images asked for. A maximum of zero means the surface has no limit.
pub fn choose_image_count(capabilities: &SurfaceCapabilitiesKHR, policy: PresentModePolicy) -> u32 {
    let image_count = policy
        .desired_image_count()
        .max(capabilities.min_image_count);
    match capabilities.max_image_count {
        0 => image_count,
        max_image_count => image_count.min(max_image_count),
    }
}

/// Swapchains can't be built for minimized windows
pub fn is_zero_area(extent: Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: (u32, u32), max: (u32, u32)) -> SurfaceCapabilitiesKHR {
        SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            min_image_extent: Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: Extent2D {
                width: max.0,
                height: max.1,
            },
            ..Default::default()
        }
    }

    fn extent(width: u32, height: u32) -> Extent2D {
        Extent2D { width, height }
    }

    #[test]
    fn test_choose_surface_format_preferred() {
        let formats = [
            SurfaceFormatKHR {
                format: Format::R8G8B8A8_UNORM,
                color_space: ColorSpaceKHR::SRGB_NONLINEAR,
            },
            SurfaceFormatKHR {
                format: Format::B8G8R8A8_SRGB,
                color_space: ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let chosen = choose_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_choose_surface_format_falls_back_to_first() {
        let formats = [
            SurfaceFormatKHR {
                format: Format::R8G8B8A8_UNORM,
                color_space: ColorSpaceKHR::SRGB_NONLINEAR,
            },
            SurfaceFormatKHR {
                format: Format::B8G8R8A8_SRGB,
                color_space: ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
            },
        ];
        let chosen = choose_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_choose_surface_format_empty_is_error() {
        let err = choose_surface_format(&[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::NoSurfaceFormats)
        ));
    }

    #[test]
    fn test_choose_present_mode_by_policy() {
        let modes = [PresentModeKHR::FIFO, PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(&modes, PresentModePolicy::TripleBuffer),
            PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&modes, PresentModePolicy::DoubleBuffer),
            PresentModeKHR::FIFO
        );
        assert_eq!(
            choose_present_mode(&modes, PresentModePolicy::VsyncOff),
            PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_present_mode_falls_back_to_fifo() {
        let modes = [PresentModeKHR::FIFO, PresentModeKHR::IMMEDIATE];
        assert_eq!(
            choose_present_mode(&modes, PresentModePolicy::TripleBuffer),
            PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_extent_clamps() {
        let caps = capabilities((64, 64), (1920, 1080));
        assert_eq!(choose_extent(&caps, extent(800, 600)), extent(800, 600));
        assert_eq!(choose_extent(&caps, extent(4000, 3000)), extent(1920, 1080));
        assert_eq!(choose_extent(&caps, extent(10, 5000)), extent(64, 1080));
    }

    #[test]
    fn test_choose_extent_zero_window() {
        let caps = capabilities((1, 1), (1920, 1080));
        let chosen = choose_extent(&caps, extent(0, 0));
        assert_eq!(chosen, extent(1, 1));
        assert!(is_zero_area(extent(0, 0)));
        assert!(is_zero_area(extent(0, 720)));
        assert!(!is_zero_area(chosen));
    }

    #[test]
    fn test_choose_extent_minimized_surface() {
        // the window still reports a size while the surface allows nothing
        let caps = capabilities((0, 0), (0, 0));
        let window_size = extent(1280, 720);
        assert!(!is_zero_area(window_size));
        assert!(is_zero_area(choose_extent(&caps, window_size)));
    }

    #[test]
    fn test_choose_image_count_by_policy() {
        let caps = capabilities((1, 1), (1, 1));
        assert_eq!(choose_image_count(&caps, PresentModePolicy::TripleBuffer), 3);
        assert_eq!(choose_image_count(&caps, PresentModePolicy::DoubleBuffer), 2);
    }

    #[test]
    fn test_choose_image_count_clamped() {
        let caps = SurfaceCapabilitiesKHR {
            min_image_count: 4,
            max_image_count: 6,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps, PresentModePolicy::TripleBuffer), 4);

        let caps = SurfaceCapabilitiesKHR {
            min_image_count: 1,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps, PresentModePolicy::TripleBuffer), 2);
    }

    #[test]
    fn test_choose_image_count_unbounded_max() {
        let caps = SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps, PresentModePolicy::TripleBuffer), 3);
    }

    #[test]
    fn test_support_adequacy() {
        let mut support = SwapchainSupportDetails {
            formats: vec![SurfaceFormatKHR::default()],
            present_modes: vec![PresentModeKHR::FIFO],
            ..Default::default()
        };
        assert!(support.is_adequate());
        support.present_modes.clear();
        assert!(!support.is_adequate());
    }
}
