use std::path::PathBuf;

/// How frames are handed to the presentation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentModePolicy {
    /// Not implemented yet, behaves like `DoubleBuffer`.
    VsyncOff,
    /// Two images, strict v-sync (FIFO).
    DoubleBuffer,
    /// Three images, mailbox when the surface supports it.
    #[default]
    TripleBuffer,
}

impl PresentModePolicy {
    /// Number of swapchain images this policy asks for before clamping.
    pub fn desired_image_count(self) -> u32 {
        match self {
            PresentModePolicy::TripleBuffer => 3,
            PresentModePolicy::DoubleBuffer | PresentModePolicy::VsyncOff => 2,
        }
    }
}

pub const PRESENT_MODE_POLICY: PresentModePolicy = PresentModePolicy::TripleBuffer;
/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

pub const WINDOW_TITLE: &str = "Arcane Engine";
pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;

pub const VERTEX_SHADER_PATH: &str = "res/shaders/simple_vert.spv";
pub const FRAGMENT_SHADER_PATH: &str = "res/shaders/simple_frag.spv";
pub const TEXTURE_PATH: &str = "res/textures/checker.png";

#[cfg(feature = "enable_validations")]
pub const ENABLE_VALIDATIONS: bool = true;
#[cfg(not(feature = "enable_validations"))]
pub const ENABLE_VALIDATIONS: bool = false;

/// Settings handed to the renderer at construction.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub present_mode: PresentModePolicy,
    pub max_frames_in_flight: usize,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub texture: PathBuf,
    pub enable_validations: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            present_mode: PRESENT_MODE_POLICY,
            max_frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            vertex_shader: PathBuf::from(VERTEX_SHADER_PATH),
            fragment_shader: PathBuf::from(FRAGMENT_SHADER_PATH),
            texture: PathBuf::from(TEXTURE_PATH),
            enable_validations: ENABLE_VALIDATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_count_per_policy() {
        assert_eq!(PresentModePolicy::TripleBuffer.desired_image_count(), 3);
        assert_eq!(PresentModePolicy::DoubleBuffer.desired_image_count(), 2);
        assert_eq!(PresentModePolicy::VsyncOff.desired_image_count(), 2);
    }

    #[test]
    fn test_default_config_uses_constants() {
        let config = RendererConfig::default();
        assert_eq!(config.present_mode, PRESENT_MODE_POLICY);
        assert_eq!(config.max_frames_in_flight, MAX_FRAMES_IN_FLIGHT);
        assert!(config.vertex_shader.ends_with("simple_vert.spv"));
        assert!(config.fragment_shader.ends_with("simple_frag.spv"));
    }
}
