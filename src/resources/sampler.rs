use std::{ops::Deref, rc::Rc};

use anyhow::Result;
use ash::vk::{
    self, BorderColor, CompareOp, Filter, SamplerAddressMode, SamplerCreateInfo,
    SamplerMipmapMode,
};
use tracing::debug;

use crate::LogicalDevice;

/// Sampling state of a texture. Textures with equal settings share one sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerSettings {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub address_mode: SamplerAddressMode,
    /// 1 disables anisotropic filtering
    pub max_anisotropy: u32,
    pub border_color: BorderColor,
    pub mipmap_mode: SamplerMipmapMode,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            mag_filter: Filter::LINEAR,
            min_filter: Filter::LINEAR,
            address_mode: SamplerAddressMode::REPEAT,
            max_anisotropy: 16,
            border_color: BorderColor::INT_OPAQUE_BLACK,
            mipmap_mode: SamplerMipmapMode::LINEAR,
        }
    }
}

impl SamplerSettings {
    /// Anisotropy level to request, limited to what the device supports
    pub fn effective_anisotropy(&self, device_limit: f32) -> Option<f32> {
        if self.max_anisotropy <= 1 {
            return None;
        }
        Some((self.max_anisotropy as f32).min(device_limit))
    }
}

pub struct Sampler {
    sampler: vk::Sampler,
    settings: SamplerSettings,
    logical_device: Rc<LogicalDevice>,
}

impl Sampler {
    pub fn new(logical_device: &Rc<LogicalDevice>, settings: SamplerSettings) -> Result<Self> {
        debug!("Creating sampler {:?}", settings);
        let anisotropy =
            settings.effective_anisotropy(logical_device.get_limits().max_sampler_anisotropy);
        let sampler_create_info = SamplerCreateInfo::default()
            .mag_filter(settings.mag_filter)
            .min_filter(settings.min_filter)
            .address_mode_u(settings.address_mode)
            .address_mode_v(settings.address_mode)
            .address_mode_w(settings.address_mode)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .border_color(settings.border_color)
            // texel coordinates in [0, 1)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(CompareOp::ALWAYS)
            .mipmap_mode(settings.mipmap_mode)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);
        let sampler = unsafe { logical_device.create_sampler(&sampler_create_info, None)? };
        Ok(Self {
            sampler,
            settings,
            logical_device: Rc::clone(logical_device),
        })
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        debug!("Dropping sampler");
        unsafe { self.logical_device.destroy_sampler(self.sampler, None) }
    }
}

impl Deref for Sampler {
    type Target = vk::Sampler;

    fn deref(&self) -> &Self::Target {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anisotropy_clamped_to_device() {
        let settings = SamplerSettings::default();
        assert_eq!(settings.effective_anisotropy(8.0), Some(8.0));
        assert_eq!(settings.effective_anisotropy(16.0), Some(16.0));
    }

    #[test]
    fn test_anisotropy_disabled() {
        let settings = SamplerSettings {
            max_anisotropy: 1,
            ..Default::default()
        };
        assert_eq!(settings.effective_anisotropy(16.0), None);
    }

    #[test]
    fn test_settings_compare_by_value() {
        let nearest = SamplerSettings {
            mag_filter: Filter::NEAREST,
            min_filter: Filter::NEAREST,
            ..Default::default()
        };
        assert_eq!(SamplerSettings::default(), SamplerSettings::default());
        assert_ne!(nearest, SamplerSettings::default());
    }
}
