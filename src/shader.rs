use std::{
    ffi::CStr,
    fs,
    ops::Deref,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use ash::vk::{self, PipelineShaderStageCreateInfo, ShaderModuleCreateInfo, ShaderStageFlags};
use tracing::debug;

use crate::{error::EngineError, LogicalDevice};

/// Reinterprets SPIR-V bytes as words. `None` if the length isn't a multiple of 4.
pub fn spirv_words(code: &[u8]) -> Option<Vec<u32>> {
    if code.is_empty() || code.len() % 4 != 0 {
        return None;
    }
    let words = code
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Some(words)
}

pub struct ShaderModule {
    shader_module: vk::ShaderModule,
    logical_device: Rc<LogicalDevice>,
}

impl ShaderModule {
    /// Reads precompiled SPIR-V from `path`. The contents are handed to the driver as-is.
    pub fn from_file(logical_device: &Rc<LogicalDevice>, path: &Path) -> Result<Self> {
        debug!("Loading shader module {}", path.display());
        let code = fs::read(path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        let code = spirv_words(&code).ok_or_else(|| EngineError::InvalidShaderCode {
            path: path.to_path_buf(),
        })?;
        let shader_module_create_info = ShaderModuleCreateInfo::default().code(&code);
        let shader_module = unsafe {
            logical_device.create_shader_module(&shader_module_create_info, None)
        }
        .with_context(|| format!("failed to create shader module {}", path.display()))?;
        Ok(Self {
            shader_module,
            logical_device: Rc::clone(logical_device),
        })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        debug!("Dropping shader module");
        unsafe {
            self.logical_device
                .destroy_shader_module(self.shader_module, None)
        }
    }
}

impl Deref for ShaderModule {
    type Target = vk::ShaderModule;

    fn deref(&self) -> &Self::Target {
        &self.shader_module
    }
}

/// A vertex + fragment shader pair.
pub struct Shader {
    vertex: ShaderModule,
    fragment: ShaderModule,
    paths: (PathBuf, PathBuf),
}

impl Shader {
    pub fn load(
        logical_device: &Rc<LogicalDevice>,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<Self> {
        Ok(Self {
            vertex: ShaderModule::from_file(logical_device, vertex_path)?,
            fragment: ShaderModule::from_file(logical_device, fragment_path)?,
            paths: (vertex_path.to_path_buf(), fragment_path.to_path_buf()),
        })
    }

    /// Stage create infos for both modules, entering at `entry_point`
    pub fn stages<'a>(&self, entry_point: &'a CStr) -> [PipelineShaderStageCreateInfo<'a>; 2] {
        [
            PipelineShaderStageCreateInfo::default()
                .stage(ShaderStageFlags::VERTEX)
                .module(*self.vertex)
                .name(entry_point),
            PipelineShaderStageCreateInfo::default()
                .stage(ShaderStageFlags::FRAGMENT)
                .module(*self.fragment)
                .name(entry_point),
        ]
    }

    pub fn paths(&self) -> &(PathBuf, PathBuf) {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spirv_words() {
        // SPIR-V magic number, little endian
        let code = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
        assert_eq!(spirv_words(&code), Some(vec![0x0723_0203, 0x0001_0000]));
    }

    #[test]
    fn test_spirv_words_rejects_partial_words() {
        assert_eq!(spirv_words(&[0x03, 0x02, 0x23]), None);
        assert_eq!(spirv_words(&[]), None);
    }

    /// Execution model of the `main` entry point, if the module declares one.
    fn main_entry_point(words: &[u32]) -> Option<u32> {
        const OP_ENTRY_POINT: u32 = 15;
        // five word header
        let mut offset = 5;
        while offset < words.len() {
            let word_count = (words[offset] >> 16) as usize;
            let opcode = words[offset] & 0xffff;
            if word_count == 0 || offset + word_count > words.len() {
                return None;
            }
            if opcode == OP_ENTRY_POINT {
                let name: Vec<u8> = words[offset + 3..offset + word_count]
                    .iter()
                    .flat_map(|word| word.to_le_bytes())
                    .take_while(|byte| *byte != 0)
                    .collect();
                if name == b"main" {
                    return Some(words[offset + 1]);
                }
            }
            offset += word_count;
        }
        None
    }

    #[test]
    fn test_shipped_shader_binaries() {
        // execution models: 0 is vertex, 4 is fragment
        for (file, execution_model) in [("simple_vert.spv", 0), ("simple_frag.spv", 4)] {
            let path = Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("res/shaders")
                .join(file);
            let code = fs::read(&path).unwrap();
            let words = spirv_words(&code).unwrap();
            assert_eq!(words[0], 0x0723_0203, "{}", path.display());
            assert_eq!(main_entry_point(&words), Some(execution_model));
        }
    }
}
