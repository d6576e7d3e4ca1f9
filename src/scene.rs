//! The hard-coded scene: two stacked textured quads spinning around Z.

use std::mem;

use ash::vk::{
    Extent2D, Format, VertexInputAttributeDescription, VertexInputBindingDescription,
    VertexInputRate,
};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const fn new(pos: [f32; 3], color: [f32; 3], uv: [f32; 2]) -> Self {
        Self { pos, color, uv }
    }

    pub fn binding_description() -> VertexInputBindingDescription {
        VertexInputBindingDescription::default()
            .binding(0)
            .stride(mem::size_of::<Self>() as u32)
            .input_rate(VertexInputRate::VERTEX)
    }

    pub fn attribute_descriptions() -> [VertexInputAttributeDescription; 3] {
        [
            VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: Format::R32G32B32_SFLOAT,
                offset: mem::offset_of!(Self, pos) as u32,
            },
            VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: Format::R32G32B32_SFLOAT,
                offset: mem::offset_of!(Self, color) as u32,
            },
            VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: Format::R32G32_SFLOAT,
                offset: mem::offset_of!(Self, uv) as u32,
            },
        ]
    }
}

pub const VERTICES: [Vertex; 8] = [
    Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0]),
    Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
    Vertex::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
    Vertex::new([-0.5, 0.5, 0.0], [1.0, 1.0, 1.0], [1.0, 1.0]),
    Vertex::new([-0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [1.0, 0.0]),
    Vertex::new([0.5, -0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 0.0]),
    Vertex::new([0.5, 0.5, -0.5], [0.0, 0.0, 1.0], [0.0, 1.0]),
    Vertex::new([-0.5, 0.5, -0.5], [1.0, 1.0, 1.0], [1.0, 1.0]),
];

pub const INDICES: [u32; 12] = [0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4];

const DEGREES_PER_SECOND: f32 = 90.0;
const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 10.0;

/// Transforms read by the vertex shader, one buffer per swapchain image.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl UniformBufferObject {
    /// Transforms `elapsed_seconds` into the animation, for a target of size `extent`.
    pub fn at(elapsed_seconds: f32, extent: Extent2D) -> Self {
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let mut proj = Mat4::perspective_rh(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
        // Vulkan clip space has Y pointing down
        proj.y_axis.y *= -1.0;

        Self {
            model: Mat4::from_rotation_z((elapsed_seconds * DEGREES_PER_SECOND).to_radians()),
            view: Mat4::look_at_rh(Vec3::splat(2.0), Vec3::ZERO, Vec3::Z),
            proj,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.stride, 32);

        let offsets = Vertex::attribute_descriptions().map(|attribute| attribute.offset);
        assert_eq!(offsets, [0, 12, 24]);
    }

    #[test]
    fn test_indices_in_range() {
        assert_eq!(INDICES.len() % 3, 0);
        assert!(INDICES.iter().all(|index| (*index as usize) < VERTICES.len()));
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(mem::size_of::<UniformBufferObject>(), 3 * 64);
    }

    #[test]
    fn test_projection_flips_y() {
        let extent = Extent2D {
            width: 1280,
            height: 720,
        };
        let ubo = UniformBufferObject::at(0.0, extent);
        assert!(ubo.proj.y_axis.y < 0.0);
        assert_eq!(ubo.model, Mat4::IDENTITY);
    }

    #[test]
    fn test_model_rotates_over_time() {
        let extent = Extent2D {
            width: 800,
            height: 800,
        };
        // a quarter turn after one second
        let ubo = UniformBufferObject::at(1.0, extent);
        let rotated = ubo.model.transform_vector3(Vec3::X);
        assert!((rotated - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_zero_height_does_not_produce_nan() {
        let ubo = UniformBufferObject::at(
            0.5,
            Extent2D {
                width: 100,
                height: 0,
            },
        );
        assert!(!ubo.proj.is_nan());
    }
}
