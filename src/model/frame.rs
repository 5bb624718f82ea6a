//! Per frame data shared by every pass.

use super::camera::Camera;
use super::light::Light;
use super::shadow::ShadowMap;
use super::GfxState;
use crate::math::{mat4_to_array, quat_to_array};
use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, Vector3};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

pub const SAMPLE_COUNT: u32 = 4;

#[derive(Pod, Zeroable, Clone, Copy, Debug)]
#[repr(C)]
pub struct SceneUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub orientation: [f32; 4],
    /// particle_size, shadow_map_size, shadow_bias, time
    pub params: [f32; 4],
}

impl SceneUniform {
    pub fn new(camera: &Camera, settings: &FrameSettings, time: f32) -> Self {
        Self {
            projection: mat4_to_array(&camera.projection_matrix()),
            view: mat4_to_array(&camera.view_matrix()),
            orientation: quat_to_array(&camera.orientation()),
            params: [
                settings.particle_size,
                settings.shadow_map_size as f32,
                settings.shadow_bias,
                time,
            ],
        }
    }
}

#[derive(Pod, Zeroable, Clone, Copy, Debug)]
#[repr(C)]
pub struct LightUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub orientation: [f32; 4],
    pub direction: [f32; 4],
}

impl LightUniform {
    pub fn new(light: &Light) -> Self {
        let direction = light.direction();

        Self {
            projection: mat4_to_array(&light.projection_matrix()),
            view: mat4_to_array(&light.view_matrix()),
            orientation: quat_to_array(&light.orientation()),
            direction: [direction.x, direction.y, direction.z, 0.],
        }
    }
}

#[derive(Pod, Zeroable, Clone, Copy, Debug)]
#[repr(C)]
pub struct NodeUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x: edge fade
    pub params: [f32; 4],
}

impl NodeUniform {
    pub fn new(model: Matrix4<f32>, color: Vector3<f32>, edge_fade: f32) -> Self {
        Self {
            model: mat4_to_array(&model),
            color: [color.x, color.y, color.z, 1.],
            params: [edge_fade, 0., 0., 0.],
        }
    }
}

/// Model uniform of one drawable.
pub struct NodeBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl NodeBinding {
    pub fn write(&self, queue: &wgpu::Queue, uniform: &NodeUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameSettings {
    pub particle_size: f32,
    pub shadow_map_size: u32,
    pub shadow_bias: f32,
}

/// Uniform buffers, layouts and the shadow map every renderer binds.
///
/// Group 0 of the main pass holds scene, light, shadow map and comparison
/// sampler. The shadow pass binds only scene and light. Group 1 is always
/// the drawable's `NodeUniform`.
pub struct FrameContext {
    pub settings: FrameSettings,
    pub color_format: wgpu::TextureFormat,
    pub shadow_map: ShadowMap,

    pub frame_layout: wgpu::BindGroupLayout,
    pub shadow_layout: wgpu::BindGroupLayout,
    pub node_layout: wgpu::BindGroupLayout,
    pub frame_bind_group: wgpu::BindGroup,
    pub shadow_bind_group: wgpu::BindGroup,

    scene_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
}

fn uniform_entry(binding: u32, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

impl FrameContext {
    pub fn write_scene(&self, queue: &wgpu::Queue, camera: &Camera, time: f32) {
        let uniform = SceneUniform::new(camera, &self.settings, time);
        queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn write_light(&self, queue: &wgpu::Queue, light: &Light) {
        let uniform = LightUniform::new(light);
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn create_node_binding(&self, device: &wgpu::Device, label: &str) -> NodeBinding {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} node buffer", label)),
            size: std::mem::size_of::<NodeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} node bind group", label)),
            layout: &self.node_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        NodeBinding { buffer, bind_group }
    }

    pub fn depth_stencil(&self, depth_write_enabled: bool) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: GfxState::DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: if depth_write_enabled {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    pub fn multisample(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: SAMPLE_COUNT,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

impl GfxState {
    pub fn create_frame_context(&self, settings: FrameSettings) -> FrameContext {
        let device = &self.device;
        let scene_size = std::mem::size_of::<SceneUniform>();
        let light_size = std::mem::size_of::<LightUniform>();

        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene buffer"),
            contents: bytemuck::bytes_of(&SceneUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light buffer"),
            contents: bytemuck::bytes_of(&LightUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let shadow_map = self.create_shadow_map(settings.shadow_map_size);

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame layout"),
            entries: &[
                uniform_entry(0, scene_size),
                uniform_entry(1, light_size),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow pass layout"),
            entries: &[uniform_entry(0, scene_size), uniform_entry(1, light_size)],
        });

        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Node layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<NodeUniform>())],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame bind group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow pass bind group"),
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        FrameContext {
            settings,
            color_format: self.surface_config.format,
            shadow_map,
            frame_layout,
            shadow_layout,
            node_layout,
            frame_bind_group,
            shadow_bind_group,
            scene_buffer,
            light_buffer,
        }
    }
}
