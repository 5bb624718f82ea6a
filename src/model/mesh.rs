use super::GfxState;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use wgpu::util::DeviceExt;

#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl ModelVertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Procedural shapes particles can be scattered over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshSource {
    Sphere,
    Torus,
    Cube,
}

impl MeshSource {
    pub fn create_geometry(&self) -> Geometry {
        match self {
            MeshSource::Sphere => Geometry::sphere(1., 48, 32),
            MeshSource::Torus => Geometry::torus(1., 0.35, 24, 64),
            MeshSource::Cube => Geometry::cube(1.6),
        }
    }
}

/// Indexed triangle list, counter clockwise front faces.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Positions padded to `vec4` for storage buffers.
    pub fn scatter_vertices(&self) -> Vec<[f32; 4]> {
        self.vertices
            .iter()
            .map(|v| [v.position[0], v.position[1], v.position[2], 1.])
            .collect()
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let normal = [
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                ];

                vertices.push(ModelVertex {
                    position: normal.map(|n| n * radius),
                    uv: [u, 1. - v],
                    normal,
                });
            }
        }

        let row = width_segments + 1;

        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend([a, b, d]);
                }

                if iy != height_segments - 1 {
                    indices.extend([b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Flat plane on XZ facing up.
    pub fn plane(width: f32, depth: f32) -> Self {
        let (w, d) = (width / 2., depth / 2.);
        let up = [0., 1., 0.];

        let vertices = vec![
            ModelVertex { position: [-w, 0., -d], uv: [0., 0.], normal: up },
            ModelVertex { position: [w, 0., -d], uv: [1., 0.], normal: up },
            ModelVertex { position: [-w, 0., d], uv: [0., 1.], normal: up },
            ModelVertex { position: [w, 0., d], uv: [1., 1.], normal: up },
        ];

        Self {
            vertices,
            indices: vec![0, 2, 1, 1, 2, 3],
        }
    }

    pub fn cube(size: f32) -> Self {
        // normal, u axis, v axis with u x v = normal
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1., 0., 0.], [0., 0., -1.], [0., 1., 0.]),
            ([-1., 0., 0.], [0., 0., 1.], [0., 1., 0.]),
            ([0., 1., 0.], [1., 0., 0.], [0., 0., -1.]),
            ([0., -1., 0.], [1., 0., 0.], [0., 0., 1.]),
            ([0., 0., 1.], [1., 0., 0.], [0., 1., 0.]),
            ([0., 0., -1.], [-1., 0., 0.], [0., 1., 0.]),
        ];

        let h = size / 2.;
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for (normal, u, v) in faces {
            let start = vertices.len() as u32;

            for (su, sv) in [(-1., -1.), (1., -1.), (1., 1.), (-1., 1.)] {
                let position = [0, 1, 2].map(|k| (normal[k] + u[k] * su + v[k] * sv) * h);

                vertices.push(ModelVertex {
                    position,
                    uv: [(su + 1.) / 2., (1. - sv) / 2.],
                    normal,
                });
            }

            indices.extend([start, start + 1, start + 2, start, start + 2, start + 3]);
        }

        Self { vertices, indices }
    }

    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for j in 0..=radial_segments {
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let v = j as f32 / radial_segments as f32 * TAU;

                let position = [
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                ];
                let normal = [v.cos() * u.cos(), v.cos() * u.sin(), v.sin()];

                vertices.push(ModelVertex {
                    position,
                    uv: [
                        i as f32 / tubular_segments as f32,
                        j as f32 / radial_segments as f32,
                    ],
                    normal,
                });
            }
        }

        let row = tubular_segments + 1;

        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;

                indices.extend([a, b, d, b, c, d]);
            }
        }

        Self { vertices, indices }
    }

    /// Open tube standing on the origin along +Y.
    pub fn cylinder(radius: f32, height: f32, radial_segments: u32, height_segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;

            for ix in 0..=radial_segments {
                let u = ix as f32 / radial_segments as f32;
                let theta = u * TAU;
                let normal = [theta.sin(), 0., theta.cos()];

                vertices.push(ModelVertex {
                    position: [normal[0] * radius, v * height, normal[2] * radius],
                    uv: [u, v],
                    normal,
                });
            }
        }

        let row = radial_segments + 1;

        for iy in 0..height_segments {
            for ix in 0..radial_segments {
                let a = iy * row + ix;
                let b = (iy + 1) * row + ix;
                let c = (iy + 1) * row + ix + 1;
                let d = iy * row + ix + 1;

                indices.extend([a, d, b, b, d, c]);
            }
        }

        Self { vertices, indices }
    }
}

pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

impl GfxState {
    pub fn create_mesh_buffers(&self, geometry: &Geometry, label: &str) -> MeshBuffers {
        let device = &self.device;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} vertex buffer", label)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} index buffer", label)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffers {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }
}
