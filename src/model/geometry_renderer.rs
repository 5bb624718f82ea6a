use super::frame::{FrameContext, NodeBinding, NodeUniform};
use super::mesh::{Geometry, MeshBuffers, ModelVertex};
use super::shadow::ShadowPipelines;
use super::transform::{NodeId, NodeTree};
use super::GfxState;
use crate::error::SketchResult;
use crate::shaders::{ShaderOptions, SDR_GEOMETRY};
use crate::traits::{Drawable, ShadowCaster};
use cgmath::Vector3;

pub struct GeometryOptions<'a> {
    pub label: &'a str,
    pub geometry: &'a Geometry,
    pub node: NodeId,
    pub color: Vector3<f32>,
    /// How much the edges blend into the base color, 0 disables it.
    pub edge_fade: f32,
    pub casts_shadow: bool,
}

/// Indexed, lambert shaded mesh that receives shadows.
pub struct GeometryRenderer {
    pipeline: wgpu::RenderPipeline,
    mesh: MeshBuffers,
    binding: NodeBinding,
    node: NodeId,
    color: Vector3<f32>,
    edge_fade: f32,
    casts_shadow: bool,
}

impl GeometryRenderer {
    /// Writes the node's current world matrix, call before encoding.
    pub fn prepare(&self, queue: &wgpu::Queue, nodes: &NodeTree) {
        let uniform = NodeUniform::new(nodes.world_matrix(self.node), self.color, self.edge_fade);
        self.binding.write(queue, &uniform);
    }
}

impl Drawable for GeometryRenderer {
    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(1, &self.binding.bind_group, &[]);
        self.mesh.draw(render_pass);
    }
}

impl ShadowCaster for GeometryRenderer {
    fn cast_shadow<'a>(&'a self, pipelines: &'a ShadowPipelines, render_pass: &mut wgpu::RenderPass<'a>) {
        if !self.casts_shadow {
            return;
        }

        render_pass.set_pipeline(&pipelines.geometry);
        render_pass.set_bind_group(1, &self.binding.bind_group, &[]);
        self.mesh.draw(render_pass);
    }
}

impl GfxState {
    pub fn create_geometry_renderer(
        &self,
        ctx: &FrameContext,
        options: GeometryOptions,
    ) -> SketchResult<GeometryRenderer> {
        let device = &self.device;

        let shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_GEOMETRY],
            if_directives: &[],
            defines: &[],
            label: options.label,
        })?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", options.label)),
            bind_group_layouts: &[&ctx.frame_layout, &ctx.node_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} pipeline", options.label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[ModelVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(ctx.depth_stencil(true)),
            multisample: ctx.multisample(),
            multiview: None,
        });

        Ok(GeometryRenderer {
            pipeline,
            mesh: self.create_mesh_buffers(options.geometry, options.label),
            binding: ctx.create_node_binding(device, options.label),
            node: options.node,
            color: options.color,
            edge_fade: options.edge_fade,
            casts_shadow: options.casts_shadow,
        })
    }
}
