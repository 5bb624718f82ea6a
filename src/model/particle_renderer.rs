use super::compute::ParticleSimulator;
use super::frame::{FrameContext, NodeBinding, NodeUniform};
use super::shadow::ShadowPipelines;
use super::transform::{NodeId, NodeTree};
use super::GfxState;
use crate::error::SketchResult;
use crate::shaders::{ShaderOptions, SDR_PARTICLE};
use crate::traits::{Drawable, ShadowCaster};
use cgmath::Vector3;

/// Draws each particle as one camera facing triangle, instanced over the
/// particle buffer.
pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    binding: NodeBinding,
    node: NodeId,
    color: Vector3<f32>,
}

impl ParticleRenderer {
    pub fn prepare(&self, queue: &wgpu::Queue, nodes: &NodeTree) {
        let uniform = NodeUniform::new(nodes.world_matrix(self.node), self.color, 0.);
        self.binding.write(queue, &uniform);
    }

    fn record<'a>(
        &'a self,
        pipeline: &'a wgpu::RenderPipeline,
        simulator: &'a ParticleSimulator,
        render_pass: &mut wgpu::RenderPass<'a>,
    ) {
        let count = simulator.particle_count();

        if count == 0 {
            return;
        }

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(1, &self.binding.bind_group, &[]);
        render_pass.set_vertex_buffer(0, simulator.particle_buffer().slice(..));
        render_pass.draw(0..3, 0..count);
    }
}

/// Simulation plus the renderer drawing it.
pub struct ParticleSystem {
    pub simulator: ParticleSimulator,
    pub renderer: ParticleRenderer,
}

impl Drawable for ParticleSystem {
    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        self.renderer
            .record(&self.renderer.pipeline, &self.simulator, render_pass);
    }
}

impl ShadowCaster for ParticleSystem {
    fn cast_shadow<'a>(&'a self, pipelines: &'a ShadowPipelines, render_pass: &mut wgpu::RenderPass<'a>) {
        self.renderer
            .record(&pipelines.particle, &self.simulator, render_pass);
    }
}

impl GfxState {
    pub fn create_particle_renderer(
        &self,
        ctx: &FrameContext,
        simulator: &ParticleSimulator,
        node: NodeId,
        color: Vector3<f32>,
    ) -> SketchResult<ParticleRenderer> {
        let device = &self.device;
        let layout = simulator.layout();

        let shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_PARTICLE],
            if_directives: layout.if_directives(),
            defines: &[],
            label: "Particles",
        })?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle pipeline layout"),
            bind_group_layouts: &[&ctx.frame_layout, &ctx.node_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[layout.instance_desc()],
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
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(ctx.depth_stencil(true)),
            multisample: ctx.multisample(),
            multiview: None,
        });

        Ok(ParticleRenderer {
            pipeline,
            binding: ctx.create_node_binding(device, "particles"),
            node,
            color,
        })
    }
}
