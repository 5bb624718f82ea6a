use super::frame::FrameContext;
use super::mesh::ModelVertex;
use super::particle::ParticleLayout;
use super::GfxState;
use crate::error::SketchResult;
use crate::shaders::{ShaderOptions, SDR_GEOMETRY_DEPTH, SDR_PARTICLE_DEPTH};
use crate::traits::{CreateFxView, ShadowCaster};
use cgmath::{Vector2, Vector4};

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct ShadowMap {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

/// Depth only pipelines, one per kind of caster.
pub struct ShadowPipelines {
    pub geometry: wgpu::RenderPipeline,
    pub particle: wgpu::RenderPipeline,
}

pub struct ShadowPass {
    pipelines: ShadowPipelines,
}

impl ShadowPass {
    /// Clears the shadow map and records every caster from the light.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        ctx: &FrameContext,
        casters: &[&dyn ShadowCaster],
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        render_pass.set_bind_group(0, &ctx.shadow_bind_group, &[]);

        for caster in casters {
            caster.cast_shadow(&self.pipelines, &mut render_pass);
        }
    }
}

/// Shadowed fraction of a light space position, 0 when fully lit.
///
/// Host version of `shadow_calculation`. `stored_depth` returns the shadow
/// map depth at a texel, taps compare with `LessEqual`.
pub fn shadow_factor(
    light_position: Vector4<f32>,
    map_size: u32,
    bias: f32,
    stored_depth: impl Fn(Vector2<i32>) -> f32,
) -> f32 {
    let ndc = light_position.truncate() / light_position.w;
    let coords = Vector2::new(ndc.x * 0.5 + 0.5, ndc.y * -0.5 + 0.5);

    let in_bounds = (0. ..=1.).contains(&coords.x)
        && (0. ..=1.).contains(&coords.y)
        && (0. ..=1.).contains(&ndc.z);

    if !in_bounds {
        return 0.;
    }

    let size = map_size as f32;
    let current_depth = ndc.z - bias;
    let mut lit = 0.;

    for x in -1..=1 {
        for y in -1..=1 {
            let uv = coords + Vector2::new(x as f32, y as f32) / size;
            let texel = Vector2::new(
                ((uv.x * size) as i32).clamp(0, map_size as i32 - 1),
                ((uv.y * size) as i32).clamp(0, map_size as i32 - 1),
            );

            if current_depth <= stored_depth(texel) {
                lit += 1.;
            }
        }
    }

    1. - lit / 9.
}

impl GfxState {
    pub fn create_shadow_map(&self, size: u32) -> ShadowMap {
        let device = &self.device;

        let view = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Shadow map"),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SHADOW_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .default_view();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        ShadowMap { view, sampler, size }
    }

    pub fn create_shadow_pass(&self, ctx: &FrameContext, layout: ParticleLayout) -> SketchResult<ShadowPass> {
        let device = &self.device;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow pipeline layout"),
            bind_group_layouts: &[&ctx.shadow_layout, &ctx.node_layout],
            push_constant_ranges: &[],
        });

        let depth_stencil = Some(wgpu::DepthStencilState {
            format: SHADOW_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        });

        let geometry_shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_GEOMETRY_DEPTH],
            if_directives: &[],
            defines: &[],
            label: "Geometry depth",
        })?;

        let geometry = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry shadow pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &geometry_shader,
                entry_point: "vs_main",
                buffers: &[ModelVertex::desc()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let particle_shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_PARTICLE_DEPTH],
            if_directives: layout.if_directives(),
            defines: &[],
            label: "Particle depth",
        })?;

        let particle = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle shadow pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &particle_shader,
                entry_point: "vs_main",
                buffers: &[layout.instance_desc()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(ShadowPass {
            pipelines: ShadowPipelines { geometry, particle },
        })
    }
}
