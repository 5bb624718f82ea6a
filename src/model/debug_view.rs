use super::frame::FrameContext;
use super::GfxState;
use crate::error::SketchResult;
use crate::shaders::{ShaderOptions, DEF_SHADOW_MAP_SIZE, SDR_DEBUG_DEPTH};

/// Share of the surface height the shadow map preview takes.
const CORNER_FRACTION: f32 = 0.3;

/// Shadow map preview drawn into the bottom left corner of the main pass.
pub struct DepthDebugView {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    pub enabled: bool,
}

/// Square viewport `(x, y, size)` in the bottom left corner.
pub fn corner_viewport(width: u32, height: u32) -> (f32, f32, f32) {
    let size = (height.min(width) as f32 * CORNER_FRACTION).floor();
    (0., height as f32 - size, size)
}

impl DepthDebugView {
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, surface_size: (u32, u32)) {
        if !self.enabled {
            return;
        }

        let (x, y, size) = corner_viewport(surface_size.0, surface_size.1);

        if size < 1. {
            return;
        }

        render_pass.set_viewport(x, y, size, size, 0., 1.);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

impl GfxState {
    pub fn create_depth_debug_view(&self, ctx: &FrameContext, enabled: bool) -> SketchResult<DepthDebugView> {
        let device = &self.device;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth debug layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Depth debug bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&ctx.shadow_map.view),
            }],
        });

        let shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_DEBUG_DEPTH],
            if_directives: &[],
            defines: &[(DEF_SHADOW_MAP_SIZE, ctx.shadow_map.size.to_string())],
            label: "Depth debug",
        })?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth debug pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Depth debug pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
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
            depth_stencil: Some(ctx.depth_stencil(false)),
            multisample: ctx.multisample(),
            multiview: None,
        });

        Ok(DepthDebugView {
            pipeline,
            bind_group,
            enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_is_square_and_on_screen() {
        let (x, y, size) = corner_viewport(1600, 900);

        assert_eq!(x, 0.);
        assert_eq!(size, 270.);
        assert_eq!(y + size, 900.);
    }
}
