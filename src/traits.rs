use crate::model::shadow::ShadowPipelines;

pub trait CreateAspect {
    fn aspect(&self) -> f32;
}

pub trait CreateFxView {
    fn default_view(&self) -> wgpu::TextureView;
}

/// Anything recorded into the multisampled main pass.
pub trait Drawable {
    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>);
}

/// Anything recorded into the depth-only pass seen from the light.
pub trait ShadowCaster {
    fn cast_shadow<'a>(
        &'a self,
        pipelines: &'a ShadowPipelines,
        render_pass: &mut wgpu::RenderPass<'a>,
    );
}
