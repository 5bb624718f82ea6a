use crate::model::frame::SAMPLE_COUNT;
use crate::model::gfx_state::GfxState;
use crate::traits::CreateFxView;

/// Multisampled color and depth attachments of the main pass, sized to the surface.
pub struct RenderTargets {
    pub msaa_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl RenderTargets {
    pub fn is_outdated(&self, gfx_state: &GfxState) -> bool {
        self.size != gfx_state.surface_size()
    }
}

impl GfxState {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn tex_size(&self) -> wgpu::Extent3d {
        let config = &self.surface_config;

        wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn create_depth_view(&self) -> wgpu::TextureView {
        let desc = wgpu::TextureDescriptor {
            label: Some("Depth texture"),
            size: self.tex_size(),
            mip_level_count: 1,
            sample_count: SAMPLE_COUNT,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        };

        self.device.create_texture(&desc).default_view()
    }

    pub fn create_msaa_view(&self) -> wgpu::TextureView {
        let config = &self.surface_config;

        self.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Multisampled frame"),
                size: self.tex_size(),
                mip_level_count: 1,
                sample_count: SAMPLE_COUNT,
                view_formats: &[],
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            })
            .default_view()
    }

    pub fn create_render_targets(&self) -> RenderTargets {
        log::debug!("creating render targets {:?}", self.surface_size());

        RenderTargets {
            msaa_view: self.create_msaa_view(),
            depth_view: self.create_depth_view(),
            size: self.surface_size(),
        }
    }
}

impl CreateFxView for wgpu::Texture {
    fn default_view(&self) -> wgpu::TextureView {
        self.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
