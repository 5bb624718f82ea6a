use crate::error::{SketchError, SketchResult};
use crate::traits::CreateAspect;
use winit::dpi::PhysicalSize;
use winit::window;

/**
GfxState is used to pass around to others modules.
It owns the window, the surface and the device every resource is created from.
*/
pub struct GfxState {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    window: window::Window,
    surface: wgpu::Surface,
}

impl GfxState {
    pub async fn new(window: window::Window) -> SketchResult<Self> {
        let instance = wgpu::Instance::default();

        let surface = unsafe { instance.create_surface(&window) }.map_err(|err| {
            SketchError::ResourceCreation {
                label: "surface".to_string(),
                message: err.to_string(),
            }
        })?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SketchError::AdapterNotFound)?;

        log::info!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::default(),
                    limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| SketchError::ResourceCreation {
                label: "surface".to_string(),
                message: "adapter reports no surface formats".to_string(),
            })?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            window,
            device,
            surface_config,
            queue,
        })
    }

    pub fn window_id(&self) -> window::WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.surface_config.width = size.width;
            self.surface_config.height = size.height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// `Ok(None)` when the surface had to be reconfigured and the frame is skipped.
    pub fn current_frame(&self) -> SketchResult<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, dropping frame");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn finish_frame(&self, encoder: wgpu::CommandEncoder, output_frame: wgpu::SurfaceTexture) {
        self.queue.submit(Some(encoder.finish()));
        output_frame.present();
    }

    /// Runs `create` inside a validation error scope, turning a captured error
    /// into `SketchError::ResourceCreation`.
    pub fn validated<T>(&self, label: &str, create: impl FnOnce(&Self) -> SketchResult<T>) -> SketchResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = create(self);
        let error = pollster::block_on(self.device.pop_error_scope());

        match error {
            Some(err) => Err(SketchError::ResourceCreation {
                label: label.to_string(),
                message: err.to_string(),
            }),
            None => result,
        }
    }
}

impl CreateAspect for GfxState {
    fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }
}
