use super::{Camera, Clock, GfxState, Sketch};
use crate::error::SketchResult;
use crate::init::{AppSettings, InitSettings};
use crate::traits::CreateAspect;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode};
use winit::window::Window;

pub struct State {
    pub camera: Camera,
    pub clock: Clock,
    pub sketch: Sketch,
    pub gfx_state: GfxState,
}

impl State {
    pub fn update(&mut self) {
        self.clock.update();
        self.camera.update(self.clock.delta_sec());
        self.sketch.update(&self.gfx_state, &self.clock);
    }

    pub fn render(&mut self) {
        if let Err(err) = self
            .sketch
            .render(&self.gfx_state, &self.camera, &self.clock)
        {
            log::error!("frame {} failed: {}", self.clock.frame(), err);
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gfx_state.resize(size);
        self.camera.resize(self.gfx_state.aspect());
    }

    pub fn process_events(&mut self, input: KeyboardInput, shift_pressed: bool) {
        if self.camera.process_input(&input) {
            return;
        }

        if input.state != ElementState::Pressed {
            return;
        }

        match input.virtual_keycode {
            Some(VirtualKeyCode::P) => self.clock.toggle_pause(),
            Some(VirtualKeyCode::Tab) if !shift_pressed => self.sketch.toggle_shadow_map(),
            _ => {}
        }
    }

    pub fn new(app_settings: impl AppSettings, window: Window) -> SketchResult<Self> {
        let config = InitSettings::create_config(&app_settings);
        let gfx_state = pollster::block_on(GfxState::new(window))?;
        let camera = Camera::new(&config.camera, gfx_state.aspect());
        let sketch = Sketch::new(&gfx_state, &config)?;

        log::info!(
            "{} particles, {:?} / {:?}",
            sketch.particle_count(),
            config.policy,
            config.layout
        );

        Ok(Self {
            clock: Clock::new(),
            camera,
            sketch,
            gfx_state,
        })
    }
}
