pub mod animation;
pub mod camera;
pub mod clock;
pub mod compute;
pub mod debug_view;
pub mod frame;
pub mod geometry_renderer;
pub mod gfx_state;
pub mod light;
pub mod mesh;
pub mod particle;
pub mod particle_renderer;
pub mod rig;
pub mod shadow;
pub mod simulation;
pub mod sketch;
pub mod skin;
pub mod state;
pub mod transform;

pub use camera::Camera;
pub use clock::Clock;
pub use gfx_state::GfxState;
pub use sketch::Sketch;
pub use state::State;
