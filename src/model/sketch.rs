use super::camera::Camera;
use super::compute::{ScatterMesh, ScatterSkin, SimulatorOptions};
use super::debug_view::DepthDebugView;
use super::frame::{FrameContext, FrameSettings};
use super::geometry_renderer::{GeometryOptions, GeometryRenderer};
use super::light::Light;
use super::mesh::Geometry;
use super::particle::{vertex_start_data, volume_scatter, Particle};
use super::particle_renderer::ParticleSystem;
use super::rig::{Rig, StalkOptions};
use super::shadow::ShadowPass;
use super::simulation::SimulationPolicy;
use super::transform::{NodeTree, Transform};
use super::{Clock, GfxState};
use crate::error::SketchResult;
use crate::init::SketchConfig;
use crate::texture::RenderTargets;
use crate::traits::Drawable;
use cgmath::Vector3;
use rand::{rngs::StdRng, SeedableRng};

/// Owns every pass and drives one frame: compute, shadow, main, debug.
pub struct Sketch {
    ctx: FrameContext,
    nodes: NodeTree,
    light: Light,
    particles: ParticleSystem,
    floor: GeometryRenderer,
    sphere: GeometryRenderer,
    rig: Option<Rig>,
    shadow_pass: ShadowPass,
    debug_view: DepthDebugView,
    targets: RenderTargets,
    clear_color: wgpu::Color,
    readback_interval: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeStats {
    pub count: usize,
    pub alive: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

pub fn life_stats(particles: &[Particle]) -> Option<LifeStats> {
    if particles.is_empty() {
        return None;
    }

    let (min, max, sum) = particles.iter().fold(
        (f32::MAX, f32::MIN, 0.),
        |(min, max, sum), p| (min.min(p.life), max.max(p.life), sum + p.life),
    );

    Some(LifeStats {
        count: particles.len(),
        alive: particles.iter().filter(|p| p.life <= 1.).count(),
        min,
        max,
        mean: sum / particles.len() as f32,
    })
}

impl Sketch {
    pub fn new(gfx: &GfxState, config: &SketchConfig) -> SketchResult<Self> {
        config.validate(gfx.device.limits().max_texture_dimension_2d)?;

        gfx.validated("sketch", |gfx| Self::build(gfx, config))
    }

    fn build(gfx: &GfxState, config: &SketchConfig) -> SketchResult<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let ctx = gfx.create_frame_context(FrameSettings {
            particle_size: config.particle_size,
            shadow_map_size: config.shadow.map_size,
            shadow_bias: config.shadow.bias,
        });

        let mut nodes = NodeTree::new();
        let floor_node = nodes.add("floor", Transform::default(), None);
        let sphere_node = nodes.add(
            "sphere",
            Transform::from_position(Vector3::new(-2.2, 0.6, 1.4)),
            None,
        );

        let count = config.particle_count;
        let mut rig = None;

        let (particle_node, simulator) = match config.policy {
            SimulationPolicy::VolumeScatter => {
                let node = nodes.add("particles", Transform::from_position(Vector3::new(0., 1.5, 0.)), None);

                let simulator = gfx.create_particle_simulator(SimulatorOptions {
                    policy: config.policy,
                    layout: config.layout,
                    settings: &config.simulation,
                    start_data: volume_scatter(count, config.volume_radius, &mut rng),
                    scatter: None,
                    rng: &mut rng,
                })?;

                (node, simulator)
            }
            SimulationPolicy::MeshSurfaceSample => {
                let node = nodes.add("particles", Transform::from_position(Vector3::new(0., 1.5, 0.)), None);
                let geometry = config.mesh.create_geometry();
                let vertices = geometry.scatter_vertices();

                let simulator = gfx.create_particle_simulator(SimulatorOptions {
                    policy: config.policy,
                    layout: config.layout,
                    settings: &config.simulation,
                    start_data: vertex_start_data(&vertices, count, &mut rng),
                    scatter: Some(ScatterMesh {
                        vertices: &vertices,
                        indices: &geometry.indices,
                        skin: None,
                    }),
                    rng: &mut rng,
                })?;

                (node, simulator)
            }
            SimulationPolicy::SkinnedMeshSample => {
                let mut stalk = Rig::stalk(&mut nodes, &StalkOptions::default())?;

                if let Some(name) = &config.animation {
                    stalk.animation.run_animation(name);
                }

                let vertices = stalk.geometry.scatter_vertices();

                let simulator = gfx.create_particle_simulator(SimulatorOptions {
                    policy: config.policy,
                    layout: config.layout,
                    settings: &config.simulation,
                    start_data: vertex_start_data(&vertices, count, &mut rng),
                    scatter: Some(ScatterMesh {
                        vertices: &vertices,
                        indices: &stalk.geometry.indices,
                        skin: Some(ScatterSkin {
                            skin: &stalk.skin,
                            joints: &stalk.skin_joints,
                            weights: &stalk.skin_weights,
                        }),
                    }),
                    rng: &mut rng,
                })?;

                let node = stalk.root;
                rig = Some(stalk);

                (node, simulator)
            }
        };

        let renderer = gfx.create_particle_renderer(
            &ctx,
            &simulator,
            particle_node,
            config.particle_color.into(),
        )?;

        let floor = gfx.create_geometry_renderer(
            &ctx,
            GeometryOptions {
                label: "Floor",
                geometry: &Geometry::plane(20., 20.),
                node: floor_node,
                color: config.floor_color.into(),
                edge_fade: 1.,
                casts_shadow: false,
            },
        )?;

        let sphere = gfx.create_geometry_renderer(
            &ctx,
            GeometryOptions {
                label: "Sphere",
                geometry: &Geometry::sphere(0.6, 48, 32),
                node: sphere_node,
                color: config.sphere_color.into(),
                edge_fade: 0.,
                casts_shadow: true,
            },
        )?;

        let shadow_pass = gfx.create_shadow_pass(&ctx, config.layout)?;
        let debug_view = gfx.create_depth_debug_view(&ctx, config.show_shadow_map)?;
        let [r, g, b] = config.clear_color.map(f64::from);

        nodes.update_world_matrices();

        Ok(Self {
            light: Light::new(&config.light),
            particles: ParticleSystem { simulator, renderer },
            targets: gfx.create_render_targets(),
            clear_color: wgpu::Color { r, g, b, a: 1. },
            readback_interval: config.readback_interval.filter(|n| *n > 0),
            ctx,
            nodes,
            floor,
            sphere,
            rig,
            shadow_pass,
            debug_view,
        })
    }

    /// Advances animation and skin, then the simulation uniforms.
    pub fn update(&mut self, gfx: &GfxState, clock: &Clock) {
        let delta = clock.sim_delta_sec();

        if let Some(rig) = &mut self.rig {
            rig.animation.update(delta, &mut self.nodes);
        }

        self.nodes.update_world_matrices();

        if let Some(rig) = &mut self.rig {
            rig.skin.update(&self.nodes, rig.root);
            self.particles
                .simulator
                .upload_joint_matrices(&gfx.queue, &rig.skin);
        }

        self.particles
            .simulator
            .update(&gfx.queue, clock.sim_elapsed_sec(), delta);
    }

    pub fn render(&mut self, gfx: &GfxState, camera: &Camera, clock: &Clock) -> SketchResult<()> {
        if self.targets.is_outdated(gfx) {
            self.targets = gfx.create_render_targets();
        }

        let Some(output_frame) = gfx.current_frame()? else {
            return Ok(());
        };

        let output_view = output_frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let queue = &gfx.queue;
        self.ctx.write_scene(queue, camera, clock.elapsed_sec());
        self.ctx.write_light(queue, &self.light);
        self.floor.prepare(queue, &self.nodes);
        self.sphere.prepare(queue, &self.nodes);
        self.particles.renderer.prepare(queue, &self.nodes);

        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });

        self.particles.simulator.compute(&mut encoder);

        self.shadow_pass.render(
            &mut encoder,
            &self.ctx,
            &[&self.particles, &self.sphere, &self.floor],
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.msaa_view,
                    resolve_target: Some(&output_view),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: false,
                    }),
                    stencil_ops: None,
                }),
            });

            render_pass.set_bind_group(0, &self.ctx.frame_bind_group, &[]);

            self.floor.draw(&mut render_pass);
            self.sphere.draw(&mut render_pass);
            self.particles.draw(&mut render_pass);
            self.debug_view.draw(&mut render_pass, self.targets.size);
        }

        gfx.finish_frame(encoder, output_frame);

        if let Some(interval) = self.readback_interval {
            if clock.frame() % interval as usize == 0 {
                self.log_life_stats(gfx)?;
            }
        }

        Ok(())
    }

    fn log_life_stats(&self, gfx: &GfxState) -> SketchResult<()> {
        let particles = self.particles.simulator.read_back(gfx)?;

        if let Some(stats) = life_stats(&particles) {
            log::info!(
                "{} / {} alive, life min {:.3} max {:.3} mean {:.3}",
                stats.alive,
                stats.count,
                stats.min,
                stats.max,
                stats.mean
            );
        }

        Ok(())
    }

    pub fn toggle_shadow_map(&mut self) {
        self.debug_view.enabled = !self.debug_view.enabled;
    }

    pub fn particle_count(&self) -> u32 {
        self.particles.simulator.particle_count()
    }
}
