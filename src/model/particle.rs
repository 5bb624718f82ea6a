use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Upper bound (exclusive) of the life a particle restarts with.
pub const RESET_LIFE_JITTER: f32 = 0.25;

/// Host side view of one particle, independent of the GPU layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub life: f32,
}

impl Particle {
    pub fn new(position: Vector3<f32>, life: f32) -> Self {
        Self {
            position,
            velocity: Vector3::new(0., 0., 0.),
            life,
        }
    }
}

#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct StartData {
    pub position: [f32; 3],
    pub life: f32,
}

#[derive(Pod, Zeroable, Clone, Copy)]
#[repr(C)]
struct CompactParticle {
    position: [f32; 3],
    life: f32,
}

#[derive(Pod, Zeroable, Clone, Copy)]
#[repr(C)]
struct VelocityParticle {
    position: [f32; 3],
    _padding: f32,
    velocity: [f32; 3],
    life: f32,
}

const COMPACT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32];

const VELOCITY_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: 28,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32,
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x3,
    },
];

/// Byte layout of the particle buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleLayout {
    /// position, life
    Compact,
    /// position, padding, velocity, life
    WithVelocity,
}

impl ParticleLayout {
    pub fn stride(&self) -> u64 {
        match self {
            ParticleLayout::Compact => std::mem::size_of::<CompactParticle>() as u64,
            ParticleLayout::WithVelocity => std::mem::size_of::<VelocityParticle>() as u64,
        }
    }

    pub fn if_directives(&self) -> &'static [&'static str] {
        match self {
            ParticleLayout::Compact => &[],
            ParticleLayout::WithVelocity => &[crate::shaders::DIR_HAS_VELOCITY],
        }
    }

    /// The particle buffer doubles as a per instance vertex buffer.
    pub fn instance_desc(&self) -> wgpu::VertexBufferLayout<'static> {
        let attributes: &'static [wgpu::VertexAttribute] = match self {
            ParticleLayout::Compact => &COMPACT_ATTRIBUTES,
            ParticleLayout::WithVelocity => &VELOCITY_ATTRIBUTES,
        };

        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    }

    pub fn encode(&self, particles: &[Particle]) -> Vec<u8> {
        match self {
            ParticleLayout::Compact => {
                let gpu: Vec<CompactParticle> = particles
                    .iter()
                    .map(|p| CompactParticle {
                        position: p.position.into(),
                        life: p.life,
                    })
                    .collect();

                bytemuck::cast_slice(&gpu).to_vec()
            }
            ParticleLayout::WithVelocity => {
                let gpu: Vec<VelocityParticle> = particles
                    .iter()
                    .map(|p| VelocityParticle {
                        position: p.position.into(),
                        _padding: 0.,
                        velocity: p.velocity.into(),
                        life: p.life,
                    })
                    .collect();

                bytemuck::cast_slice(&gpu).to_vec()
            }
        }
    }

    /// Inverse of `encode`. Compact particles decode with zero velocity.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Particle> {
        let chunks = bytes.chunks_exact(self.stride() as usize);

        match self {
            ParticleLayout::Compact => chunks
                .map(|c| {
                    let p: CompactParticle = bytemuck::pod_read_unaligned(c);
                    Particle::new(p.position.into(), p.life)
                })
                .collect(),
            ParticleLayout::WithVelocity => chunks
                .map(|c| {
                    let p: VelocityParticle = bytemuck::pod_read_unaligned(c);

                    Particle {
                        position: p.position.into(),
                        velocity: p.velocity.into(),
                        life: p.life,
                    }
                })
                .collect(),
        }
    }
}

fn reset_life(rng: &mut impl Rng) -> f32 {
    rng.gen_range(0.0..RESET_LIFE_JITTER)
}

/// Random points inside a ball, uniform by volume.
pub fn volume_scatter(count: u32, radius: f32, rng: &mut impl Rng) -> Vec<StartData> {
    (0..count)
        .map(|_| {
            let theta = rng.gen_range(0.0..TAU);
            let phi = (rng.gen_range(-1.0f32..1.0)).acos();
            let r = radius * rng.gen::<f32>().cbrt();

            StartData {
                position: [
                    r * phi.sin() * theta.cos(),
                    r * phi.cos(),
                    r * phi.sin() * theta.sin(),
                ],
                life: reset_life(rng),
            }
        })
        .collect()
}

/// Vertices of `positions` assigned 1:1, cycling when there are more particles.
pub fn vertex_start_data(positions: &[[f32; 4]], count: u32, rng: &mut impl Rng) -> Vec<StartData> {
    if positions.is_empty() {
        return (0..count)
            .map(|_| StartData {
                position: [0.; 3],
                life: reset_life(rng),
            })
            .collect();
    }

    (0..count as usize)
        .map(|i| {
            let p = positions[i % positions.len()];

            StartData {
                position: [p[0], p[1], p[2]],
                life: reset_life(rng),
            }
        })
        .collect()
}

/// First frame state, lives spread over `[0, 1)` so resets are staggered.
pub fn initial_particles(start: &[StartData], rng: &mut impl Rng) -> Vec<Particle> {
    start
        .iter()
        .map(|s| Particle::new(s.position.into(), rng.gen_range(0.0..1.0)))
        .collect()
}
