//! Host mirror of `compute.wgsl`.
//!
//! `step_particle` performs exactly what one compute thread does, which lets
//! the reset policy and the advection rule be checked without a device.

use super::particle::{Particle, StartData};
use crate::noise::{barycentric_sample, curl_noise};
use crate::shaders::{DIR_MESH_SAMPLE, DIR_SKINNED, DIR_STATIC_MESH};
use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

pub const WORKGROUP_SIZE: u32 = 64;

/// Where particles respawn once their life runs past 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPolicy {
    /// Back to the slot's own start position.
    VolumeScatter,
    /// Random point on a random triangle of a static mesh.
    MeshSurfaceSample,
    /// Like `MeshSurfaceSample` on the current pose of a skinned mesh.
    SkinnedMeshSample,
}

impl SimulationPolicy {
    pub fn if_directives(&self) -> &'static [&'static str] {
        match self {
            SimulationPolicy::VolumeScatter => &[],
            SimulationPolicy::MeshSurfaceSample => &[DIR_MESH_SAMPLE, DIR_STATIC_MESH],
            SimulationPolicy::SkinnedMeshSample => &[DIR_MESH_SAMPLE, DIR_SKINNED],
        }
    }

    pub fn binding_count(&self) -> u32 {
        match self {
            SimulationPolicy::VolumeScatter => 3,
            SimulationPolicy::MeshSurfaceSample => 5,
            SimulationPolicy::SkinnedMeshSample => 8,
        }
    }

    pub fn samples_mesh(&self) -> bool {
        !matches!(self, SimulationPolicy::VolumeScatter)
    }
}

/// Tunables of the advection, fixed for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Time scale of the animated noise phases.
    pub curl_time: f32,
    pub noise_scale: f32,
    /// Distance travelled per second along the normalized curl.
    pub step_size: f32,
    pub lifetime_sec: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            curl_time: 0.15,
            noise_scale: 0.7,
            step_size: 0.6,
            lifetime_sec: 1.6,
        }
    }
}

#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct SimulationUniforms {
    pub time: f32,
    pub delta: f32,
    pub curl_time: f32,
    pub seed: f32,
    pub mesh_triangle_count: f32,
    pub life_rate: f32,
    pub noise_scale: f32,
    pub step_size: f32,
    pub particle_count: u32,
    _padding: [u32; 3],
}

impl SimulationUniforms {
    pub fn new(
        settings: &SimulationSettings,
        seed: f32,
        mesh_triangle_count: u32,
        particle_count: u32,
    ) -> Self {
        Self {
            time: 0.,
            delta: 0.,
            curl_time: settings.curl_time,
            seed,
            mesh_triangle_count: mesh_triangle_count as f32,
            life_rate: 1. / settings.lifetime_sec.max(f32::EPSILON),
            noise_scale: settings.noise_scale,
            step_size: settings.step_size,
            particle_count,
            _padding: [0; 3],
        }
    }
}

pub struct SkinSource<'a> {
    pub joint_matrices: &'a [Matrix4<f32>],
    pub joints: &'a [[u32; 4]],
    pub weights: &'a [[f32; 4]],
}

/// Triangles reset particles are sampled from.
pub struct ScatterSource<'a> {
    pub vertices: &'a [[f32; 4]],
    pub indices: &'a [u32],
    pub skin: Option<SkinSource<'a>>,
}

impl<'a> ScatterSource<'a> {
    fn vertex(&self, index: u32) -> Vector3<f32> {
        let v = self.vertices[index as usize];
        let rest = Vector3::new(v[0], v[1], v[2]);

        match &self.skin {
            Some(skin) => skin_vertex(
                rest,
                skin.joints[index as usize],
                skin.weights[index as usize],
                skin.joint_matrices,
            ),
            None => rest,
        }
    }
}

/// Linear blend skinning, summing `w_i * (M_i * v)`.
pub fn skin_vertex(
    rest: Vector3<f32>,
    joints: [u32; 4],
    weights: [f32; 4],
    joint_matrices: &[Matrix4<f32>],
) -> Vector3<f32> {
    let rest = Vector4::new(rest.x, rest.y, rest.z, 1.);

    let skinned = joints
        .iter()
        .zip(weights.iter())
        .fold(Vector4::new(0., 0., 0., 0.), |acc, (&joint, &weight)| {
            acc + (joint_matrices[joint as usize] * rest) * weight
        });

    skinned.truncate()
}

pub fn sample_mesh(index: u32, uniforms: &SimulationUniforms, source: &ScatterSource) -> Vector3<f32> {
    let (triangle, weights) = barycentric_sample(
        index,
        uniforms.seed,
        uniforms.time,
        uniforms.mesh_triangle_count as u32,
    );

    let base = triangle as usize * 3;
    let a = source.vertex(source.indices[base]);
    let b = source.vertex(source.indices[base + 1]);
    let c = source.vertex(source.indices[base + 2]);

    a * weights.x + b * weights.y + c * weights.z
}

/// One compute thread. Resets when `life > 1`, otherwise advects along the
/// curl field and ages by `life_rate * delta`.
pub fn step_particle(
    index: u32,
    particle: &Particle,
    start: &StartData,
    uniforms: &SimulationUniforms,
    source: Option<&ScatterSource>,
) -> Particle {
    if particle.life > 1. {
        let position = match source {
            Some(source) => sample_mesh(index, uniforms, source),
            None => start.position.into(),
        };

        return Particle::new(position, start.life);
    }

    let velocity = curl_noise(
        particle.position * uniforms.noise_scale,
        uniforms.time * uniforms.curl_time,
    );

    Particle {
        position: particle.position + velocity * (uniforms.step_size * uniforms.delta),
        velocity: velocity * uniforms.step_size,
        life: particle.life + uniforms.life_rate * uniforms.delta,
    }
}

pub fn dispatch_size(particle_count: u32) -> u32 {
    particle_count / WORKGROUP_SIZE + u32::from(particle_count % WORKGROUP_SIZE != 0)
}

/// Runs a whole dispatch, including the threads past the particle count.
pub fn run_dispatch(
    particles: &mut [Particle],
    start: &[StartData],
    uniforms: &SimulationUniforms,
    source: Option<&ScatterSource>,
) {
    let threads = dispatch_size(uniforms.particle_count) * WORKGROUP_SIZE;

    for index in 0..threads {
        if index >= uniforms.particle_count {
            continue;
        }

        let i = index as usize;
        particles[i] = step_particle(index, &particles[i], &start[i], uniforms, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mesh::Geometry;
    use crate::model::particle::{initial_particles, volume_scatter};
    use cgmath::{InnerSpace, SquareMatrix};
    use rand::{rngs::StdRng, SeedableRng};

    fn uniforms(particle_count: u32, delta: f32) -> SimulationUniforms {
        let mut uniforms =
            SimulationUniforms::new(&SimulationSettings::default(), 4.2, 0, particle_count);
        uniforms.time = 3.;
        uniforms.delta = delta;
        uniforms
    }

    #[test]
    fn uniforms_are_48_bytes() {
        assert_eq!(std::mem::size_of::<SimulationUniforms>(), 48);
    }

    #[test]
    fn dispatch_rounds_up_to_workgroups() {
        for count in 1..=64 {
            assert_eq!(dispatch_size(count), 1);
        }

        assert_eq!(dispatch_size(0), 0);
        assert_eq!(dispatch_size(65), 2);
        assert_eq!(dispatch_size(128), 2);
        assert_eq!(dispatch_size(129), 3);
        assert_eq!(dispatch_size(u32::MAX), u32::MAX / 64 + 1);
    }

    #[test]
    fn zero_delta_leaves_every_particle_alone() {
        let start = vec![StartData { position: [0.; 3], life: 0. }; 100];
        let mut rng = StdRng::seed_from_u64(11);
        let mut particles = initial_particles(&start, &mut rng);
        let before = particles.clone();

        run_dispatch(&mut particles, &start, &uniforms(100, 0.), None);

        for (p, b) in particles.iter().zip(before.iter()) {
            assert_eq!(p.life, b.life);
            assert_eq!(p.position, b.position);
        }
    }

    #[test]
    fn expired_particle_resets_and_others_age() {
        let start = vec![
            StartData { position: [1., 2., 3.], life: 0.1 },
            StartData { position: [0.; 3], life: 0.2 },
            StartData { position: [0.; 3], life: 0.05 },
        ];
        let mut particles = vec![
            Particle::new(Vector3::new(5., 5., 5.), 1.5),
            Particle::new(Vector3::new(0.3, 0.1, 0.), 0.5),
            Particle::new(Vector3::new(-0.2, 0.4, 0.9), 0.9),
        ];

        run_dispatch(&mut particles, &start, &uniforms(3, 1. / 60.), None);

        assert_eq!(particles[0].position, Vector3::new(1., 2., 3.));
        assert_eq!(particles[0].life, 0.1);
        assert_eq!(particles[0].velocity, Vector3::new(0., 0., 0.));
        assert!(particles[1].life > 0.5);
        assert!(particles[2].life > 0.9);
        assert!(particles[1].position != Vector3::new(0.3, 0.1, 0.));
    }

    #[test]
    fn overflow_resets_on_the_next_step() {
        let start = [StartData { position: [0.; 3], life: 0. }];
        let mut particles = vec![Particle::new(Vector3::new(0.5, 0., 0.), 0.999)];
        let uniforms = uniforms(1, 0.1);

        run_dispatch(&mut particles, &start, &uniforms, None);
        assert!(particles[0].life > 1.);

        run_dispatch(&mut particles, &start, &uniforms, None);
        assert_eq!(particles[0].life, 0.);
    }

    #[test]
    fn lives_never_go_negative() {
        let mut rng = StdRng::seed_from_u64(5);
        let start = volume_scatter(150, 1.5, &mut rng);
        let mut particles = initial_particles(&start, &mut rng);
        let mut uniforms = uniforms(150, 1. / 30.);

        for frame in 0..120 {
            uniforms.time = frame as f32 / 30.;
            run_dispatch(&mut particles, &start, &uniforms, None);

            assert!(particles.iter().all(|p| p.life >= 0.));
        }
    }

    #[test]
    fn velocity_is_the_scaled_curl() {
        let start = [StartData { position: [0.; 3], life: 0. }];
        let particle = Particle::new(Vector3::new(0.2, -0.4, 1.), 0.3);
        let uniforms = uniforms(1, 0.02);

        let next = step_particle(0, &particle, &start[0], &uniforms, None);

        assert!((next.velocity.magnitude() - uniforms.step_size).abs() < 1e-4);
        assert!(((next.position - particle.position) - next.velocity * uniforms.delta).magnitude() < 1e-6);
    }

    #[test]
    fn mesh_reset_lands_on_a_triangle() {
        let geometry = Geometry::plane(2., 2.);
        let vertices = geometry.scatter_vertices();
        let source = ScatterSource {
            vertices: &vertices,
            indices: &geometry.indices,
            skin: None,
        };

        let mut uniforms = uniforms(64, 0.1);
        uniforms.mesh_triangle_count = (geometry.indices.len() / 3) as f32;

        let start = vec![StartData { position: [9.; 3], life: 0. }; 64];
        let mut particles = vec![Particle::new(Vector3::new(9., 9., 9.), 2.); 64];

        run_dispatch(&mut particles, &start, &uniforms, Some(&source));

        for p in particles {
            assert!(p.position.y.abs() < 1e-6);
            assert!(p.position.x.abs() <= 1. + 1e-5 && p.position.z.abs() <= 1. + 1e-5);
            assert_eq!(p.life, 0.);
        }
    }

    #[test]
    fn identity_skin_matches_static_mesh() {
        let geometry = Geometry::cube(1.);
        let vertices = geometry.scatter_vertices();
        let joints = vec![[0, 1, 0, 0]; vertices.len()];
        let weights = vec![[0.25, 0.75, 0., 0.]; vertices.len()];
        let matrices = [Matrix4::identity(), Matrix4::identity()];

        let skinned = ScatterSource {
            vertices: &vertices,
            indices: &geometry.indices,
            skin: Some(SkinSource {
                joint_matrices: &matrices,
                joints: &joints,
                weights: &weights,
            }),
        };
        let fixed = ScatterSource {
            vertices: &vertices,
            indices: &geometry.indices,
            skin: None,
        };

        let mut uniforms = uniforms(32, 0.1);
        uniforms.mesh_triangle_count = (geometry.indices.len() / 3) as f32;

        for index in 0..32 {
            let a = sample_mesh(index, &uniforms, &skinned);
            let b = sample_mesh(index, &uniforms, &fixed);
            assert!((a - b).magnitude() < 1e-5);
        }
    }

    #[test]
    fn skinning_blends_joint_transforms() {
        let matrices = [
            Matrix4::from_translation(Vector3::new(1., 0., 0.)),
            Matrix4::from_translation(Vector3::new(0., 2., 0.)),
        ];

        let v = skin_vertex(Vector3::new(0., 0., 1.), [0, 1, 0, 0], [0.5, 0.5, 0., 0.], &matrices);

        assert!((v - Vector3::new(0.5, 1., 1.)).magnitude() < 1e-6);
    }

    #[test]
    fn policies_bind_the_right_number_of_slots() {
        assert_eq!(SimulationPolicy::VolumeScatter.binding_count(), 3);
        assert_eq!(SimulationPolicy::MeshSurfaceSample.binding_count(), 5);
        assert_eq!(SimulationPolicy::SkinnedMeshSample.binding_count(), 8);
        assert!(!SimulationPolicy::VolumeScatter.samples_mesh());
    }
}
