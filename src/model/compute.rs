use super::particle::{initial_particles, Particle, ParticleLayout, StartData};
use super::simulation::{dispatch_size, SimulationPolicy, SimulationSettings, SimulationUniforms, WORKGROUP_SIZE};
use super::skin::Skin;
use super::GfxState;
use crate::error::{SketchError, SketchResult};
use crate::shaders::{ShaderOptions, DEF_WORKGROUP_SIZE, SDR_COMPUTE};
use rand::Rng;
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

/// Mesh the reset policy samples from, with skin data when skinned.
pub struct ScatterMesh<'a> {
    pub vertices: &'a [[f32; 4]],
    pub indices: &'a [u32],
    pub skin: Option<ScatterSkin<'a>>,
}

pub struct ScatterSkin<'a> {
    pub skin: &'a Skin,
    pub joints: &'a [[u32; 4]],
    pub weights: &'a [[f32; 4]],
}

pub struct SimulatorOptions<'a, R: Rng> {
    pub policy: SimulationPolicy,
    pub layout: ParticleLayout,
    pub settings: &'a SimulationSettings,
    pub start_data: Vec<StartData>,
    pub scatter: Option<ScatterMesh<'a>>,
    pub rng: &'a mut R,
}

pub struct ParticleSimulator {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    particle_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    joint_buffer: Option<wgpu::Buffer>,

    uniforms: SimulationUniforms,
    layout: ParticleLayout,
    dispatch_x_count: u32,
}

/// Rejects counts whose dispatch grid exceeds the device limit.
pub fn validate_dispatch(particle_count: u32, max_workgroups: u32) -> SketchResult<u32> {
    let workgroups = dispatch_size(particle_count);

    if workgroups > max_workgroups {
        return Err(SketchError::DispatchTooLarge {
            particles: particle_count,
            max: max_workgroups,
        });
    }

    Ok(workgroups)
}

/// Storage bindings must not be empty, zero particles still get one element.
fn padded<T: bytemuck::Pod + bytemuck::Zeroable>(content: &[T]) -> Vec<T> {
    if content.is_empty() {
        vec![T::zeroed()]
    } else {
        content.to_vec()
    }
}

impl ParticleSimulator {
    pub fn update(&mut self, queue: &wgpu::Queue, elapsed_sec: f32, delta_sec: f32) {
        self.uniforms.time = elapsed_sec;
        self.uniforms.delta = delta_sec;

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    pub fn upload_joint_matrices(&self, queue: &wgpu::Queue, skin: &Skin) {
        if let Some(joint_buffer) = &self.joint_buffer {
            let joint_data = skin.joint_data();
            queue.write_buffer(joint_buffer, 0, bytemuck::cast_slice(&joint_data));
        }
    }

    pub fn compute(&self, encoder: &mut wgpu::CommandEncoder) {
        if self.dispatch_x_count == 0 {
            return;
        }

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle simulation"),
        });

        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.bind_group, &[]);
        compute_pass.dispatch_workgroups(self.dispatch_x_count, 1, 1);
    }

    /// Copies the particle buffer back to the host, blocking until the GPU is done.
    pub fn read_back(&self, gfx_state: &GfxState) -> SketchResult<Vec<Particle>> {
        let device = &gfx_state.device;
        let size = self.particle_count() as u64 * self.layout.stride();

        if size == 0 {
            return Ok(vec![]);
        }

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle read-back"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("read-back encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.particle_buffer, 0, &staging, 0, size);
        gfx_state.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = sender.send(res);
        });
        device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|err| SketchError::ReadBack(err.to_string()))?
            .map_err(|err| SketchError::ReadBack(err.to_string()))?;

        let particles = self.layout.decode(&slice.get_mapped_range());
        staging.unmap();

        Ok(particles)
    }

    pub fn particle_buffer(&self) -> &wgpu::Buffer {
        &self.particle_buffer
    }

    pub fn particle_count(&self) -> u32 {
        self.uniforms.particle_count
    }

    pub fn layout(&self) -> ParticleLayout {
        self.layout
    }
}

impl GfxState {
    pub fn create_particle_simulator<R: Rng>(
        &self,
        mut options: SimulatorOptions<R>,
    ) -> SketchResult<ParticleSimulator> {
        let particle_count = options.start_data.len() as u32;
        let max_workgroups = self.device.limits().max_compute_workgroups_per_dimension;
        let dispatch_x_count = validate_dispatch(particle_count, max_workgroups)?;

        if options.policy.samples_mesh() && options.scatter.is_none() {
            return Err(SketchError::Config(format!(
                "{:?} needs a scatter mesh",
                options.policy
            )));
        }

        if options.policy == SimulationPolicy::SkinnedMeshSample
            && options.scatter.as_ref().map_or(true, |s| s.skin.is_none())
        {
            return Err(SketchError::Config("skinned sampling needs a skin".to_string()));
        }

        let triangle_count = options
            .scatter
            .as_ref()
            .map_or(0, |s| s.indices.len() as u32 / 3);
        let seed = options.rng.gen_range(0.0..100.0);
        let uniforms = SimulationUniforms::new(options.settings, seed, triangle_count, particle_count);
        let particles = initial_particles(&options.start_data, &mut *options.rng);

        log::info!(
            "creating {:?} simulator: {} particles, {} workgroups of {}",
            options.policy,
            particle_count,
            dispatch_x_count,
            WORKGROUP_SIZE
        );

        self.validated("particle simulator", |gfx| {
            gfx.create_simulator_resources(&options, uniforms, &particles, dispatch_x_count)
        })
    }

    fn create_simulator_resources<R: Rng>(
        &self,
        options: &SimulatorOptions<R>,
        uniforms: SimulationUniforms,
        particles: &[Particle],
        dispatch_x_count: u32,
    ) -> SketchResult<ParticleSimulator> {
        let device = &self.device;
        let layout = options.layout;

        let start_data = padded(&options.start_data);
        let mut particle_bytes = layout.encode(particles);

        if particle_bytes.is_empty() {
            particle_bytes = vec![0; layout.stride() as usize];
        }

        let start_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Start data buffer"),
            contents: bytemuck::cast_slice(&start_data),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle buffer"),
            contents: &particle_bytes,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut buffers = vec![start_buffer, particle_buffer, uniform_buffer];
        let mut joint_buffer = None;

        if let (true, Some(scatter)) = (options.policy.samples_mesh(), &options.scatter) {
            buffers.push(
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scatter vertices"),
                    contents: bytemuck::cast_slice(&padded(scatter.vertices)),
                    usage: wgpu::BufferUsages::STORAGE,
                }),
            );

            buffers.push(
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scatter indices"),
                    contents: bytemuck::cast_slice(&padded(scatter.indices)),
                    usage: wgpu::BufferUsages::STORAGE,
                }),
            );

            if let (SimulationPolicy::SkinnedMeshSample, Some(skin)) = (options.policy, &scatter.skin) {
                let joint_data = skin.skin.joint_data();

                buffers.push(
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Joint matrices"),
                        contents: bytemuck::cast_slice(&padded(&joint_data)),
                        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    }),
                );

                buffers.push(
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Skin joints"),
                        contents: bytemuck::cast_slice(&padded(skin.joints)),
                        usage: wgpu::BufferUsages::STORAGE,
                    }),
                );

                buffers.push(
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Skin weights"),
                        contents: bytemuck::cast_slice(&padded(skin.weights)),
                        usage: wgpu::BufferUsages::STORAGE,
                    }),
                );

                joint_buffer = Some(5);
            }
        }

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| {
                let ty = match i {
                    1 => wgpu::BufferBindingType::Storage { read_only: false },
                    2 => wgpu::BufferBindingType::Uniform,
                    _ => wgpu::BufferBindingType::Storage { read_only: true },
                };

                wgpu::BindGroupLayoutEntry {
                    binding: i as u32,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(buffer.size()),
                    },
                    count: None,
                }
            })
            .collect();

        debug_assert_eq!(layout_entries.len() as u32, options.policy.binding_count());

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation layout"),
            entries: &layout_entries,
        });

        let bind_group = {
            let entries: Vec<wgpu::BindGroupEntry> = buffers
                .iter()
                .enumerate()
                .map(|(i, buffer)| wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: buffer.as_entire_binding(),
                })
                .collect();

            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Simulation bind group"),
                layout: &bind_group_layout,
                entries: &entries,
            })
        };

        let if_directives = [options.policy.if_directives(), layout.if_directives()].concat();

        let shader = self.create_shader_builtin(ShaderOptions {
            files: &[SDR_COMPUTE],
            if_directives: &if_directives,
            defines: &[(DEF_WORKGROUP_SIZE, WORKGROUP_SIZE.to_string())],
            label: "Particle compute",
        })?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Simulation pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
        });

        let joint_buffer = joint_buffer.map(|i| buffers.swap_remove(i));
        let uniform_buffer = buffers.swap_remove(2);
        let particle_buffer = buffers.swap_remove(1);

        Ok(ParticleSimulator {
            pipeline,
            bind_group,
            particle_buffer,
            uniform_buffer,
            joint_buffer,
            uniforms,
            layout,
            dispatch_x_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_within_limits_passes() {
        assert_eq!(validate_dispatch(0, 65535).unwrap(), 0);
        assert_eq!(validate_dispatch(64, 65535).unwrap(), 1);
        assert_eq!(validate_dispatch(65, 65535).unwrap(), 2);
        assert_eq!(validate_dispatch(65535 * 64, 65535).unwrap(), 65535);
    }

    #[test]
    fn dispatch_over_limit_is_rejected() {
        let res = validate_dispatch(65535 * 64 + 1, 65535);

        assert!(matches!(
            res,
            Err(SketchError::DispatchTooLarge {
                particles: 4194241,
                max: 65535
            })
        ));
    }

    #[test]
    fn empty_storage_is_padded() {
        let empty: [u32; 0] = [];

        assert_eq!(padded(&empty), vec![0]);
        assert_eq!(padded(&[3u32, 4]), vec![3, 4]);
    }
}
