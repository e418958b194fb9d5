//! The field integrator: reads generation `read`, writes generation `write`.
//!
//! Two implementations of the same program:
//!
//! - **Stream-out** runs the integrator in the vertex stage of a point-list
//!   draw. The read slot is bound as ordinary vertex buffers and each
//!   invocation stores its result into the write slot through storage
//!   bindings. Every point is emitted outside the clip volume and the only
//!   color target has an empty write mask, so nothing is rasterized.
//! - **Compute** dispatches one invocation per particle over storage views of
//!   both slots. Used where the device cannot write storage from the vertex
//!   stage.
//!
//! Either way, element `i` of the write slot is derived only from element
//! `i` of the read slot.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::store::ParticleStore;
use super::{create_shader, scoped, storage_entry, uniform_entry, vec3_stream};
use crate::config::IntegratorPreference;
use crate::error::{FlowError, GpuError};
use crate::field::StepInputs;
use crate::schedule::{Slot, StepSlots};
use crate::sources::{
    ShaderSourceProvider, INTEGRATE_COMPUTE_PATH, INTEGRATE_FRAGMENT_PATH, INTEGRATE_VERTEX_PATH,
};

const WORKGROUP_SIZE: u32 = 256;
const SCRATCH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Uniform block shared by both integrator programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FlowUniforms {
    /// Environment direction times force.
    pub env_vec: [f32; 3],
    pub time: f32,
    pub time_delta: f32,
    pub noise_force: f32,
    pub damping: f32,
    pub particle_count: u32,
    pub extent: [f32; 2],
    pub _pad: [f32; 2],
}

impl FlowUniforms {
    pub fn from_inputs(inputs: &StepInputs, particle_count: u32) -> Self {
        Self {
            env_vec: inputs.env.to_array(),
            time: inputs.time,
            time_delta: inputs.time_delta,
            noise_force: inputs.noise_force,
            damping: inputs.damping,
            particle_count,
            extent: [inputs.extent.x, inputs.extent.y],
            _pad: [0.0; 2],
        }
    }
}

/// Which program the integrator runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorMode {
    StreamOut,
    Compute,
}

impl IntegratorMode {
    /// Resolve a preference against what the device offers.
    pub fn select(
        preference: IntegratorPreference,
        features: wgpu::Features,
    ) -> Result<Self, GpuError> {
        let stream_out = features.contains(wgpu::Features::VERTEX_WRITABLE_STORAGE);
        match preference {
            IntegratorPreference::Auto if stream_out => Ok(Self::StreamOut),
            IntegratorPreference::Auto => {
                log::warn!("vertex-stage storage writes unavailable, integrating with compute");
                Ok(Self::Compute)
            }
            IntegratorPreference::StreamOut if stream_out => Ok(Self::StreamOut),
            IntegratorPreference::StreamOut => Err(GpuError::MissingFeature(
                wgpu::Features::VERTEX_WRITABLE_STORAGE,
            )),
            IntegratorPreference::Compute => Ok(Self::Compute),
        }
    }
}

enum Program {
    StreamOut {
        pipeline: wgpu::RenderPipeline,
        scratch: wgpu::TextureView,
    },
    Compute {
        pipeline: wgpu::ComputePipeline,
    },
}

/// Integrator pipeline plus one bind group per read slot.
pub struct FieldIntegrator {
    program: Program,
    uniform_buffer: wgpu::Buffer,
    /// Indexed by the slot being read.
    bind_groups: [wgpu::BindGroup; 2],
    count: u32,
}

impl FieldIntegrator {
    /// Build the integrator for `store`. The same store must be passed to
    /// [`encode`](Self::encode).
    pub fn new(
        device: &wgpu::Device,
        store: &ParticleStore,
        sources: &dyn ShaderSourceProvider,
        preference: IntegratorPreference,
    ) -> Result<Self, FlowError> {
        let mode = IntegratorMode::select(preference, device.features())?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flow Uniform Buffer"),
            size: std::mem::size_of::<FlowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (program, bind_groups) = match mode {
            IntegratorMode::StreamOut => {
                let (program, layout) = stream_out_program(device, sources)?;
                let bind_groups = [Slot::A, Slot::B]
                    .map(|read| stream_out_bind_group(device, &layout, &uniform_buffer, store, read));
                (program, bind_groups)
            }
            IntegratorMode::Compute => {
                let (program, layout) = compute_program(device, sources)?;
                let bind_groups = [Slot::A, Slot::B]
                    .map(|read| compute_bind_group(device, &layout, &uniform_buffer, store, read));
                (program, bind_groups)
            }
        };

        log::info!("field integrator ready ({mode:?})");

        Ok(Self {
            program,
            uniform_buffer,
            bind_groups,
            count: store.count(),
        })
    }

    pub fn mode(&self) -> IntegratorMode {
        match self.program {
            Program::StreamOut { .. } => IntegratorMode::StreamOut,
            Program::Compute { .. } => IntegratorMode::Compute,
        }
    }

    /// Record one step from `step.read` into `step.write`.
    ///
    /// The step's uniforms are copied into place by the encoder itself, so
    /// any number of steps can be recorded into one submission and each
    /// runs with its own time.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        store: &ParticleStore,
        step: StepSlots,
        inputs: &StepInputs,
    ) {
        debug_assert_ne!(step.read, step.write);
        let uniforms = FlowUniforms::from_inputs(inputs, self.count);
        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flow Uniform Staging Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &self.uniform_buffer,
            0,
            std::mem::size_of::<FlowUniforms>() as u64,
        );

        let bind_group = &self.bind_groups[step.read.index()];

        match &self.program {
            Program::StreamOut { pipeline, scratch } => {
                let input = store.slot(step.read);
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Stream-Out Integrate Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: scratch,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Discard,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, input.position.slice(..));
                pass.set_vertex_buffer(1, input.velocity.slice(..));
                pass.draw(0..self.count, 0..1);
            }
            Program::Compute { pipeline } => {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Compute Integrate Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups(workgroup_count(self.count), 1, 1);
            }
        }
    }
}

fn workgroup_count(count: u32) -> u32 {
    count.div_ceil(WORKGROUP_SIZE)
}

fn pipeline_error(label: &str, err: wgpu::Error) -> GpuError {
    GpuError::Pipeline {
        label: label.to_string(),
        reason: err.to_string(),
    }
}

fn stream_out_program(
    device: &wgpu::Device,
    sources: &dyn ShaderSourceProvider,
) -> Result<(Program, wgpu::BindGroupLayout), FlowError> {
    let vertex = create_shader(
        device,
        "Stream-Out Integrate Vertex Shader",
        &sources.require(INTEGRATE_VERTEX_PATH)?,
    )?;
    let fragment = create_shader(
        device,
        "Stream-Out Integrate Fragment Shader",
        &sources.require(INTEGRATE_FRAGMENT_PATH)?,
    )?;

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Stream-Out Integrate Bind Group Layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            storage_entry(1, wgpu::ShaderStages::VERTEX, false),
            storage_entry(2, wgpu::ShaderStages::VERTEX, false),
        ],
    });

    let label = "Stream-Out Integrate Pipeline";
    let pipeline = scoped(device, wgpu::ErrorFilter::Validation, || {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stream-Out Integrate Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                buffers: &[
                    vec3_stream(0, wgpu::VertexStepMode::Vertex),
                    vec3_stream(1, wgpu::VertexStepMode::Vertex),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: SCRATCH_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::empty(),
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    })
    .map_err(|e| pipeline_error(label, e))?;

    let scratch = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Stream-Out Scratch Target"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCRATCH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    Ok((Program::StreamOut { pipeline, scratch }, layout))
}

fn stream_out_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    store: &ParticleStore,
    read: Slot,
) -> wgpu::BindGroup {
    let output = store.slot(read.other());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(match read {
            Slot::A => "Stream-Out Bind Group A->B",
            Slot::B => "Stream-Out Bind Group B->A",
        }),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: output.position.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: output.velocity.as_entire_binding(),
            },
        ],
    })
}

fn compute_program(
    device: &wgpu::Device,
    sources: &dyn ShaderSourceProvider,
) -> Result<(Program, wgpu::BindGroupLayout), FlowError> {
    let module = create_shader(
        device,
        "Compute Integrate Shader",
        &sources.require(INTEGRATE_COMPUTE_PATH)?,
    )?;

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Compute Integrate Bind Group Layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::COMPUTE),
            storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
            storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
            storage_entry(3, wgpu::ShaderStages::COMPUTE, true),
            storage_entry(4, wgpu::ShaderStages::COMPUTE, true),
        ],
    });

    let label = "Compute Integrate Pipeline";
    let pipeline = scoped(device, wgpu::ErrorFilter::Validation, || {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Compute Integrate Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        })
    })
    .map_err(|e| pipeline_error(label, e))?;

    Ok((Program::Compute { pipeline }, layout))
}

fn compute_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    store: &ParticleStore,
    read: Slot,
) -> wgpu::BindGroup {
    let input = store.slot(read);
    let output = store.slot(read.other());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(match read {
            Slot::A => "Compute Integrate Bind Group A->B",
            Slot::B => "Compute Integrate Bind Group B->A",
        }),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: output.position.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: output.velocity.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: input.position.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: input.velocity.as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Extent;
    use glam::Vec3;

    #[test]
    fn test_flow_uniforms_size() {
        // Must match the WGSL struct: vec3 + 5 scalars + two vec2.
        assert_eq!(std::mem::size_of::<FlowUniforms>(), 48);
    }

    #[test]
    fn test_flow_uniforms_from_inputs() {
        let inputs = StepInputs {
            time: 1.5,
            time_delta: 0.01,
            env: Vec3::new(0.0, 0.3, 0.0),
            noise_force: 0.5,
            damping: 0.99,
            extent: Extent::new(50.0, 28.125),
        };
        let uniforms = FlowUniforms::from_inputs(&inputs, 4);
        assert_eq!(uniforms.env_vec, [0.0, 0.3, 0.0]);
        assert_eq!(uniforms.time, 1.5);
        assert_eq!(uniforms.particle_count, 4);
        assert_eq!(uniforms.extent, [50.0, 28.125]);
    }

    #[test]
    fn test_select_auto() {
        let stream_out = wgpu::Features::VERTEX_WRITABLE_STORAGE;
        assert_eq!(
            IntegratorMode::select(IntegratorPreference::Auto, stream_out).unwrap(),
            IntegratorMode::StreamOut
        );
        assert_eq!(
            IntegratorMode::select(IntegratorPreference::Auto, wgpu::Features::empty()).unwrap(),
            IntegratorMode::Compute
        );
    }

    #[test]
    fn test_select_stream_out_requires_feature() {
        let err = IntegratorMode::select(IntegratorPreference::StreamOut, wgpu::Features::empty())
            .unwrap_err();
        assert!(matches!(err, GpuError::MissingFeature(f) if f == wgpu::Features::VERTEX_WRITABLE_STORAGE));
    }

    #[test]
    fn test_select_compute_always_available() {
        let all = wgpu::Features::VERTEX_WRITABLE_STORAGE;
        assert_eq!(
            IntegratorMode::select(IntegratorPreference::Compute, all).unwrap(),
            IntegratorMode::Compute
        );
    }

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(256), 1);
        assert_eq!(workgroup_count(257), 2);
        assert_eq!(workgroup_count(1_000_000), 3907);
    }
}
