//! Per-frame render tasks.
//!
//! The host owns the device and the frame's command encoder and calls every
//! task once per frame through [`RenderTask`]. [`FlowTask`] is the particle
//! flow: it advances the population one step and draws the generation it
//! just wrote, both into the same encoder.

use crate::camera::OrthoCamera;
use crate::clock::SimulationClock;
use crate::config::FlowConfig;
use crate::error::{FlowError, GpuError};
use crate::field::{Extent, StepInputs};
use crate::gpu::{FieldIntegrator, IntegratorMode, ParticleStore, PointFrame, PointRenderer};
use crate::params::FlowParams;
use crate::population::Generation;
use crate::schedule::BufferRoles;
use crate::sources::{DirectorySources, EmbeddedSources, ShaderSourceProvider};
use crate::targets::RenderTargets;

/// GPU handles for one frame.
pub struct FrameContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
}

/// A unit of per-frame GPU work scheduled by the host.
pub trait RenderTask {
    fn name(&self) -> &str;

    /// Record simulation work.
    fn advance(&mut self, frame: &mut FrameContext<'_>) -> Result<(), FlowError>;

    /// Record drawing into one of `targets`.
    fn draw(&mut self, targets: &RenderTargets, frame: &mut FrameContext<'_>) -> Result<(), FlowError>;

    /// Advance, then draw what was just produced.
    fn run_frame(
        &mut self,
        targets: &RenderTargets,
        frame: &mut FrameContext<'_>,
    ) -> Result<(), FlowError> {
        self.advance(frame)?;
        self.draw(targets, frame)
    }
}

/// The particle flow as a render task.
pub struct FlowTask {
    store: ParticleStore,
    integrator: FieldIntegrator,
    renderer: PointRenderer,
    roles: BufferRoles,
    clock: SimulationClock,
    extent: Extent,
    target: String,
    clear_color: Option<[f64; 4]>,
    /// Live parameters; read at the start of every pass.
    pub params: FlowParams,
    pub camera: OrthoCamera,
}

impl FlowTask {
    pub const NAME: &'static str = "TransformFeedbackParticles";

    /// Build the task with the built-in programs, or with overrides from
    /// `config.shader_dir` when set.
    pub fn new(
        device: &wgpu::Device,
        config: &FlowConfig,
        format: wgpu::TextureFormat,
    ) -> Result<Self, FlowError> {
        match &config.shader_dir {
            Some(dir) => Self::with_sources(device, config, format, &DirectorySources::new(dir)),
            None => Self::with_sources(device, config, format, &EmbeddedSources::builtin()),
        }
    }

    /// Build the task drawing into targets of `format`.
    pub fn with_sources(
        device: &wgpu::Device,
        config: &FlowConfig,
        format: wgpu::TextureFormat,
        sources: &dyn ShaderSourceProvider,
    ) -> Result<Self, FlowError> {
        let store = ParticleStore::seeded(device, config.particle_count, config.seed, config.extent)?;
        let integrator = FieldIntegrator::new(device, &store, sources, config.integrator)?;
        let renderer = PointRenderer::new(device, sources, format)?;

        log::info!(
            "{} ready: {} particles, extent {}x{}, target `{}`",
            Self::NAME,
            store.count(),
            config.extent.x,
            config.extent.y,
            config.target
        );

        Ok(Self {
            store,
            integrator,
            renderer,
            roles: BufferRoles::default(),
            clock: SimulationClock::new(config.time_delta),
            extent: config.extent,
            target: config.target.clone(),
            clear_color: config.clear_color,
            params: config.params,
            camera: OrthoCamera::new(config.extent.x),
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.store.count()
    }

    pub fn integrator_mode(&self) -> IntegratorMode {
        self.integrator.mode()
    }

    pub fn roles(&self) -> BufferRoles {
        self.roles
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Integrator inputs for a step ending at `time`, from the live parameters.
    pub fn step_inputs(&self, time: f32) -> StepInputs {
        self.params
            .step_inputs(time, self.clock.time_delta(), self.extent)
    }

    /// Read the latest generation back to the host.
    pub fn read_current(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Generation, GpuError> {
        self.store
            .read_generation(device, queue, self.roles.current())
    }
}

impl RenderTask for FlowTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn advance(&mut self, frame: &mut FrameContext<'_>) -> Result<(), FlowError> {
        let time = self.clock.advance();
        let inputs = self.step_inputs(time);

        let step = self.roles.begin_step();
        self.integrator
            .encode(frame.device, frame.encoder, &self.store, step, &inputs);
        self.roles.finish_step(step);
        Ok(())
    }

    fn draw(&mut self, targets: &RenderTargets, frame: &mut FrameContext<'_>) -> Result<(), FlowError> {
        let target = targets.get(&self.target)?;
        let point_frame = PointFrame {
            view_proj: self.camera.view_projection(target.aspect()),
            point_size: self.params.point_size,
            color_mode: self.params.color_mode,
            clear_color: self.clear_color,
        };
        self.renderer.draw(
            frame.device,
            frame.encoder,
            &self.target,
            target,
            self.store.slot(self.roles.render_slot()),
            self.store.count(),
            &point_frame,
        )
    }
}
