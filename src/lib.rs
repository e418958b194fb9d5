//! # particle-flow
//!
//! A million particles drifting through a time-varying noise field,
//! simulated and drawn entirely on the GPU.
//!
//! Every frame the population is advanced one fixed step by a vertex-stage
//! "stream-out" program: a point-list draw whose vertex shader reads the
//! current generation as vertex attributes and stores the next generation
//! into a second set of buffers, rasterizing nothing. The two generations
//! swap roles after each step and the point renderer draws the one just
//! written. Devices that cannot write storage from the vertex stage run the
//! same math as a compute shader.
//!
//! ## Quick Start
//!
//! ```ignore
//! use particle_flow::prelude::*;
//!
//! fn main() -> Result<(), RunError> {
//!     env_logger::init();
//!     let config = FlowConfig::new()
//!         .with_particle_count(250_000)
//!         .with_params(FlowParams::default().with_damping(0.98));
//!     particle_flow::app::run(config)
//! }
//! ```
//!
//! ## Embedding
//!
//! [`FlowTask`] is a [`RenderTask`]: any host holding a `wgpu::Device` can
//! build it, register a [`RenderTarget`] under the configured key and call
//! [`RenderTask::run_frame`] with its frame encoder.
//!
//! ```ignore
//! let mut flow = FlowTask::new(&device, &FlowConfig::default(), format)?;
//! let mut targets = RenderTargets::new();
//! targets.insert(DISPLAY, RenderTarget::new(view, format, width, height));
//! flow.run_frame(&targets, &mut FrameContext { device: &device, queue: &queue, encoder: &mut encoder })?;
//! queue.submit(Some(encoder.finish()));
//! ```
//!
//! ## Determinism
//!
//! The integrator has a CPU twin in [`field`]: same hash, same noise, same
//! update and wrap. [`Generation::step_reference`] runs it over a whole
//! population, which is what the GPU tests compare against.

pub mod app;
pub mod camera;
pub mod clock;
pub mod config;
pub mod error;
pub mod field;
pub mod gpu;
pub mod params;
pub mod population;
pub mod schedule;
pub mod shaders;
pub mod sources;
pub mod targets;
pub mod task;
#[cfg(feature = "egui")]
pub mod ui;

pub use camera::OrthoCamera;
pub use clock::SimulationClock;
pub use config::{FlowConfig, IntegratorPreference};
pub use error::{ConfigError, FlowError, GpuError, RunError};
pub use field::{Extent, StepInputs};
pub use glam::{Vec2, Vec3};
pub use gpu::{FieldIntegrator, GpuContext, IntegratorMode, ParticleStore, PointRenderer};
pub use params::{ColorMode, FlowParams};
pub use population::Generation;
pub use schedule::{BufferRoles, Slot, StepSlots};
pub use sources::{DirectorySources, EmbeddedSources, ShaderSourceProvider};
pub use targets::{RenderTarget, RenderTargets, DISPLAY};
pub use task::{FlowTask, FrameContext, RenderTask};

/// Convenient imports for hosts.
pub mod prelude {
    pub use crate::camera::OrthoCamera;
    pub use crate::config::{FlowConfig, IntegratorPreference};
    pub use crate::error::{FlowError, GpuError, RunError};
    pub use crate::field::Extent;
    pub use crate::gpu::{GpuContext, IntegratorMode};
    pub use crate::params::{ColorMode, FlowParams};
    pub use crate::targets::{RenderTarget, RenderTargets, DISPLAY};
    pub use crate::task::{FlowTask, FrameContext, RenderTask};
    pub use crate::{Vec2, Vec3};
    #[cfg(feature = "egui")]
    pub use crate::ui::particles_window;
    #[cfg(feature = "egui")]
    pub use egui;
}
