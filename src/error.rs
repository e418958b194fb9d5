//! Error types for particle-flow.
//!
//! Every failure in the simulation pipeline is either fatal at startup
//! (adapter, device, shader, allocation) or a lookup failure while drawing
//! (missing render target). Out-of-range parameters are never errors.

use thiserror::Error;

/// Errors raised while acquiring or using the GPU.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a Vulkan, Metal or DX12 capable device is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// A buffer could not be allocated, or would exceed a device limit.
    #[error("failed to allocate {label} ({bytes} bytes): {reason}")]
    Allocation {
        label: String,
        bytes: u64,
        reason: String,
    },
    /// A shader module or pipeline failed validation.
    #[error("failed to build {label}: {reason}")]
    Pipeline { label: String, reason: String },
    /// The requested integrator mode needs a feature the device lacks.
    #[error("device does not support {0:?}")]
    MissingFeature(wgpu::Features),
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors that can occur while loading a [`FlowConfig`](crate::FlowConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors produced by the flow render task.
#[derive(Debug, Error)]
pub enum FlowError {
    /// GPU setup or allocation failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The source provider has nothing mounted at this path.
    #[error("no shader source mounted at `{0}`")]
    MissingShaderSource(String),
    /// The population must hold at least one particle.
    #[error("particle count must be greater than zero")]
    EmptyPopulation,
    /// Positions and velocities disagree in length, or differ from the store's count.
    #[error("generation has {positions} positions and {velocities} velocities, expected {expected}")]
    GenerationSize {
        expected: usize,
        positions: usize,
        velocities: usize,
    },
    /// Named render target missing from the registry.
    #[error("render target `{0}` not found")]
    TargetNotFound(String),
    /// Render target format differs from the one the point pipeline was built for.
    #[error("render target `{name}` has format {found:?}, point pipeline expects {expected:?}")]
    TargetFormat {
        name: String,
        expected: wgpu::TextureFormat,
        found: wgpu::TextureFormat,
    },
}

/// Errors that can occur when running the windowed demo.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// Building the flow task failed.
    #[error(transparent)]
    Flow(#[from] FlowError),
    /// GPU initialization failed.
    #[error(transparent)]
    Gpu(#[from] GpuError),
    /// The surface offers no texture format to render into.
    #[error("surface reports no supported texture formats")]
    UnsupportedSurface,
    /// The swapchain could not provide a frame.
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
