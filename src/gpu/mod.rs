//! GPU resources: device acquisition, particle buffers and the two pipelines.

#[cfg(feature = "egui")]
pub mod egui_integration;
mod integrator;
mod points;
mod store;

pub use integrator::{FieldIntegrator, FlowUniforms, IntegratorMode};
pub use points::{PointFrame, PointRenderer};
pub use store::{GenerationBuffers, ParticleStore, STREAM_STRIDE};

use crate::error::GpuError;

/// Adapter, device and queue, with stream-out enabled when available.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Device with no surface, for offscreen use and tests.
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = create_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        Self::from_adapter(adapter).await
    }

    /// Device able to present to `surface`.
    pub async fn for_surface(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        Self::from_adapter(adapter).await
    }

    async fn from_adapter(adapter: wgpu::Adapter) -> Result<Self, GpuError> {
        let info = adapter.get_info();
        let stream_out = adapter.features() & wgpu::Features::VERTEX_WRITABLE_STORAGE;
        log::info!(
            "using {} ({:?}), vertex stream-out {}",
            info.name,
            info.backend,
            if stream_out.is_empty() { "unavailable" } else { "available" }
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Flow Device"),
                    required_features: stream_out,
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }
}

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

/// Run `f` inside an error scope and surface any captured error synchronously.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    f: impl FnOnce() -> T,
) -> Result<T, wgpu::Error> {
    device.push_error_scope(filter);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Build a shader module, turning validation failures into [`GpuError::Pipeline`].
pub(crate) fn create_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, GpuError> {
    scoped(device, wgpu::ErrorFilter::Validation, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
    .map_err(|e| GpuError::Pipeline {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

/// Storage buffer entry of a bind group layout.
pub(crate) fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Uniform buffer entry of a bind group layout.
pub(crate) fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Tightly packed `Float32x3` stream at `location`.
pub(crate) fn vec3_stream(
    location: u32,
    step_mode: wgpu::VertexStepMode,
) -> wgpu::VertexBufferLayout<'static> {
    static POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    static VELOCITY: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
    wgpu::VertexBufferLayout {
        array_stride: STREAM_STRIDE,
        step_mode,
        attributes: if location == 0 { &POSITION } else { &VELOCITY },
    }
}
