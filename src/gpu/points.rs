//! Point renderer.
//!
//! Draws the current generation as one screen-aligned quad per particle,
//! `point_size` pixels wide, colored from its velocity. The particle streams
//! are bound per instance so no expansion buffer is needed.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::store::GenerationBuffers;
use super::{create_shader, scoped, uniform_entry, vec3_stream};
use crate::error::{FlowError, GpuError};
use crate::params::ColorMode;
use crate::sources::{ShaderSourceProvider, POINTS_FRAGMENT_PATH, POINTS_VERTEX_PATH};
use crate::targets::RenderTarget;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Target size in pixels.
    pub viewport: [f32; 2],
    pub point_size: f32,
    pub color_mode: u32,
}

/// Per-frame inputs of the point pass.
#[derive(Clone, Copy, Debug)]
pub struct PointFrame {
    pub view_proj: Mat4,
    pub point_size: f32,
    pub color_mode: ColorMode,
    /// Clear color, or `None` to draw over the target's content.
    pub clear_color: Option<[f64; 4]>,
}

impl PointUniforms {
    pub fn new(frame: &PointFrame, target: &RenderTarget) -> Self {
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            viewport: [target.width.max(1) as f32, target.height.max(1) as f32],
            point_size: frame.point_size.max(0.0),
            color_mode: frame.color_mode.as_gpu(),
        }
    }
}

pub struct PointRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
}

impl PointRenderer {
    /// Build the point pipeline for targets of `format`.
    pub fn new(
        device: &wgpu::Device,
        sources: &dyn ShaderSourceProvider,
        format: wgpu::TextureFormat,
    ) -> Result<Self, FlowError> {
        let vertex = create_shader(
            device,
            "Point Vertex Shader",
            &sources.require(POINTS_VERTEX_PATH)?,
        )?;
        let fragment = create_shader(
            device,
            "Point Fragment Shader",
            &sources.require(POINTS_FRAGMENT_PATH)?,
        )?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Uniform Buffer"),
            size: std::mem::size_of::<PointUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let label = "Point Render Pipeline";
        let pipeline = scoped(device, wgpu::ErrorFilter::Validation, || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Point Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("vs_main"),
                    buffers: &[
                        vec3_stream(0, wgpu::VertexStepMode::Instance),
                        vec3_stream(1, wgpu::VertexStepMode::Instance),
                    ],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .map_err(|e| GpuError::Pipeline {
            label: label.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            format,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Record the point pass drawing `count` particles of `buffers` into `target`.
    ///
    /// Uniforms are staged through the encoder like the integrator's.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target_name: &str,
        target: &RenderTarget,
        buffers: GenerationBuffers<'_>,
        count: u32,
        frame: &PointFrame,
    ) -> Result<(), FlowError> {
        if target.format != self.format {
            return Err(FlowError::TargetFormat {
                name: target_name.to_string(),
                expected: self.format,
                found: target.format,
            });
        }

        let uniforms = PointUniforms::new(frame, target);
        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Uniform Staging Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &self.uniform_buffer,
            0,
            std::mem::size_of::<PointUniforms>() as u64,
        );

        let load = match frame.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
            None => wgpu::LoadOp::Load,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Point Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffers.position.slice(..));
        pass.set_vertex_buffer(1, buffers.velocity.slice(..));
        pass.draw(0..6, 0..count);

        Ok(())
    }
}
