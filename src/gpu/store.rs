//! Double-buffered particle storage.
//!
//! Two generations live on the GPU at once. Each is a pair of tightly packed
//! `vec3<f32>` streams (positions, velocities) usable both as vertex buffers
//! and as storage buffers, so the same memory feeds the integrator and the
//! point renderer without copies.

use std::sync::mpsc;

use wgpu::util::DeviceExt;

use super::scoped;
use crate::error::{FlowError, GpuError};
use crate::field::Extent;
use crate::population::{self, Generation};
use crate::schedule::Slot;

/// Bytes per particle per stream: three `f32`, no padding.
pub const STREAM_STRIDE: u64 = 12;

/// Both streams of one slot.
#[derive(Clone, Copy, Debug)]
pub struct GenerationBuffers<'a> {
    pub position: &'a wgpu::Buffer,
    pub velocity: &'a wgpu::Buffer,
}

/// Position and velocity buffers for slots A and B.
pub struct ParticleStore {
    positions: [wgpu::Buffer; 2],
    velocities: [wgpu::Buffer; 2],
    count: u32,
}

impl ParticleStore {
    /// Upload `initial` into both slots.
    ///
    /// Fails before touching the device if the population is empty, its
    /// streams differ in length, or a stream would exceed the buffer or
    /// binding limits.
    pub fn new(device: &wgpu::Device, initial: &Generation) -> Result<Self, FlowError> {
        let len = check_generation(initial, None)?;
        if len == 0 {
            return Err(FlowError::EmptyPopulation);
        }
        let count = u32::try_from(len).map_err(|_| GpuError::Allocation {
            label: "Particle Streams".to_string(),
            bytes: len as u64 * STREAM_STRIDE,
            reason: "particle count exceeds u32".to_string(),
        })?;
        let bytes = count as u64 * STREAM_STRIDE;
        check_limits(&device.limits(), bytes)?;

        let positions = population::pack(&initial.positions);
        let velocities = population::pack(&initial.velocities);

        let usage = wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let create = |label: &str, data: &[[f32; 3]]| -> Result<wgpu::Buffer, GpuError> {
            scoped(device, wgpu::ErrorFilter::OutOfMemory, || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(data),
                    usage,
                })
            })
            .map_err(|e| GpuError::Allocation {
                label: label.to_string(),
                bytes,
                reason: e.to_string(),
            })
        };

        let store = Self {
            positions: [
                create("Position Buffer A", &positions)?,
                create("Position Buffer B", &positions)?,
            ],
            velocities: [
                create("Velocity Buffer A", &velocities)?,
                create("Velocity Buffer B", &velocities)?,
            ],
            count,
        };

        log::info!(
            "allocated {} particles ({:.1} MiB across 4 streams)",
            count,
            (bytes * 4) as f64 / (1024.0 * 1024.0)
        );
        Ok(store)
    }

    /// Seed `count` particles over `extent` and upload them.
    pub fn seeded(
        device: &wgpu::Device,
        count: u32,
        seed: u64,
        extent: Extent,
    ) -> Result<Self, FlowError> {
        Self::new(device, &Generation::seeded(count as usize, seed, extent))
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Size of one stream in bytes.
    pub fn stream_bytes(&self) -> u64 {
        self.count as u64 * STREAM_STRIDE
    }

    pub fn slot(&self, slot: Slot) -> GenerationBuffers<'_> {
        GenerationBuffers {
            position: &self.positions[slot.index()],
            velocity: &self.velocities[slot.index()],
        }
    }

    /// Overwrite `slot` with `generation`, which must hold exactly `count` particles.
    pub fn write_generation(
        &self,
        queue: &wgpu::Queue,
        slot: Slot,
        generation: &Generation,
    ) -> Result<(), FlowError> {
        check_generation(generation, Some(self.count as usize))?;
        let buffers = self.slot(slot);
        queue.write_buffer(
            buffers.position,
            0,
            bytemuck::cast_slice(&population::pack(&generation.positions)),
        );
        queue.write_buffer(
            buffers.velocity,
            0,
            bytemuck::cast_slice(&population::pack(&generation.velocities)),
        );
        Ok(())
    }

    /// Copy `slot` back to the host. Blocks until the GPU is idle.
    pub fn read_generation(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: Slot,
    ) -> Result<Generation, GpuError> {
        let size = self.stream_bytes();
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Generation Readback Buffer"),
            size: size * 2,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let buffers = self.slot(slot);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Generation Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(buffers.position, 0, &staging, 0, size);
        encoder.copy_buffer_to_buffer(buffers.velocity, 0, &staging, size, size);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| GpuError::BufferMapping("map callback dropped".to_string()))?
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

        let generation = {
            let data = slice.get_mapped_range();
            let floats: &[[f32; 3]] = bytemuck::cast_slice(&data);
            let (positions, velocities) = floats.split_at(self.count as usize);
            Generation {
                positions: population::unpack(positions),
                velocities: population::unpack(velocities),
            }
        };
        staging.unmap();

        Ok(generation)
    }
}

/// Both streams must have the same length, and `expected` when given.
fn check_generation(generation: &Generation, expected: Option<usize>) -> Result<usize, FlowError> {
    let positions = generation.positions.len();
    let velocities = generation.velocities.len();
    let expected = expected.unwrap_or(positions);
    if positions == expected && velocities == expected {
        Ok(expected)
    } else {
        Err(FlowError::GenerationSize {
            expected,
            positions,
            velocities,
        })
    }
}

/// Reject streams the device could not hold or bind.
fn check_limits(limits: &wgpu::Limits, bytes: u64) -> Result<(), GpuError> {
    let reason = if bytes > limits.max_buffer_size {
        format!("exceeds max_buffer_size ({})", limits.max_buffer_size)
    } else if bytes > limits.max_storage_buffer_binding_size as u64 {
        format!(
            "exceeds max_storage_buffer_binding_size ({})",
            limits.max_storage_buffer_binding_size
        )
    } else {
        return Ok(());
    };
    Err(GpuError::Allocation {
        label: "Particle Streams".to_string(),
        bytes,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_is_three_floats() {
        assert_eq!(STREAM_STRIDE, 3 * std::mem::size_of::<f32>() as u64);
    }

    #[test]
    fn test_million_particles_fit_default_limits() {
        let limits = wgpu::Limits::default();
        assert!(check_limits(&limits, 1_000_000 * STREAM_STRIDE).is_ok());
    }

    #[test]
    fn test_oversized_stream_is_rejected() {
        let limits = wgpu::Limits::default();
        let bytes = limits.max_storage_buffer_binding_size as u64 + STREAM_STRIDE;
        let err = check_limits(&limits, bytes).unwrap_err();
        match err {
            GpuError::Allocation { bytes: b, reason, .. } => {
                assert_eq!(b, bytes);
                assert!(reason.contains("max_storage_buffer_binding_size"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_buffer_size_limit_checked_first() {
        let limits = wgpu::Limits {
            max_buffer_size: 1024,
            ..wgpu::Limits::default()
        };
        let err = check_limits(&limits, 2048).unwrap_err();
        assert!(err.to_string().contains("max_buffer_size"));
    }

    fn generation(positions: usize, velocities: usize) -> Generation {
        Generation {
            positions: vec![glam::Vec3::ZERO; positions],
            velocities: vec![glam::Vec3::ZERO; velocities],
        }
    }

    #[test]
    fn test_matching_streams_pass() {
        assert_eq!(check_generation(&generation(8, 8), None).unwrap(), 8);
        assert_eq!(check_generation(&generation(8, 8), Some(8)).unwrap(), 8);
        assert_eq!(check_generation(&generation(0, 0), None).unwrap(), 0);
    }

    #[test]
    fn test_short_velocity_stream_is_rejected() {
        let err = check_generation(&generation(8, 5), None).unwrap_err();
        assert!(matches!(
            err,
            FlowError::GenerationSize {
                expected: 8,
                positions: 8,
                velocities: 5
            }
        ));
    }

    #[test]
    fn test_write_needs_store_count() {
        let err = check_generation(&generation(6, 6), Some(8)).unwrap_err();
        assert!(matches!(err, FlowError::GenerationSize { expected: 8, .. }));
        assert!(check_generation(&generation(8, 9), Some(8)).is_err());
    }
}
