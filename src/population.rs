//! Host-side particle generations.
//!
//! A [`Generation`] is the whole population at one tick as two parallel
//! arrays. It is what gets uploaded into both GPU slots at startup and what a
//! readback returns.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::field::{self, Extent, StepInputs};

/// Seed used when the config does not set one.
pub const DEFAULT_SEED: u64 = 1337;

/// Positions and velocities of every particle at one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl Generation {
    /// `count` particles uniformly spread over the extent, z = 0, at rest.
    pub fn seeded(count: usize, seed: u64, extent: Extent) -> Self {
        Self {
            positions: seed_positions(count, seed, extent),
            velocities: vec![Vec3::ZERO; count],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Run the CPU reference integrator over every particle.
    pub fn step_reference(&self, inputs: &StepInputs) -> Generation {
        let (positions, velocities) = self
            .positions
            .iter()
            .zip(&self.velocities)
            .map(|(&p, &v)| field::integrate(p, v, inputs))
            .unzip();
        Generation {
            positions,
            velocities,
        }
    }
}

/// Deterministic uniform samples over `[-x, x] x [-y, y]` with z = 0.
pub fn seed_positions(count: usize, seed: u64, extent: Extent) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.gen_range(-1.0f32..=1.0) * extent.x;
            let y = rng.gen_range(-1.0f32..=1.0) * extent.y;
            Vec3::new(x, y, 0.0)
        })
        .collect()
}

/// Flatten vectors into the tightly packed `3 x f32` layout the GPU buffers use.
pub fn pack(values: &[Vec3]) -> Vec<[f32; 3]> {
    values.iter().map(|v| v.to_array()).collect()
}

/// Inverse of [`pack`].
pub fn unpack(values: &[[f32; 3]]) -> Vec<Vec3> {
    values.iter().copied().map(Vec3::from_array).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_positions_are_reproducible() {
        let a = seed_positions(1000, DEFAULT_SEED, Extent::default());
        let b = seed_positions(1000, DEFAULT_SEED, Extent::default());
        let bits = |v: &[Vec3]| -> Vec<[u32; 3]> {
            v.iter()
                .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
                .collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = seed_positions(16, 1, Extent::default());
        let b = seed_positions(16, 2, Extent::default());
        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_positions_cover_domain_flat() {
        let extent = Extent::default();
        let positions = seed_positions(10_000, DEFAULT_SEED, extent);
        assert!(positions.iter().all(|p| extent.contains(*p) && p.z == 0.0));
        // Both halves of each axis are populated.
        assert!(positions.iter().any(|p| p.x < -25.0));
        assert!(positions.iter().any(|p| p.x > 25.0));
        assert!(positions.iter().any(|p| p.y < -14.0));
        assert!(positions.iter().any(|p| p.y > 14.0));
    }

    #[test]
    fn test_initial_velocity_is_zero() {
        let g = Generation::seeded(512, DEFAULT_SEED, Extent::default());
        assert_eq!(g.len(), 512);
        assert!(g.velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_pack_is_tight() {
        let packed = pack(&[Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        assert_eq!(bytes.len(), 24);
        assert_eq!(unpack(&packed)[1], Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_step_depends_only_on_own_index() {
        let inputs = StepInputs {
            time: 0.5,
            time_delta: (1.0 / 144.0) * 0.2,
            env: Vec3::new(0.0, 0.3, 0.0),
            noise_force: 0.5,
            damping: 0.99,
            extent: Extent::default(),
        };
        let base = Generation::seeded(64, DEFAULT_SEED, Extent::default());
        let mut changed = base.clone();
        changed.positions[17] = Vec3::new(-3.0, 4.0, 0.0);
        changed.velocities[17] = Vec3::new(0.2, -0.1, 0.0);

        let a = base.step_reference(&inputs);
        let b = changed.step_reference(&inputs);
        for i in (0..64).filter(|&i| i != 17) {
            assert_eq!(a.positions[i], b.positions[i]);
            assert_eq!(a.velocities[i], b.velocities[i]);
        }
        assert_ne!(a.positions[17], b.positions[17]);
    }
}
