//! The flow field: value noise, per-particle integration and toroidal wrap.
//!
//! These are the CPU twins of the WGSL in [`shaders`](crate::shaders). The
//! integer hash is bit-identical on both sides; the float math follows the
//! same operation order, so CPU and GPU agree up to transcendental precision.
//! The GPU never calls into this module; tests and tooling do.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Scale applied to `position.xy` for the second noise sample.
pub const DECORRELATION_SCALE: f32 = 7.888_221_3;

/// Half-size of the rectangular domain particles live in.
///
/// Positions wrap on x and y; z is left alone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x: f32,
    pub y: f32,
}

impl Extent {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Whether `p` lies inside `[-x, x] x [-y, y]`.
    pub fn contains(&self, p: Vec3) -> bool {
        p.x.abs() <= self.x && p.y.abs() <= self.y
    }
}

impl Default for Extent {
    /// 100 units wide with a 16:9 aspect.
    fn default() -> Self {
        Self::new(50.0, 50.0 * (9.0 / 16.0))
    }
}

/// Global inputs of one integration step, shared by every particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepInputs {
    /// Elapsed simulation time after this step's clock advance.
    pub time: f32,
    pub time_delta: f32,
    /// Environment direction already multiplied by its force.
    pub env: Vec3,
    pub noise_force: f32,
    pub damping: f32,
    pub extent: Extent,
}

/// Avalanche hash of a u32. Matches `hash` in the WGSL noise library.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

#[inline]
pub fn hash3(x: u32, y: u32, z: u32) -> u32 {
    hash(x.wrapping_add(hash(y.wrapping_add(hash(z)))))
}

/// Lattice value in `[0, 1)`; 24 bits so the result is exact in f32.
#[inline]
fn lattice(x: i32, y: i32, z: i32) -> f32 {
    (hash3(x as u32, y as u32, z as u32) >> 8) as f32 / 16_777_216.0
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smooth(f: f32) -> f32 {
    f * f * (3.0 - 2.0 * f)
}

/// 3D value noise in `[0, 1)`.
///
/// Trilinear blend of hashed lattice values with a cubic smoothstep weight,
/// so both value and first derivative are continuous across cell faces.
pub fn value_noise3(p: Vec3) -> f32 {
    let i = p.floor();
    let f = p - i;
    let u = Vec3::new(smooth(f.x), smooth(f.y), smooth(f.z));
    let (x, y, z) = (i.x as i32, i.y as i32, i.z as i32);

    let c000 = lattice(x, y, z);
    let c100 = lattice(x.wrapping_add(1), y, z);
    let c010 = lattice(x, y.wrapping_add(1), z);
    let c110 = lattice(x.wrapping_add(1), y.wrapping_add(1), z);
    let c001 = lattice(x, y, z.wrapping_add(1));
    let c101 = lattice(x.wrapping_add(1), y, z.wrapping_add(1));
    let c011 = lattice(x, y.wrapping_add(1), z.wrapping_add(1));
    let c111 = lattice(x.wrapping_add(1), y.wrapping_add(1), z.wrapping_add(1));

    mix(
        mix(mix(c000, c100, u.x), mix(c010, c110, u.x), u.y),
        mix(mix(c001, c101, u.x), mix(c011, c111, u.x), u.y),
        u.z,
    )
}

/// Unit direction of the noise force at `pos` and time `time`.
///
/// Returns zero when the two angle vectors cancel out.
pub fn noise_direction(pos: Vec3, time: f32) -> Vec3 {
    let n1 = value_noise3(Vec3::new(pos.x, pos.y, time));
    let scaled = Vec2::new(pos.x, pos.y) * DECORRELATION_SCALE;
    let n2 = value_noise3(Vec3::new(scaled.x, scaled.y, time));

    let a1 = n1 * std::f32::consts::TAU;
    let a2 = n2 * std::f32::consts::TAU;

    let raw = Vec3::new(
        a1.cos() - a2.cos(),
        a1.sin() * 0.5 + a2.sin() * 0.5,
        0.0,
    );
    let len = raw.length();
    if len > 1e-6 {
        raw / len
    } else {
        Vec3::ZERO
    }
}

/// Wrap one coordinate back into `[-e, e]`.
#[inline]
pub fn wrap_axis(v: f32, e: f32) -> f32 {
    let v = if v > e { v - e * 2.0 } else { v };
    if v < -e {
        v + e * 2.0
    } else {
        v
    }
}

/// Toroidal wrap of x and y.
pub fn wrap_position(p: Vec3, extent: Extent) -> Vec3 {
    Vec3::new(wrap_axis(p.x, extent.x), wrap_axis(p.y, extent.y), p.z)
}

/// Advance one particle by one step. Returns `(position, velocity)`.
pub fn integrate(pos: Vec3, vel: Vec3, inputs: &StepInputs) -> (Vec3, Vec3) {
    let dir = noise_direction(pos, inputs.time);

    let mut next_vel = vel + (dir * inputs.noise_force + inputs.env) * inputs.time_delta;
    next_vel *= inputs.damping;

    let next_pos = wrap_position(pos + next_vel, inputs.extent);
    (next_pos, next_vel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> StepInputs {
        StepInputs {
            time: 0.1,
            time_delta: (1.0 / 144.0) * 0.2,
            env: Vec3::new(0.0, 0.3, 0.0),
            noise_force: 0.0,
            damping: 1.0,
            extent: Extent::default(),
        }
    }

    #[test]
    fn test_default_extent() {
        let e = Extent::default();
        assert_eq!(e.x, 50.0);
        assert_eq!(e.y, 28.125);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        for i in 0..500 {
            let p = Vec3::new(i as f32 * 0.37 - 90.0, i as f32 * -0.11 + 3.0, i as f32 * 0.013);
            let a = value_noise3(p);
            let b = value_noise3(p);
            assert_eq!(a.to_bits(), b.to_bits());
            assert!((0.0..1.0).contains(&a), "noise {a} out of range at {p:?}");
        }
    }

    #[test]
    fn test_noise_matches_lattice_at_integer_points() {
        let p = Vec3::new(3.0, -7.0, 12.0);
        assert_eq!(value_noise3(p), lattice(3, -7, 12));
    }

    #[test]
    fn test_noise_is_continuous_across_lattice_faces() {
        let eps = 1e-3;
        for k in -5..5 {
            let x = k as f32;
            let below = value_noise3(Vec3::new(x - eps, 0.4, 1.7));
            let above = value_noise3(Vec3::new(x + eps, 0.4, 1.7));
            assert!((below - above).abs() < 0.01, "jump at x = {x}");
        }
    }

    #[test]
    fn test_noise_varies_over_domain() {
        let first = value_noise3(Vec3::new(0.5, 0.5, 0.0));
        let differs = (1..50).any(|i| {
            let v = value_noise3(Vec3::new(0.5 + i as f32, 0.5, 0.0));
            (v - first).abs() > 1e-3
        });
        assert!(differs);
    }

    #[test]
    fn test_noise_direction_is_unit_or_zero() {
        for i in 0..200 {
            let pos = Vec3::new(i as f32 * 0.5 - 50.0, i as f32 * 0.25 - 25.0, 0.0);
            let d = noise_direction(pos, i as f32 * 0.01);
            let len = d.length();
            assert!(len == 0.0 || (len - 1.0).abs() < 1e-4);
            assert_eq!(d.z, 0.0);
        }
    }

    #[test]
    fn test_wrap_right_edge() {
        let e = Extent::default();
        let eps = 0.25;
        let wrapped = wrap_position(Vec3::new(e.x + eps, 0.0, 0.0), e);
        assert!((wrapped.x - (e.x + eps - 2.0 * e.x)).abs() < 1e-5);
    }

    #[test]
    fn test_wrap_left_and_vertical_edges() {
        let e = Extent::default();
        let wrapped = wrap_position(Vec3::new(-e.x - 1.0, e.y + 2.0, 5.0), e);
        assert!((wrapped.x - (e.x - 1.0)).abs() < 1e-5);
        assert!((wrapped.y - (-e.y + 2.0)).abs() < 1e-5);
        assert_eq!(wrapped.z, 5.0);
    }

    #[test]
    fn test_wrap_leaves_interior_untouched() {
        let e = Extent::default();
        let p = Vec3::new(49.9, -28.0, 0.0);
        assert_eq!(wrap_position(p, e), p);
    }

    #[test]
    fn test_integrate_crossing_right_edge_reenters_left() {
        let e = Extent::default();
        let eps = 0.5;
        let mut step = inputs();
        step.env = Vec3::ZERO;
        let pos = Vec3::new(e.x - 0.5, 0.0, 0.0);
        let vel = Vec3::new(1.0, 0.0, 0.0);
        let (next, _) = integrate(pos, vel, &step);
        assert!((next.x - (e.x + eps - 2.0 * e.x)).abs() < 1e-4);
        assert!(e.contains(next));
    }

    #[test]
    fn test_scenario_env_force_only() {
        let step = inputs();
        let dt = step.time_delta;
        let starts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, -5.0, 0.0),
            Vec3::new(-42.0, 20.0, 0.0),
            Vec3::new(3.5, 27.0, 0.0),
        ];
        for pos in starts {
            let (next_pos, next_vel) = integrate(pos, Vec3::ZERO, &step);
            assert!((next_vel - Vec3::new(0.0, 0.3 * dt, 0.0)).length() < 1e-7);
            assert!((next_pos - (pos + next_vel)).length() < 1e-5);
        }
    }

    #[test]
    fn test_damping_halves_velocity_each_step() {
        let step = StepInputs {
            env: Vec3::ZERO,
            damping: 0.5,
            ..inputs()
        };
        let v0 = Vec3::new(0.8, -0.6, 0.0);
        let mut pos = Vec3::ZERO;
        let mut vel = v0;
        for t in 1..=10 {
            (pos, vel) = integrate(pos, vel, &step);
            let expected = v0.length() * 0.5f32.powi(t);
            assert!((vel.length() - expected).abs() <= expected * 1e-5);
        }
    }

    #[test]
    fn test_zero_damping_freezes() {
        let step = StepInputs {
            damping: 0.0,
            noise_force: 3.0,
            ..inputs()
        };
        let (pos, vel) = integrate(Vec3::new(1.0, 2.0, 0.0), Vec3::new(5.0, 5.0, 0.0), &step);
        assert_eq!(vel, Vec3::ZERO);
        assert_eq!(pos, Vec3::new(1.0, 2.0, 0.0));
    }
}
