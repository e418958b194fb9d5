//! Runtime-tunable parameters of the flow.
//!
//! Fields are plain and public so an editing surface can write them directly.
//! Nothing here is validated: a damping above 1.0 makes velocities grow, a
//! damping of 0.0 freezes the field. Bounding values is the caller's job.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::field::{Extent, StepInputs};

/// How the point renderer colors a particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    /// Hue from the xy direction of motion.
    #[default]
    Direction,
    /// Warm ramp from speed.
    Speed,
}

impl ColorMode {
    pub(crate) fn as_gpu(self) -> u32 {
        match self {
            ColorMode::Direction => 0,
            ColorMode::Speed => 1,
        }
    }
}

/// Parameter set read once per pass by the integrator and the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Direction of the constant environment force. Kept unit length by
    /// [`set_env_dir`](Self::set_env_dir).
    pub env_dir: Vec3,
    /// Magnitude of the environment force (typical: 0.0 to 1.0).
    pub env_force: f32,
    /// Magnitude of the noise force (typical: 0.0 to 2.0).
    pub noise_force: f32,
    /// Per-step velocity multiplier, nominally in (0, 1].
    pub damping: f32,
    /// Point diameter in pixels.
    pub point_size: f32,
    pub color_mode: ColorMode,
}

impl FlowParams {
    /// Environment force with the magnitude folded in, as the integrator wants it.
    pub fn env_vector(&self) -> Vec3 {
        self.env_dir * self.env_force
    }

    /// Integrator inputs for a step ending at simulation time `time`.
    pub fn step_inputs(&self, time: f32, time_delta: f32, extent: Extent) -> StepInputs {
        StepInputs {
            time,
            time_delta,
            env: self.env_vector(),
            noise_force: self.noise_force,
            damping: self.damping,
            extent,
        }
    }

    /// Set the environment direction, normalizing it. A zero vector is
    /// stored as-is and disables the environment force.
    pub fn set_env_dir(&mut self, dir: Vec3) {
        self.env_dir = dir.try_normalize().unwrap_or(dir);
    }

    pub fn with_env(mut self, dir: Vec3, force: f32) -> Self {
        self.set_env_dir(dir);
        self.env_force = force;
        self
    }

    pub fn with_noise_force(mut self, noise_force: f32) -> Self {
        self.noise_force = noise_force;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_point_size(mut self, point_size: f32) -> Self {
        self.point_size = point_size;
        self
    }
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            env_dir: Vec3::Y,
            env_force: 0.3,
            noise_force: 0.5,
            damping: 0.99,
            point_size: 1.0,
            color_mode: ColorMode::Direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_inputs_fold_env_force() {
        let params = FlowParams::default().with_env(Vec3::new(3.0, 0.0, 0.0), 2.0);
        let inputs = params.step_inputs(0.5, 0.01, Extent::default());
        assert_eq!(inputs.env, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(inputs.time, 0.5);
        assert_eq!(inputs.damping, 0.99);
        assert_eq!(inputs.extent, Extent::default());
    }

    #[test]
    fn test_defaults() {
        let p = FlowParams::default();
        assert_eq!(p.env_dir, Vec3::Y);
        assert_eq!(p.env_force, 0.3);
        assert_eq!(p.noise_force, 0.5);
        assert_eq!(p.damping, 0.99);
        assert_eq!(p.point_size, 1.0);
        assert_eq!(p.color_mode, ColorMode::Direction);
    }

    #[test]
    fn test_env_vector_is_premultiplied() {
        let p = FlowParams::default();
        assert!((p.env_vector() - Vec3::new(0.0, 0.3, 0.0)).length() < 1e-7);
    }

    #[test]
    fn test_set_env_dir_normalizes() {
        let mut p = FlowParams::default();
        p.set_env_dir(Vec3::new(3.0, 4.0, 0.0));
        assert!((p.env_dir.length() - 1.0).abs() < 1e-6);
        assert!((p.env_dir - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_zero_direction_is_accepted() {
        let mut p = FlowParams::default();
        p.set_env_dir(Vec3::ZERO);
        assert_eq!(p.env_vector(), Vec3::ZERO);
    }

    #[test]
    fn test_out_of_range_values_are_kept() {
        let p = FlowParams::default().with_damping(1.5).with_point_size(-2.0);
        assert_eq!(p.damping, 1.5);
        assert_eq!(p.point_size, -2.0);
    }
}
