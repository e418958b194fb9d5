//! Startup configuration.
//!
//! Everything here is fixed once the flow task is built (population size,
//! seed, step size, domain) except [`FlowConfig::params`], which only seeds
//! the live [`FlowParams`]. Configs can be written by hand as JSON; any
//! missing field takes its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_TIME_DELTA;
use crate::error::ConfigError;
use crate::field::Extent;
use crate::params::FlowParams;
use crate::population::DEFAULT_SEED;
use crate::targets::DISPLAY;

/// Which integrator program to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorPreference {
    /// Stream-out when the device supports it, compute otherwise.
    #[default]
    Auto,
    /// Vertex-stage stream-out only; startup fails without device support.
    StreamOut,
    /// Compute shader.
    Compute,
}

/// Complete flow configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub particle_count: u32,
    pub seed: u64,
    /// Fixed simulation step in seconds.
    pub time_delta: f32,
    pub extent: Extent,
    /// Render target key the points are drawn into.
    pub target: String,
    /// Background the point pass clears to; `None` draws over existing content.
    pub clear_color: Option<[f64; 4]>,
    pub integrator: IntegratorPreference,
    /// Directory with shader overrides; built-in programs otherwise.
    pub shader_dir: Option<String>,
    /// Initial parameter values.
    pub params: FlowParams,
    pub window_title: String,
    pub window_size: [u32; 2],
}

impl FlowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_time_delta(mut self, time_delta: f32) -> Self {
        self.time_delta = time_delta;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_clear_color(mut self, clear_color: Option<[f64; 4]>) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorPreference) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_params(mut self, params: FlowParams) -> Self {
        self.params = params;
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            particle_count: 1_000_000,
            seed: DEFAULT_SEED,
            time_delta: DEFAULT_TIME_DELTA,
            extent: Extent::default(),
            target: DISPLAY.to_string(),
            clear_color: Some([0.02, 0.02, 0.05, 1.0]),
            integrator: IntegratorPreference::Auto,
            shader_dir: None,
            params: FlowParams::default(),
            window_title: "wgpu Stream-Out Particles flow".to_string(),
            window_size: [1280, 720],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = FlowConfig::from_json("{}").unwrap();
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.particle_count, 1_000_000);
        assert_eq!(config.target, "display");
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = FlowConfig::from_json(
            r#"{
                "particle_count": 4096,
                "integrator": "Compute",
                "params": { "damping": 0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.particle_count, 4096);
        assert_eq!(config.integrator, IntegratorPreference::Compute);
        assert_eq!(config.params.damping, 0.5);
        assert_eq!(config.params.noise_force, FlowParams::default().noise_force);
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = FlowConfig::from_json("{ particle_count: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FlowConfig::load("/nonexistent/flow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("particle-flow-{}.json", std::process::id()));
        let config = FlowConfig::new()
            .with_particle_count(10)
            .with_clear_color(None)
            .with_target("offscreen");
        config.save(&path).unwrap();
        let loaded = FlowConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
