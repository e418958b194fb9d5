//! Named render targets.
//!
//! The host registers whatever surfaces it has under string keys ("display"
//! for the window), and render tasks resolve their output by key.

use std::collections::HashMap;

use crate::error::FlowError;

/// Key of the window's swapchain image.
pub const DISPLAY: &str = "display";

/// A texture view a task can draw into.
#[derive(Debug)]
pub struct RenderTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(view: wgpu::TextureView, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        Self {
            view,
            format,
            width,
            height,
        }
    }

    /// Width over height; 1.0 for a degenerate target.
    pub fn aspect(&self) -> f32 {
        aspect_ratio(self.width, self.height)
    }
}

pub(crate) fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

/// String-keyed registry of render targets.
#[derive(Debug, Default)]
pub struct RenderTargets {
    targets: HashMap<String, RenderTarget>,
}

impl RenderTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` under `name`, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, target: RenderTarget) -> Option<RenderTarget> {
        self.targets.insert(name.into(), target)
    }

    pub fn remove(&mut self, name: &str) -> Option<RenderTarget> {
        self.targets.remove(name)
    }

    /// Resolve `name`; a missing target is fatal for the caller.
    pub fn get(&self, name: &str) -> Result<&RenderTarget, FlowError> {
        self.targets
            .get(name)
            .ok_or_else(|| FlowError::TargetNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_is_not_found() {
        let targets = RenderTargets::new();
        assert!(targets.is_empty());
        let err = targets.get(DISPLAY).unwrap_err();
        assert!(matches!(err, FlowError::TargetNotFound(name) if name == DISPLAY));
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio(1280, 720), 1280.0 / 720.0);
        assert_eq!(aspect_ratio(0, 720), 1.0);
    }
}
