//! Shader source lookup by logical path.
//!
//! The flow task never embeds shader text directly; it asks a
//! [`ShaderSourceProvider`] for each program by path. [`EmbeddedSources`]
//! mounts the built-in programs, [`DirectorySources`] lets files on disk
//! override them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::FlowError;
use crate::shaders;

/// Stream-out integrator, vertex stage.
pub const INTEGRATE_VERTEX_PATH: &str = "shader/tf_particles/tf_vert.wgsl";
/// Integrator pass-through fragment stage.
pub const INTEGRATE_FRAGMENT_PATH: &str = "shader/tf_particles/tf_frag.wgsl";
/// Compute fallback of the integrator.
pub const INTEGRATE_COMPUTE_PATH: &str = "shader/tf_particles/tf_comp.wgsl";
/// Point renderer, vertex stage.
pub const POINTS_VERTEX_PATH: &str = "shader/tf_particles/point_vert.wgsl";
/// Point renderer, fragment stage.
pub const POINTS_FRAGMENT_PATH: &str = "shader/tf_particles/point_frag.wgsl";

/// Supplies program text for a logical path.
pub trait ShaderSourceProvider {
    fn source(&self, path: &str) -> Option<Cow<'_, str>>;

    /// Like [`source`](Self::source) but missing paths are an error.
    fn require(&self, path: &str) -> Result<Cow<'_, str>, FlowError> {
        self.source(path)
            .ok_or_else(|| FlowError::MissingShaderSource(path.to_string()))
    }
}

/// In-memory sources keyed by logical path.
#[derive(Clone, Debug, Default)]
pub struct EmbeddedSources {
    files: HashMap<String, String>,
}

impl EmbeddedSources {
    /// No files mounted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All built-in programs at their standard paths.
    pub fn builtin() -> Self {
        let mut sources = Self::empty();
        sources.mount(INTEGRATE_VERTEX_PATH, shaders::integrate_vertex_program());
        sources.mount(INTEGRATE_FRAGMENT_PATH, shaders::INTEGRATE_FRAGMENT_WGSL);
        sources.mount(INTEGRATE_COMPUTE_PATH, shaders::integrate_compute_program());
        sources.mount(POINTS_VERTEX_PATH, shaders::POINTS_VERTEX_WGSL);
        sources.mount(POINTS_FRAGMENT_PATH, shaders::POINTS_FRAGMENT_WGSL);
        sources
    }

    /// Mount (or replace) `text` at `path`.
    pub fn mount(&mut self, path: impl Into<String>, text: impl Into<String>) {
        let path = path.into();
        log::debug!("mounting shader source {path}");
        self.files.insert(path, text.into());
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl ShaderSourceProvider for EmbeddedSources {
    fn source(&self, path: &str) -> Option<Cow<'_, str>> {
        self.files.get(path).map(|s| Cow::Borrowed(s.as_str()))
    }
}

/// Reads `root/<path>` from disk, falling back to the built-in programs.
///
/// Only a missing file falls back. An override that exists but cannot be
/// read (permissions, invalid UTF-8) is logged and reported as missing.
#[derive(Clone, Debug)]
pub struct DirectorySources {
    root: PathBuf,
    fallback: EmbeddedSources,
}

impl DirectorySources {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            fallback: EmbeddedSources::builtin(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderSourceProvider for DirectorySources {
    fn source(&self, path: &str) -> Option<Cow<'_, str>> {
        let file = self.root.join(path);
        match std::fs::read_to_string(&file) {
            Ok(text) => {
                log::info!("loaded shader override {}", file.display());
                Some(Cow::Owned(text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.fallback.source(path),
            Err(e) => {
                log::error!("failed to read shader override {}: {e}", file.display());
                None
            }
        }
    }
}
