//! Windowed host for the flow task.
//!
//! Plays the engine's part for the demo: creates the window and device,
//! registers the swapchain image as the "display" target every frame, runs
//! the task (and the parameter overlay with the `egui` feature), presents.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::config::FlowConfig;
use crate::error::{GpuError, RunError};
use crate::gpu::{create_instance, GpuContext};
use crate::targets::{RenderTarget, RenderTargets, DISPLAY};
use crate::task::{FlowTask, FrameContext, RenderTask};

#[cfg(feature = "egui")]
use crate::gpu::egui_integration::EguiIntegration;

/// Open a window and run the flow until it is closed.
pub fn run(config: FlowConfig) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Frames per wall-clock second, reported once per second.
struct FpsCounter {
    frames: u32,
    since: Instant,
    last: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
            last: 0.0,
        }
    }

    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.since.elapsed().as_secs_f32();
        if elapsed < 1.0 {
            return None;
        }
        self.last = self.frames as f32 / elapsed;
        self.frames = 0;
        self.since = Instant::now();
        Some(self.last)
    }
}

struct Host {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    gpu: GpuContext,
    surface_config: wgpu::SurfaceConfiguration,
    flow: FlowTask,
    #[cfg(feature = "egui")]
    egui: EguiIntegration,
    fps: FpsCounter,
}

impl Host {
    fn new(window: Arc<Window>, config: &FlowConfig) -> Result<Self, RunError> {
        let size = window.inner_size();

        let instance = create_instance();
        let surface = instance
            .create_surface(window.clone())
            .map_err(GpuError::from)?;
        let gpu = pollster::block_on(GpuContext::for_surface(&instance, &surface))?;

        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RunError::UnsupportedSurface)?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let flow = FlowTask::new(&gpu.device, config, format)?;

        #[cfg(feature = "egui")]
        let egui = EguiIntegration::new(&gpu.device, format, &window);

        Ok(Self {
            window,
            surface,
            gpu,
            surface_config,
            flow,
            #[cfg(feature = "egui")]
            egui,
            fps: FpsCounter::new(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.gpu.device, &self.surface_config);
    }

    #[cfg(feature = "egui")]
    fn status(&self) -> String {
        format!(
            "{} particles, {:?}, {:.0} fps",
            self.flow.particle_count(),
            self.flow.integrator_mode(),
            self.fps.last
        )
    }

    fn render(&mut self) -> Result<(), RunError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize(self.surface_config.width, self.surface_config.height);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let [width, height] = [self.surface_config.width, self.surface_config.height];
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut targets = RenderTargets::new();
        targets.insert(
            DISPLAY,
            RenderTarget::new(view, self.surface_config.format, width, height),
        );

        #[cfg(feature = "egui")]
        let overlay = {
            let status = self.status();
            let params = &mut self.flow.params;
            self.egui.run(&self.window, |ctx| {
                crate::ui::particles_window(ctx, params, &status);
            })
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut ctx = FrameContext {
                device: &self.gpu.device,
                queue: &self.gpu.queue,
                encoder: &mut encoder,
            };
            self.flow.run_frame(&targets, &mut ctx)?;
        }

        #[cfg(feature = "egui")]
        {
            let display = targets.get(DISPLAY)?;
            self.egui.paint(
                &self.gpu.device,
                &self.gpu.queue,
                &mut encoder,
                &display.view,
                [width, height],
                overlay,
            );
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();

        if let Some(fps) = self.fps.tick() {
            log::info!(
                "{:.1} fps, {} steps, t = {:.2}s",
                fps,
                self.flow.clock().steps(),
                self.flow.clock().elapsed()
            );
        }
        Ok(())
    }
}

struct App {
    config: FlowConfig,
    host: Option<Host>,
    error: Option<RunError>,
}

impl App {
    fn new(config: FlowConfig) -> Self {
        Self {
            config,
            host: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RunError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let result = event_loop
            .create_window(window_attrs)
            .map_err(RunError::from)
            .and_then(|window| Host::new(Arc::new(window), &self.config));

        match result {
            Ok(host) => {
                host.window.request_redraw();
                self.host = Some(host);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(host) = &mut self.host else {
            return;
        };

        #[cfg(feature = "egui")]
        if host.egui.on_window_event(&host.window, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => host.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match host.render() {
                    Ok(()) => host.window.request_redraw(),
                    Err(err) => self.fail(event_loop, err),
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_counter_waits_a_second() {
        let mut fps = FpsCounter::new();
        assert_eq!(fps.tick(), None);
        assert_eq!(fps.frames, 1);
    }

    #[test]
    fn test_fps_counter_reports_and_resets() {
        let mut fps = FpsCounter::new();
        fps.frames = 59;
        fps.since = Instant::now() - std::time::Duration::from_secs(1);
        let reported = fps.tick().unwrap();
        assert!(reported > 0.0 && reported <= 60.0);
        assert_eq!(fps.frames, 0);
        assert_eq!(fps.last, reported);
    }
}
