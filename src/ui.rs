//! Parameter window (`egui` feature).

use glam::Vec3;

use crate::params::{ColorMode, FlowParams};

/// Draw the "Particles" window editing `params`; `status` is shown at the
/// bottom. Returns `true` if any parameter changed this frame.
pub fn particles_window(ctx: &egui::Context, params: &mut FlowParams, status: &str) -> bool {
    let mut changed = false;

    egui::Window::new("Particles")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            let mut env = params.env_dir.to_array();
            let env_changed = ui
                .horizontal(|ui| {
                    ui.label("Env vector");
                    let mut any = false;
                    any |= ui.add(egui::DragValue::new(&mut env[0]).speed(0.01).prefix("X: ")).changed();
                    any |= ui.add(egui::DragValue::new(&mut env[1]).speed(0.01).prefix("Y: ")).changed();
                    any |= ui.add(egui::DragValue::new(&mut env[2]).speed(0.01).prefix("Z: ")).changed();
                    any
                })
                .inner;
            if env_changed {
                params.set_env_dir(Vec3::from_array(env));
                changed = true;
            }

            changed |= ui
                .add(
                    egui::DragValue::new(&mut params.env_force)
                        .speed(0.01)
                        .prefix("Env force: "),
                )
                .changed();

            changed |= ui
                .add(
                    egui::DragValue::new(&mut params.noise_force)
                        .speed(0.01)
                        .prefix("Noise force: "),
                )
                .changed();

            changed |= ui
                .add(
                    egui::DragValue::new(&mut params.damping)
                        .speed(0.001)
                        .fixed_decimals(3)
                        .prefix("Damping: "),
                )
                .on_hover_text("Per-step velocity multiplier (1.0 = no damping)")
                .changed();

            changed |= ui
                .add(
                    egui::DragValue::new(&mut params.point_size)
                        .speed(0.1)
                        .prefix("Point size: ")
                        .suffix(" px"),
                )
                .changed();

            ui.horizontal(|ui| {
                ui.label("Color");
                changed |= ui
                    .radio_value(&mut params.color_mode, ColorMode::Direction, "Direction")
                    .changed();
                changed |= ui
                    .radio_value(&mut params.color_mode, ColorMode::Speed, "Speed")
                    .changed();
            });

            ui.separator();
            ui.label(egui::RichText::new(status).small().weak());
        });

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_without_input_changes_nothing() {
        let ctx = egui::Context::default();
        let mut params = FlowParams::default();
        let mut changed = true;

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            changed = particles_window(ctx, &mut params, "1000000 particles");
        });

        assert!(!changed);
        assert_eq!(params, FlowParams::default());
    }
}
