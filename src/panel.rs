//! Floating parameter panel for live shader tuning.

use winit::window::Window;

use crate::analysis::BandIntensity;
use crate::audio::PlaybackState;
use crate::surface::{SurfaceParams, SurfaceSet};

/// Tessellated panel output handed to the render system
pub struct PanelFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// egui-based overlay exposing both surfaces' parameters
pub struct ParameterPanel {
    context: egui::Context,
    state: egui_winit::State,
}

impl ParameterPanel {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            None,
            None,
            None,
        );
        Self { context, state }
    }

    /// Forward a window event; returns true if the panel consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether the pointer is currently over or captured by the panel
    pub fn wants_pointer(&self) -> bool {
        self.context.wants_pointer_input()
    }

    /// Run the panel UI for one frame. Edits land directly in the surface
    /// parameters and take effect on the next render.
    pub fn run(
        &mut self,
        window: &Window,
        surfaces: &mut SurfaceSet,
        playback: PlaybackState,
        intensity: BandIntensity,
    ) -> PanelFrame {
        let input = self.state.take_egui_input(window);

        let output = self.context.run(input, |ctx| {
            egui::Window::new("Tuning")
                .default_width(340.0)
                .show(ctx, |ui| {
                    let status = if playback.is_active() {
                        "playing (space pauses)"
                    } else {
                        "paused (space plays)"
                    };
                    ui.label(status);
                    ui.label(format!(
                        "band intensity  low {:.3}  high {:.3}",
                        intensity.low, intensity.high
                    ));
                    ui.separator();

                    surface_controls(ui, "Left surface", &mut surfaces.left);
                    surface_controls(ui, "Right surface", &mut surfaces.right);
                });
        });

        self.state
            .handle_platform_output(window, output.platform_output);

        let primitives = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);

        PanelFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }
}

fn surface_controls(ui: &mut egui::Ui, label: &str, params: &mut SurfaceParams) {
    egui::CollapsingHeader::new(label)
        .default_open(true)
        .show(ui, |ui| {
            ui.add(
                egui::Slider::new(&mut params.elevation, 0.0..=1.0)
                    .step_by(0.001)
                    .text("elevation"),
            );
            ui.add(
                egui::Slider::new(&mut params.frequency[0], 0.0..=10.0)
                    .step_by(0.001)
                    .text("frequency.x"),
            );
            ui.add(
                egui::Slider::new(&mut params.frequency[1], 0.0..=10.0)
                    .step_by(0.001)
                    .text("frequency.y"),
            );
            ui.add(
                egui::Slider::new(&mut params.speed, 0.0..=4.0)
                    .step_by(0.001)
                    .text("speed"),
            );
            ui.add(
                egui::Slider::new(&mut params.color_offset, 0.0..=1.0)
                    .step_by(0.001)
                    .text("color offset"),
            );
            ui.add(
                egui::Slider::new(&mut params.color_multiplier, 0.0..=10.0)
                    .step_by(0.001)
                    .text("color multiplier"),
            );
            ui.horizontal(|ui| {
                ui.color_edit_button_rgb(&mut params.deep_color);
                ui.label("deep color");
            });
            ui.horizontal(|ui| {
                ui.color_edit_button_rgb(&mut params.surface_color);
                ui.label("surface color");
            });
        });
}
