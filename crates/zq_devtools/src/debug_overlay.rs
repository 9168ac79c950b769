//! egui debug window drawn over the game.
//!
//! egui-wgpu needs a `RenderPass<'static>`, so a frame goes through four calls:
//! `prepare()` runs the UI and tessellates, `upload()` pushes textures and
//! buffers through the encoder, `paint()` draws into a pass created with
//! `forget_lifetime()`, and `cleanup()` frees textures egui released.
//!
//! Window events are always forwarded so clicks on the window are captured
//! while it is shown (F3).

use zq_core::time::FrameClock;
use winit::window::Window;

/// Snapshot of the scene handed to the overlay each frame.
#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub quad_count: u32,
    pub texture_memory_kb: f32,
    pub scene_id: String,
    pub font_label: String,
    pub textbox_state: String,
    /// Fully revealed lines and total lines on the current page.
    pub revealed: (usize, usize),
    pub remaining_pages: usize,
    pub queued_frames: usize,
    pub slide_offset: i32,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayActions {
    pub toggle_pause: bool,
    /// Run exactly one fixed step while paused.
    pub single_step: bool,
    /// Reset the textbox and queue the dialogue script again.
    pub restart_dialogue: bool,
    pub reload: bool,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    /// Forward a window event to egui. Returns true if egui consumed it.
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        self.egui_winit_state.on_window_event(window, event).consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        stats: &OverlayStats,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if !visible {
                return;
            }
            egui::Window::new("Debug")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {:.1}", clock.smoothed_fps));
                    ui.label(format!("Frame time: {:.2} ms", clock.smoothed_frame_time_ms));
                    ui.label(format!("Steps this frame: {}", clock.steps_this_frame));
                    ui.label(format!("Logic frames: {}", clock.fixed_step_count));

                    ui.separator();
                    ui.label(format!("Scene: {}", stats.scene_id));
                    ui.label(format!("Font: {}", stats.font_label));
                    ui.label(format!("Draw calls: {}", stats.draw_calls));
                    ui.label(format!("Texture binds: {}", stats.texture_binds));
                    ui.label(format!("Quads: {}", stats.quad_count));
                    ui.label(format!("Texture memory: {:.1} KB", stats.texture_memory_kb));

                    ui.separator();
                    ui.label(format!("Textbox: {}", stats.textbox_state));
                    ui.label(format!("Slide offset: {} px", stats.slide_offset));
                    ui.label(format!(
                        "Lines revealed: {}/{}",
                        stats.revealed.0, stats.revealed.1
                    ));
                    ui.label(format!("Pages left: {}", stats.remaining_pages));
                    ui.label(format!("Frames queued: {}", stats.queued_frames));

                    ui.separator();
                    ui.horizontal(|ui| {
                        let pause_label = if stats.paused { "Resume" } else { "Pause" };
                        if ui.button(pause_label).clicked() {
                            actions.toggle_pause = true;
                        }
                        if stats.paused && ui.button("Step").clicked() {
                            actions.single_step = true;
                        }
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Restart dialogue").clicked() {
                            actions.restart_dialogue = true;
                        }
                        if ui.button("Reload").clicked() {
                            actions.reload = true;
                        }
                    });
                    if stats.paused {
                        ui.label("\u{23f8} PAUSED");
                    }
                });
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
