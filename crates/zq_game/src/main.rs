//! ZaneQuest 2020 -- dialogue textbox demo.
//!
//! winit drives the event loop through `ApplicationHandler`. Every redraw:
//!
//!   1. `begin_frame()` measures the wall-clock delta and feeds the accumulator
//!   2. `while should_step()` runs one logic frame of the scene per 1/60 s slice
//!   3. the quad mesh is rebuilt from the textbox and streamed to the GPU
//!   4. the sprite pass is drawn, then the egui overlay on top
//!
//! The scene file and everything it references are polled for changes and
//! reloaded between logic frames.

mod atlas;
mod mesh;
#[cfg(test)]
mod replay;
mod scene;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use mesh::{build_scene_mesh, count_texture_binds, font_texture_key, DrawCall, BUILTIN_FONT_TEXTURE, WHITE_TEXTURE};
use scene::{load_scene_assets, load_scene_from_path, FileWatcher, Scene};
use zq_core::font::builtin_atlas_rgba;
use zq_core::input::{Button, Control, DevKey, InputState};
use zq_core::time::FrameClock;
use zq_devtools::{DebugOverlay, OverlayStats};
use zq_platform::PlatformConfig;
use zq_render::{Camera2D, GpuContext, SpritePipeline, SpriteVertex, Texture};

const SCENE_PATH: &str = "assets/scenes/zane_scene.json";
const ICON_PATH: &str = "assets/textures/icon.png";

struct GpuSpriteTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// Everything the running game owns. Built in `ApplicationHandler::resumed`
/// once a window exists.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    clock: FrameClock,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,

    scene_path: PathBuf,
    scene_watcher: FileWatcher,
    dependency_watchers: Vec<FileWatcher>,
    scene: Scene,
    paused: bool,
    single_step_requested: bool,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,

    // The mesh is rebuilt on the CPU and streamed into these buffers, which
    // grow to the next power of two and never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    quad_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>, display: (u32, u32)) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let scene_path = PathBuf::from(SCENE_PATH);
        let scene_file = load_scene_from_path(&scene_path)?;
        let assets = load_scene_assets(&scene_file)?;
        let dependency_watchers = watchers_for(&scene_file);
        let scene = Scene::new(scene_file, assets, display);

        let camera = Camera2D::new(display.0, display.1);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            clock: FrameClock::default(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            scene_watcher: FileWatcher::new(scene_path.clone()),
            scene_path,
            dependency_watchers,
            scene,
            paused: false,
            single_step_requested: false,
            textures: HashMap::new(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            quad_count: 0,
        };

        state.ensure_textures_for_scene();
        state.ensure_mesh_capacity(4, 6);
        state.rebuild_scene_mesh();
        Ok(state)
    }

    /// Reload the scene file and its assets. On any error the running scene
    /// is left untouched.
    fn reload_scene(&mut self, reason: &str) {
        let loaded = load_scene_from_path(&self.scene_path)
            .and_then(|file| load_scene_assets(&file).map(|assets| (file, assets)));
        match loaded {
            Ok((file, assets)) => {
                self.dependency_watchers = watchers_for(&file);
                self.scene.apply_reload(file, assets);
                self.ensure_textures_for_scene();
                self.rebuild_scene_mesh();
                log::info!(
                    "Scene reloaded ({reason}): {} ({})",
                    self.scene.file.scene_id,
                    self.scene.file.version
                );
            }
            Err(err) => {
                log::error!("Scene reload failed ({reason}): {err}");
            }
        }
    }

    fn poll_watchers(&mut self) -> bool {
        // Poll every watcher so each records the latest mtime.
        let scene_changed = self.scene_watcher.should_reload();
        let mut changed_dependency = None;
        for watcher in &mut self.dependency_watchers {
            if watcher.should_reload() && changed_dependency.is_none() {
                changed_dependency = Some(watcher.path().display().to_string());
            }
        }
        if scene_changed {
            self.reload_scene("file watcher");
            true
        } else if let Some(path) = changed_dependency {
            self.reload_scene(&format!("file watcher: {path}"));
            true
        } else {
            false
        }
    }

    fn ensure_textures_for_scene(&mut self) {
        let mut required = HashSet::new();
        if let Some(path) = &self.scene.font.texture_path {
            required.insert(path.clone());
        }
        if let Some(atlas) = &self.scene.atlas {
            log::debug!(
                "Atlas '{}' provides {} sprite(s)",
                atlas.atlas_id,
                atlas.sprite_count()
            );
            required.insert(atlas.texture_path.clone());
        }

        for path in required {
            if self.textures.contains_key(path.as_str()) {
                continue;
            }
            let texture = load_texture_asset(
                &self.gpu.device,
                &self.gpu.queue,
                &self.sprite_pipeline,
                &path,
            );
            self.textures.insert(Arc::from(path), texture);
        }

        if !self.textures.contains_key(WHITE_TEXTURE) {
            let texture = Texture::from_rgba8(
                &self.gpu.device,
                &self.gpu.queue,
                &[255, 255, 255, 255],
                1,
                1,
                "white",
            );
            self.insert_texture(WHITE_TEXTURE, texture);
        }
        if !self.textures.contains_key(BUILTIN_FONT_TEXTURE) {
            let (pixels, width, height) = builtin_atlas_rgba();
            let texture = Texture::from_rgba8(
                &self.gpu.device,
                &self.gpu.queue,
                &pixels,
                width,
                height,
                "builtin_font",
            );
            self.insert_texture(BUILTIN_FONT_TEXTURE, texture);
        }
        log::debug!(
            "Text draws from texture '{}'",
            font_texture_key(&self.scene.font)
        );
    }

    fn insert_texture(&mut self, key: &str, texture: Texture) {
        let bind_group = self
            .sprite_pipeline
            .create_texture_bind_group(&self.gpu.device, &texture);
        self.textures.insert(
            Arc::from(key),
            GpuSpriteTexture {
                texture,
                bind_group,
            },
        );
    }

    fn rebuild_scene_mesh(&mut self) {
        let mesh = build_scene_mesh(&self.scene);
        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        self.quad_count = mesh.quad_count();

        if !mesh.vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
        }
        if !mesh.indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.draw_calls = mesh.draw_calls;
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!(
            "Simulation {}",
            if self.paused { "PAUSED" } else { "RESUMED" }
        );
    }

    fn texture_memory_kb(&self) -> f32 {
        let bytes: usize = self
            .textures
            .values()
            .map(|tex| tex.texture.size.0 as usize * tex.texture.size.1 as usize * 4)
            .sum();
        bytes as f32 / 1024.0
    }

    fn overlay_stats(&self) -> OverlayStats {
        let textbox = &self.scene.textbox;
        OverlayStats {
            draw_calls: self.draw_calls.len() as u32,
            texture_binds: count_texture_binds(&self.draw_calls) as u32,
            quad_count: self.quad_count as u32,
            texture_memory_kb: self.texture_memory_kb(),
            scene_id: self.scene.file.scene_id.clone(),
            font_label: format!("{} x{}", self.scene.font.font_id, self.scene.font.scale),
            textbox_state: textbox.state().to_string(),
            revealed: textbox.reveal_progress(),
            remaining_pages: textbox.remaining_pages(),
            queued_frames: textbox.queued_frames(),
            slide_offset: textbox.slide_offset(),
            paused: self.paused,
        }
    }

    /// Run every logic frame due this redraw. Returns true if anything
    /// visible may have changed.
    fn simulate(&mut self) -> bool {
        self.clock.begin_frame();
        let mut changed = false;

        while self.clock.should_step() {
            if self.input.is_just_pressed(DevKey::ToggleOverlay) {
                self.debug_overlay.toggle();
            }
            if self.input.is_just_pressed(DevKey::TogglePause) {
                self.toggle_pause();
            }
            if self.input.is_just_pressed(DevKey::Reload) {
                self.reload_scene("manual trigger (F5)");
                changed = true;
            } else if self.poll_watchers() {
                changed = true;
            }

            if self.paused && !self.single_step_requested {
                self.input.end_frame();
                break;
            }
            self.single_step_requested = false;

            let pressed = self.input.just_pressed_buttons();
            self.scene.step(&pressed);
            // Each press is seen by exactly one logic frame.
            self.input.end_frame();
            changed = true;
        }
        changed
    }

    fn render(&mut self) {
        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.debug_overlay.prepare(&self.window, &self.clock, &stats);

        if overlay_actions.toggle_pause {
            self.toggle_pause();
        }
        if overlay_actions.single_step {
            self.single_step_requested = true;
        }
        if overlay_actions.restart_dialogue {
            self.scene.restart();
        }
        if overlay_actions.reload {
            self.reload_scene("overlay");
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = self.scene.file.background.to_f32_array();
            let clear_color = wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            let mut last_bound: Option<&Arc<str>> = None;
            for draw in &self.draw_calls {
                let texture = self
                    .textures
                    .get(&draw.texture_key)
                    .or_else(|| self.textures.get(WHITE_TEXTURE));
                let Some(texture) = texture else {
                    continue;
                };
                if last_bound.is_none_or(|last| **last != *draw.texture_key) {
                    render_pass.set_bind_group(1, &texture.bind_group, &[]);
                    last_bound = Some(&draw.texture_key);
                }
                render_pass.draw_indexed(
                    draw.index_start..(draw.index_start + draw.index_count),
                    0,
                    0..1,
                );
            }
        }

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
    /// Why the engine could not start, reported as the process exit status.
    startup_error: Option<String>,
}

impl App {
    fn new() -> Self {
        let icon = PathBuf::from(ICON_PATH);
        Self {
            config: PlatformConfig {
                icon_path: icon.exists().then_some(icon),
                ..PlatformConfig::default()
            },
            state: None,
            startup_error: None,
        }
    }

    fn fail_startup(&mut self, err: String) {
        log::error!("Startup failed: {err}");
        self.startup_error = Some(err);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.startup_error.is_some() {
            return;
        }
        let display = (self.config.width, self.config.height);
        let started = zq_platform::create_window(event_loop, &self.config)
            .and_then(|window| EngineState::new(window, display));
        match started {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                self.fail_startup(err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let (w, h) = (physical_size.width, physical_size.height);
                if w > 0 && h > 0 {
                    // The logical display stays fixed; only the surface changes.
                    state.gpu.resize(w, h);
                    log::info!("Resized to {w}x{h}");
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(control) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(control),
                            ElementState::Released => state.input.key_up(control),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }
                if state.simulate() {
                    state.rebuild_scene_mesh();
                }
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[state.camera.build_uniform()]),
                );
                state.render();
            }

            _ => {}
        }
    }
}

fn watchers_for(file: &scene::SceneFile) -> Vec<FileWatcher> {
    file
        .dependency_paths()
        .into_iter()
        .map(FileWatcher::new)
        .collect()
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Load a texture from disk, falling back to plain white if it cannot be read
/// or decoded.
fn load_texture_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &SpritePipeline,
    asset_path: &str,
) -> GpuSpriteTexture {
    let loaded = std::fs::read(asset_path)
        .map_err(|e| format!("Failed to read texture '{asset_path}': {e}"))
        .and_then(|bytes| Texture::from_bytes(device, queue, &bytes, asset_path));
    let texture = loaded.unwrap_or_else(|err| {
        log::warn!("{err}. Falling back to a white texture.");
        Texture::from_rgba8(device, queue, &[255, 255, 255, 255], 1, 1, asset_path)
    });
    let bind_group = pipeline.create_texture_bind_group(device, &texture);
    GpuSpriteTexture {
        texture,
        bind_group,
    }
}

fn map_key(key_code: KeyCode) -> Option<Control> {
    let control = match key_code {
        KeyCode::ArrowUp => Button::Up.into(),
        KeyCode::ArrowDown => Button::Down.into(),
        KeyCode::ArrowLeft => Button::Left.into(),
        KeyCode::ArrowRight => Button::Right.into(),
        KeyCode::KeyZ => Button::A.into(),
        KeyCode::KeyX => Button::B.into(),
        KeyCode::Escape => Button::Start.into(),
        KeyCode::Enter => Button::Select.into(),
        KeyCode::F3 => DevKey::ToggleOverlay.into(),
        KeyCode::F5 => DevKey::Reload.into(),
        KeyCode::KeyP => DevKey::TogglePause.into(),
        _ => return None,
    };
    Some(control)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("ZaneQuest 2020 starting...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        return ExitCode::FAILURE;
    }
    if app.startup_error.is_some() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_pad_buttons() {
        assert_eq!(map_key(KeyCode::KeyZ), Some(Control::Pad(Button::A)));
        assert_eq!(map_key(KeyCode::KeyX), Some(Control::Pad(Button::B)));
        assert_eq!(map_key(KeyCode::Escape), Some(Control::Pad(Button::Start)));
        assert_eq!(map_key(KeyCode::Enter), Some(Control::Pad(Button::Select)));
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Control::Pad(Button::Left)));
    }

    #[test]
    fn dev_keys_are_separate_from_pad() {
        assert_eq!(map_key(KeyCode::F3), Some(Control::Dev(DevKey::ToggleOverlay)));
        assert_eq!(map_key(KeyCode::F5), Some(Control::Dev(DevKey::Reload)));
        assert_eq!(map_key(KeyCode::KeyP), Some(Control::Dev(DevKey::TogglePause)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::KeyQ), None);
        assert_eq!(map_key(KeyCode::Space), None);
    }

    #[test]
    fn startup_failure_is_recorded_for_exit_status() {
        let mut app = App::new();
        assert!(app.startup_error.is_none());
        app.fail_startup("Failed to read assets/scenes/zane_scene.json".to_string());
        assert_eq!(
            app.startup_error.as_deref(),
            Some("Failed to read assets/scenes/zane_scene.json")
        );
        assert!(app.state.is_none());
    }
}
