//! Scene files and the runtime scene they describe.
//!
//! A scene names the font, sprite atlas and dialogue script to use, and
//! carries the textbox configuration. Every referenced file is watched by
//! mtime polling; the main loop reloads at a frame boundary.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use zq_core::dialogue::{load_dialogue_script, Color, DialogueScript};
use zq_core::font::{load_bitmap_font, BitmapFont, MAX_FONT_SCALE};
use zq_core::input::Button;
use zq_core::textbox::{BButtonPolicy, TextBox, TextBoxConfig, TextBoxState};

use crate::atlas::{load_atlas_from_path, SpriteAtlas};

#[derive(Debug, Deserialize, Clone)]
pub struct SceneFile {
    pub version: String,
    pub scene_id: String,
    #[serde(default = "default_background")]
    pub background: Color,
    /// Bitmap font description. The built-in font is used when absent.
    #[serde(default)]
    pub font: Option<String>,
    /// Scale for the built-in font; font files carry their own.
    #[serde(default = "default_font_scale")]
    pub font_scale: u32,
    #[serde(default)]
    pub atlas: Option<String>,
    #[serde(default)]
    pub sprites: SceneSprites,
    pub script: String,
    /// Slide the box in as soon as the scene starts.
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub textbox: TextBoxConfig,
}

/// Atlas sprite names for the textbox chrome.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SceneSprites {
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub arrow: Option<String>,
    /// Emote name (as used by dialogue frames) to atlas sprite name.
    #[serde(default)]
    pub emotes: HashMap<String, String>,
}

impl SceneFile {
    /// Every file this scene depends on, scene file excluded.
    pub fn dependency_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(&self.script)];
        paths.extend(self.font.iter().map(PathBuf::from));
        paths.extend(self.atlas.iter().map(PathBuf::from));
        paths
    }
}

pub struct FileWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once per observed modification (or first appearance) of the file.
    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

pub fn load_scene_from_path(scene_path: &Path) -> Result<SceneFile, String> {
    let raw = fs::read_to_string(scene_path)
        .map_err(|e| format!("Failed to read scene file {}: {e}", scene_path.display()))?;
    let scene: SceneFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse scene JSON {}: {e}", scene_path.display()))?;
    validate_scene(&scene)?;
    Ok(scene)
}

fn validate_scene(scene: &SceneFile) -> Result<(), String> {
    if scene.version != "0.1" {
        return Err(format!(
            "Scene validation failed: unsupported version '{}'",
            scene.version
        ));
    }
    if scene.scene_id.is_empty() {
        return Err("Scene validation failed: scene_id is empty".to_string());
    }
    if scene.script.is_empty() {
        return Err("Scene validation failed: script path is empty".to_string());
    }
    if !(1..=MAX_FONT_SCALE).contains(&scene.font_scale) {
        return Err(format!(
            "Scene validation failed: font_scale {} outside 1..={MAX_FONT_SCALE}",
            scene.font_scale
        ));
    }
    let sprite_names = [&scene.sprites.frame, &scene.sprites.arrow];
    if sprite_names
        .iter()
        .any(|name| name.as_deref().is_some_and(str::is_empty))
        || scene
            .sprites
            .emotes
            .iter()
            .any(|(emote, sprite)| emote.is_empty() || sprite.is_empty())
    {
        return Err("Scene validation failed: sprite names must not be empty".to_string());
    }
    scene.textbox.validate()
}

/// Warn about sprite names the atlas cannot resolve. These draw as plain
/// colored quads, so they are not an error.
pub fn check_sprite_references(scene: &SceneFile, atlas: Option<&SpriteAtlas>) -> usize {
    let names = scene
        .sprites
        .frame
        .iter()
        .chain(scene.sprites.arrow.iter())
        .chain(scene.sprites.emotes.values());
    let mut missing = 0;
    for name in names {
        let resolved = atlas.is_some_and(|atlas| atlas.resolve(name).is_some());
        if !resolved {
            log::warn!(
                "Scene '{}' sprite '{}' is not in the atlas; drawing a solid quad",
                scene.scene_id,
                name
            );
            missing += 1;
        }
    }
    missing
}

/// Font, script and atlas a scene file refers to.
pub struct SceneAssets {
    pub font: BitmapFont,
    pub script: DialogueScript,
    pub atlas: Option<SpriteAtlas>,
}

/// Load everything `scene` references. Only the dialogue script is required;
/// a bad font or atlas falls back with a warning.
pub fn load_scene_assets(scene: &SceneFile) -> Result<SceneAssets, String> {
    let script = load_dialogue_script(Path::new(&scene.script))?;

    let font = match &scene.font {
        Some(path) => load_bitmap_font(Path::new(path)).unwrap_or_else(|err| {
            log::warn!("{err}. Falling back to the built-in font.");
            BitmapFont::builtin(scene.font_scale)
        }),
        None => BitmapFont::builtin(scene.font_scale),
    };

    let atlas = scene
        .atlas
        .as_ref()
        .and_then(|path| match load_atlas_from_path(Path::new(path)) {
            Ok(atlas) => Some(atlas),
            Err(err) => {
                log::warn!("{err}. Textbox chrome will use solid quads.");
                None
            }
        });
    check_sprite_references(scene, atlas.as_ref());

    Ok(SceneAssets {
        font,
        script,
        atlas,
    })
}

/// A running scene: the textbox and what it draws with.
pub struct Scene {
    pub file: SceneFile,
    pub font: BitmapFont,
    pub script: DialogueScript,
    pub atlas: Option<SpriteAtlas>,
    pub textbox: TextBox,
}

impl Scene {
    pub fn new(file: SceneFile, assets: SceneAssets, bounds: (u32, u32)) -> Self {
        let textbox = TextBox::new(file.textbox.clone(), bounds);
        let mut scene = Self {
            file,
            font: assets.font,
            script: assets.script,
            atlas: assets.atlas,
            textbox,
        };
        scene.restart();
        scene
    }

    /// Run one logic frame with the buttons pressed during it.
    pub fn step(&mut self, pressed: &[Button]) {
        for &button in pressed {
            if self.starts_dialogue(button) && self.textbox.queued_frames() == 0 {
                log::info!("Replaying script '{}'", self.script.script_id);
                self.textbox.enqueue(self.script.frames.iter().cloned());
            }
            self.textbox.press(button, &self.font);
        }
        self.textbox.update();
    }

    fn starts_dialogue(&self, button: Button) -> bool {
        let b_starts = self.file.textbox.b_button == BButtonPolicy::SameAsA;
        self.textbox.state() == TextBoxState::Idle
            && (button == Button::A || (button == Button::B && b_starts))
    }

    /// Hide the box and queue the script from its first frame.
    pub fn restart(&mut self) {
        self.textbox.reset();
        self.textbox.enqueue(self.script.frames.iter().cloned());
        if self.file.autostart {
            self.textbox.press(Button::A, &self.font);
        }
        log::info!(
            "Scene '{}' started with script '{}' ({} frame(s))",
            self.file.scene_id,
            self.script.script_id,
            self.script.frames.len()
        );
    }

    /// Swap in reloaded content. The textbox keeps its state unless the
    /// script itself changed, in which case the dialogue restarts. Text on
    /// screen is re-wrapped for the new textbox config and font.
    pub fn apply_reload(&mut self, file: SceneFile, assets: SceneAssets) {
        let script_changed = assets.script != self.script;
        self.textbox.set_config(file.textbox.clone(), &assets.font);
        self.file = file;
        self.font = assets.font;
        self.atlas = assets.atlas;
        self.script = assets.script;
        if script_changed {
            self.restart();
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

const fn default_background() -> Color {
    Color::rgb(255, 255, 255)
}

const fn default_font_scale() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zq_core::dialogue::DialogueFrame;

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "zq_scene_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_file(path: &Path, body: &str) {
        fs::write(path, body).expect("failed to write temp file");
    }

    fn scene_file(json: &str) -> SceneFile {
        serde_json::from_str(json).expect("scene json parses")
    }

    fn two_frame_script() -> DialogueScript {
        DialogueScript {
            version: "0.1".to_string(),
            script_id: "test".to_string(),
            frames: vec![
                DialogueFrame::new("Hello.", Color::rgb(10, 10, 10)),
                DialogueFrame::new("Bye.", Color::rgb(10, 10, 10)),
            ],
        }
    }

    fn test_scene(json: &str) -> Scene {
        Scene::new(
            scene_file(json),
            SceneAssets {
                font: BitmapFont::builtin(1),
                script: two_frame_script(),
                atlas: None,
            },
            (1024, 768),
        )
    }

    const MINIMAL: &str = r#"{ "version": "0.1", "scene_id": "s", "script": "x.json" }"#;

    #[test]
    fn load_scene_applies_defaults() {
        let path = temp_file_path("defaults");
        write_file(&path, MINIMAL);
        let scene = load_scene_from_path(&path).expect("minimal scene loads");
        assert_eq!(scene.font_scale, 3);
        assert!(!scene.autostart);
        assert_eq!(scene.background, Color::rgb(255, 255, 255));
        assert_eq!(scene.textbox, TextBoxConfig::default());
        assert!(scene.sprites.emotes.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_scene_reads_textbox_block() {
        let path = temp_file_path("textbox");
        write_file(
            &path,
            r#"{
              "version": "0.1",
              "scene_id": "s",
              "script": "x.json",
              "sprites": { "frame": "textbox", "emotes": { "IDLE": "zane_idle" } },
              "textbox": { "scroll_delay": 2, "b_button": "same_as_a" }
            }"#,
        );
        let scene = load_scene_from_path(&path).expect("scene loads");
        assert_eq!(scene.textbox.scroll_delay, 2);
        assert_eq!(scene.textbox.b_button, BButtonPolicy::SameAsA);
        assert_eq!(scene.sprites.frame.as_deref(), Some("textbox"));
        assert_eq!(scene.sprites.emotes["IDLE"], "zane_idle");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_scene_rejects_bad_version() {
        let path = temp_file_path("version");
        write_file(&path, r#"{ "version": "9", "scene_id": "s", "script": "x.json" }"#);
        let err = load_scene_from_path(&path).expect_err("bad version fails");
        assert!(err.contains("unsupported version"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_scene_rejects_invalid_textbox() {
        let path = temp_file_path("bad_textbox");
        write_file(
            &path,
            r#"{ "version": "0.1", "scene_id": "s", "script": "x.json",
                 "textbox": { "text_rect": { "x": 0, "y": 0, "w": 0, "h": 10 } } }"#,
        );
        let err = load_scene_from_path(&path).expect_err("zero text rect fails");
        assert!(err.contains("text_rect"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_scene_rejects_empty_sprite_name() {
        let path = temp_file_path("empty_sprite");
        write_file(
            &path,
            r#"{ "version": "0.1", "scene_id": "s", "script": "x.json", "sprites": { "arrow": "" } }"#,
        );
        let err = load_scene_from_path(&path).expect_err("empty sprite name fails");
        assert!(err.contains("sprite names"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn shipped_scene_and_script_are_valid() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let scene = load_scene_from_path(&root.join(SHIPPED_SCENE)).expect("shipped scene loads");
        assert_eq!(scene.textbox, TextBoxConfig::default());
        let script = load_dialogue_script(&root.join(&scene.script)).expect("shipped script loads");
        assert!(script.frames.len() >= 2);
    }

    const SHIPPED_SCENE: &str = "assets/scenes/zane_scene.json";

    #[test]
    fn file_watcher_detects_newly_created_file() {
        let path = temp_file_path("watcher_create");
        let _ = fs::remove_file(&path);

        let mut watcher = FileWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");
        write_file(&path, MINIMAL);
        assert!(watcher.should_reload(), "creating file should trigger reload once");
        assert!(!watcher.should_reload(), "second poll without changes should not reload");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn dependency_paths_list_script_font_and_atlas() {
        let file = scene_file(
            r#"{ "version": "0.1", "scene_id": "s", "script": "a.json",
                 "font": "f.json", "atlas": "t.json" }"#,
        );
        let paths = file.dependency_paths();
        assert_eq!(
            paths,
            vec![PathBuf::from("a.json"), PathBuf::from("f.json"), PathBuf::from("t.json")]
        );
    }

    #[test]
    fn missing_atlas_counts_every_sprite_reference() {
        let file = scene_file(
            r#"{ "version": "0.1", "scene_id": "s", "script": "a.json",
                 "sprites": { "frame": "f", "arrow": "a", "emotes": { "IDLE": "i" } } }"#,
        );
        assert_eq!(check_sprite_references(&file, None), 3);
    }

    #[test]
    fn load_scene_assets_falls_back_to_builtin_font() {
        let script_path = temp_file_path("assets_script");
        write_file(
            &script_path,
            r#"{ "version": "0.1", "script_id": "intro", "frames": [{ "text": "hi" }] }"#,
        );
        let json = format!(
            r#"{{ "version": "0.1", "scene_id": "s", "script": {:?},
                  "font": "/nonexistent/font.json", "font_scale": 2 }}"#,
            script_path.display().to_string()
        );
        let assets = load_scene_assets(&scene_file(&json)).expect("assets load");
        assert_eq!(assets.font.font_id, zq_core::font::BUILTIN_FONT_ID);
        assert_eq!(assets.font.scale, 2);
        assert_eq!(assets.script.script_id, "intro");
        assert!(assets.atlas.is_none());
        let _ = fs::remove_file(script_path);
    }

    #[test]
    fn load_scene_assets_requires_script() {
        let file = scene_file(
            r#"{ "version": "0.1", "scene_id": "s", "script": "/nonexistent/script.json" }"#,
        );
        assert!(load_scene_assets(&file).is_err());
    }

    #[test]
    fn scene_queues_script_without_starting() {
        let scene = test_scene(MINIMAL);
        assert_eq!(scene.textbox.state(), TextBoxState::Idle);
        assert_eq!(scene.textbox.queued_frames(), 2);
    }

    #[test]
    fn autostart_slides_in_immediately() {
        let scene = test_scene(
            r#"{ "version": "0.1", "scene_id": "s", "script": "x.json", "autostart": true }"#,
        );
        assert_eq!(scene.textbox.state(), TextBoxState::SlideUp);
        assert_eq!(scene.textbox.queued_frames(), 1);
    }

    #[test]
    fn a_after_script_ends_replays_it() {
        let mut scene = test_scene(MINIMAL);
        // Start, then keep pressing A every few frames until the box is put away.
        scene.step(&[Button::A]);
        for frame in 0..400 {
            let pressed: &[Button] = if frame % 20 == 19 { &[Button::A] } else { &[] };
            scene.step(pressed);
            if scene.textbox.state() == TextBoxState::Idle {
                break;
            }
        }
        assert_eq!(scene.textbox.state(), TextBoxState::Idle);
        assert_eq!(scene.textbox.queued_frames(), 0);

        scene.step(&[Button::A]);
        assert_eq!(scene.textbox.state(), TextBoxState::SlideUp);
        assert_eq!(scene.textbox.queued_frames(), 1);
    }

    #[test]
    fn reload_with_same_script_keeps_textbox_state() {
        let mut scene = test_scene(MINIMAL);
        scene.step(&[Button::A]);
        scene.step(&[]);
        let file = scene_file(
            r#"{ "version": "0.1", "scene_id": "s", "script": "x.json",
                 "textbox": { "scroll_delay": 4 } }"#,
        );
        scene.apply_reload(
            file,
            SceneAssets {
                font: BitmapFont::builtin(1),
                script: two_frame_script(),
                atlas: None,
            },
        );
        // The slide in progress completes; the queued frame is kept.
        assert_eq!(scene.textbox.state(), TextBoxState::Scrolling);
        assert_eq!(scene.textbox.queued_frames(), 1);
        assert_eq!(scene.textbox.config().scroll_delay, 4);
    }

    #[test]
    fn reload_with_new_script_restarts_dialogue() {
        let mut scene = test_scene(MINIMAL);
        scene.step(&[Button::A]);
        let mut script = two_frame_script();
        script.frames.push(DialogueFrame::new("Third.", Color::rgb(0, 0, 0)));
        scene.apply_reload(
            scene_file(MINIMAL),
            SceneAssets {
                font: BitmapFont::builtin(1),
                script,
                atlas: None,
            },
        );
        assert_eq!(scene.textbox.state(), TextBoxState::Idle);
        assert_eq!(scene.textbox.queued_frames(), 3);
    }
}
