use serde::Deserialize;
use std::fs;
use std::path::Path;
use zq_core::input::Button;

/// Recorded pad input, one entry per run of identical logic frames.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    /// Buttons pressed on each of these frames.
    #[serde(default)]
    pub press: Vec<Button>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<Vec<Button>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(frame.press.clone());
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, SceneAssets, SceneFile};
    use std::time::{SystemTime, UNIX_EPOCH};
    use zq_core::dialogue::{Color, DialogueFrame, DialogueScript};
    use zq_core::font::BitmapFont;
    use zq_core::textbox::TextBoxState;

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "zq_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_scene() -> Scene {
        let file: SceneFile = serde_json::from_str(
            r#"{ "version": "0.1", "scene_id": "replay", "script": "unused.json" }"#,
        )
        .expect("scene json parses");
        let frames = [
            "Hey Zane. Did you know that Chuck E. Cheese isn't actually made of cheese?",
            "Funniest thing I've ever seen in my life.",
        ]
        .iter()
        .map(|text| DialogueFrame::new(*text, Color::rgb(10, 10, 10)))
        .collect();
        Scene::new(
            file,
            SceneAssets {
                font: BitmapFont::builtin(3),
                script: DialogueScript {
                    version: "0.1".to_string(),
                    script_id: "intro".to_string(),
                    frames,
                },
                atlas: None,
            },
            (1024, 768),
        )
    }

    /// Per-frame observable state: box state, slide offset and visible text.
    fn run(inputs: &[Vec<Button>]) -> Vec<(TextBoxState, i32, String)> {
        let mut scene = sample_scene();
        inputs
            .iter()
            .map(|pressed| {
                scene.step(pressed);
                let visible = scene
                    .textbox
                    .lines()
                    .iter()
                    .map(|line| line.visible())
                    .collect::<Vec<_>>()
                    .join("|");
                (scene.textbox.state(), scene.textbox.slide_offset(), visible)
            })
            .collect()
    }

    const PLAYTHROUGH: &str = r#"{
      "frames": [
        { "press": ["A"] },
        { "repeat": 119 },
        { "press": ["A"] },
        { "repeat": 99 },
        { "press": ["A"] },
        { "repeat": 30 }
      ]
    }"#;

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{ "frames": [ { "press": ["A", "B"], "repeat": 2 }, { "repeat": 3 } ] }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 5);
        assert_eq!(expanded[1], vec![Button::A, Button::B]);
        assert!(expanded[4].is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(&path, PLAYTHROUGH).expect("write replay file");
        let inputs = load_replay_from_path(&path)
            .expect("replay should load")
            .expanded_inputs();

        assert_eq!(run(&inputs), run(&inputs));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn playthrough_shows_both_frames_then_hides() {
        let replay: ReplaySequence = serde_json::from_str(PLAYTHROUGH).expect("replay parses");
        let trace = run(&replay.expanded_inputs());

        // First frame fully typed out before the second A.
        let (state, offset, text) = &trace[119];
        assert_eq!(*state, TextBoxState::Scrolling);
        assert_eq!(*offset, 216);
        assert!(text.starts_with("Hey Zane."));
        assert!(text.ends_with("cheese?"));

        // Second A loads the next frame from scratch.
        let (state, _, text) = &trace[120];
        assert_eq!(*state, TextBoxState::Scrolling);
        assert!(!text.starts_with("Hey"));
        assert!("Funniest".starts_with(text.as_str()));

        // Third A dismisses; the box slides back out and rests hidden.
        assert_eq!(trace[220].0, TextBoxState::SlideDown);
        let (state, offset, text) = trace.last().expect("trace not empty");
        assert_eq!(*state, TextBoxState::Idle);
        assert_eq!(*offset, 0);
        assert!(text.is_empty());
    }
}
