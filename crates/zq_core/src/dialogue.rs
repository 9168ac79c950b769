//! Dialogue frames and the JSON scripts they are loaded from.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Normalized `[r, g, b, a]` for vertex colors.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

/// Text color used when a frame does not specify one.
pub const DEFAULT_TEXT_COLOR: Color = Color::rgb(10, 10, 10);

/// One complete text payload shown by the textbox.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogueFrame {
    pub text: String,
    #[serde(default = "default_text_color")]
    pub color: Color,
    /// Portrait expression to show alongside the text.
    #[serde(default)]
    pub emote: Option<String>,
}

impl DialogueFrame {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
            emote: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogueScript {
    pub version: String,
    pub script_id: String,
    pub frames: Vec<DialogueFrame>,
}

/// Load a dialogue script from disk.
pub fn load_dialogue_script(path: &Path) -> Result<DialogueScript, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read dialogue script {}: {e}", path.display()))?;
    let script: DialogueScript = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse dialogue script {}: {e}", path.display()))?;
    validate_script(&script)?;
    Ok(script)
}

fn validate_script(script: &DialogueScript) -> Result<(), String> {
    if script.version != "0.1" {
        return Err(format!(
            "Dialogue validation failed: unsupported version '{}'",
            script.version
        ));
    }
    if script.script_id.is_empty() {
        return Err("Dialogue validation failed: script_id is empty".to_string());
    }
    if script.frames.is_empty() {
        return Err(format!(
            "Dialogue validation failed: script '{}' has no frames",
            script.script_id
        ));
    }
    for (i, frame) in script.frames.iter().enumerate() {
        if frame.text.trim().is_empty() {
            return Err(format!(
                "Dialogue validation failed: script '{}' frame {} has no text",
                script.script_id, i
            ));
        }
        if frame.emote.as_deref().is_some_and(str::is_empty) {
            return Err(format!(
                "Dialogue validation failed: script '{}' frame {} has an empty emote",
                script.script_id, i
            ));
        }
    }
    Ok(())
}

const fn opaque() -> u8 {
    255
}

const fn default_text_color() -> Color {
    DEFAULT_TEXT_COLOR
}
