//! Bitmap font metrics and the built-in fallback font.
//!
//! The textbox never touches pixels: it only needs to know how wide a run of
//! text is and how tall a line is, which is what `TextMeasure` provides.
//! `BitmapFont` answers those questions from a glyph table loaded from a JSON
//! atlas description (same conventions as sprite atlases: versioned, with
//! pixel rects into a single texture).
//!
//! When no font file is configured the game falls back to `BitmapFont::builtin`,
//! a 5x7 ASCII font whose texture is generated at startup by
//! `builtin_atlas_rgba`.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Measured-width function used by the line wrapper.
pub trait TextMeasure {
    /// Width in pixels of `text` drawn on a single line.
    fn text_width(&self, text: &str) -> u32;
    /// Vertical distance between consecutive baselines.
    fn line_height(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Unscaled horizontal advance.
    pub advance: u32,
    /// Source rect in the font texture.
    pub rect_px: GlyphRect,
    /// Unscaled draw offset from the pen position.
    pub offset: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct BitmapFont {
    pub font_id: String,
    /// `None` for the built-in font, whose texture is generated in memory.
    pub texture_path: Option<String>,
    pub texture_size: (u32, u32),
    /// Integer pixel scale applied to every metric and glyph quad.
    pub scale: u32,
    line_height: u32,
    fallback_advance: u32,
    glyphs: HashMap<char, Glyph>,
}

impl BitmapFont {
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    /// Scaled advance of a single character.
    pub fn advance(&self, ch: char) -> u32 {
        let unscaled = self
            .glyphs
            .get(&ch)
            .map_or(self.fallback_advance, |glyph| glyph.advance);
        unscaled.saturating_mul(self.scale)
    }

    /// Texture coordinates `[u0, v0, u1, v1]` of a glyph.
    pub fn uv(&self, glyph: &Glyph) -> [f32; 4] {
        let (tw, th) = (self.texture_size.0 as f32, self.texture_size.1 as f32);
        let r = glyph.rect_px;
        [
            r.x as f32 / tw,
            r.y as f32 / th,
            (r.x + r.w) as f32 / tw,
            (r.y + r.h) as f32 / th,
        ]
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// The built-in 5x7 ASCII font at an integer scale.
    pub fn builtin(scale: u32) -> Self {
        let mut glyphs = HashMap::new();
        for (index, code) in (BUILTIN_FIRST..=BUILTIN_LAST).enumerate() {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            let (col, row) = (index as u32 % BUILTIN_COLUMNS, index as u32 / BUILTIN_COLUMNS);
            glyphs.insert(
                ch,
                Glyph {
                    advance: BUILTIN_CELL.0,
                    rect_px: GlyphRect {
                        x: col * BUILTIN_CELL.0,
                        y: row * BUILTIN_CELL.1,
                        w: BUILTIN_CELL.0,
                        h: BUILTIN_CELL.1,
                    },
                    offset: (0, 0),
                },
            );
        }
        Self {
            font_id: BUILTIN_FONT_ID.to_string(),
            texture_path: None,
            texture_size: builtin_atlas_size(),
            scale: scale.max(1),
            line_height: BUILTIN_CELL.1 + 2,
            fallback_advance: BUILTIN_CELL.0,
            glyphs,
        }
    }
}

impl TextMeasure for BitmapFont {
    fn text_width(&self, text: &str) -> u32 {
        text.chars()
            .fold(0u32, |width, ch| width.saturating_add(self.advance(ch)))
    }

    fn line_height(&self) -> u32 {
        self.line_height.saturating_mul(self.scale)
    }
}

pub const BUILTIN_FONT_ID: &str = "__builtin_5x7";

/// Largest integer scale a font may be drawn at.
pub const MAX_FONT_SCALE: u32 = 8;

const BUILTIN_FIRST: u32 = 0x20;
const BUILTIN_LAST: u32 = 0x7e;
const BUILTIN_COLUMNS: u32 = 16;
/// Atlas cell: 5x7 glyph plus one pixel of spacing on the right and bottom.
const BUILTIN_CELL: (u32, u32) = (6, 8);

fn builtin_atlas_size() -> (u32, u32) {
    let count = BUILTIN_LAST - BUILTIN_FIRST + 1;
    let rows = count.div_ceil(BUILTIN_COLUMNS);
    (BUILTIN_COLUMNS * BUILTIN_CELL.0, rows * BUILTIN_CELL.1)
}

/// RGBA8 pixels of the built-in font atlas: white glyphs on transparent.
pub fn builtin_atlas_rgba() -> (Vec<u8>, u32, u32) {
    let (width, height) = builtin_atlas_size();
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    for (index, columns) in FONT_5X7.iter().enumerate() {
        let index = index as u32;
        let origin_x = (index % BUILTIN_COLUMNS) * BUILTIN_CELL.0;
        let origin_y = (index / BUILTIN_COLUMNS) * BUILTIN_CELL.1;
        for (dx, bits) in columns.iter().enumerate() {
            for dy in 0..7u32 {
                if bits & (1 << dy) == 0 {
                    continue;
                }
                let px = origin_x + dx as u32;
                let py = origin_y + dy;
                let offset = ((py * width + px) * 4) as usize;
                pixels[offset..offset + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
    }
    (pixels, width, height)
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct FontFileJson {
    version: String,
    font_id: String,
    texture: FontTextureJson,
    line_height: u32,
    fallback_advance: u32,
    #[serde(default = "default_scale")]
    scale: u32,
    glyphs: Vec<GlyphJson>,
}

#[derive(Debug, Deserialize)]
struct FontTextureJson {
    path: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct GlyphJson {
    ch: String,
    advance: u32,
    rect_px: GlyphRect,
    #[serde(default)]
    offset: (i32, i32),
}

/// Load a bitmap font description from disk.
pub fn load_bitmap_font(path: &Path) -> Result<BitmapFont, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read font file {}: {e}", path.display()))?;
    let json: FontFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse font file {}: {e}", path.display()))?;
    validate_font_json(&json)?;

    let mut glyphs = HashMap::new();
    for glyph in &json.glyphs {
        if let Some(ch) = single_char(&glyph.ch) {
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.advance,
                    rect_px: glyph.rect_px,
                    offset: glyph.offset,
                },
            );
        }
    }

    Ok(BitmapFont {
        font_id: json.font_id,
        texture_path: Some(json.texture.path),
        texture_size: (json.texture.width, json.texture.height),
        scale: json.scale,
        line_height: json.line_height,
        fallback_advance: json.fallback_advance,
        glyphs,
    })
}

fn validate_font_json(json: &FontFileJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Font validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.font_id.is_empty() {
        return Err("Font validation failed: font_id is empty".to_string());
    }
    if json.texture.width == 0 || json.texture.height == 0 {
        return Err("Font validation failed: texture width/height must be > 0".to_string());
    }
    if json.line_height == 0 {
        return Err("Font validation failed: line_height must be > 0".to_string());
    }
    if !(1..=MAX_FONT_SCALE).contains(&json.scale) {
        return Err(format!(
            "Font validation failed: scale {} outside 1..={MAX_FONT_SCALE}",
            json.scale
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for glyph in &json.glyphs {
        let Some(ch) = single_char(&glyph.ch) else {
            return Err(format!(
                "Font validation failed: glyph key '{}' must be exactly one character",
                glyph.ch
            ));
        };
        if !seen.insert(ch) {
            return Err(format!(
                "Font validation failed: duplicate glyph '{}'",
                glyph.ch
            ));
        }
        let r = glyph.rect_px;
        let in_bounds = r
            .x
            .checked_add(r.w)
            .zip(r.y.checked_add(r.h))
            .is_some_and(|(right, bottom)| {
                right <= json.texture.width && bottom <= json.texture.height
            });
        if !in_bounds {
            return Err(format!(
                "Font validation failed: glyph '{}' rect exceeds texture bounds",
                glyph.ch
            ));
        }
    }
    Ok(())
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let ch = chars.next()?;
    chars.next().is_none().then_some(ch)
}

const fn default_scale() -> u32 {
    1
}

/// Column-major 5x7 glyphs for 0x20..=0x7e, bit 0 is the top row.
#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x5f, 0x00, 0x00],
    [0x00, 0x07, 0x00, 0x07, 0x00], [0x14, 0x7f, 0x14, 0x7f, 0x14],
    [0x24, 0x2a, 0x7f, 0x2a, 0x12], [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50], [0x00, 0x05, 0x03, 0x00, 0x00],
    [0x00, 0x1c, 0x22, 0x41, 0x00], [0x00, 0x41, 0x22, 0x1c, 0x00],
    [0x14, 0x08, 0x3e, 0x08, 0x14], [0x08, 0x08, 0x3e, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00], [0x08, 0x08, 0x08, 0x08, 0x08],
    [0x00, 0x60, 0x60, 0x00, 0x00], [0x20, 0x10, 0x08, 0x04, 0x02],
    [0x3e, 0x51, 0x49, 0x45, 0x3e], [0x00, 0x42, 0x7f, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46], [0x21, 0x41, 0x45, 0x4b, 0x31],
    [0x18, 0x14, 0x12, 0x7f, 0x10], [0x27, 0x45, 0x45, 0x45, 0x39],
    [0x3c, 0x4a, 0x49, 0x49, 0x30], [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36], [0x06, 0x49, 0x49, 0x29, 0x1e],
    [0x00, 0x36, 0x36, 0x00, 0x00], [0x00, 0x56, 0x36, 0x00, 0x00],
    [0x08, 0x14, 0x22, 0x41, 0x00], [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08], [0x02, 0x01, 0x51, 0x09, 0x06],
    [0x32, 0x49, 0x79, 0x41, 0x3e], [0x7e, 0x11, 0x11, 0x11, 0x7e],
    [0x7f, 0x49, 0x49, 0x49, 0x36], [0x3e, 0x41, 0x41, 0x41, 0x22],
    [0x7f, 0x41, 0x41, 0x22, 0x1c], [0x7f, 0x49, 0x49, 0x49, 0x41],
    [0x7f, 0x09, 0x09, 0x09, 0x01], [0x3e, 0x41, 0x49, 0x49, 0x7a],
    [0x7f, 0x08, 0x08, 0x08, 0x7f], [0x00, 0x41, 0x7f, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3f, 0x01], [0x7f, 0x08, 0x14, 0x22, 0x41],
    [0x7f, 0x40, 0x40, 0x40, 0x40], [0x7f, 0x02, 0x0c, 0x02, 0x7f],
    [0x7f, 0x04, 0x08, 0x10, 0x7f], [0x3e, 0x41, 0x41, 0x41, 0x3e],
    [0x7f, 0x09, 0x09, 0x09, 0x06], [0x3e, 0x41, 0x51, 0x21, 0x5e],
    [0x7f, 0x09, 0x19, 0x29, 0x46], [0x46, 0x49, 0x49, 0x49, 0x31],
    [0x01, 0x01, 0x7f, 0x01, 0x01], [0x3f, 0x40, 0x40, 0x40, 0x3f],
    [0x1f, 0x20, 0x40, 0x20, 0x1f], [0x3f, 0x40, 0x38, 0x40, 0x3f],
    [0x63, 0x14, 0x08, 0x14, 0x63], [0x07, 0x08, 0x70, 0x08, 0x07],
    [0x61, 0x51, 0x49, 0x45, 0x43], [0x00, 0x7f, 0x41, 0x41, 0x00],
    [0x02, 0x04, 0x08, 0x10, 0x20], [0x00, 0x41, 0x41, 0x7f, 0x00],
    [0x04, 0x02, 0x01, 0x02, 0x04], [0x40, 0x40, 0x40, 0x40, 0x40],
    [0x00, 0x01, 0x02, 0x04, 0x00], [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7f, 0x48, 0x44, 0x44, 0x38], [0x38, 0x44, 0x44, 0x44, 0x20],
    [0x38, 0x44, 0x44, 0x48, 0x7f], [0x38, 0x54, 0x54, 0x54, 0x18],
    [0x08, 0x7e, 0x09, 0x01, 0x02], [0x0c, 0x52, 0x52, 0x52, 0x3e],
    [0x7f, 0x08, 0x04, 0x04, 0x78], [0x00, 0x44, 0x7d, 0x40, 0x00],
    [0x20, 0x40, 0x44, 0x3d, 0x00], [0x7f, 0x10, 0x28, 0x44, 0x00],
    [0x00, 0x41, 0x7f, 0x40, 0x00], [0x7c, 0x04, 0x18, 0x04, 0x78],
    [0x7c, 0x08, 0x04, 0x04, 0x78], [0x38, 0x44, 0x44, 0x44, 0x38],
    [0x7c, 0x14, 0x14, 0x14, 0x08], [0x08, 0x14, 0x14, 0x18, 0x7c],
    [0x7c, 0x08, 0x04, 0x04, 0x08], [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3f, 0x44, 0x40, 0x20], [0x3c, 0x40, 0x40, 0x20, 0x7c],
    [0x1c, 0x20, 0x40, 0x20, 0x1c], [0x3c, 0x40, 0x30, 0x40, 0x3c],
    [0x44, 0x28, 0x10, 0x28, 0x44], [0x0c, 0x50, 0x50, 0x50, 0x3c],
    [0x44, 0x64, 0x54, 0x4c, 0x44], [0x00, 0x08, 0x36, 0x41, 0x00],
    [0x00, 0x00, 0x7f, 0x00, 0x00], [0x00, 0x41, 0x36, 0x08, 0x00],
    [0x08, 0x04, 0x08, 0x10, 0x08],
];
