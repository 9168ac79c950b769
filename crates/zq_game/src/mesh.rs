//! CPU-side quad mesh for one frame of the scene.
//!
//! The textbox is drawn back to front: frame, portrait, glyphs, arrow. Each
//! quad names the texture it samples; consecutive quads sharing a texture are
//! merged into a single indexed draw.

use std::sync::Arc;

use glam::IVec2;
use zq_core::font::BitmapFont;
use zq_core::textbox::{Rect, TextBoxState};
use zq_render::SpriteVertex;

use crate::atlas::SpriteAtlas;
use crate::scene::Scene;

/// 1x1 white texture used for solid-colour quads.
pub const WHITE_TEXTURE: &str = "__white";
/// Generated atlas of the built-in font.
pub const BUILTIN_FONT_TEXTURE: &str = "__builtin_font";

const FULL_UV: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const FALLBACK_FRAME_COLOR: [f32; 4] = [0.96, 0.94, 0.88, 1.0];
const FALLBACK_PORTRAIT_COLOR: [f32; 4] = [0.55, 0.55, 0.6, 1.0];

/// A contiguous run of indices drawn with one texture binding.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct QuadSpec<'a> {
    pub texture_key: &'a str,
    /// Top-left corner in display pixels.
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub uv: [f32; 4],
    pub color: [f32; 4],
}

#[derive(Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl Mesh {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn push_quad(&mut self, spec: QuadSpec<'_>) {
        let base_index = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&SpriteVertex::quad(
            spec.x, spec.y, spec.w, spec.h, spec.uv, spec.color,
        ));
        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);
        push_draw_call(&mut self.draw_calls, spec.texture_key, draw_start, 6);
    }
}

/// Append a draw call, extending the previous one when the texture matches
/// and the index ranges touch.
fn push_draw_call(draw_calls: &mut Vec<DrawCall>, texture_key: &str, index_start: u32, index_count: u32) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if &*last.texture_key == texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key: Arc::from(texture_key),
        index_start,
        index_count,
    });
}

/// Number of bind-group switches needed to issue `draw_calls` in order.
pub fn count_texture_binds(draw_calls: &[DrawCall]) -> usize {
    let mut binds = 0usize;
    let mut current: Option<&str> = None;
    for draw in draw_calls {
        let key: &str = &draw.texture_key;
        if current != Some(key) {
            current = Some(key);
            binds += 1;
        }
    }
    binds
}

/// Texture key glyph quads of `font` sample from.
pub fn font_texture_key(font: &BitmapFont) -> &str {
    font.texture_path.as_deref().unwrap_or(BUILTIN_FONT_TEXTURE)
}

/// Quad for a named atlas sprite stretched over `rect`, or a solid quad of
/// `fallback` colour when the sprite cannot be resolved.
fn chrome_quad<'a>(
    atlas: Option<&'a SpriteAtlas>,
    sprite: Option<&str>,
    origin: IVec2,
    rect: Rect,
    fallback: [f32; 4],
) -> QuadSpec<'a> {
    let entry = sprite.and_then(|name| atlas.and_then(|atlas| atlas.resolve(name)));
    let (texture_key, uv, color) = match entry {
        Some(entry) => (entry.texture_path.as_str(), entry.uv, WHITE),
        None => (WHITE_TEXTURE, FULL_UV, fallback),
    };
    QuadSpec {
        texture_key,
        x: (origin.x + rect.x) as f32,
        y: (origin.y + rect.y) as f32,
        w: rect.w as f32,
        h: rect.h as f32,
        uv,
        color,
    }
}

pub fn build_scene_mesh(scene: &Scene) -> Mesh {
    let mut mesh = Mesh::default();
    let textbox = &scene.textbox;
    // At rest the box sits entirely below the display.
    if textbox.state() == TextBoxState::Idle {
        return mesh;
    }

    let atlas = scene.atlas.as_ref();
    let sprites = &scene.file.sprites;
    let config = textbox.config();
    let origin = textbox.position();
    let (width, height) = textbox.size();

    mesh.push_quad(chrome_quad(
        atlas,
        sprites.frame.as_deref(),
        origin,
        Rect::new(0, 0, width, height),
        FALLBACK_FRAME_COLOR,
    ));

    if let Some(emote) = textbox.emote() {
        let sprite = sprites.emotes.get(emote).map(String::as_str);
        mesh.push_quad(chrome_quad(
            atlas,
            sprite,
            origin,
            config.portrait_rect,
            FALLBACK_PORTRAIT_COLOR,
        ));
    }

    push_text(&mut mesh, scene);

    if let Some(arrow) = textbox.arrow_position() {
        let rect = Rect::new(0, 0, config.arrow_rect.w, config.arrow_rect.h);
        let color = textbox.color().to_f32_array();
        mesh.push_quad(chrome_quad(atlas, sprites.arrow.as_deref(), arrow, rect, color));
    }

    mesh
}

fn push_text(mesh: &mut Mesh, scene: &Scene) {
    let font = &scene.font;
    let textbox = &scene.textbox;
    let texture_key = font_texture_key(font);
    let color = textbox.color().to_f32_array();
    let scale = font.scale as i32;
    let text_origin = textbox.text_origin();

    for line in textbox.lines() {
        let mut pen = text_origin + line.origin();
        for ch in line.visible().chars() {
            if let Some(glyph) = font.glyph(ch).filter(|_| !ch.is_whitespace()) {
                mesh.push_quad(QuadSpec {
                    texture_key,
                    x: (pen.x + glyph.offset.0 * scale) as f32,
                    y: (pen.y + glyph.offset.1 * scale) as f32,
                    w: (glyph.rect_px.w as i32 * scale) as f32,
                    h: (glyph.rect_px.h as i32 * scale) as f32,
                    uv: font.uv(glyph),
                    color,
                });
            }
            pen.x += font.advance(ch) as i32;
        }
    }
}
