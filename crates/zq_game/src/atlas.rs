//! Sprite atlas for the textbox chrome: frame, "next" arrow and portraits.
//!
//! One JSON file describes one texture and the named pixel rects inside it.
//! UVs are derived from the rects, so the file cannot disagree with itself.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
struct AtlasFile {
    version: String,
    atlas_id: String,
    texture: AtlasTexture,
    sprites: Vec<AtlasSprite>,
}

#[derive(Debug, Deserialize, Clone)]
struct AtlasTexture {
    path: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize, Clone)]
struct AtlasSprite {
    name: String,
    rect_px: AtlasRectPx,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct AtlasRectPx {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasSpriteEntry {
    pub texture_path: String,
    pub size_px: (u32, u32),
    pub uv: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct SpriteAtlas {
    pub atlas_id: String,
    pub texture_path: String,
    sprites: HashMap<String, AtlasSpriteEntry>,
}

impl SpriteAtlas {
    pub fn resolve(&self, name: &str) -> Option<&AtlasSpriteEntry> {
        self.sprites.get(name)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }
}

pub fn load_atlas_from_path(path: &Path) -> Result<SpriteAtlas, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read atlas {}: {e}", path.display()))?;
    let atlas: AtlasFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse atlas {}: {e}", path.display()))?;
    validate_atlas(&atlas)?;

    let (tw, th) = (atlas.texture.width as f32, atlas.texture.height as f32);
    let sprites = atlas
        .sprites
        .iter()
        .map(|sprite| {
            let r = sprite.rect_px;
            let entry = AtlasSpriteEntry {
                texture_path: atlas.texture.path.clone(),
                size_px: (r.w, r.h),
                uv: [
                    r.x as f32 / tw,
                    r.y as f32 / th,
                    (r.x + r.w) as f32 / tw,
                    (r.y + r.h) as f32 / th,
                ],
            };
            (sprite.name.clone(), entry)
        })
        .collect();

    log::info!(
        "Atlas '{}' loaded with {} sprite(s)",
        atlas.atlas_id,
        atlas.sprites.len()
    );
    Ok(SpriteAtlas {
        atlas_id: atlas.atlas_id,
        texture_path: atlas.texture.path,
        sprites,
    })
}

fn validate_atlas(atlas: &AtlasFile) -> Result<(), String> {
    if atlas.version != "0.1" {
        return Err(format!(
            "Atlas validation failed: unsupported version '{}'",
            atlas.version
        ));
    }
    if atlas.texture.width == 0 || atlas.texture.height == 0 {
        return Err("Atlas validation failed: texture width/height must be > 0".to_string());
    }

    let mut names = HashSet::new();
    for sprite in &atlas.sprites {
        if sprite.name.is_empty() {
            return Err("Atlas validation failed: sprite with empty name".to_string());
        }
        if !names.insert(sprite.name.as_str()) {
            return Err(format!(
                "Atlas validation failed: duplicate sprite '{}'",
                sprite.name
            ));
        }
        let r = sprite.rect_px;
        if r.w == 0 || r.h == 0 {
            return Err(format!(
                "Atlas validation failed: sprite '{}' has zero-sized rect",
                sprite.name
            ));
        }
        let in_bounds = r
            .x
            .checked_add(r.w)
            .zip(r.y.checked_add(r.h))
            .is_some_and(|(right, bottom)| {
                right <= atlas.texture.width && bottom <= atlas.texture.height
            });
        if !in_bounds {
            return Err(format!(
                "Atlas validation failed: sprite '{}' rect exceeds atlas bounds",
                sprite.name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "zq_atlas_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn atlas_json(sprites: &str) -> String {
        format!(
            r#"{{
              "version": "0.1",
              "atlas_id": "ui",
              "texture": {{ "path": "assets/textures/ui.png", "width": 100, "height": 50 }},
              "sprites": [{sprites}]
            }}"#
        )
    }

    #[test]
    fn load_atlas_derives_uvs_from_rects() {
        let path = temp_file_path("valid");
        fs::write(
            &path,
            atlas_json(r#"{ "name": "arrow", "rect_px": { "x": 50, "y": 0, "w": 25, "h": 50 } }"#),
        )
        .expect("write atlas");

        let atlas = load_atlas_from_path(&path).expect("atlas should load");
        let arrow = atlas.resolve("arrow").expect("arrow present");
        assert_eq!(arrow.size_px, (25, 50));
        assert_eq!(arrow.uv, [0.5, 0.0, 0.75, 1.0]);
        assert_eq!(arrow.texture_path, "assets/textures/ui.png");
        assert!(atlas.resolve("frame").is_none());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_atlas_rejects_out_of_bounds_rect() {
        let path = temp_file_path("oob");
        fs::write(
            &path,
            atlas_json(r#"{ "name": "frame", "rect_px": { "x": 90, "y": 0, "w": 20, "h": 10 } }"#),
        )
        .expect("write atlas");
        let err = load_atlas_from_path(&path).expect_err("oob rect should fail");
        assert!(err.contains("exceeds atlas bounds"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_atlas_rejects_duplicate_names() {
        let path = temp_file_path("dup");
        fs::write(
            &path,
            atlas_json(
                r#"{ "name": "a", "rect_px": { "x": 0, "y": 0, "w": 1, "h": 1 } },
                   { "name": "a", "rect_px": { "x": 1, "y": 0, "w": 1, "h": 1 } }"#,
            ),
        )
        .expect("write atlas");
        let err = load_atlas_from_path(&path).expect_err("duplicate should fail");
        assert!(err.contains("duplicate sprite 'a'"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_atlas_rejects_overflowing_rect() {
        let path = temp_file_path("overflow");
        fs::write(
            &path,
            atlas_json(r#"{ "name": "x", "rect_px": { "x": 4294967295, "y": 0, "w": 2, "h": 1 } }"#),
        )
        .expect("write atlas");
        assert!(load_atlas_from_path(&path).is_err());
        let _ = fs::remove_file(path);
    }
}
