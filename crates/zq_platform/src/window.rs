use std::path::{Path, PathBuf};
use std::sync::Arc;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Icon, Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// PNG used as the window icon. A missing or unreadable file is logged
    /// and the platform default icon is kept.
    pub icon_path: Option<PathBuf>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "ZaneQuest 2020".to_string(),
            width: 1024,
            height: 768,
            icon_path: None,
        }
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, String> {
    let mut attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height))
        .with_resizable(false);

    if let Some(path) = &config.icon_path {
        match load_icon(path) {
            Ok(icon) => attrs = attrs.with_window_icon(Some(icon)),
            Err(err) => log::warn!("{err}"),
        }
    }

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| format!("Failed to create window: {e}"))?;
    log::info!(
        "Window '{}' created at {}x{}",
        config.title,
        config.width,
        config.height
    );
    Ok(Arc::new(window))
}

fn load_icon(path: &Path) -> Result<Icon, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to load window icon {}: {e}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Icon::from_rgba(img.into_raw(), width, height)
        .map_err(|e| format!("Invalid window icon {}: {e}", path.display()))
}
