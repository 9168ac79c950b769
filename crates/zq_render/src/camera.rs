use glam::{Mat4, Vec2, Vec4};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Screen-space camera: `viewport` logical pixels starting at `origin`, with
/// y pointing down. The logical size stays fixed when the window is resized;
/// the surface simply stretches it.
pub struct Camera2D {
    pub origin: Vec2,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            origin: Vec2::ZERO,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn projection(&self) -> Mat4 {
        let w = self.viewport.0 as f32;
        let h = self.viewport.1 as f32;
        Mat4::orthographic_rh(
            self.origin.x,
            self.origin.x + w,
            self.origin.y + h,
            self.origin.y,
            -1.0,
            1.0,
        )
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.projection().to_cols_array_2d(),
        }
    }

    /// Normalized device coordinates of a logical pixel position.
    pub fn to_ndc(&self, point: Vec2) -> Vec2 {
        let clip = self.projection() * Vec4::new(point.x, point.y, 0.0, 1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn corners_map_to_ndc_with_y_down() {
        let camera = Camera2D::new(1024, 768);
        assert!(approx(camera.to_ndc(Vec2::ZERO), Vec2::new(-1.0, 1.0)));
        assert!(approx(camera.to_ndc(Vec2::new(1024.0, 768.0)), Vec2::new(1.0, -1.0)));
        assert!(approx(camera.to_ndc(Vec2::new(512.0, 384.0)), Vec2::ZERO));
    }

    #[test]
    fn origin_shifts_the_view() {
        let mut camera = Camera2D::new(100, 100);
        camera.origin = Vec2::new(50.0, 0.0);
        assert!(approx(camera.to_ndc(Vec2::new(50.0, 0.0)), Vec2::new(-1.0, 1.0)));
    }
}
