#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Corners of an axis-aligned quad in y-down screen space, clockwise from
    /// top-left. `uv` is `[u0, v0, u1, v1]`.
    pub fn quad(x: f32, y: f32, w: f32, h: f32, uv: [f32; 4], color: [f32; 4]) -> [Self; 4] {
        let [u0, v0, u1, v1] = uv;
        [
            Self { position: [x, y], tex_coords: [u0, v0], color },
            Self { position: [x + w, y], tex_coords: [u1, v0], color },
            Self { position: [x + w, y + h], tex_coords: [u1, v1], color },
            Self { position: [x, y + h], tex_coords: [u0, v1], color },
        ]
    }
}
