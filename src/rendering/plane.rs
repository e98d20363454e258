//! Textured plane mesh facing the camera.

use bytemuck::{Pod, Zeroable};

/// Vertex data for the plane (position + UV coordinates)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Square grid in the XY plane centered at the origin
pub struct PlaneMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    /// Create a plane of side `size` split into `segments` cells per side
    ///
    /// UV (0, 0) is the top-left corner, matching texture row order.
    pub fn new(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let step = size / segments as f32;
        let half_size = size / 2.0;

        let mut vertices = Vec::with_capacity(((segments + 1) * (segments + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);

        // Rows run top to bottom
        for row in 0..=segments {
            for col in 0..=segments {
                vertices.push(Vertex {
                    position: [
                        col as f32 * step - half_size,
                        half_size - row as f32 * step,
                        0.0,
                    ],
                    uv: [col as f32 / segments as f32, row as f32 / segments as f32],
                });
            }
        }

        // Counter-clockwise winding seen from +Z
        for row in 0..segments {
            for col in 0..segments {
                let top_left = row * (segments + 1) + col;
                let top_right = top_left + 1;
                let bottom_left = (row + 1) * (segments + 1) + col;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        Self { vertices, indices }
    }
}
