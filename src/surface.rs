//! Water surface meshes and live-tunable shader parameters.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Vertex data for a surface mesh (position + UV coordinates)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Flat XZ plane mesh shared by both surfaces
pub struct PlaneMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    /// Create a centered plane of `size` world units with `subdivisions`
    /// quads per side
    pub fn new(size: f32, subdivisions: usize) -> Self {
        let half_size = size / 2.0;
        let step = size / subdivisions as f32;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                let x_pos = x as f32 * step - half_size;
                let z_pos = z as f32 * step - half_size;

                vertices.push(Vertex {
                    position: [x_pos, 0.0, z_pos],
                    uv: [
                        x as f32 / subdivisions as f32,
                        z as f32 / subdivisions as f32,
                    ],
                });
            }
        }

        // Triangle indices with counter-clockwise winding
        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let top_left = (z * (subdivisions + 1) + x) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((z + 1) * (subdivisions + 1) + x) as u32;
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

/// Shader parameters for one surface.
///
/// The panel may edit any field at any time; while audio plays, `elevation`
/// is overwritten every frame by the band extractor and otherwise keeps its
/// last value.
#[derive(Debug, Clone)]
pub struct SurfaceParams {
    /// Vertical displacement amplitude (the audio-driven uniform)
    pub elevation: f32,

    /// Wave spatial frequency along X and Z
    pub frequency: [f32; 2],

    /// Wave animation speed multiplier
    pub speed: f32,

    /// Color of wave troughs (RGB, 0..1)
    pub deep_color: [f32; 3],

    /// Color of wave crests (RGB, 0..1)
    pub surface_color: [f32; 3],

    /// Offset added to elevation before color blending
    pub color_offset: f32,

    /// Gain applied to the color blend factor
    pub color_multiplier: f32,
}

impl SurfaceParams {
    /// Left surface defaults (driven by the high band)
    pub fn left() -> Self {
        Self {
            elevation: 0.0,
            frequency: [4.0, 3.0],
            speed: 0.75,
            deep_color: [0.0, 0.0, 0.0],
            surface_color: [1.0, 0.0, 0.0],
            color_offset: 0.25,
            color_multiplier: 1.2,
        }
    }

    /// Right surface defaults (driven by the low band)
    pub fn right() -> Self {
        Self {
            elevation: 0.0,
            frequency: [2.7, 2.7],
            speed: 0.5,
            deep_color: [0.0, 0.0, 0.0],
            surface_color: [1.0, 0.0, 0.0],
            color_offset: 0.25,
            color_multiplier: 1.0,
        }
    }
}

/// Identifies one of the two rendered surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceId {
    Left,
    Right,
}

impl SurfaceId {
    /// World translation of each surface (side by side on the X axis)
    pub fn model_matrix(self) -> Mat4 {
        let x = match self {
            Self::Left => -2.1,
            Self::Right => 2.1,
        };
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }
}

/// The two surfaces' parameter sets plus their shared mesh
pub struct SurfaceSet {
    pub mesh: PlaneMesh,
    pub left: SurfaceParams,
    pub right: SurfaceParams,
}

impl SurfaceSet {
    pub fn new() -> Self {
        Self {
            mesh: PlaneMesh::new(4.0, 64),
            left: SurfaceParams::left(),
            right: SurfaceParams::right(),
        }
    }

    pub fn params(&self, id: SurfaceId) -> &SurfaceParams {
        match id {
            SurfaceId::Left => &self.left,
            SurfaceId::Right => &self.right,
        }
    }

    /// Write one surface's displacement uniform, leaving the other untouched
    pub fn set_displacement(&mut self, id: SurfaceId, value: f32) {
        match id {
            SurfaceId::Left => self.left.elevation = value,
            SurfaceId::Right => self.right.elevation = value,
        }
    }
}

impl Default for SurfaceSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_mesh_counts() {
        let mesh = PlaneMesh::new(4.0, 64);

        // (subdivisions + 1)^2 vertices
        assert_eq!(mesh.vertices.len(), 65 * 65);
        // subdivisions^2 quads, two triangles each
        assert_eq!(mesh.indices.len(), 64 * 64 * 6);
    }

    #[test]
    fn test_plane_mesh_centered_and_flat() {
        let mesh = PlaneMesh::new(4.0, 8);

        for v in &mesh.vertices {
            assert_eq!(v.position[1], 0.0);
            assert!(v.position[0] >= -2.0 && v.position[0] <= 2.0);
            assert!(v.position[2] >= -2.0 && v.position[2] <= 2.0);
        }

        let first = mesh.vertices.first().unwrap();
        let last = mesh.vertices.last().unwrap();
        assert_eq!(first.position[0], -2.0);
        assert_eq!(last.position[0], 2.0);
    }

    #[test]
    fn test_set_displacement_targets_one_surface() {
        let mut surfaces = SurfaceSet::new();

        surfaces.set_displacement(SurfaceId::Left, 0.9);
        assert_eq!(surfaces.left.elevation, 0.9);
        assert_eq!(surfaces.right.elevation, 0.0);

        surfaces.set_displacement(SurfaceId::Right, 0.4);
        assert_eq!(surfaces.left.elevation, 0.9);
        assert_eq!(surfaces.right.elevation, 0.4);
    }

    #[test]
    fn test_model_matrices_are_mirrored() {
        let left = SurfaceId::Left.model_matrix();
        let right = SurfaceId::Right.model_matrix();

        assert_eq!(left.w_axis.x, -right.w_axis.x);
        assert_ne!(left, right);
    }
}
