use bytemuck::{Pod, Zeroable};

use crate::material::MaterialId;

/// Number of bone influences a vertex can carry.
pub const MAX_BONE_INFLUENCES: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    /// xyz direction, w handedness (±1)
    pub tangent: [f32; 4],
    pub bitangent: [f32; 3],
    pub bone_indices: [u32; MAX_BONE_INFLUENCES],
    pub bone_weights: [f32; MAX_BONE_INFLUENCES],
    pub uv: [f32; 2],
    pub uv2: [f32; 2],
    /// Source control point this vertex was built from. Only meaningful
    /// while a mesh is being imported, and ignored by equality.
    pub control_point: i32,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            color: [1.0; 4],
            normal: [0.0; 3],
            tangent: [0.0; 4],
            bitangent: [0.0; 3],
            bone_indices: [0; MAX_BONE_INFLUENCES],
            bone_weights: [0.0; MAX_BONE_INFLUENCES],
            uv: [0.0; 2],
            uv2: [0.0; 2],
            control_point: -1,
        }
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.color == other.color
            && self.normal == other.normal
            && self.tangent == other.tangent
            && self.bitangent == other.bitangent
            && self.bone_indices == other.bone_indices
            && self.bone_weights == other.bone_weights
            && self.uv == other.uv
            && self.uv2 == other.uv2
    }
}

impl Vertex {
    /// Influences that are actually set, in slot order.
    pub fn influences(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.bone_indices
            .iter()
            .zip(self.bone_weights.iter())
            .filter(|(index, weight)| **index != 0 || **weight != 0.0)
            .map(|(index, weight)| (*index, *weight))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub material: Option<MaterialId>,
    pub vertices: Vec<Vertex>,
    /// Triangle list, always a multiple of 3 long.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod test {
    use std::mem;

    use super::{MeshData, Vertex};

    #[test]
    fn test_equality_ignores_control_point() {
        let a = Vertex {
            control_point: 3,
            ..Default::default()
        };
        let b = Vertex {
            control_point: 7,
            ..Default::default()
        };
        assert_eq!(a, b);
        let c = Vertex {
            uv2: [0.5, 0.0],
            ..a
        };
        assert_ne!(a, c);
    }

    #[test]
    fn test_influences_skip_empty_slots() {
        let vertex = Vertex {
            bone_indices: [2, 0, 5, 0],
            bone_weights: [0.25, 0.0, 0.75, 0.0],
            ..Default::default()
        };
        let influences: Vec<_> = vertex.influences().collect();
        assert_eq!(influences, vec![(2, 0.25), (5, 0.75)]);
    }

    #[test]
    fn test_buffers_as_bytes() {
        let mesh = MeshData {
            material: None,
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_bytes().len(), 3 * mem::size_of::<Vertex>());
        assert_eq!(mesh.index_bytes().len(), 12);
    }
}
