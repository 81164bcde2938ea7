use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
};

use crate::mesh::Vertex;

/// Merge structurally equal vertices while building an index buffer.
pub trait VertexWelder {
    /// Return the index of a vertex equal to `vertex`, appending it to
    /// `vertices` when no such vertex exists yet.
    fn weld(&mut self, vertices: &mut Vec<Vertex>, vertex: Vertex) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WelderKind {
    /// Full scan of accepted vertices for every candidate.
    Linear,
    #[default]
    Hashed,
}

impl WelderKind {
    pub fn create(self) -> Box<dyn VertexWelder> {
        match self {
            WelderKind::Linear => Box::new(LinearWelder),
            WelderKind::Hashed => Box::<HashWelder>::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearWelder;

impl VertexWelder for LinearWelder {
    fn weld(&mut self, vertices: &mut Vec<Vertex>, vertex: Vertex) -> u32 {
        if let Some(index) = vertices.iter().position(|item| *item == vertex) {
            return index as u32;
        }
        vertices.push(vertex);
        (vertices.len() - 1) as u32
    }
}

#[derive(Debug, Clone, Default)]
pub struct HashWelder {
    buckets: HashMap<u64, Vec<u32>>,
    indexed: usize,
}

// -0.0 and 0.0 compare equal, so they must hash equal too.
fn float_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

fn vertex_hash(vertex: &Vertex) -> u64 {
    let mut hasher = DefaultHasher::new();
    let floats = vertex
        .position
        .iter()
        .chain(&vertex.color)
        .chain(&vertex.normal)
        .chain(&vertex.tangent)
        .chain(&vertex.bitangent)
        .chain(&vertex.bone_weights)
        .chain(&vertex.uv)
        .chain(&vertex.uv2);
    for value in floats {
        float_bits(*value).hash(&mut hasher);
    }
    vertex.bone_indices.hash(&mut hasher);
    hasher.finish()
}

impl HashWelder {
    // Catch up with vertices accepted outside this welder.
    fn sync(&mut self, vertices: &[Vertex]) {
        if vertices.len() < self.indexed {
            self.buckets.clear();
            self.indexed = 0;
        }
        for (index, vertex) in vertices.iter().enumerate().skip(self.indexed) {
            self.buckets
                .entry(vertex_hash(vertex))
                .or_default()
                .push(index as u32);
        }
        self.indexed = vertices.len();
    }
}

impl VertexWelder for HashWelder {
    fn weld(&mut self, vertices: &mut Vec<Vertex>, vertex: Vertex) -> u32 {
        self.sync(vertices);
        let hash = vertex_hash(&vertex);
        if let Some(bucket) = self.buckets.get(&hash) {
            if let Some(index) = bucket
                .iter()
                .find(|index| vertices[**index as usize] == vertex)
            {
                return *index;
            }
        }
        let index = vertices.len() as u32;
        vertices.push(vertex);
        self.buckets.entry(hash).or_default().push(index);
        self.indexed = vertices.len();
        index
    }
}

#[cfg(test)]
mod test {
    use crate::mesh::Vertex;

    use super::{HashWelder, LinearWelder, VertexWelder, WelderKind};

    fn vertex(x: f32, u: f32) -> Vertex {
        Vertex {
            position: [x, 0.0, 0.0],
            uv: [u, 0.0],
            ..Default::default()
        }
    }

    fn input() -> Vec<Vertex> {
        vec![
            vertex(0.0, 0.0),
            vertex(1.0, 0.0),
            vertex(0.0, 0.0),
            vertex(1.0, 1.0),
            vertex(-0.0, 0.0),
            vertex(1.0, 0.0),
        ]
    }

    fn weld_all(welder: &mut dyn VertexWelder, input: &[Vertex]) -> (Vec<Vertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        let indices = input
            .iter()
            .map(|vertex| welder.weld(&mut vertices, *vertex))
            .collect();
        (vertices, indices)
    }

    #[test]
    fn test_linear_and_hashed_agree() {
        let (linear_vertices, linear_indices) = weld_all(&mut LinearWelder, &input());
        let (hashed_vertices, hashed_indices) = weld_all(&mut HashWelder::default(), &input());
        assert_eq!(linear_indices, vec![0, 1, 0, 2, 0, 1]);
        assert_eq!(linear_indices, hashed_indices);
        assert_eq!(linear_vertices, hashed_vertices);
    }

    #[test]
    fn test_welding_is_deterministic() {
        for kind in [WelderKind::Linear, WelderKind::Hashed] {
            let first = weld_all(kind.create().as_mut(), &input());
            let second = weld_all(kind.create().as_mut(), &input());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_welded_vertices_are_distinct() {
        let (vertices, _) = weld_all(&mut HashWelder::default(), &input());
        for (i, a) in vertices.iter().enumerate() {
            for b in &vertices[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_hashed_welder_sees_external_vertices() {
        let mut welder = HashWelder::default();
        let mut vertices = vec![vertex(5.0, 0.0)];
        assert_eq!(welder.weld(&mut vertices, vertex(5.0, 0.0)), 0);
        assert_eq!(welder.weld(&mut vertices, vertex(6.0, 0.0)), 1);
        assert_eq!(vertices.len(), 2);
    }

    #[test]
    fn test_nan_vertices_are_never_merged() {
        let nan = vertex(f32::NAN, 0.0);
        for kind in [WelderKind::Linear, WelderKind::Hashed] {
            let (vertices, indices) = weld_all(kind.create().as_mut(), &[nan, nan]);
            assert_eq!(vertices.len(), 2);
            assert_eq!(indices, vec![0, 1]);
        }
    }
}
