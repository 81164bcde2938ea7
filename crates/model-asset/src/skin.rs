use std::collections::HashMap;

use glam::Mat4;
use log::{trace, warn};

use crate::{
    loader::{Pose, SkinCluster},
    mesh::{Vertex, MAX_BONE_INFLUENCES},
    node::NodeId,
};

/// Joint name to bone index, numbered in the order joints were found.
#[derive(Debug, Clone, Default)]
pub struct BoneIndexMap {
    indices: HashMap<String, u32>,
    count: u32,
}

impl BoneIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next bone index to `name`.
    pub fn insert(&mut self, name: &str) -> u32 {
        let index = self.count;
        if self.indices.insert(name.to_string(), index).is_some() {
            warn!("Duplicate joint name {:?}, later joint wins", name);
        }
        self.count += 1;
        index
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    /// Number of bone indices handed out.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Write cluster influences into the bone slots of every vertex built from
/// an affected control point.
///
/// Influences fill the first empty slot in cluster order. A vertex that
/// already has all slots taken keeps them and drops the new influence.
pub fn bind_skin(vertices: &mut [Vertex], clusters: &[SkinCluster], bones: &BoneIndexMap) {
    for cluster in clusters {
        let Some(joint) = &cluster.joint else {
            warn!("Skin cluster without joint link, skipped");
            continue;
        };
        let Some(bone) = bones.get(joint) else {
            warn!("Skin cluster references unknown joint {:?}, skipped", joint);
            continue;
        };
        for (control_point, weight) in cluster.control_points.iter().zip(&cluster.weights) {
            for vertex in vertices
                .iter_mut()
                .filter(|vertex| vertex.control_point == *control_point)
            {
                let slot = (0..MAX_BONE_INFLUENCES).find(|slot| {
                    vertex.bone_indices[*slot] == 0 && vertex.bone_weights[*slot] == 0.0
                });
                match slot {
                    Some(slot) => {
                        vertex.bone_indices[slot] = bone;
                        vertex.bone_weights[slot] = *weight;
                    }
                    None => trace!(
                        "Drop influence of bone {} on control point {}",
                        bone,
                        control_point
                    ),
                }
            }
        }
    }
}

/// Inverse pose matrix for every bone name. Every pose is searched and later
/// matches replace earlier ones; bones without a pose get identity.
pub fn bind_poses<'a>(bone_names: impl IntoIterator<Item = &'a str>, poses: &[Pose]) -> Vec<Mat4> {
    bone_names
        .into_iter()
        .map(|name| {
            poses
                .iter()
                .flat_map(|pose| pose.entries.iter())
                .filter(|(entry, _)| entry == name)
                .last()
                .map(|(_, matrix)| matrix.inverse())
                .unwrap_or(Mat4::IDENTITY)
        })
        .collect()
}

/// Bones driving a set of nodes, with their bind poses and skinning matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) bind_poses: Vec<Mat4>,
    pub(crate) bones: Vec<Mat4>,
}

impl Skeleton {
    /// `bones` starts out as given, usually each joint's local transform.
    pub(crate) fn new(nodes: Vec<NodeId>, bind_poses: Vec<Mat4>, bones: Vec<Mat4>) -> Self {
        Self {
            nodes,
            bind_poses,
            bones,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn bind_poses(&self) -> &[Mat4] {
        &self.bind_poses
    }

    /// Skinning matrices from the last evaluation.
    pub fn bones(&self) -> &[Mat4] {
        &self.bones
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};

    use crate::{
        loader::{Pose, SkinCluster},
        mesh::Vertex,
    };

    use super::{bind_poses, bind_skin, BoneIndexMap};

    fn bones(count: usize) -> BoneIndexMap {
        let mut map = BoneIndexMap::new();
        for index in 0..count {
            map.insert(&format!("bone{}", index));
        }
        map
    }

    fn cluster(joint: &str, control_point: i32, weight: f32) -> SkinCluster {
        SkinCluster {
            joint: Some(joint.to_string()),
            control_points: vec![control_point],
            weights: vec![weight],
        }
    }

    #[test]
    fn test_bone_index_map_order() {
        let map = bones(3);
        assert_eq!(map.get("bone0"), Some(0));
        assert_eq!(map.get("bone2"), Some(2));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_fifth_influence_is_dropped() {
        let map = bones(6);
        let mut vertices = vec![
            Vertex {
                control_point: 0,
                ..Default::default()
            },
            Vertex {
                control_point: 1,
                ..Default::default()
            },
        ];
        let weights = [0.1, 0.2, 0.3, 0.4, 0.5];
        let clusters: Vec<_> = (1..6)
            .zip(weights)
            .map(|(bone, weight)| cluster(&format!("bone{}", bone), 0, weight))
            .chain([cluster("bone1", 1, 1.0)])
            .collect();
        bind_skin(&mut vertices, &clusters, &map);

        assert_eq!(vertices[0].bone_indices, [1, 2, 3, 4]);
        assert_eq!(vertices[0].bone_weights, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(vertices[1].bone_indices, [1, 0, 0, 0]);
        assert_eq!(vertices[1].bone_weights, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_and_unlinked_clusters_are_skipped() {
        let map = bones(1);
        let mut vertices = vec![Vertex {
            control_point: 0,
            ..Default::default()
        }];
        let clusters = vec![
            cluster("nobody", 0, 0.5),
            SkinCluster {
                joint: None,
                control_points: vec![0],
                weights: vec![0.5],
            },
        ];
        bind_skin(&mut vertices, &clusters, &map);
        assert_eq!(vertices[0].influences().count(), 0);
    }

    #[test]
    fn test_bind_poses_use_last_match() {
        let first = Mat4::from_translation(Vec3::X);
        let second = Mat4::from_translation(Vec3::Y);
        let poses = vec![
            Pose {
                entries: vec![("hip".to_string(), first)],
            },
            Pose {
                entries: vec![("hip".to_string(), second)],
            },
        ];
        let result = bind_poses(["hip", "knee"], &poses);
        assert!(result[0].abs_diff_eq(second.inverse(), 1e-6));
        assert_eq!(result[1], Mat4::IDENTITY);
    }
}
