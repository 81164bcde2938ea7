//! Import source kept entirely in memory.
//!
//! Useful to feed scenes produced by other tools, and for tests.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::{
    animation::{slerp, Interpolate},
    loader::{
        AnimationStackInfo, AttributeType, LayerElement, MeshSource, Pose, SceneSource,
        SkinCluster, SourceCamera, SourceLight, SourceMaterial, SourceNode, TransformCurves,
    },
    node::DecomposedTransform,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    pub ambient_light: Vec4,
    pub nodes: Vec<MemoryNode>,
    pub poses: Vec<Pose>,
    pub animation_stacks: Vec<AnimationStackInfo>,
}

impl SceneSource for MemoryScene {
    fn ambient_light(&self) -> Vec4 {
        self.ambient_light
    }

    fn root_nodes(&self) -> Vec<&dyn SourceNode> {
        self.nodes.iter().map(|node| node as &dyn SourceNode).collect()
    }

    fn poses(&self) -> Vec<Pose> {
        self.poses.clone()
    }

    fn animation_stacks(&self) -> Vec<AnimationStackInfo> {
        self.animation_stacks.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNode {
    pub name: String,
    pub attribute: AttributeType,
    pub local_transform: Mat4,
    pub children: Vec<MemoryNode>,
    pub mesh: Option<MemoryMesh>,
    pub light: Option<SourceLight>,
    pub camera: Option<SourceCamera>,
    /// Curves keyed by (stack, layer).
    pub curves: HashMap<(usize, usize), TransformCurves>,
    /// Sampled local transforms by time in seconds, ascending.
    pub samples: Vec<(f32, DecomposedTransform)>,
}

impl MemoryNode {
    pub fn new(name: &str, attribute: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attribute,
            local_transform: Mat4::IDENTITY,
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.local_transform = transform;
        self
    }

    pub fn with_child(mut self, child: MemoryNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_mesh(mut self, mesh: MemoryMesh) -> Self {
        self.mesh = Some(mesh);
        self
    }
}

impl SourceNode for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> Mat4 {
        self.local_transform
    }

    fn attribute(&self) -> AttributeType {
        self.attribute
    }

    fn children(&self) -> Vec<&dyn SourceNode> {
        self.children
            .iter()
            .map(|node| node as &dyn SourceNode)
            .collect()
    }

    fn mesh(&self) -> Option<&dyn MeshSource> {
        self.mesh.as_ref().map(|mesh| mesh as &dyn MeshSource)
    }

    fn light(&self) -> Option<SourceLight> {
        self.light
    }

    fn camera(&self) -> Option<SourceCamera> {
        self.camera
    }

    fn transform_curves(&self, stack: usize, layer: usize) -> Option<TransformCurves> {
        self.curves.get(&(stack, layer)).cloned()
    }

    /// Interpolates between the surrounding samples, holding the first and
    /// last sample outside their range.
    fn local_transform_at(&self, time: f32) -> Mat4 {
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return self.local_transform;
        };
        if time <= first.0 {
            return Mat4::from(first.1);
        }
        if time >= last.0 {
            return Mat4::from(last.1);
        }
        let Some(pair) = self
            .samples
            .windows(2)
            .find(|pair| pair[0].0 <= time && time <= pair[1].0)
        else {
            return Mat4::from(last.1);
        };
        let ((from_time, from), (to_time, to)) = (pair[0], pair[1]);
        let span = to_time - from_time;
        let t = if span > 0.0 {
            (time - from_time) / span
        } else {
            0.0
        };
        Mat4::from(DecomposedTransform {
            translation: Vec3::linear(from.translation, to.translation, t),
            rotation: slerp(from.rotation, to.rotation, t),
            scale: Vec3::linear(from.scale, to.scale, t),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMesh {
    pub control_points: Vec<Vec3>,
    /// Control point of every corner, per polygon.
    pub polygons: Vec<Vec<i32>>,
    pub colors: Vec<LayerElement<Vec4>>,
    pub normals: Vec<LayerElement<Vec3>>,
    pub uvs: Vec<LayerElement<Vec2>>,
    pub clusters: Vec<SkinCluster>,
    pub material: Option<SourceMaterial>,
}

impl MeshSource for MemoryMesh {
    fn control_points(&self) -> &[Vec3] {
        &self.control_points
    }

    fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    fn polygon_size(&self, polygon: usize) -> usize {
        self.polygons.get(polygon).map_or(0, Vec::len)
    }

    fn polygon_vertex(&self, polygon: usize, corner: usize) -> i32 {
        self.polygons
            .get(polygon)
            .and_then(|corners| corners.get(corner))
            .copied()
            .unwrap_or(-1)
    }

    fn color_layer(&self, layer: usize) -> Option<&LayerElement<Vec4>> {
        self.colors.get(layer)
    }

    fn normal_layer(&self, layer: usize) -> Option<&LayerElement<Vec3>> {
        self.normals.get(layer)
    }

    fn uv_layer(&self, layer: usize) -> Option<&LayerElement<Vec2>> {
        self.uvs.get(layer)
    }

    fn skin_clusters(&self) -> Vec<SkinCluster> {
        self.clusters.clone()
    }

    fn material(&self) -> Option<SourceMaterial> {
        self.material.clone()
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};

    use crate::{
        loader::{AttributeType, SourceNode},
        node::DecomposedTransform,
    };

    use super::MemoryNode;

    #[test]
    fn test_local_transform_at() {
        let mut node = MemoryNode::new("bone", AttributeType::SkeletonJoint);
        assert_eq!(node.local_transform_at(3.0), Mat4::IDENTITY);

        node.samples = vec![
            (0.0, DecomposedTransform::default()),
            (
                1.0,
                DecomposedTransform {
                    translation: Vec3::new(2.0, 0.0, 0.0),
                    ..Default::default()
                },
            ),
        ];
        let mid = node.local_transform_at(0.5);
        assert!(mid.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        let after = node.local_transform_at(5.0);
        assert!(after.w_axis.truncate().abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }
}
