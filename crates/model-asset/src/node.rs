use std::{
    fmt::{self, Display, Formatter},
    ops::{Index, IndexMut},
};

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::{bounded_name, camera::CameraData, light::LightData, mesh::MeshData};

/// Mirror of the z axis, applied once to the imported root and undone again
/// when skinning matrices are built.
pub const AXIS_FLIP: Mat4 = Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::NEG_Z, Vec4::W);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl From<DecomposedTransform> for Mat4 {
    fn from(value: DecomposedTransform) -> Self {
        Mat4::from_translation(value.translation)
            * Mat4::from_quat(value.rotation)
            * Mat4::from_scale(value.scale)
    }
}

impl From<Mat4> for DecomposedTransform {
    fn from(value: Mat4) -> Self {
        let (scale, rotation, translation) = value.to_scale_rotation_translation();
        DecomposedTransform {
            translation,
            rotation,
            scale,
        }
    }
}

/// Index of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root is always the first node of a tree.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persisted node kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKindTag {
    Plain = 0,
    Mesh = 1,
    Light = 2,
    Camera = 3,
}

impl NodeKindTag {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            1 => Some(Self::Mesh),
            2 => Some(Self::Light),
            3 => Some(Self::Camera),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Display for NodeKindTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NodeKindTag::Plain => write!(f, "Plain"),
            NodeKindTag::Mesh => write!(f, "Mesh"),
            NodeKindTag::Light => write!(f, "Light"),
            NodeKindTag::Camera => write!(f, "Camera"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    #[default]
    Plain,
    Mesh(MeshData),
    Light(LightData),
    Camera(CameraData),
}

impl NodeKind {
    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Plain => NodeKindTag::Plain,
            NodeKind::Mesh(_) => NodeKindTag::Mesh,
            NodeKind::Light(_) => NodeKindTag::Light,
            NodeKind::Camera(_) => NodeKindTag::Camera,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    local_transform: Mat4,
    global_transform: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(
        name: &str,
        kind: NodeKind,
        local_transform: Mat4,
        global_transform: Mat4,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            name: bounded_name(name),
            kind,
            local_transform,
            global_transform,
            parent,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn local_transform(&self) -> &Mat4 {
        &self.local_transform
    }

    pub fn global_transform(&self) -> &Mat4 {
        &self.global_transform
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&LightData> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&CameraData> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }
}

/// Node hierarchy stored as an arena.
///
/// The first node is the root. Every other node is reachable from exactly
/// one parent, which is recorded both in the parent's child list and in the
/// node's back-reference. Transforms compose as `global = local * parent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(name: &str, transform: Mat4) -> Self {
        Self {
            nodes: vec![Node::new(name, NodeKind::Plain, transform, transform, None)],
        }
    }

    /// Build a tree from nodes whose links are already consistent.
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Attach a new node under `parent` and derive its global transform.
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        local_transform: Mat4,
    ) -> Option<NodeId> {
        let parent_global = *self.get(parent)?.global_transform();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(
            name,
            kind,
            local_transform,
            local_transform * parent_global,
            Some(parent),
        ));
        self.nodes[parent.0].push_child(id);
        Some(id)
    }

    pub fn set_local_transform(&mut self, id: NodeId, transform: Mat4) {
        if let Some(node) = self.get_mut(id) {
            node.local_transform = transform;
        }
    }

    /// Recompute one node's global transform from its parent's current one.
    pub fn update_global_transform(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let global = match node.parent.and_then(|parent| self.get(parent)) {
            Some(parent) => node.local_transform * parent.global_transform,
            None => node.local_transform,
        };
        self.nodes[id.0].global_transform = global;
    }

    /// Node ids in depth-first pre-order starting at the root.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }
        order
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }
}

impl Index<NodeId> for NodeTree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeId> for NodeTree {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Quat, Vec3};

    use super::{DecomposedTransform, NodeKind, NodeTree};

    #[test]
    fn test_add_child_composes_global_transform() {
        let root_transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mut tree = NodeTree::with_root("root", root_transform);
        let root = tree.root().unwrap();
        let local = Mat4::from_translation(Vec3::X);
        let child = tree.add_child(root, "child", NodeKind::Plain, local).unwrap();

        assert_eq!(tree[child].parent(), Some(root));
        assert_eq!(tree[root].children(), &[child]);
        assert_eq!(*tree[child].global_transform(), local * root_transform);
    }

    #[test]
    fn test_pre_order_visits_children_in_order() {
        let mut tree = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = tree.root().unwrap();
        let a = tree.add_child(root, "a", NodeKind::Plain, Mat4::IDENTITY).unwrap();
        let b = tree.add_child(root, "b", NodeKind::Plain, Mat4::IDENTITY).unwrap();
        let a1 = tree.add_child(a, "a1", NodeKind::Plain, Mat4::IDENTITY).unwrap();

        assert_eq!(tree.pre_order(), vec![root, a, a1, b]);
        assert_eq!(tree.find_by_name("a1"), Some(a1));
        assert!(tree.find_by_name("missing").is_none());
    }

    #[test]
    fn test_decomposed_transform_round_trip() {
        let transform = DecomposedTransform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
            scale: Vec3::splat(2.0),
        };
        let decomposed = DecomposedTransform::from(Mat4::from(transform));
        assert!(decomposed.translation.abs_diff_eq(transform.translation, 1e-5));
        assert!(decomposed.rotation.abs_diff_eq(transform.rotation, 1e-5));
        assert!(decomposed.scale.abs_diff_eq(transform.scale, 1e-5));
    }
}
