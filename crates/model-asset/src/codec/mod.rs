use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    io::{self, Read, Seek, Write},
};

use binrw::{BinReaderExt, BinWrite, BinWriterExt};
use glam::{Mat4, Vec4};
use log::{debug, trace};

use crate::{
    animation::{Animation, KeyFrame, Track},
    camera::CameraData,
    light::{LightData, LightKind},
    material::{Material, MaterialId},
    mesh::MeshData,
    node::{Node, NodeId, NodeKind, NodeKindTag, NodeTree},
    scene::Scene,
    skin::Skeleton,
};

pub mod format;

use format::{
    AnimationHeader, CameraRecord, FixedName, KeyFrameRecord, LightRecord, MaterialRecord,
    NodeHeader, TrackHeader, VertexRecord,
};

#[derive(Debug)]
pub enum CodecError {
    /// The stream ended inside a record.
    Truncated,
    Io(io::Error),
    Format(binrw::Error),
    UnknownNodeKind { token: u32, kind: u32 },
    UnknownLightKind(u32),
    NodeCountMismatch { expected: usize, actual: usize },
    DuplicateToken(u32),
    DanglingNode(u32),
    DanglingMaterial(u32),
    ParentMismatch { token: u32, expected: u32, actual: u32 },
    OrphanNode(u32),
    EmptyTree,
    BadIndexCount(usize),
    IndexOutOfRange { index: u32, vertex_count: usize },
    BadTrack {
        animation: String,
        track: usize,
        reason: &'static str,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "Unexpected end of asset"),
            CodecError::Io(io) => Display::fmt(io, f),
            CodecError::Format(format) => Display::fmt(format, f),
            CodecError::UnknownNodeKind { token, kind } => {
                write!(f, "Node {} has unknown kind {}", token, kind)
            }
            CodecError::UnknownLightKind(kind) => write!(f, "Unknown light kind {}", kind),
            CodecError::NodeCountMismatch { expected, actual } => write!(
                f,
                "Asset declares {} nodes, but the tree links {}",
                expected, actual
            ),
            CodecError::DuplicateToken(token) => {
                write!(f, "Token {} is zero or used more than once", token)
            }
            CodecError::DanglingNode(token) => write!(f, "No node with token {}", token),
            CodecError::DanglingMaterial(token) => write!(f, "No material with token {}", token),
            CodecError::ParentMismatch {
                token,
                expected,
                actual,
            } => write!(
                f,
                "Node {} should have parent {}, but records {}",
                token, expected, actual
            ),
            CodecError::OrphanNode(token) => write!(f, "Node {} is not part of the tree", token),
            CodecError::EmptyTree => write!(f, "Asset has no root node"),
            CodecError::BadIndexCount(count) => {
                write!(f, "Index count {} is not a multiple of 3", count)
            }
            CodecError::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(
                f,
                "Index {} out of range for {} vertices",
                index, vertex_count
            ),
            CodecError::BadTrack {
                animation,
                track,
                reason,
            } => write!(f, "Track {} of animation {:?}: {}", track, animation, reason),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<binrw::Error> for CodecError {
    fn from(value: binrw::Error) -> Self {
        if value.is_eof() {
            return Self::Truncated;
        }
        match value {
            binrw::Error::Io(io) => Self::Io(io),
            other => Self::Format(other),
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(value: io::Error) -> Self {
        if value.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(value)
        }
    }
}

fn write_count<W: Write + Seek>(writer: &mut W, count: usize) -> Result<(), CodecError> {
    let count = u32::try_from(count)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "count exceeds u32"))?;
    writer.write_le(&count)?;
    Ok(())
}

/// Write `scene` in the binary asset layout.
///
/// Tokens are handed out for this call only: materials get `1..=n` in arena
/// order and nodes `1..=n` in pre-order, with 0 meaning none.
pub fn save<W: Write + Seek>(scene: &Scene, writer: &mut W) -> Result<(), CodecError> {
    writer.write_le(&scene.ambient_light().to_array())?;

    write_count(writer, scene.materials().len())?;
    for (index, material) in scene.materials().iter().enumerate() {
        writer.write_le(&(index as u32 + 1))?;
        MaterialRecord::from(material).write_le(writer)?;
    }

    let nodes = scene.nodes();
    let order = nodes.pre_order();
    let mut tokens = vec![0u32; nodes.len()];
    for (position, id) in order.iter().enumerate() {
        tokens[id.index()] = position as u32 + 1;
    }
    write_count(writer, order.len())?;
    for id in &order {
        let node = &nodes[*id];
        NodeHeader {
            token: tokens[id.index()],
            kind: node.kind().tag().as_u32(),
            name: FixedName::new(node.name()),
            parent: node.parent().map_or(0, |parent| tokens[parent.index()]),
            local_transform: node.local_transform().to_cols_array(),
            global_transform: node.global_transform().to_cols_array(),
        }
        .write_le(writer)?;
        write_payload(writer, node.kind())?;
        write_count(writer, node.children().len())?;
        for child in node.children() {
            writer.write_le(&tokens[child.index()])?;
        }
        trace!("Write node {:?} as token {}", node.name(), tokens[id.index()]);
    }

    write_count(writer, scene.skeletons().len())?;
    for skeleton in scene.skeletons() {
        write_count(writer, skeleton.bone_count())?;
        for bind_pose in skeleton.bind_poses() {
            writer.write_le(&bind_pose.to_cols_array())?;
        }
        for node in skeleton.nodes() {
            let token = tokens
                .get(node.index())
                .copied()
                .filter(|token| *token != 0)
                .ok_or(CodecError::OrphanNode(node.index() as u32))?;
            writer.write_le(&token)?;
        }
    }

    write_count(writer, scene.animation_count())?;
    for animation in scene.animations() {
        AnimationHeader {
            name: FixedName::new(animation.name()),
            start_frame: animation.start_frame(),
            end_frame: animation.end_frame(),
            track_count: animation.tracks().len() as u32,
        }
        .write_le(writer)?;
        for track in animation.tracks() {
            TrackHeader {
                bone: track.bone,
                keyframe_count: track.keyframes.len() as u32,
            }
            .write_le(writer)?;
            for keyframe in &track.keyframes {
                KeyFrameRecord::from(keyframe).write_le(writer)?;
            }
        }
    }
    debug!(
        "Saved {} materials, {} nodes, {} skeletons, {} animations",
        scene.materials().len(),
        order.len(),
        scene.skeletons().len(),
        scene.animation_count()
    );
    Ok(())
}

fn write_payload<W: Write + Seek>(writer: &mut W, kind: &NodeKind) -> Result<(), CodecError> {
    match kind {
        NodeKind::Plain => {}
        NodeKind::Mesh(mesh) => {
            let material = mesh.material.map_or(0, |id| id.index() as u32 + 1);
            writer.write_le(&material)?;
            write_count(writer, mesh.vertices.len())?;
            for vertex in &mesh.vertices {
                VertexRecord::from(vertex).write_le(writer)?;
            }
            write_count(writer, mesh.indices.len())?;
            for index in &mesh.indices {
                writer.write_le(index)?;
            }
        }
        NodeKind::Light(light) => LightRecord::from(light).write_le(writer)?,
        NodeKind::Camera(camera) => CameraRecord::from(camera).write_le(writer)?,
    }
    Ok(())
}

/// A node as stored, before its tokens are resolved.
struct FlatNode {
    token: u32,
    parent: u32,
    name: String,
    kind: NodeKind,
    local_transform: Mat4,
    global_transform: Mat4,
    children: Vec<u32>,
}

/// Read a scene written by [`save`].
///
/// Nothing is returned unless the whole stream is read and every token
/// resolves.
pub fn load<R: Read + Seek>(reader: &mut R) -> Result<Scene, CodecError> {
    let ambient_light = Vec4::from_array(reader.read_le()?);

    let material_count: u32 = reader.read_le()?;
    let mut materials = Vec::new();
    let mut material_tokens = HashMap::new();
    for _ in 0..material_count {
        let token: u32 = reader.read_le()?;
        let record: MaterialRecord = reader.read_le()?;
        let id = MaterialId(materials.len());
        if token == 0 || material_tokens.insert(token, id).is_some() {
            return Err(CodecError::DuplicateToken(token));
        }
        materials.push(Material::from(record));
    }

    let node_count: u32 = reader.read_le()?;
    let mut flat = Vec::new();
    for _ in 0..node_count {
        flat.push(read_node(reader, &material_tokens)?);
    }
    let (nodes, node_tokens) = relink(flat)?;
    debug!("Read {} nodes", nodes.len());

    let skeleton_count: u32 = reader.read_le()?;
    let mut skeletons = Vec::new();
    for _ in 0..skeleton_count {
        let bone_count: u32 = reader.read_le()?;
        let mut bind_poses = Vec::new();
        for _ in 0..bone_count {
            let matrix: [f32; 16] = reader.read_le()?;
            bind_poses.push(Mat4::from_cols_array(&matrix));
        }
        let mut bone_nodes = Vec::new();
        for _ in 0..bone_count {
            let token: u32 = reader.read_le()?;
            let id = node_tokens
                .get(&token)
                .copied()
                .ok_or(CodecError::DanglingNode(token))?;
            bone_nodes.push(id);
        }
        let bones = bone_nodes
            .iter()
            .map(|id| *nodes[*id].local_transform())
            .collect();
        skeletons.push(Skeleton::new(bone_nodes, bind_poses, bones));
    }

    let bone_count = skeletons.first().map_or(0, Skeleton::bone_count);
    let animation_count: u32 = reader.read_le()?;
    let mut animations = Vec::new();
    for _ in 0..animation_count {
        animations.push(read_animation(reader, bone_count)?);
    }

    Ok(Scene::from_parts(
        ambient_light,
        nodes,
        materials,
        skeletons,
        animations,
    ))
}

fn read_node<R: Read + Seek>(
    reader: &mut R,
    material_tokens: &HashMap<u32, MaterialId>,
) -> Result<FlatNode, CodecError> {
    let header: NodeHeader = reader.read_le()?;
    let tag = NodeKindTag::from_u32(header.kind).ok_or(CodecError::UnknownNodeKind {
        token: header.token,
        kind: header.kind,
    })?;
    let kind = match tag {
        NodeKindTag::Plain => NodeKind::Plain,
        NodeKindTag::Mesh => NodeKind::Mesh(read_mesh(reader, material_tokens)?),
        NodeKindTag::Light => {
            let record: LightRecord = reader.read_le()?;
            NodeKind::Light(LightData {
                kind: LightKind::from_u32(record.kind)
                    .ok_or(CodecError::UnknownLightKind(record.kind))?,
                on: record.on != 0,
                color: Vec4::from_array(record.color),
                inner_angle: record.inner_angle,
                outer_angle: record.outer_angle,
                attenuation: Vec4::from_array(record.attenuation),
            })
        }
        NodeKindTag::Camera => {
            let record: CameraRecord = reader.read_le()?;
            NodeKind::Camera(CameraData::from(record))
        }
    };
    let child_count: u32 = reader.read_le()?;
    let mut children = Vec::new();
    for _ in 0..child_count {
        let child: u32 = reader.read_le()?;
        children.push(child);
    }
    trace!("Read node {} with {} children", header.token, children.len());
    Ok(FlatNode {
        token: header.token,
        parent: header.parent,
        name: header.name.to_string_lossy(),
        kind,
        local_transform: Mat4::from_cols_array(&header.local_transform),
        global_transform: Mat4::from_cols_array(&header.global_transform),
        children,
    })
}

fn read_mesh<R: Read + Seek>(
    reader: &mut R,
    material_tokens: &HashMap<u32, MaterialId>,
) -> Result<MeshData, CodecError> {
    let token: u32 = reader.read_le()?;
    let material = match token {
        0 => None,
        token => Some(
            material_tokens
                .get(&token)
                .copied()
                .ok_or(CodecError::DanglingMaterial(token))?,
        ),
    };
    let vertex_count: u32 = reader.read_le()?;
    let mut vertices = Vec::new();
    for _ in 0..vertex_count {
        let record: VertexRecord = reader.read_le()?;
        vertices.push(record.into());
    }
    let index_count: u32 = reader.read_le()?;
    if index_count % 3 != 0 {
        return Err(CodecError::BadIndexCount(index_count as usize));
    }
    let mut indices = Vec::new();
    for _ in 0..index_count {
        let index: u32 = reader.read_le()?;
        if index as usize >= vertices.len() {
            return Err(CodecError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        indices.push(index);
    }
    Ok(MeshData {
        material,
        vertices,
        indices,
    })
}

/// Resolve stored tokens into a node tree, checking that parent and child
/// links describe one tree rooted at the first record.
fn relink(mut flat: Vec<FlatNode>) -> Result<(NodeTree, HashMap<u32, NodeId>), CodecError> {
    if flat.is_empty() {
        return Err(CodecError::EmptyTree);
    }
    let mut positions = HashMap::new();
    for (position, node) in flat.iter().enumerate() {
        if node.token == 0 || positions.insert(node.token, position).is_some() {
            return Err(CodecError::DuplicateToken(node.token));
        }
    }
    let linked = 1 + flat.iter().map(|node| node.children.len()).sum::<usize>();
    if linked != flat.len() {
        return Err(CodecError::NodeCountMismatch {
            expected: flat.len(),
            actual: linked,
        });
    }
    if flat[0].parent != 0 {
        return Err(CodecError::ParentMismatch {
            token: flat[0].token,
            expected: 0,
            actual: flat[0].parent,
        });
    }

    // Visit in pre-order; the visit order becomes the arena order.
    let mut order = Vec::with_capacity(flat.len());
    let mut ids = vec![None; flat.len()];
    let mut seen = vec![false; flat.len()];
    seen[0] = true;
    let mut stack = vec![0usize];
    while let Some(position) = stack.pop() {
        ids[position] = Some(NodeId(order.len()));
        order.push(position);
        let node = &flat[position];
        for child in node.children.iter().rev() {
            let child_position = *positions
                .get(child)
                .ok_or(CodecError::DanglingNode(*child))?;
            let child_node = &flat[child_position];
            if child_node.parent != node.token {
                return Err(CodecError::ParentMismatch {
                    token: *child,
                    expected: node.token,
                    actual: child_node.parent,
                });
            }
            if seen[child_position] {
                return Err(CodecError::DuplicateToken(*child));
            }
            seen[child_position] = true;
            stack.push(child_position);
        }
    }
    if let Some(position) = ids.iter().position(Option::is_none) {
        return Err(CodecError::OrphanNode(flat[position].token));
    }
    let ids: Vec<NodeId> = ids.into_iter().flatten().collect();

    let mut nodes = Vec::with_capacity(flat.len());
    let mut tokens = HashMap::with_capacity(flat.len());
    for position in order {
        let node = &mut flat[position];
        let parent = match node.parent {
            0 => None,
            token => Some(ids[positions[&token]]),
        };
        let mut linked = Node::new(
            &node.name,
            std::mem::take(&mut node.kind),
            node.local_transform,
            node.global_transform,
            parent,
        );
        for child in &node.children {
            linked.push_child(ids[positions[child]]);
        }
        tokens.insert(node.token, ids[position]);
        nodes.push(linked);
    }
    Ok((NodeTree::from_nodes(nodes), tokens))
}

fn read_animation<R: Read + Seek>(
    reader: &mut R,
    bone_count: usize,
) -> Result<Animation, CodecError> {
    let header: AnimationHeader = reader.read_le()?;
    let name = header.name.to_string_lossy();
    let bad_track = |track: usize, reason: &'static str| CodecError::BadTrack {
        animation: name.clone(),
        track,
        reason,
    };
    let mut tracks = Vec::new();
    for track_index in 0..header.track_count as usize {
        let track: TrackHeader = reader.read_le()?;
        let mut keyframes: Vec<KeyFrame> = Vec::new();
        for _ in 0..track.keyframe_count {
            let record: KeyFrameRecord = reader.read_le()?;
            keyframes.push(record.into());
        }
        if track.bone as usize >= bone_count {
            return Err(bad_track(track_index, "bone index out of range"));
        }
        if keyframes.windows(2).any(|pair| pair[0].key >= pair[1].key) {
            return Err(bad_track(track_index, "keys are not strictly ascending"));
        }
        if keyframes
            .iter()
            .any(|keyframe| keyframe.key < header.start_frame || keyframe.key > header.end_frame)
        {
            return Err(bad_track(track_index, "key outside the frame range"));
        }
        tracks.push(Track {
            bone: track.bone,
            keyframes,
        });
    }
    Ok(Animation::from_parts(
        &name,
        header.start_frame,
        header.end_frame,
        tracks,
    ))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinWriterExt;
    use glam::{Mat4, Quat, Vec3, Vec4};

    use crate::{
        animation::{Animation, KeyFrame, Track},
        camera::CameraData,
        material::{Material, MaterialId},
        mesh::{MeshData, Vertex},
        node::{NodeKind, NodeTree},
        scene::Scene,
        skin::Skeleton,
        NAME_CAPACITY,
    };

    use super::{load, save, CodecError};

    const MATERIAL_RECORD: usize = NAME_CAPACITY + 16 * 4 + 8 * NAME_CAPACITY + 8 * 4;
    const NODE_HEADER: usize = 4 + 4 + NAME_CAPACITY + 4 + 64 + 64;

    fn camera() -> CameraData {
        CameraData {
            aspect: 1.5,
            fov: 0.8,
            near: 0.5,
            far: 50.0,
            view: Mat4::look_at_rh(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y),
        }
    }

    fn tree_scene() -> Scene {
        let mut nodes = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = nodes.root().unwrap();
        let a = nodes
            .add_child(root, "a", NodeKind::Plain, Mat4::from_translation(Vec3::X))
            .unwrap();
        nodes
            .add_child(
                a,
                "mesh",
                NodeKind::Mesh(MeshData {
                    material: None,
                    vertices: vec![Vertex::default(); 3],
                    indices: vec![0, 1, 2],
                }),
                Mat4::IDENTITY,
            )
            .unwrap();
        nodes
            .add_child(root, "b", NodeKind::Plain, Mat4::IDENTITY)
            .unwrap();
        nodes
            .add_child(root, "eye", NodeKind::Camera(camera()), Mat4::IDENTITY)
            .unwrap();
        Scene::from_parts(Vec3::ONE.extend(1.0), nodes, Vec::new(), Vec::new(), Vec::new())
    }

    fn mesh_scene(mesh: MeshData, materials: Vec<Material>) -> Scene {
        let mut nodes = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = nodes.root().unwrap();
        nodes
            .add_child(root, "mesh", NodeKind::Mesh(mesh), Mat4::IDENTITY)
            .unwrap();
        Scene::from_parts(Vec4::ONE, nodes, materials, Vec::new(), Vec::new())
    }

    fn triangle(material: Option<MaterialId>, indices: Vec<u32>) -> MeshData {
        MeshData {
            material,
            vertices: vec![Vertex::default(); 3],
            indices,
        }
    }

    fn key(key: u32) -> KeyFrame {
        KeyFrame {
            key,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    fn skeleton_scene(animations: Vec<Animation>) -> Scene {
        let mut nodes = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = nodes.root().unwrap();
        let bone = nodes
            .add_child(root, "bone", NodeKind::Plain, Mat4::IDENTITY)
            .unwrap();
        let skeleton = Skeleton::new(vec![bone], vec![Mat4::IDENTITY], vec![Mat4::IDENTITY]);
        Scene::from_parts(Vec4::ONE, nodes, Vec::new(), vec![skeleton], animations)
    }

    fn track_error(start_frame: u32, end_frame: u32, bone: u32, keys: &[u32]) -> CodecError {
        let track = Track {
            bone,
            keyframes: keys.iter().copied().map(key).collect(),
        };
        let animation = Animation::from_parts("walk", start_frame, end_frame, vec![track]);
        load(&mut Cursor::new(bytes(&skeleton_scene(vec![animation])))).unwrap_err()
    }

    fn bytes(scene: &Scene) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        save(scene, &mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_round_trip_tree() {
        let scene = tree_scene();
        let loaded = load(&mut Cursor::new(bytes(&scene))).unwrap();
        assert_eq!(loaded, scene);
        assert_eq!(loaded.camera_by_name("eye").unwrap().as_camera(), Some(&camera()));
    }

    #[test]
    fn test_every_truncation_fails() {
        let data = bytes(&tree_scene());
        for length in [0, 3, 16, 30, data.len() / 2, data.len() - 1] {
            let result = load(&mut Cursor::new(&data[..length]));
            assert!(
                matches!(result, Err(CodecError::Truncated)),
                "length {}",
                length
            );
        }
    }

    // The first node record starts after ambient light, material count and
    // node count.
    const FIRST_NODE: usize = 16 + 4 + 4;

    #[test]
    fn test_unknown_node_kind() {
        let mut data = bytes(&tree_scene());
        data[FIRST_NODE + 4..FIRST_NODE + 8].copy_from_slice(&9u32.to_le_bytes());
        let result = load(&mut Cursor::new(data));
        assert!(matches!(
            result,
            Err(CodecError::UnknownNodeKind { token: 1, kind: 9 })
        ));
    }

    #[test]
    fn test_root_with_parent_is_rejected() {
        let mut data = bytes(&tree_scene());
        let parent = FIRST_NODE + 8 + crate::NAME_CAPACITY;
        data[parent..parent + 4].copy_from_slice(&7u32.to_le_bytes());
        let result = load(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::ParentMismatch { .. })));
    }

    #[test]
    fn test_dangling_child_token() {
        // A root whose single child token was never written.
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&[0f32; 4]).unwrap();
        cursor.write_le(&0u32).unwrap();
        cursor.write_le(&2u32).unwrap();
        for (token, parent, child) in [(1u32, 0u32, 5u32), (2, 1, 0)] {
            cursor.write_le(&token).unwrap();
            cursor.write_le(&0u32).unwrap();
            cursor.write_le(&[0u8; crate::NAME_CAPACITY]).unwrap();
            cursor.write_le(&parent).unwrap();
            cursor.write_le(&Mat4::IDENTITY.to_cols_array()).unwrap();
            cursor.write_le(&Mat4::IDENTITY.to_cols_array()).unwrap();
            if child == 0 {
                cursor.write_le(&0u32).unwrap();
            } else {
                cursor.write_le(&1u32).unwrap();
                cursor.write_le(&child).unwrap();
            }
        }
        cursor.write_le(&0u32).unwrap();
        cursor.write_le(&0u32).unwrap();
        let result = load(&mut Cursor::new(cursor.into_inner()));
        assert!(matches!(result, Err(CodecError::DanglingNode(5))));
    }

    #[test]
    fn test_empty_tree() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&[0f32; 4]).unwrap();
        cursor.write_le(&[0u32; 4]).unwrap();
        let result = load(&mut Cursor::new(cursor.into_inner()));
        assert!(matches!(result, Err(CodecError::EmptyTree)));
    }

    #[test]
    fn test_duplicate_node_token() {
        let mut nodes = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = nodes.root().unwrap();
        nodes
            .add_child(root, "child", NodeKind::Plain, Mat4::IDENTITY)
            .unwrap();
        let scene = Scene::from_parts(Vec4::ONE, nodes, Vec::new(), Vec::new(), Vec::new());
        let mut data = bytes(&scene);
        // Root record: header, child count and one child token.
        let child = FIRST_NODE + NODE_HEADER + 4 + 4;
        data[child..child + 4].copy_from_slice(&1u32.to_le_bytes());
        let result = load(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::DuplicateToken(1))));
    }

    #[test]
    fn test_duplicate_material_token() {
        let scene = mesh_scene(
            triangle(None, vec![0, 1, 2]),
            vec![Material::new("a"), Material::new("b")],
        );
        let mut data = bytes(&scene);
        let second = 16 + 4 + 4 + MATERIAL_RECORD;
        data[second..second + 4].copy_from_slice(&1u32.to_le_bytes());
        let result = load(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::DuplicateToken(1))));
    }

    #[test]
    fn test_dangling_material() {
        let scene = mesh_scene(triangle(Some(MaterialId(3)), vec![0, 1, 2]), Vec::new());
        let result = load(&mut Cursor::new(bytes(&scene)));
        assert!(matches!(result, Err(CodecError::DanglingMaterial(4))));
    }

    #[test]
    fn test_bad_index_count() {
        let scene = mesh_scene(triangle(None, vec![0, 1]), Vec::new());
        let result = load(&mut Cursor::new(bytes(&scene)));
        assert!(matches!(result, Err(CodecError::BadIndexCount(2))));
    }

    #[test]
    fn test_index_out_of_range() {
        let scene = mesh_scene(triangle(None, vec![0, 1, 5]), Vec::new());
        let result = load(&mut Cursor::new(bytes(&scene)));
        assert!(matches!(
            result,
            Err(CodecError::IndexOutOfRange {
                index: 5,
                vertex_count: 3
            })
        ));
    }

    #[test]
    fn test_dangling_skeleton_bone() {
        let mut data = bytes(&skeleton_scene(Vec::new()));
        // The bone token sits right before the animation count.
        let token = data.len() - 8;
        data[token..token + 4].copy_from_slice(&99u32.to_le_bytes());
        let result = load(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::DanglingNode(99))));
    }

    #[test]
    fn test_skeleton_and_animation_round_trip() {
        let animation = Animation::new(
            "walk",
            vec![Track {
                bone: 0,
                keyframes: vec![key(0), key(12)],
            }],
        );
        let scene = skeleton_scene(vec![animation]);
        let loaded = load(&mut Cursor::new(bytes(&scene))).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn test_track_bone_out_of_range() {
        let error = track_error(0, 5, 1, &[0, 5]);
        assert!(matches!(
            error,
            CodecError::BadTrack { track: 0, reason, .. } if reason == "bone index out of range"
        ));
    }

    #[test]
    fn test_track_keys_not_ascending() {
        let error = track_error(0, 5, 0, &[5, 5]);
        assert!(matches!(
            error,
            CodecError::BadTrack { reason, .. } if reason == "keys are not strictly ascending"
        ));
    }

    #[test]
    fn test_track_key_outside_frame_range() {
        let error = track_error(0, 10, 0, &[0, 20]);
        assert!(matches!(
            error,
            CodecError::BadTrack { reason, .. } if reason == "key outside the frame range"
        ));
    }
}
