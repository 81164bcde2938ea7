use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Seek, Write},
    path::Path,
};

use glam::{Mat4, Vec4};
use log::{debug, warn};

use crate::{
    animation::{Animation, Playback},
    codec::{self, CodecError},
    loader::{ImportContext, ImportOptions, SceneSource},
    material::{Material, MaterialId},
    node::{Node, NodeId, NodeKind, NodeTree},
    skin::Skeleton,
};

#[derive(Debug)]
pub enum SceneError {
    /// The scene already holds data.
    AlreadyLoaded,
    Io(io::Error),
    Codec(CodecError),
}

impl Display for SceneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::AlreadyLoaded => write!(f, "Scene is already loaded"),
            SceneError::Io(io) => Display::fmt(io, f),
            SceneError::Codec(codec) => Display::fmt(codec, f),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::AlreadyLoaded => None,
            SceneError::Io(io) => Some(io),
            SceneError::Codec(codec) => Some(codec),
        }
    }
}

impl From<io::Error> for SceneError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CodecError> for SceneError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Imported or restored model.
///
/// Meshes, lights, cameras, materials and animations are registered by
/// name. Lookups by index follow the lexicographic order of those names;
/// skeletons keep the order they were added in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    ambient_light: Vec4,
    nodes: NodeTree,
    materials: Vec<Material>,
    material_names: BTreeMap<String, MaterialId>,
    meshes: BTreeMap<String, NodeId>,
    lights: BTreeMap<String, NodeId>,
    cameras: BTreeMap<String, NodeId>,
    skeletons: Vec<Skeleton>,
    animations: BTreeMap<String, Animation>,
}

fn register<T>(registry: &mut BTreeMap<String, T>, kind: &str, name: &str, value: T) {
    if registry.insert(name.to_string(), value).is_some() {
        warn!("Duplicate {} name {:?}, the later one is registered", kind, name);
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a scene and build its name registries.
    pub(crate) fn from_parts(
        ambient_light: Vec4,
        nodes: NodeTree,
        materials: Vec<Material>,
        skeletons: Vec<Skeleton>,
        animations: Vec<Animation>,
    ) -> Self {
        let mut scene = Self {
            ambient_light,
            nodes,
            materials,
            skeletons,
            ..Default::default()
        };
        for (index, material) in scene.materials.iter().enumerate() {
            register(
                &mut scene.material_names,
                "material",
                material.name(),
                MaterialId(index),
            );
        }
        for id in scene.nodes.pre_order() {
            let node = &scene.nodes[id];
            let registry = match node.kind() {
                NodeKind::Plain => continue,
                NodeKind::Mesh(_) => (&mut scene.meshes, "mesh"),
                NodeKind::Light(_) => (&mut scene.lights, "light"),
                NodeKind::Camera(_) => (&mut scene.cameras, "camera"),
            };
            register(registry.0, registry.1, node.name(), id);
        }
        for animation in animations {
            let name = animation.name().to_string();
            register(&mut scene.animations, "animation", &name, animation);
        }
        debug!(
            "Scene with {} nodes, {} meshes, {} materials, {} skeletons, {} animations",
            scene.nodes.len(),
            scene.meshes.len(),
            scene.materials.len(),
            scene.skeletons.len(),
            scene.animations.len()
        );
        scene
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.materials.is_empty()
            && self.skeletons.is_empty()
            && self.animations.is_empty()
    }

    /// Drop everything and return to the empty state.
    pub fn unload(&mut self) {
        *self = Self::default();
    }

    /// Build the scene from an import source. The scene must be empty.
    pub fn import(
        &mut self,
        source: &dyn SceneSource,
        options: ImportOptions,
    ) -> Result<(), SceneError> {
        if !self.is_empty() {
            return Err(SceneError::AlreadyLoaded);
        }
        *self = ImportContext::new(options).build(source);
        Ok(())
    }

    pub fn save<W: Write + Seek>(&self, writer: &mut W) -> Result<(), SceneError> {
        codec::save(self, writer)?;
        Ok(())
    }

    /// Restore a saved scene. On failure the scene stays empty.
    pub fn load<R: Read + Seek>(&mut self, reader: &mut R) -> Result<(), SceneError> {
        if !self.is_empty() {
            return Err(SceneError::AlreadyLoaded);
        }
        *self = codec::load(reader)?;
        Ok(())
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        if !self.is_empty() {
            return Err(SceneError::AlreadyLoaded);
        }
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader)
    }

    pub fn ambient_light(&self) -> Vec4 {
        self.ambient_light
    }

    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.root().map(|root| &self.nodes[root])
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn material_count(&self) -> usize {
        self.material_names.len()
    }

    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&Node> {
        self.meshes.get(name).map(|id| &self.nodes[*id])
    }

    pub fn mesh_by_index(&self, index: usize) -> Option<&Node> {
        self.meshes.values().nth(index).map(|id| &self.nodes[*id])
    }

    pub fn light_by_name(&self, name: &str) -> Option<&Node> {
        self.lights.get(name).map(|id| &self.nodes[*id])
    }

    pub fn light_by_index(&self, index: usize) -> Option<&Node> {
        self.lights.values().nth(index).map(|id| &self.nodes[*id])
    }

    pub fn camera_by_name(&self, name: &str) -> Option<&Node> {
        self.cameras.get(name).map(|id| &self.nodes[*id])
    }

    pub fn camera_by_index(&self, index: usize) -> Option<&Node> {
        self.cameras.values().nth(index).map(|id| &self.nodes[*id])
    }

    /// Every material, including ones whose name was registered twice.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        self.material_names
            .get(name)
            .and_then(|id| self.materials.get(id.0))
    }

    pub fn material_by_index(&self, index: usize) -> Option<&Material> {
        self.material_names
            .values()
            .nth(index)
            .and_then(|id| self.materials.get(id.0))
    }

    /// Mutable access, used by runtimes to assign texture handles.
    pub fn material_mut(&mut self, name: &str) -> Option<&mut Material> {
        let id = *self.material_names.get(name)?;
        self.materials.get_mut(id.0)
    }

    pub fn skeletons(&self) -> &[Skeleton] {
        &self.skeletons
    }

    pub fn skeleton_by_index(&self, index: usize) -> Option<&Skeleton> {
        self.skeletons.get(index)
    }

    pub fn animation_by_name(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    pub fn animation_by_index(&self, index: usize) -> Option<&Animation> {
        self.animations.values().nth(index)
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }

    /// Sample a skeleton and return its skinning matrices.
    ///
    /// An unknown animation name evaluates the skeleton without animation.
    pub fn evaluate_skeleton(
        &mut self,
        index: usize,
        animation: Option<&str>,
        time: f32,
        playback: Playback,
        fps: f32,
    ) -> Option<&[Mat4]> {
        let animation = animation.and_then(|name| {
            let found = self.animations.get(name);
            if found.is_none() {
                warn!("No animation named {:?}", name);
            }
            found
        });
        let skeleton = self.skeletons.get_mut(index)?;
        skeleton.evaluate(&mut self.nodes, animation, time, playback, fps);
        Some(skeleton.bones())
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec4};

    use crate::{
        light::LightData,
        material::Material,
        mesh::MeshData,
        node::{NodeKind, NodeTree},
    };

    use super::{Scene, SceneError};

    fn scene() -> Scene {
        let mut nodes = NodeTree::with_root("root", Mat4::IDENTITY);
        let root = nodes.root().unwrap();
        for name in ["zeta", "alpha", "alpha"] {
            nodes
                .add_child(root, name, NodeKind::Mesh(MeshData::default()), Mat4::IDENTITY)
                .unwrap();
        }
        nodes
            .add_child(root, "sun", NodeKind::Light(LightData::default()), Mat4::IDENTITY)
            .unwrap();
        let materials = vec![Material::new("b"), Material::new("a")];
        Scene::from_parts(Vec4::ONE, nodes, materials, Vec::new(), Vec::new())
    }

    #[test]
    fn test_registries_are_lexicographic() {
        let scene = scene();
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.mesh_by_index(0).unwrap().name(), "alpha");
        assert_eq!(scene.mesh_by_index(1).unwrap().name(), "zeta");
        assert!(scene.mesh_by_index(2).is_none());
        assert_eq!(scene.material_by_index(0).unwrap().name(), "a");
        assert_eq!(scene.light_count(), 1);
        assert_eq!(scene.camera_count(), 0);
        assert!(scene.light_by_name("sun").unwrap().as_light().is_some());
    }

    #[test]
    fn test_duplicate_name_keeps_later_node() {
        let scene = scene();
        let alpha = scene.mesh_by_name("alpha").unwrap();
        let later = scene.nodes().iter().filter(|(_, node)| node.name() == "alpha").last();
        assert!(std::ptr::eq(alpha, later.unwrap().1));
    }

    #[test]
    fn test_unload_and_preconditions() {
        let mut scene = scene();
        assert!(!scene.is_empty());
        let mut buffer = std::io::Cursor::new(Vec::new());
        assert!(matches!(
            scene.load(&mut buffer),
            Err(SceneError::AlreadyLoaded)
        ));
        scene.unload();
        assert!(scene.is_empty());
        assert_eq!(scene, Scene::new());
    }

    #[test]
    fn test_material_mut() {
        let mut scene = scene();
        scene.material_mut("a").unwrap().textures[0].handle = 4;
        assert_eq!(scene.material_by_name("a").unwrap().textures[0].handle, 4);
        assert!(scene.material_mut("missing").is_none());
    }
}
