use std::collections::{BTreeSet, HashMap};

use glam::{Mat4, Vec3, Vec4};
use log::{debug, trace, warn};

use crate::{
    animation::{Animation, KeyFrame, Track, DEFAULT_FPS},
    bounded_name,
    camera::CameraData,
    light::{LightData, LightKind},
    loader::{
        AttributeType, LayerElement, MeshSource, SceneSource, ShadingModel, SourceCamera,
        SourceLight, SourceMaterial, SourceNode,
    },
    material::{Material, MaterialId},
    mesh::{MeshData, Vertex},
    node::{DecomposedTransform, NodeId, NodeKind, NodeTree, AXIS_FLIP},
    scene::Scene,
    skin::{bind_poses, bind_skin, BoneIndexMap, Skeleton},
    tangent::build_tangents,
    weld::WelderKind,
};

/// Corners of a polygon that take part in triangulation.
const MAX_POLYGON_CORNERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    pub welder: WelderKind,
    /// Frame rate used to turn curve frames into evaluation times.
    pub fps: f32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            welder: WelderKind::default(),
            fps: DEFAULT_FPS,
        }
    }
}

/// State threaded through one import.
#[derive(Debug, Default)]
pub struct ImportContext {
    options: ImportOptions,
    bones: BoneIndexMap,
    bone_names: Vec<String>,
    bone_nodes: Vec<NodeId>,
    materials: Vec<Material>,
    material_names: HashMap<String, MaterialId>,
}

// Depth-first pre-order over the source tree, without recursion.
fn walk<'a>(
    roots: Vec<&'a dyn SourceNode>,
    mut visit: impl FnMut(&'a dyn SourceNode),
) {
    let mut stack: Vec<&dyn SourceNode> = roots.into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        visit(node);
        stack.extend(node.children().into_iter().rev());
    }
}

fn supported_layer<'a, T: Copy>(
    layer: Option<&'a LayerElement<T>>,
    kind: &str,
) -> Option<&'a LayerElement<T>> {
    let layer = layer?;
    if !layer.is_supported() {
        warn!(
            "Unsupported {} layer mapping {:?} with reference {:?}",
            kind, layer.mapping, layer.reference
        );
        return None;
    }
    Some(layer)
}

impl ImportContext {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn bones(&self) -> &BoneIndexMap {
        &self.bones
    }

    pub fn build(mut self, source: &dyn SceneSource) -> Scene {
        walk(source.root_nodes(), |node| {
            if node.attribute() == AttributeType::SkeletonJoint {
                self.bones.insert(node.name());
                self.bone_names.push(node.name().to_string());
            }
        });
        debug!("Found {} joints", self.bones.len());

        let mut nodes = NodeTree::with_root("root", AXIS_FLIP);
        let mut stack: Vec<(&dyn SourceNode, NodeId)> = source
            .root_nodes()
            .into_iter()
            .rev()
            .map(|node| (node, NodeId::ROOT))
            .collect();
        while let Some((node, parent)) = stack.pop() {
            let kind = self.extract_kind(node);
            let Some(id) = nodes.add_child(parent, node.name(), kind, node.local_transform())
            else {
                continue;
            };
            trace!("Add node {:?} as {}", node.name(), id);
            if node.attribute() == AttributeType::SkeletonJoint {
                self.bone_nodes.push(id);
            }
            stack.extend(node.children().into_iter().rev().map(|child| (child, id)));
        }

        let skeletons = self.extract_skeleton(source, &nodes).into_iter().collect::<Vec<_>>();
        let animations = if skeletons.is_empty() {
            Vec::new()
        } else {
            self.extract_animations(source)
        };
        Scene::from_parts(
            source.ambient_light(),
            nodes,
            self.materials,
            skeletons,
            animations,
        )
    }

    fn extract_kind(&mut self, node: &dyn SourceNode) -> NodeKind {
        match node.attribute() {
            AttributeType::Mesh => match node.mesh() {
                Some(mesh) => NodeKind::Mesh(self.extract_mesh(node.name(), mesh)),
                None => {
                    warn!("Mesh node {:?} has no mesh", node.name());
                    NodeKind::Plain
                }
            },
            AttributeType::Light => match node.light() {
                Some(light) => NodeKind::Light(convert_light(node.name(), &light)),
                None => {
                    warn!("Light node {:?} has no light", node.name());
                    NodeKind::Plain
                }
            },
            AttributeType::Camera => match node.camera() {
                Some(camera) => NodeKind::Camera(convert_camera(&camera)),
                None => {
                    warn!("Camera node {:?} has no camera", node.name());
                    NodeKind::Plain
                }
            },
            AttributeType::SkeletonJoint | AttributeType::None | AttributeType::Other => {
                NodeKind::Plain
            }
        }
    }

    fn extract_mesh(&mut self, name: &str, mesh: &dyn MeshSource) -> MeshData {
        let mut welder = self.options.welder.create();
        let control_points = mesh.control_points();
        let colors = supported_layer(mesh.color_layer(0), "color");
        let normals = supported_layer(mesh.normal_layer(0), "normal");
        let uvs = supported_layer(mesh.uv_layer(0), "uv");
        let uvs2 = supported_layer(mesh.uv_layer(1), "uv");

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut polygon_vertex = 0;
        for polygon in 0..mesh.polygon_count() {
            let size = mesh.polygon_size(polygon);
            if size < 3 {
                warn!(
                    "Skip polygon {} of mesh {:?} with {} corners",
                    polygon, name, size
                );
                polygon_vertex += size;
                continue;
            }
            let used = size.min(MAX_POLYGON_CORNERS);
            let mut corners = [0u32; MAX_POLYGON_CORNERS];
            for (corner, slot) in corners.iter_mut().enumerate().take(used) {
                let control_point = mesh.polygon_vertex(polygon, corner);
                let point = usize::try_from(control_point).unwrap_or(usize::MAX);
                let mut vertex = Vertex {
                    control_point,
                    ..Default::default()
                };
                match control_points.get(point) {
                    Some(position) => vertex.position = position.to_array(),
                    None => debug!(
                        "Control point {} of mesh {:?} out of range",
                        control_point, name
                    ),
                }
                if let Some(color) = colors.and_then(|layer| layer.resolve(point, polygon_vertex)) {
                    vertex.color = color.to_array();
                }
                if let Some(normal) = normals.and_then(|layer| layer.resolve(point, polygon_vertex))
                {
                    vertex.normal = normal.to_array();
                }
                if let Some(uv) = uvs.and_then(|layer| layer.resolve(point, polygon_vertex)) {
                    vertex.uv = uv.to_array();
                }
                if let Some(uv) = uvs2.and_then(|layer| layer.resolve(point, polygon_vertex)) {
                    vertex.uv2 = uv.to_array();
                }
                *slot = welder.weld(&mut vertices, vertex);
                polygon_vertex += 1;
            }
            polygon_vertex += size - used;
            indices.extend_from_slice(&[corners[0], corners[1], corners[2]]);
            if used == MAX_POLYGON_CORNERS {
                indices.extend_from_slice(&[corners[0], corners[2], corners[3]]);
            }
        }

        build_tangents(&mut vertices, &indices);
        bind_skin(&mut vertices, &mesh.skin_clusters(), &self.bones);
        let material = mesh.material().map(|material| self.material(&material));
        debug!(
            "Mesh {:?} with {} vertices and {} indices",
            name,
            vertices.len(),
            indices.len()
        );
        MeshData {
            material,
            vertices,
            indices,
        }
    }

    /// Find a material by name, converting it on first use.
    fn material(&mut self, source: &SourceMaterial) -> MaterialId {
        let name = bounded_name(&source.name);
        if let Some(id) = self.material_names.get(&name) {
            return *id;
        }
        let id = MaterialId(self.materials.len());
        self.materials.push(convert_material(source));
        self.material_names.insert(name, id);
        id
    }

    fn extract_skeleton(&self, source: &dyn SceneSource, nodes: &NodeTree) -> Option<Skeleton> {
        if self.bone_nodes.is_empty() {
            return None;
        }
        let poses = source.poses();
        let bind_poses = bind_poses(self.bone_names.iter().map(String::as_str), &poses);
        let bones = self
            .bone_nodes
            .iter()
            .map(|id| *nodes[*id].local_transform())
            .collect();
        debug!("Skeleton with {} bones", self.bone_nodes.len());
        Some(Skeleton::new(self.bone_nodes.clone(), bind_poses, bones))
    }

    fn extract_animations(&self, source: &dyn SceneSource) -> Vec<Animation> {
        let fps = self.options.fps;
        let mut animations = Vec::new();
        for (stack, info) in source.animation_stacks().iter().enumerate() {
            let mut tracks = Vec::new();
            for layer in 0..info.layer_count {
                walk(source.root_nodes(), |node| {
                    let Some(bone) = self.bones.get(node.name()) else {
                        return;
                    };
                    let Some(curves) = node.transform_curves(stack, layer) else {
                        return;
                    };
                    let frames: BTreeSet<u32> = curves.frames().collect();
                    if frames.is_empty() {
                        return;
                    }
                    let keyframes = frames
                        .into_iter()
                        .map(|key| {
                            let transform = DecomposedTransform::from(
                                node.local_transform_at(key as f32 / fps),
                            );
                            KeyFrame {
                                key,
                                rotation: transform.rotation,
                                translation: transform.translation,
                                scale: transform.scale,
                            }
                        })
                        .collect();
                    tracks.push(Track { bone, keyframes });
                });
            }
            let animation = Animation::new(&info.name, tracks);
            debug!(
                "Animation {:?} with {} tracks, frames {}..={}",
                animation.name(),
                animation.tracks().len(),
                animation.start_frame(),
                animation.end_frame()
            );
            animations.push(animation);
        }
        animations
    }
}

fn convert_material(source: &SourceMaterial) -> Material {
    let mut material = Material::new(&source.name);
    match source.shading {
        ShadingModel::Phong {
            ambient,
            ambient_factor,
            diffuse,
            transparency,
            specular,
            shininess,
            emissive,
            emissive_factor,
        } => {
            material.ambient = ambient.extend(ambient_factor);
            material.diffuse = diffuse.extend(1.0 - transparency);
            material.specular = specular.extend(shininess);
            material.emissive = emissive.extend(emissive_factor);
        }
        ShadingModel::Lambert {
            ambient,
            ambient_factor,
            diffuse,
            transparency,
            emissive,
            emissive_factor,
        } => {
            material.ambient = ambient.extend(ambient_factor);
            material.diffuse = diffuse.extend(1.0 - transparency);
            material.specular = Vec4::ZERO;
            material.emissive = emissive.extend(emissive_factor);
        }
        ShadingModel::HardwareShader => {
            warn!("Unsupported hardware shader material {:?}", source.name);
        }
        ShadingModel::Unknown => {
            warn!("Unknown type of material {:?}", source.name);
        }
    }
    for (kind, path) in &source.textures {
        material.set_texture_file(*kind, path);
    }
    material
}

fn convert_light(name: &str, light: &SourceLight) -> LightData {
    let kind = LightKind::from_u32(light.light_type).unwrap_or_else(|| {
        warn!(
            "Unknown type {} of light {:?}, using point",
            light.light_type, name
        );
        LightKind::Point
    });
    let attenuation = match light.decay_type {
        0 => Vec4::X,
        1 => Vec4::Y,
        2 => Vec4::Z,
        other => {
            warn!(
                "Unsupported decay type {} of light {:?}, using constant",
                other, name
            );
            Vec4::X
        }
    };
    LightData {
        kind,
        on: light.cast_light,
        color: light.color.extend(light.intensity),
        inner_angle: light.inner_angle.to_radians(),
        outer_angle: light.outer_angle.to_radians(),
        attenuation,
    }
}

fn convert_camera(camera: &SourceCamera) -> CameraData {
    let fov = if camera.orthographic {
        0.0
    } else {
        camera.field_of_view.to_radians()
    };
    let aspect = if camera.window_size_aspect || camera.aspect_height == 0.0 {
        0.0
    } else {
        camera.aspect_width / camera.aspect_height
    };
    let target = camera.target_position.unwrap_or(camera.interest_position);
    let up = camera
        .target_up_position
        .unwrap_or(camera.up_vector)
        .try_normalize()
        .unwrap_or(Vec3::Y);
    CameraData {
        aspect,
        fov,
        near: camera.near,
        far: camera.far,
        view: Mat4::look_at_rh(camera.position, target, up),
    }
}
