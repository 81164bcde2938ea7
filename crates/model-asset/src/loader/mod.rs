use glam::{Mat4, Vec2, Vec3, Vec4};
use log::debug;

use crate::material::TextureType;

pub mod builder;
pub mod memory;

pub use builder::{ImportContext, ImportOptions};

/// What a source node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeType {
    #[default]
    None,
    Mesh,
    SkeletonJoint,
    Light,
    Camera,
    /// Markers, patches and anything else without a payload.
    Other,
}

/// How layer elements map onto the mesh surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
    ByControlPoint,
    #[default]
    ByPolygonVertex,
    ByPolygon,
    AllSame,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    #[default]
    Direct,
    IndexToDirect,
    Index,
}

/// One attribute layer of a mesh, such as normals or a UV set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerElement<T> {
    pub mapping: MappingMode,
    pub reference: ReferenceMode,
    pub direct: Vec<T>,
    pub index: Vec<i32>,
}

impl<T: Copy> LayerElement<T> {
    pub fn is_supported(&self) -> bool {
        matches!(
            self.mapping,
            MappingMode::ByControlPoint | MappingMode::ByPolygonVertex
        ) && matches!(
            self.reference,
            ReferenceMode::Direct | ReferenceMode::IndexToDirect
        )
    }

    /// Value for a corner, given its control point and running polygon
    /// vertex number. `None` when the modes are unsupported or an index
    /// points outside the layer.
    pub fn resolve(&self, control_point: usize, polygon_vertex: usize) -> Option<T> {
        let slot = match self.mapping {
            MappingMode::ByControlPoint => control_point,
            MappingMode::ByPolygonVertex => polygon_vertex,
            _ => return None,
        };
        let direct_index = match self.reference {
            ReferenceMode::Direct => slot,
            ReferenceMode::IndexToDirect => {
                let Some(index) = self.index.get(slot) else {
                    debug!("Layer index slot {} out of range", slot);
                    return None;
                };
                match usize::try_from(*index) {
                    Ok(index) => index,
                    Err(_) => {
                        debug!("Negative layer index {} at slot {}", index, slot);
                        return None;
                    }
                }
            }
            ReferenceMode::Index => return None,
        };
        let value = self.direct.get(direct_index).copied();
        if value.is_none() {
            debug!("Layer direct index {} out of range", direct_index);
        }
        value
    }
}

/// Influence of one joint over a set of control points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinCluster {
    /// Name of the joint node, `None` when the cluster has no link.
    pub joint: Option<String>,
    pub control_points: Vec<i32>,
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadingModel {
    Phong {
        ambient: Vec3,
        ambient_factor: f32,
        diffuse: Vec3,
        transparency: f32,
        specular: Vec3,
        shininess: f32,
        emissive: Vec3,
        emissive_factor: f32,
    },
    Lambert {
        ambient: Vec3,
        ambient_factor: f32,
        diffuse: Vec3,
        transparency: f32,
        emissive: Vec3,
        emissive_factor: f32,
    },
    HardwareShader,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceMaterial {
    pub name: String,
    pub shading: ShadingModel,
    /// Texture file paths as authored, directories included.
    pub textures: Vec<(TextureType, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceLight {
    /// 0 point, 1 directional, 2 spot.
    pub light_type: u32,
    pub cast_light: bool,
    pub color: Vec3,
    pub intensity: f32,
    /// Degrees.
    pub inner_angle: f32,
    /// Degrees.
    pub outer_angle: f32,
    /// 0 none, 1 linear, 2 quadratic.
    pub decay_type: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCamera {
    pub orthographic: bool,
    /// Degrees.
    pub field_of_view: f32,
    pub aspect_width: f32,
    pub aspect_height: f32,
    /// The viewport decides the aspect ratio.
    pub window_size_aspect: bool,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub interest_position: Vec3,
    pub up_vector: Vec3,
    /// Position of the target node, if any.
    pub target_position: Option<Vec3>,
    /// Position of the target-up node, if any.
    pub target_up_position: Option<Vec3>,
}

/// Bind pose entries, node name to world matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub entries: Vec<(String, Mat4)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationStackInfo {
    pub name: String,
    pub layer_count: usize,
}

/// Key frame numbers of the nine translation, rotation and scale curves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformCurves {
    pub translation: [Vec<u32>; 3],
    pub rotation: [Vec<u32>; 3],
    pub scale: [Vec<u32>; 3],
}

impl TransformCurves {
    pub fn frames(&self) -> impl Iterator<Item = u32> + '_ {
        self.translation
            .iter()
            .chain(&self.rotation)
            .chain(&self.scale)
            .flatten()
            .copied()
    }
}

/// Access to a whole interchange scene.
pub trait SceneSource {
    fn ambient_light(&self) -> Vec4;
    fn root_nodes(&self) -> Vec<&dyn SourceNode>;
    fn poses(&self) -> Vec<Pose>;
    fn animation_stacks(&self) -> Vec<AnimationStackInfo>;
}

pub trait SourceNode {
    fn name(&self) -> &str;
    /// Evaluated local transform at the default time.
    fn local_transform(&self) -> Mat4;
    fn attribute(&self) -> AttributeType;
    fn children(&self) -> Vec<&dyn SourceNode>;

    fn mesh(&self) -> Option<&dyn MeshSource> {
        None
    }

    fn light(&self) -> Option<SourceLight> {
        None
    }

    fn camera(&self) -> Option<SourceCamera> {
        None
    }

    /// Curves of this node on one layer of one animation stack.
    fn transform_curves(&self, _stack: usize, _layer: usize) -> Option<TransformCurves> {
        None
    }

    /// Evaluated local transform at `time` seconds.
    fn local_transform_at(&self, _time: f32) -> Mat4 {
        self.local_transform()
    }
}

pub trait MeshSource {
    fn control_points(&self) -> &[Vec3];
    fn polygon_count(&self) -> usize;
    fn polygon_size(&self, polygon: usize) -> usize;
    /// Control point of one polygon corner.
    fn polygon_vertex(&self, polygon: usize, corner: usize) -> i32;

    fn color_layer(&self, _layer: usize) -> Option<&LayerElement<Vec4>> {
        None
    }

    fn normal_layer(&self, _layer: usize) -> Option<&LayerElement<Vec3>> {
        None
    }

    fn uv_layer(&self, _layer: usize) -> Option<&LayerElement<Vec2>> {
        None
    }

    fn skin_clusters(&self) -> Vec<SkinCluster> {
        Vec::new()
    }

    /// The first material bound to the mesh node.
    fn material(&self) -> Option<SourceMaterial> {
        None
    }
}
