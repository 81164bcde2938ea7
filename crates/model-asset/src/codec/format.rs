use std::array;

use binrw::{BinRead, BinWrite};
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::{
    animation::KeyFrame,
    camera::CameraData,
    light::LightData,
    material::{Material, TextureSlot, TEXTURE_SLOT_COUNT},
    mesh::{Vertex, MAX_BONE_INFLUENCES},
    NAME_CAPACITY,
};

/// Zero padded name buffer.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FixedName(pub [u8; NAME_CAPACITY]);

impl FixedName {
    /// Names longer than the buffer are cut, keeping the terminating zero.
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; NAME_CAPACITY];
        let length = name.len().min(NAME_CAPACITY - 1);
        bytes[..length].copy_from_slice(&name.as_bytes()[..length]);
        Self(bytes)
    }

    pub fn to_string_lossy(&self) -> String {
        let end = self.0.iter().position(|byte| *byte == 0).unwrap_or(NAME_CAPACITY);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct MaterialRecord {
    pub name: FixedName,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub texture_names: [FixedName; TEXTURE_SLOT_COUNT],
    pub texture_handles: [u32; TEXTURE_SLOT_COUNT],
}

impl From<&Material> for MaterialRecord {
    fn from(value: &Material) -> Self {
        Self {
            name: FixedName::new(value.name()),
            ambient: value.ambient.to_array(),
            diffuse: value.diffuse.to_array(),
            specular: value.specular.to_array(),
            emissive: value.emissive.to_array(),
            texture_names: array::from_fn(|slot| FixedName::new(&value.textures[slot].file_name)),
            texture_handles: array::from_fn(|slot| value.textures[slot].handle),
        }
    }
}

impl From<MaterialRecord> for Material {
    fn from(value: MaterialRecord) -> Self {
        let mut material = Material::new(&value.name.to_string_lossy());
        material.ambient = Vec4::from_array(value.ambient);
        material.diffuse = Vec4::from_array(value.diffuse);
        material.specular = Vec4::from_array(value.specular);
        material.emissive = Vec4::from_array(value.emissive);
        for (slot, (name, handle)) in material
            .textures
            .iter_mut()
            .zip(value.texture_names.iter().zip(value.texture_handles))
        {
            *slot = TextureSlot {
                file_name: name.to_string_lossy(),
                handle,
            };
        }
        material
    }
}

#[derive(Debug, Clone, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct NodeHeader {
    pub token: u32,
    pub kind: u32,
    pub name: FixedName,
    pub parent: u32,
    pub local_transform: [f32; 16],
    pub global_transform: [f32; 16],
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub bitangent: [f32; 3],
    pub bone_indices: [u32; MAX_BONE_INFLUENCES],
    pub bone_weights: [f32; MAX_BONE_INFLUENCES],
    pub uv: [f32; 2],
    pub uv2: [f32; 2],
}

impl From<&Vertex> for VertexRecord {
    fn from(value: &Vertex) -> Self {
        Self {
            position: value.position,
            color: value.color,
            normal: value.normal,
            tangent: value.tangent,
            bitangent: value.bitangent,
            bone_indices: value.bone_indices,
            bone_weights: value.bone_weights,
            uv: value.uv,
            uv2: value.uv2,
        }
    }
}

impl From<VertexRecord> for Vertex {
    fn from(value: VertexRecord) -> Self {
        Self {
            position: value.position,
            color: value.color,
            normal: value.normal,
            tangent: value.tangent,
            bitangent: value.bitangent,
            bone_indices: value.bone_indices,
            bone_weights: value.bone_weights,
            uv: value.uv,
            uv2: value.uv2,
            control_point: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct LightRecord {
    pub kind: u32,
    pub on: u32,
    pub color: [f32; 4],
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub attenuation: [f32; 4],
}

impl From<&LightData> for LightRecord {
    fn from(value: &LightData) -> Self {
        Self {
            kind: value.kind.as_u32(),
            on: value.on as u32,
            color: value.color.to_array(),
            inner_angle: value.inner_angle,
            outer_angle: value.outer_angle,
            attenuation: value.attenuation.to_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct CameraRecord {
    pub aspect: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub view: [f32; 16],
}

impl From<&CameraData> for CameraRecord {
    fn from(value: &CameraData) -> Self {
        Self {
            aspect: value.aspect,
            fov: value.fov,
            near: value.near,
            far: value.far,
            view: value.view.to_cols_array(),
        }
    }
}

impl From<CameraRecord> for CameraData {
    fn from(value: CameraRecord) -> Self {
        Self {
            aspect: value.aspect,
            fov: value.fov,
            near: value.near,
            far: value.far,
            view: Mat4::from_cols_array(&value.view),
        }
    }
}

#[derive(Debug, Clone, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct AnimationHeader {
    pub name: FixedName,
    pub start_frame: u32,
    pub end_frame: u32,
    pub track_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct TrackHeader {
    pub bone: u32,
    pub keyframe_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct KeyFrameRecord {
    pub key: u32,
    pub rotation: [f32; 4],
    /// w is always 0.
    pub translation: [f32; 4],
    /// w is always 0.
    pub scale: [f32; 4],
}

impl From<&KeyFrame> for KeyFrameRecord {
    fn from(value: &KeyFrame) -> Self {
        Self {
            key: value.key,
            rotation: value.rotation.to_array(),
            translation: value.translation.extend(0.0).to_array(),
            scale: value.scale.extend(0.0).to_array(),
        }
    }
}

impl From<KeyFrameRecord> for KeyFrame {
    fn from(value: KeyFrameRecord) -> Self {
        Self {
            key: value.key,
            rotation: Quat::from_array(value.rotation),
            translation: Vec3::from_slice(&value.translation[..3]),
            scale: Vec3::from_slice(&value.scale[..3]),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};

    use crate::{material::Material, NAME_CAPACITY};

    use super::{FixedName, MaterialRecord};

    #[test]
    fn test_fixed_name() {
        let name = FixedName::new("Hips");
        assert_eq!(&name.0[..5], b"Hips\0");
        assert_eq!(name.to_string_lossy(), "Hips");

        let long = FixedName::new(&"x".repeat(NAME_CAPACITY + 10));
        assert_eq!(long.0[NAME_CAPACITY - 1], 0);
        assert_eq!(long.to_string_lossy().len(), NAME_CAPACITY - 1);
    }

    #[test]
    fn test_material_record_size() {
        let record = MaterialRecord::from(&Material::new("cloth"));
        let mut cursor = Cursor::new(Vec::new());
        record.write_le(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), NAME_CAPACITY + 16 * 4 + 8 * NAME_CAPACITY + 8 * 4);

        let read = MaterialRecord::read_le(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(Material::from(read), Material::new("cloth"));
    }
}
