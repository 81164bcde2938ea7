use std::fmt::{self, Display, Formatter};

use glam::Vec4;
use log::warn;

use crate::{bounded_name, NAME_CAPACITY};

/// Number of texture slots a material carries.
pub const TEXTURE_SLOT_COUNT: usize = 8;

/// Index of a material inside the scene's material arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Texture slots, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    Diffuse = 0,
    Ambient = 1,
    Glow = 2,
    Specular = 3,
    Gloss = 4,
    Normal = 5,
    Alpha = 6,
    Displacement = 7,
}

impl TextureType {
    pub const ALL: [TextureType; TEXTURE_SLOT_COUNT] = [
        TextureType::Diffuse,
        TextureType::Ambient,
        TextureType::Glow,
        TextureType::Specular,
        TextureType::Gloss,
        TextureType::Normal,
        TextureType::Alpha,
        TextureType::Displacement,
    ];

    pub fn slot(self) -> usize {
        self as usize
    }
}

impl Display for TextureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureType::Diffuse => "diffuse",
            TextureType::Ambient => "ambient",
            TextureType::Glow => "glow",
            TextureType::Specular => "specular",
            TextureType::Gloss => "gloss",
            TextureType::Normal => "normal",
            TextureType::Alpha => "alpha",
            TextureType::Displacement => "displacement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureSlot {
    /// File name without directory, empty when the slot is unused.
    pub file_name: String,
    /// Assigned by the runtime once the texture is uploaded.
    pub handle: u32,
}

impl TextureSlot {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_empty()
    }
}

/// Remove everything up to the last `/` or `\`.
pub fn strip_directory(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(position) => &path[position + 1..],
        None => path,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    /// RGB with the ambient factor in w.
    pub ambient: Vec4,
    /// RGB with opacity in w.
    pub diffuse: Vec4,
    /// RGB with shininess in w.
    pub specular: Vec4,
    /// RGB with the emissive factor in w.
    pub emissive: Vec4,
    pub textures: [TextureSlot; TEXTURE_SLOT_COUNT],
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: bounded_name(name),
            ambient: Vec4::ZERO,
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            emissive: Vec4::ZERO,
            textures: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self, kind: TextureType) -> &TextureSlot {
        &self.textures[kind.slot()]
    }

    pub fn set_texture_handle(&mut self, kind: TextureType, handle: u32) {
        self.textures[kind.slot()].handle = handle;
    }

    /// Store the file name of `path` in the slot for `kind`.
    ///
    /// Names that would not fit the on-disk buffer leave the slot empty.
    pub fn set_texture_file(&mut self, kind: TextureType, path: &str) {
        let file_name = strip_directory(path);
        let slot = &mut self.textures[kind.slot()];
        if file_name.len() >= NAME_CAPACITY {
            warn!(
                "Texture name for {} slot of material {:?} is too long: {:?}",
                kind, self.name, file_name
            );
            slot.file_name.clear();
            return;
        }
        slot.file_name = file_name.to_string();
    }
}

#[cfg(test)]
mod test {
    use glam::Vec4;

    use crate::NAME_CAPACITY;

    use super::{strip_directory, Material, TextureType};

    #[test]
    fn test_strip_directory() {
        assert_eq!(strip_directory("C:\\textures\\wood.png"), "wood.png");
        assert_eq!(strip_directory("/tmp/skin/face.tga"), "face.tga");
        assert_eq!(strip_directory("plain.dds"), "plain.dds");
        assert_eq!(strip_directory("dir/"), "");
    }

    #[test]
    fn test_material_defaults() {
        let material = Material::new("cloth");
        assert_eq!(material.ambient, Vec4::ZERO);
        assert_eq!(material.diffuse, Vec4::ONE);
        assert_eq!(material.specular, Vec4::ONE);
        assert_eq!(material.emissive, Vec4::ZERO);
        assert!(material.textures.iter().all(|slot| slot.is_empty()));
    }

    #[test]
    fn test_texture_names() {
        let mut material = Material::new("cloth");
        material.set_texture_file(TextureType::Normal, "maps/cloth_n.png");
        assert_eq!(material.texture(TextureType::Normal).file_name, "cloth_n.png");

        let long = "a".repeat(NAME_CAPACITY);
        material.set_texture_file(TextureType::Normal, &long);
        assert!(material.texture(TextureType::Normal).is_empty());

        material.set_texture_handle(TextureType::Diffuse, 9);
        assert_eq!(material.texture(TextureType::Diffuse).handle, 9);
    }
}
