//! Provide a compact scene representation for imported models.
//!
//! This library turns a scene exposed through the [`loader::SceneSource`]
//! accessor contract into a node graph with welded meshes, tangent frames,
//! skin weights, skeletons and keyframe animations. The graph can be
//! persisted to a fixed-layout binary asset and restored without touching
//! the original interchange file, and skeletons can be sampled at any time
//! against the restored graph.
//!
pub mod animation;
pub mod camera;
/// Binary asset format
pub mod codec;
pub mod light;
/// Import sources and the scene builder
pub mod loader;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod skin;
pub mod tangent;
pub mod weld;

/// Capacity in bytes of every fixed-size name buffer in the asset format,
/// including the terminating zero.
pub const NAME_CAPACITY: usize = 260;

/// Truncate a name so it fits a fixed-size buffer with a terminating zero.
pub(crate) fn bounded_name(name: &str) -> String {
    let limit = NAME_CAPACITY - 1;
    if name.len() <= limit {
        return name.to_string();
    }
    let mut end = limit;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

#[cfg(test)]
mod test {
    use super::{bounded_name, NAME_CAPACITY};

    #[test]
    fn test_bounded_name_keeps_short_names() {
        assert_eq!(bounded_name("Hips"), "Hips");
    }

    #[test]
    fn test_bounded_name_truncates_at_char_boundary() {
        let name = "é".repeat(NAME_CAPACITY);
        let bounded = bounded_name(&name);
        assert!(bounded.len() < NAME_CAPACITY);
        assert!(bounded.chars().all(|c| c == 'é'));
    }
}
