use std::ops::{Add, Mul};

use glam::{Mat4, Quat, Vec3};
use log::{trace, warn};

use crate::{
    bounded_name,
    node::{DecomposedTransform, NodeTree, AXIS_FLIP},
    skin::Skeleton,
};

/// Frame rate assumed when none is configured.
pub const DEFAULT_FPS: f32 = 24.0;

// Below this sin(halfTheta) the slerp ratios are unstable.
const SLERP_LIMIT: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    pub key: u32,
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

impl KeyFrame {
    pub fn transform(&self) -> DecomposedTransform {
        DecomposedTransform {
            translation: self.translation,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    /// Index into the skeleton's bones.
    pub bone: u32,
    /// Sorted by key, keys unique.
    pub keyframes: Vec<KeyFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    name: String,
    start_frame: u32,
    end_frame: u32,
    tracks: Vec<Track>,
}

impl Animation {
    /// Build an animation whose frame range covers every key of `tracks`.
    pub fn new(name: &str, tracks: Vec<Track>) -> Self {
        let keys = || {
            tracks
                .iter()
                .flat_map(|track| track.keyframes.iter().map(|keyframe| keyframe.key))
        };
        let start_frame = keys().min().unwrap_or(0);
        let end_frame = keys().max().unwrap_or(0);
        Self {
            name: bounded_name(name),
            start_frame,
            end_frame,
            tracks,
        }
    }

    /// Restore an animation with a stored frame range.
    pub(crate) fn from_parts(
        name: &str,
        start_frame: u32,
        end_frame: u32,
        tracks: Vec<Track>,
    ) -> Self {
        Self {
            name: bounded_name(name),
            start_frame,
            end_frame,
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> u32 {
        self.end_frame
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Length in seconds.
    pub fn duration(&self, fps: f32) -> f32 {
        (self.end_frame as f32 - self.start_frame as f32) / fps
    }

    /// Time in seconds of a frame key, relative to the first frame.
    pub fn time_of(&self, key: u32, fps: f32) -> f32 {
        (key as f32 - self.start_frame as f32) / fps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    Loop,
    #[default]
    Clamp,
}

pub trait Interpolate {
    fn linear(a: Self, b: Self, t: f32) -> Self;
}

impl<T> Interpolate for T
where
    T: Mul<f32, Output = T> + Add<T, Output = T>,
{
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a * (1.0 - t) + b * t
    }
}

/// Spherical interpolation on the raw dot product of `a` and `b`.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let cos_half_theta = a.dot(b);
    if cos_half_theta.abs() >= 1.0 {
        return a;
    }
    let half_theta = cos_half_theta.acos();
    let sin_half_theta = half_theta.sin();
    let result = if sin_half_theta.abs() < SLERP_LIMIT {
        (a + b) * 0.5
    } else {
        let ratio_a = ((1.0 - t) * half_theta).sin() / sin_half_theta;
        let ratio_b = (t * half_theta).sin() / sin_half_theta;
        a * ratio_a + b * ratio_b
    };
    result.normalize()
}

/// Time inside the animation that `time` maps to.
pub fn frame_time(duration: f32, time: f32, playback: Playback) -> f32 {
    if duration.is_nan() || duration <= 0.0 {
        return 0.0;
    }
    match playback {
        Playback::Loop => (time % duration).max(0.0),
        Playback::Clamp => time.clamp(0.0, duration),
    }
}

impl Skeleton {
    /// Pose the bones for `time` and rebuild every skinning matrix.
    ///
    /// Without an animation the node transforms are left alone and only the
    /// skinning matrices are recomputed. With one, only bones a track moved
    /// and the bones below them get new global transforms.
    pub fn evaluate(
        &mut self,
        nodes: &mut NodeTree,
        animation: Option<&Animation>,
        time: f32,
        playback: Playback,
        fps: f32,
    ) {
        if let Some(animation) = animation {
            self.apply(nodes, animation, time, playback, fps);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(node) = nodes.get(*node) else {
                continue;
            };
            self.bones[index] = self.bind_poses[index] * *node.global_transform() * AXIS_FLIP;
        }
    }

    fn apply(
        &self,
        nodes: &mut NodeTree,
        animation: &Animation,
        time: f32,
        playback: Playback,
        fps: f32,
    ) {
        let frame_time = frame_time(animation.duration(fps), time, playback);
        // The float offset can round past the last frame on long ranges.
        let offset = (frame_time * fps).floor() as u32;
        let frame = animation
            .start_frame
            .saturating_add(offset)
            .min(animation.end_frame);
        trace!(
            "Sample {:?} at {}s, frame {}",
            animation.name,
            frame_time,
            frame
        );

        let mut dirty = vec![false; nodes.len()];
        for track in &animation.tracks {
            let Some(node) = self.nodes.get(track.bone as usize).copied() else {
                warn!(
                    "Track of {:?} targets missing bone {}",
                    animation.name, track.bone
                );
                continue;
            };
            let Some(pair) = track
                .keyframes
                .windows(2)
                .find(|pair| pair[0].key <= frame && frame <= pair[1].key)
            else {
                continue;
            };
            let (from, to) = (&pair[0], &pair[1]);
            let from_time = animation.time_of(from.key, fps);
            let span = animation.time_of(to.key, fps) - from_time;
            let t = if span > 0.0 {
                ((frame_time - from_time) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let transform = DecomposedTransform {
                translation: Vec3::linear(from.translation, to.translation, t),
                rotation: slerp(from.rotation, to.rotation, t),
                scale: Vec3::linear(from.scale, to.scale, t),
            };
            nodes.set_local_transform(node, Mat4::from(transform));
            if let Some(flag) = dirty.get_mut(node.index()) {
                *flag = true;
            }
        }

        // Bones are in pre-order, so an updated parent is refreshed before
        // the bones below it.
        for node in &self.nodes {
            let parent_dirty = nodes
                .get(*node)
                .and_then(|node| node.parent())
                .is_some_and(|parent| dirty.get(parent.index()).copied().unwrap_or(false));
            let Some(flag) = dirty.get_mut(node.index()) else {
                continue;
            };
            if *flag || parent_dirty {
                *flag = true;
                nodes.update_global_transform(*node);
            }
        }
    }
}
