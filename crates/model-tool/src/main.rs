use std::{env, path::PathBuf, process};

use glam::Mat4;
use log::{error, info};
use model_asset::{
    animation::{Playback, DEFAULT_FPS},
    node::{NodeId, NodeKind},
    scene::Scene,
};

const USAGE: &str =
    "Usage: model-tool <asset> [--animation <name>] [--time <seconds>] [--clamp] [--fps <n>]";

#[derive(Debug)]
struct Args {
    asset: PathBuf,
    animation: Option<String>,
    time: Option<f32>,
    playback: Playback,
    fps: f32,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut asset = None;
    let mut parsed = Args {
        asset: PathBuf::new(),
        animation: None,
        time: None,
        playback: Playback::Loop,
        fps: DEFAULT_FPS,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--animation" => {
                parsed.animation = Some(args.next().ok_or("--animation needs a name")?);
            }
            "--time" => {
                let value = args.next().ok_or("--time needs a value")?;
                parsed.time = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid time {:?}", value))?,
                );
            }
            "--fps" => {
                let value = args.next().ok_or("--fps needs a value")?;
                let fps: f32 = value
                    .parse()
                    .map_err(|_| format!("Invalid frame rate {:?}", value))?;
                if fps.is_nan() || fps <= 0.0 {
                    return Err(format!("Frame rate must be positive, got {}", fps));
                }
                parsed.fps = fps;
            }
            "--clamp" => parsed.playback = Playback::Clamp,
            _ if asset.is_none() && !arg.starts_with("--") => asset = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument {:?}", arg)),
        }
    }
    parsed.asset = asset.ok_or("Missing asset path")?;
    Ok(parsed)
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Plain => "plain".to_string(),
        NodeKind::Mesh(mesh) => format!(
            "mesh, {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        ),
        NodeKind::Light(light) => format!("{:?} light", light.kind),
        NodeKind::Camera(camera) if camera.is_orthographic() => "orthographic camera".to_string(),
        NodeKind::Camera(camera) => format!("camera, fov {}", camera.fov),
    }
}

fn log_hierarchy(scene: &Scene) {
    let nodes = scene.nodes();
    let mut stack: Vec<(NodeId, usize)> = nodes.root().into_iter().map(|id| (id, 0)).collect();
    while let Some((id, depth)) = stack.pop() {
        let node = &nodes[id];
        info!(
            "{}{} ({})",
            "  ".repeat(depth),
            node.name(),
            describe(node.kind())
        );
        stack.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
    }
}

fn log_scene(scene: &Scene) {
    info!("Ambient light {}", scene.ambient_light());
    log_hierarchy(scene);
    info!(
        "{} meshes, {} lights, {} cameras",
        scene.mesh_count(),
        scene.light_count(),
        scene.camera_count()
    );
    for material in scene.materials() {
        let textures = material
            .textures
            .iter()
            .filter(|slot| !slot.is_empty())
            .map(|slot| slot.file_name.as_str())
            .collect::<Vec<_>>();
        info!("Material {:?}, textures {:?}", material.name(), textures);
    }
    for (index, skeleton) in scene.skeletons().iter().enumerate() {
        info!("Skeleton {} with {} bones", index, skeleton.bone_count());
    }
    for animation in scene.animations() {
        info!(
            "Animation {:?}, frames {}..={}, {} tracks",
            animation.name(),
            animation.start_frame(),
            animation.end_frame(),
            animation.tracks().len()
        );
    }
}

fn log_bones(bones: &[Mat4]) {
    for (index, bone) in bones.iter().enumerate() {
        info!("Bone {}: {:?}", index, bone.to_cols_array());
    }
}

fn main() {
    env_logger::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let mut scene = Scene::new();
    if let Err(err) = scene.load_file(&args.asset) {
        error!("Failed to load {}: {}", args.asset.display(), err);
        process::exit(1);
    }
    log_scene(&scene);

    let Some(time) = args.time else {
        return;
    };
    for index in 0..scene.skeleton_count() {
        let bones = scene.evaluate_skeleton(
            index,
            args.animation.as_deref(),
            time,
            args.playback,
            args.fps,
        );
        if let Some(bones) = bones {
            info!("Skeleton {} at {}s", index, time);
            log_bones(bones);
        }
    }
}
