use glam::{Vec2, Vec3};
use log::trace;

use crate::mesh::Vertex;

// Triangles whose UV area is below this contribute nothing.
const DEGENERATE_UV_AREA: f32 = 1e-12;

/// Fill tangent and bitangent of every vertex from the triangles in `indices`.
///
/// Per-triangle directions are summed per vertex, then the tangent is
/// orthogonalized against the normal. `tangent.w` holds the handedness and
/// `bitangent = cross(normal, tangent) * w`.
pub fn build_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut sdirs = vec![Vec3::ZERO; vertices.len()];
    let mut tdirs = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i1, i2, i3] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i1.max(i2).max(i3) >= vertices.len() {
            continue;
        }
        let (v1, v2, v3) = (&vertices[i1], &vertices[i2], &vertices[i3]);
        let p1 = Vec3::from_array(v1.position);
        let x1 = Vec3::from_array(v2.position) - p1;
        let x2 = Vec3::from_array(v3.position) - p1;
        let w1 = Vec2::from_array(v1.uv);
        let st1 = Vec2::from_array(v2.uv) - w1;
        let st2 = Vec2::from_array(v3.uv) - w1;

        let area = st1.x * st2.y - st2.x * st1.y;
        if area.abs() < DEGENERATE_UV_AREA {
            trace!("Skip triangle {} {} {} with degenerate UV", i1, i2, i3);
            continue;
        }
        let r = 1.0 / area;
        let sdir = (x1 * st2.y - x2 * st1.y) * r;
        let tdir = (x2 * st1.x - x1 * st2.x) * r;
        for index in [i1, i2, i3] {
            sdirs[index] += sdir;
            tdirs[index] += tdir;
        }
    }

    // Vertices without a usable triangle end up with a zero tangent and
    // handedness +1.
    for (index, vertex) in vertices.iter_mut().enumerate() {
        let normal = Vec3::from_array(vertex.normal);
        let sdir = sdirs[index];
        let tangent = (sdir - normal * normal.dot(sdir)).normalize_or_zero();
        let handedness = if normal.cross(tangent).dot(tdirs[index]) < 0.0 {
            -1.0
        } else {
            1.0
        };
        vertex.tangent = tangent.extend(handedness).to_array();
        vertex.bitangent = (normal.cross(tangent) * handedness).to_array();
    }
}
