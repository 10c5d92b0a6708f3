use std::collections::{hash_map::Entry, HashMap};

use anyhow::{ensure, Result};
use glam::{Mat3, Vec2, Vec3};

use crate::{
    document::{Document, MeshObject, RestPoseScope},
    export::{skeleton::Skeleton, space},
    format::{Gsmdl, SkinVertex},
};

const MAX_INFLUENCES: usize = 4;

/// Welds all mesh objects of the document into one indexed skinned mesh in
/// engine space. The armature is forced into rest position for the duration
/// of the step and restored on every exit path; vertex data read against a
/// posed skeleton would disagree with the bind-derived inverse bind
/// matrices.
pub fn weld(document: &mut Document, skeleton: &Skeleton) -> Result<Gsmdl> {
    let scope = RestPoseScope::new(document);

    let mut vertices: Vec<SkinVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut lookup: HashMap<VertexKey, u32> = HashMap::new();

    for object in &scope.meshes {
        validate(object)?;

        let rotation = Mat3::from_mat4(object.matrix_world);
        // Vertex groups that don't match a bone name are ignored.
        let group_to_joint: HashMap<usize, u16> = object
            .groups
            .iter()
            .enumerate()
            .filter_map(|(group, name)| skeleton.joint_index(name).map(|joint| (group, joint)))
            .collect();

        for polygon in &object.polygons {
            // Fan triangulation; winding order carries over.
            for fan in 1..polygon.vertices.len() - 1 {
                let corners = [0, fan, fan + 1];

                let [a, b, c] = corners.map(|corner| object.positions[polygon.vertices[corner]]);
                let face_normal = (b - a).cross(c - a);

                for corner in corners {
                    let vertex_index = polygon.vertices[corner];
                    let loop_index = polygon.loops[corner];

                    let position = space::convert_position(
                        object.matrix_world.transform_point3(object.positions[vertex_index]),
                    );

                    let source_normal = if polygon.smooth {
                        object.normals[vertex_index]
                    } else {
                        face_normal
                    };
                    let normal =
                        space::convert_direction((rotation * source_normal).normalize_or_zero());

                    let uv = object.uvs.get(loop_index).copied().unwrap_or(Vec2::ZERO);
                    let uv = Vec2::new(uv.x, 1. - uv.y);

                    let (joints, weights) =
                        resolve_influences(object, vertex_index, &group_to_joint);

                    let vertex = SkinVertex {
                        position,
                        normal,
                        uv,
                        joints,
                        weights,
                    };

                    let index = match lookup.entry(VertexKey::of(&vertex)) {
                        Entry::Occupied(entry) => *entry.get(),
                        Entry::Vacant(entry) => {
                            let index = vertices.len() as u32;
                            vertices.push(vertex);
                            *entry.insert(index)
                        }
                    };
                    indices.push(index);
                }
            }
        }
    }

    let material = scope
        .meshes
        .first()
        .and_then(|object| object.materials.iter().find(|name| !name.is_empty()))
        .cloned()
        .unwrap_or_else(|| String::from("default"));

    Ok(Gsmdl {
        material,
        vertices,
        indices,
    })
}

/// Collects the vertex's (joint, weight) pairs, keeps the strongest four,
/// and renormalizes them to sum to one. Ties sort to the lower joint index.
/// A vertex without any matching influence falls back to full weight on
/// joint zero.
fn resolve_influences(
    object: &MeshObject,
    vertex: usize,
    group_to_joint: &HashMap<usize, u16>,
) -> ([u32; 4], [f32; 4]) {
    let mut influences: Vec<(u16, f32)> = object
        .weights
        .get(vertex)
        .map(|memberships| {
            memberships
                .iter()
                .filter_map(|&(group, weight)| {
                    group_to_joint.get(&group).map(|&joint| (joint, weight))
                })
                .collect()
        })
        .unwrap_or_default();

    influences.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    influences.truncate(MAX_INFLUENCES);

    let mut joints = [0; MAX_INFLUENCES];
    let mut weights = [0.; MAX_INFLUENCES];
    let total: f32 = influences.iter().map(|&(_, weight)| weight).sum();
    if total > 0. {
        for (slot, &(joint, weight)) in influences.iter().enumerate() {
            joints[slot] = joint as u32;
            weights[slot] = weight / total;
        }
    } else {
        weights[0] = 1.;
    }

    (joints, weights)
}

fn validate(object: &MeshObject) -> Result<()> {
    ensure!(
        object.normals.len() == object.positions.len(),
        "Mesh \"{}\" has {} normals for {} vertices",
        object.name,
        object.normals.len(),
        object.positions.len()
    );
    for polygon in &object.polygons {
        ensure!(
            polygon.vertices.len() == polygon.loops.len() && polygon.vertices.len() >= 3,
            "Mesh \"{}\" has a malformed polygon",
            object.name
        );
        ensure!(
            polygon.vertices.iter().all(|&v| v < object.positions.len()),
            "Mesh \"{}\" has a polygon referencing missing vertices",
            object.name
        );
    }

    Ok(())
}

/// Welding identity of a vertex: the exact bit patterns of every attribute.
/// Any difference, however small, produces a distinct vertex.
#[derive(Hash, PartialEq, Eq)]
struct VertexKey {
    position: [u32; 3],
    normal: [u32; 3],
    uv: [u32; 2],
    joints: [u32; 4],
    weights: [u32; 4],
}

impl VertexKey {
    fn of(vertex: &SkinVertex) -> Self {
        Self {
            position: vertex.position.to_array().map(f32::to_bits),
            normal: vertex.normal.to_array().map(f32::to_bits),
            uv: vertex.uv.to_array().map(f32::to_bits),
            joints: vertex.joints,
            weights: vertex.weights.map(f32::to_bits),
        }
    }
}
