use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};

use crate::{
    document::{Armature, MeshObject, SourceBone},
    export::space,
    format::{Bone, Gskel, ROOT_PARENT},
};

/// The bind-pose skeleton of one export run, in engine space. Bones are
/// ordered depth-first from the root bones in their declared order, so a
/// parent always precedes its children. Built once per run and read-only
/// afterwards.
pub struct Skeleton {
    pub bones: Vec<Bone>,
    /// Armature arena index of each bone, in skeleton order.
    source: Vec<usize>,
    name_to_index: HashMap<String, u16>,
}

impl Skeleton {
    pub fn build(armature: &Armature) -> Self {
        let order = visit_order(armature);

        // Skeleton index of each armature bone.
        let mut skeleton_index = vec![0usize; armature.bones.len()];
        for (index, &source) in order.iter().enumerate() {
            skeleton_index[source] = index;
        }

        let worlds: Vec<Mat4> = order
            .iter()
            .map(|&source| {
                let bone = &armature.bones[source];
                scale_free_world(armature.matrix_world, bone.matrix_local, bone.head)
            })
            .collect();

        let mut bones = Vec::with_capacity(order.len());
        let mut name_to_index = HashMap::new();
        for (index, &source) in order.iter().enumerate() {
            let bone = &armature.bones[source];
            let world = worlds[index];

            let (parent, local_bind) = match bone.parent {
                Some(parent) => {
                    let parent = skeleton_index[parent];
                    (parent as u16, worlds[parent].inverse().mul_mat4(&world))
                }
                None => (ROOT_PARENT, world),
            };

            name_to_index.insert(bone.name.clone(), index as u16);
            bones.push(Bone {
                name: bone.name.clone(),
                parent,
                local_bind: space::convert_matrix(local_bind),
                inverse_bind: space::convert_matrix(world.inverse()),
            });
        }

        Self {
            bones,
            source: order,
            name_to_index,
        }
    }

    /// Index of the joint with the given bone name, if it exists.
    pub fn joint_index(&self, name: &str) -> Option<u16> {
        self.name_to_index.get(name).copied()
    }

    /// Armature arena index of the joint.
    pub(crate) fn source_index(&self, joint: usize) -> usize {
        self.source[joint]
    }

    pub fn container(&self) -> Gskel {
        Gskel {
            bones: self.bones.clone(),
        }
    }
}

/// Depth-first pre-order over the bone forest, roots in declared order.
fn visit_order(armature: &Armature) -> Vec<usize> {
    fn add(index: usize, bones: &[SourceBone], visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        order.push(index);

        for &child in &bones[index].children {
            add(child, bones, visited, order);
        }
    }

    let mut order = Vec::with_capacity(armature.bones.len());
    let mut visited = vec![false; armature.bones.len()];
    for root in armature.roots() {
        add(root, &armature.bones, &mut visited, &mut order);
    }

    order
}

/// World transform of a bone with scale stripped: the rotation comes from
/// the full object-times-local transform with its axes renormalized, the
/// translation from the given armature-space position mapped through the
/// object transform.
pub(crate) fn scale_free_world(object: Mat4, local: Mat4, position: Vec3) -> Mat4 {
    let full = object.mul_mat4(&local);
    let rotation = Mat3::from_cols(
        full.x_axis.truncate().normalize_or_zero(),
        full.y_axis.truncate().normalize_or_zero(),
        full.z_axis.truncate().normalize_or_zero(),
    );

    let mut world = Mat4::from_mat3(rotation);
    world.w_axis = object.transform_point3(position).extend(1.);
    world
}

/// Ratio between the mesh's and the skeleton's largest world-space
/// bounding-box extents. Skinning never bakes object or armature scale into
/// the exported matrices, so this is the factor a mismatched rig would need;
/// it is reported as a diagnostic only.
pub fn scale_correction(armature: &Armature, mesh: Option<&MeshObject>) -> f32 {
    let mesh = match mesh {
        Some(mesh) if !mesh.positions.is_empty() => mesh,
        _ => return 1.,
    };

    let mesh_size = extent(mesh.positions.iter().map(|&p| mesh.matrix_world.transform_point3(p)));
    let bone_size = extent(armature.bones.iter().flat_map(|bone| {
        [
            armature.matrix_world.transform_point3(bone.head),
            armature.matrix_world.transform_point3(bone.tail),
        ]
    }));

    if bone_size > 0.001 {
        mesh_size / bone_size
    } else {
        1.
    }
}

/// Largest axis-aligned extent of a point cloud.
fn extent(points: impl Iterator<Item = Vec3>) -> f32 {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut any = false;
    for point in points {
        min = min.min(point);
        max = max.max(point);
        any = true;
    }

    if any {
        (max - min).max_element()
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use glam::{EulerRot, Quat};
    use pretty_assertions::assert_eq;

    use super::*;

    fn bone(name: &str, parent: Option<usize>, children: &[usize], head: Vec3) -> SourceBone {
        SourceBone {
            name: String::from(name),
            parent,
            children: children.to_vec(),
            head,
            tail: head + Vec3::new(0., 0., 0.5),
            matrix_local: Mat4::from_translation(head),
        }
    }

    #[test]
    fn order_is_depth_first_from_declared_roots() {
        // Declared out of traversal order on purpose: the hip lists its
        // right child before its left one.
        let armature = Armature {
            matrix_world: Mat4::IDENTITY,
            bones: vec![
                bone("Hip", None, &[2, 1], Vec3::ZERO),
                bone("Leg.L", Some(0), &[], Vec3::new(0.2, 0., 0.)),
                bone("Leg.R", Some(0), &[], Vec3::new(-0.2, 0., 0.)),
                bone("Prop", None, &[], Vec3::new(1., 0., 0.)),
            ],
        };

        let skeleton = Skeleton::build(&armature);
        let names: Vec<&str> = skeleton.bones.iter().map(|b| b.name.as_str()).collect();

        assert_eq!(vec!["Hip", "Leg.R", "Leg.L", "Prop"], names);
        assert_eq!(ROOT_PARENT, skeleton.bones[0].parent);
        assert_eq!(0, skeleton.bones[1].parent);
        assert_eq!(0, skeleton.bones[2].parent);
        assert_eq!(ROOT_PARENT, skeleton.bones[3].parent);
        assert_eq!(Some(1), skeleton.joint_index("Leg.R"));
    }

    #[test]
    fn parents_always_precede_children() {
        let armature = Armature {
            matrix_world: Mat4::IDENTITY,
            bones: vec![
                bone("Spine", Some(2), &[1], Vec3::new(0., 0., 1.)),
                bone("Head", Some(0), &[], Vec3::new(0., 0., 1.5)),
                bone("Hip", None, &[0], Vec3::ZERO),
            ],
        };

        let skeleton = Skeleton::build(&armature);
        for (index, bone) in skeleton.bones.iter().enumerate() {
            if bone.parent != ROOT_PARENT {
                assert!((bone.parent as usize) < index);
            }
        }
    }

    #[test]
    fn single_root_bone() {
        let armature = Armature {
            matrix_world: Mat4::IDENTITY,
            bones: vec![bone("Root", None, &[], Vec3::ZERO)],
        };

        let skeleton = Skeleton::build(&armature);
        assert_eq!(1, skeleton.bones.len());
        assert_eq!(ROOT_PARENT, skeleton.bones[0].parent);

        let bone = &skeleton.bones[0];
        assert!(bone.local_bind.abs_diff_eq(bone.inverse_bind.inverse(), 1e-4));
    }

    #[test]
    fn inverse_bind_inverts_accumulated_locals() {
        // A posed-looking rig: rotated bones under a scaled, moved armature.
        // The accumulated local binds down a chain rebuild each bone's world
        // bind, which the inverse bind must cancel.
        let rotation = Quat::from_euler(EulerRot::XYZ, 0.4, -0.2, 1.1);
        let armature = Armature {
            matrix_world: Mat4::from_scale_rotation_translation(
                Vec3::splat(2.),
                Quat::IDENTITY,
                Vec3::new(0., 3., 0.),
            ),
            bones: vec![
                SourceBone {
                    name: String::from("Hip"),
                    parent: None,
                    children: vec![1],
                    head: Vec3::new(0., 0., 1.),
                    tail: Vec3::new(0., 0., 1.5),
                    matrix_local: Mat4::from_rotation_translation(rotation, Vec3::new(0., 0., 1.)),
                },
                SourceBone {
                    name: String::from("Spine"),
                    parent: Some(0),
                    children: vec![],
                    head: Vec3::new(0., 0.2, 1.6),
                    tail: Vec3::new(0., 0.2, 2.),
                    matrix_local: Mat4::from_rotation_translation(
                        rotation * rotation,
                        Vec3::new(0., 0.2, 1.6),
                    ),
                },
            ],
        };

        let skeleton = Skeleton::build(&armature);
        let mut world = Mat4::IDENTITY;
        for bone in &skeleton.bones {
            world = world.mul_mat4(&bone.local_bind);
            assert!(bone
                .inverse_bind
                .mul_mat4(&world)
                .abs_diff_eq(Mat4::IDENTITY, 1e-4));
        }
    }

    #[test]
    fn scale_correction_compares_dominant_extents() {
        let armature = Armature {
            matrix_world: Mat4::IDENTITY,
            bones: vec![bone("Root", None, &[], Vec3::ZERO)],
        };
        let mesh = MeshObject {
            name: String::from("body"),
            matrix_world: Mat4::IDENTITY,
            positions: vec![Vec3::ZERO, Vec3::new(0., 0., 1.)],
            normals: vec![Vec3::Z, Vec3::Z],
            polygons: Vec::new(),
            uvs: Vec::new(),
            groups: Vec::new(),
            weights: Vec::new(),
            materials: Vec::new(),
        };

        // Bone spans 0.5 along Z (head to tail), mesh spans 1.0.
        assert_eq!(2., scale_correction(&armature, Some(&mesh)));
        assert_eq!(1., scale_correction(&armature, None));
    }
}
