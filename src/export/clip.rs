use anyhow::{ensure, Context, Result};
use glam::Mat4;

use crate::{
    document::{ActionScope, Document},
    export::{
        skeleton::{scale_free_world, Skeleton},
        space,
    },
    format::{Gclip, Key, Track, ROOT_PARENT},
};

/// Bakes one action into an animation clip: every joint is sampled once per
/// integer frame of the action's range, in engine space, relative to its
/// parent. The document's active action and current frame are restored on
/// every exit path.
pub fn bake(document: &mut Document, skeleton: &Skeleton, action: usize) -> Result<Gclip> {
    let (name, start, end) = {
        let action = document
            .actions
            .get(action)
            .context("The action index is out of range")?;
        (action.name.clone(), action.frame_start, action.frame_end)
    };
    ensure!(
        start <= end,
        "Action \"{}\" has an inverted frame range ({}..{})",
        name,
        start,
        end
    );

    let fps = document.fps;
    ensure!(fps > 0., "The scene frame rate must be positive");

    let object = document
        .armature
        .as_ref()
        .context("The document has no armature to pose")?
        .matrix_world;

    let mut keys: Vec<Vec<Key>> = vec![Vec::new(); skeleton.bones.len()];
    let mut scope = ActionScope::new(document, action);

    for frame in start..=end {
        scope.set_frame(frame);
        let time = (frame - start) as f32 / fps;

        let mut worlds = vec![Mat4::IDENTITY; skeleton.bones.len()];
        for (joint, bone) in skeleton.bones.iter().enumerate() {
            let pose = scope
                .pose_matrix(skeleton.source_index(joint))
                .context("A skeleton bone disappeared from the document while baking")?;

            // Same scale-stripping recipe as the bind pose, but from the
            // posed transform.
            let world = scale_free_world(object, pose, pose.w_axis.truncate());
            worlds[joint] = world;

            let local = match bone.parent {
                ROOT_PARENT => world,
                parent => worlds[parent as usize].inverse().mul_mat4(&world),
            };

            keys[joint].push(Key {
                time,
                transform: space::convert_matrix(local),
            });
        }
    }
    drop(scope);

    let tracks = keys
        .into_iter()
        .enumerate()
        .filter(|(_, keys)| !keys.is_empty())
        .map(|(joint, keys)| Track {
            joint: joint as u16,
            keys,
        })
        .collect();

    Ok(Gclip {
        name,
        duration: (end - start) as f32 / fps,
        tracks,
    })
}
