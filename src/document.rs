use std::ops::{Deref, DerefMut};

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Represents the authored scene as the host tool hands it over: a bone
/// hierarchy, the mesh objects bound to it, and the keyframed actions.
///
/// The geometry uses the right-handed Z-up coordinate system of the
/// authoring tool. The export pipeline converts everything to the engine's
/// Y-up convention on the way out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub armature: Option<Armature>,
    #[serde(default)]
    pub meshes: Vec<MeshObject>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Playback rate of the scene, used to convert frames to seconds.
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(skip)]
    state: EvalState,
}

fn default_fps() -> f32 {
    30.
}

/// Transient evaluation state of the document. Export steps mutate it only
/// through [`ActionScope`] and [`RestPoseScope`], which restore the saved
/// values on every exit path.
#[derive(Debug, Clone, Default)]
struct EvalState {
    frame: i32,
    active_action: Option<usize>,
    pose_position: PosePosition,
}

/// Whether the armature evaluates its bones in the authored rest
/// configuration or in the currently posed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosePosition {
    Rest,
    #[default]
    Pose,
}

impl Document {
    /// An empty document at the default frame rate, with no evaluation
    /// state: frame zero, no active action, posed armature.
    pub fn new(armature: Option<Armature>) -> Self {
        Self {
            armature,
            meshes: Vec::new(),
            actions: Vec::new(),
            fps: default_fps(),
            state: EvalState::default(),
        }
    }

    pub fn current_frame(&self) -> i32 {
        self.state.frame
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.state.frame = frame;
    }

    pub fn active_action(&self) -> Option<usize> {
        self.state.active_action
    }

    pub fn pose_position(&self) -> PosePosition {
        self.state.pose_position
    }

    /// Armature-space transform of the bone under the current evaluation
    /// state: the rest transform when the armature is in rest position or
    /// the active action doesn't key the bone, otherwise the pose
    /// interpolated from the action's channels at the current frame.
    pub fn pose_matrix(&self, bone: usize) -> Option<Mat4> {
        let armature = self.armature.as_ref()?;
        let bone = armature.bones.get(bone)?;
        if self.state.pose_position == PosePosition::Rest {
            return Some(bone.matrix_local);
        }

        match self.state.active_action.and_then(|index| self.actions.get(index)) {
            Some(action) => {
                Some(action.sample(&bone.name, self.state.frame).unwrap_or(bone.matrix_local))
            }
            None => Some(bone.matrix_local),
        }
    }
}

/// Represents the bone hierarchy object of the scene. Bones form a forest:
/// multiple roots are permitted and keep their declared order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Armature {
    /// World transform of the armature object.
    pub matrix_world: Mat4,
    pub bones: Vec<SourceBone>,
}

impl Armature {
    /// Indices of the root bones, in declared order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
    }
}

/// A bone in its rest configuration. All transforms are in armature space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBone {
    pub name: String,
    /// The index of the parent bone in the armature, if any.
    pub parent: Option<usize>,
    /// The indices of the children bones, in declared order.
    #[serde(default)]
    pub children: Vec<usize>,
    /// Rest position of the bone's head.
    pub head: Vec3,
    /// Rest position of the bone's tail.
    pub tail: Vec3,
    /// Full rest transform of the bone.
    pub matrix_local: Mat4,
}

/// Represents one mesh object bound to the armature via named vertex groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshObject {
    pub name: String,
    /// World transform of the mesh object.
    pub matrix_world: Mat4,
    /// Vertex positions, object space.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals, object space.
    pub normals: Vec<Vec3>,
    /// Faces of the mesh. N-gons are permitted and get fan-triangulated on
    /// export.
    pub polygons: Vec<Polygon>,
    /// Per-loop UV coordinates. An empty list means the mesh has no UV
    /// layer; loops then read as (0, 0).
    #[serde(default)]
    pub uvs: Vec<Vec2>,
    /// Names of the vertex groups of the object. Group membership refers to
    /// this list by index.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Per-vertex group memberships as (group index, weight) pairs.
    #[serde(default)]
    pub weights: Vec<Vec<(usize, f32)>>,
    /// Material slot names. Empty strings stand for empty slots.
    #[serde(default)]
    pub materials: Vec<String>,
}

/// A face of a mesh object. `vertices` and `loops` run in winding order and
/// have the same length; each loop index addresses the per-loop attribute
/// lists of the owning mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<usize>,
    pub loops: Vec<usize>,
    /// Smooth-shaded faces use vertex normals; flat ones use the face
    /// normal.
    #[serde(default)]
    pub smooth: bool,
}

/// Represents a keyframed animation action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub frame_start: i32,
    pub frame_end: i32,
    /// Keyed pose channels, one per animated bone.
    #[serde(default)]
    pub channels: Vec<BoneChannel>,
}

impl Action {
    /// Armature-space pose transform of the bone at the given frame,
    /// interpolated between the bracketing keys. Frames outside the keyed
    /// range clamp to the first/last key. `None` if the action doesn't key
    /// the bone.
    pub fn sample(&self, bone: &str, frame: i32) -> Option<Mat4> {
        let keys = &self.channels.iter().find(|channel| channel.bone == bone)?.keys;
        let (first, last) = (keys.first()?, keys.last()?);
        if frame <= first.frame {
            return Some(first.matrix());
        }
        if frame >= last.frame {
            return Some(last.matrix());
        }

        let next = keys.iter().position(|key| key.frame >= frame)?;
        let (a, b) = (&keys[next - 1], &keys[next]);
        if b.frame == frame {
            return Some(b.matrix());
        }

        let t = (frame - a.frame) as f32 / (b.frame - a.frame) as f32;
        Some(Mat4::from_rotation_translation(
            a.rotation.slerp(b.rotation, t),
            a.translation.lerp(b.translation, t),
        ))
    }
}

/// The keyframe sequence of one bone within an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneChannel {
    /// Name of the bone the keys apply to.
    pub bone: String,
    /// Keys in ascending frame order.
    pub keys: Vec<PoseKey>,
}

/// A single pose key: the bone's armature-space translation and rotation at
/// one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseKey {
    pub frame: i32,
    pub translation: Vec3,
    pub rotation: Quat,
}

impl PoseKey {
    fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

/// Scoped activation of an action. Saves the previously active action and
/// the current frame on entry; dropping the scope restores both, so every
/// exit path of the baking step leaves the document as it found it.
pub struct ActionScope<'a> {
    document: &'a mut Document,
    prev_action: Option<usize>,
    prev_frame: i32,
}

impl<'a> ActionScope<'a> {
    pub fn new(document: &'a mut Document, action: usize) -> Self {
        let prev_action = document.state.active_action;
        let prev_frame = document.state.frame;
        document.state.active_action = Some(action);

        Self {
            document,
            prev_action,
            prev_frame,
        }
    }
}

impl Deref for ActionScope<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for ActionScope<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for ActionScope<'_> {
    fn drop(&mut self) {
        self.document.state.active_action = self.prev_action;
        self.document.state.frame = self.prev_frame;
    }
}

/// Scoped switch of the armature to its rest position. Mesh data must be
/// read against the rest skeleton; a posed armature would disagree with the
/// bind-derived inverse bind matrices. Dropping the scope restores the
/// previous pose position.
pub struct RestPoseScope<'a> {
    document: &'a mut Document,
    prev_position: PosePosition,
}

impl<'a> RestPoseScope<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        let prev_position = document.state.pose_position;
        document.state.pose_position = PosePosition::Rest;

        Self {
            document,
            prev_position,
        }
    }
}

impl Deref for RestPoseScope<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for RestPoseScope<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for RestPoseScope<'_> {
    fn drop(&mut self) {
        self.document.state.pose_position = self.prev_position;
    }
}
