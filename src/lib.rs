//! Converts an authored scene (bone hierarchy, skinned meshes, and keyframed
//! animation actions) into the GSE engine's binary asset formats:
//! `.gskel` skeletons, `.gclip` animation clips, and `.gsmdl` skinned
//! meshes.
//!
//! The [`document`] module models the source scene the way the authoring
//! tool hands it over (right-handed Z-up); the [`export`] module converts it
//! to engine space (right-handed Y-up) and builds the asset data; the
//! [`format`] module owns the binary containers.

pub mod document;
pub mod export;
pub mod format;
