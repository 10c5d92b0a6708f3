use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use thiserror::Error;

pub use self::skeleton::Skeleton;
use crate::document::Document;

pub mod clip;
pub mod mesh;
pub mod skeleton;
pub mod space;

/// Structural problems that abort the run before any document state is
/// touched or any file is written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no bone hierarchy found in the document")]
    NoSkeleton,
    #[error("invalid output directory: {}", .0.display())]
    InvalidOutputDir(PathBuf),
}

/// Options of one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Engine resources directory the artifacts are written into.
    pub out_dir: PathBuf,
    /// Name of the exported asset, used for the skeleton and mesh filenames.
    pub asset_name: String,
    pub skeleton: bool,
    pub animations: bool,
    pub mesh: bool,
}

impl ExportOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            asset_name: String::from("character"),
            skeleton: true,
            animations: true,
            mesh: true,
        }
    }
}

/// Outcome of one artifact of the run. Artifacts fail independently; one
/// failure never aborts its siblings.
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub result: Result<()>,
}

/// What an export run produced, artifact by artifact, plus any data
/// warnings. Nothing in here is silently swallowed: the caller decides how
/// to surface it.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
}

impl ExportReport {
    pub fn success(&self) -> bool {
        self.artifacts.iter().all(|artifact| artifact.result.is_ok())
    }

    fn record(&mut self, path: PathBuf, result: Result<()>) {
        match &result {
            Ok(_) => tracing::info!("Exported \"{}\"", path.display()),
            Err(err) => tracing::error!("Failed to export \"{}\": {:#}", path.display(), err),
        }
        self.artifacts.push(Artifact { path, result });
    }
}

/// Runs a full export of the document: the skeleton, one clip per action,
/// and the merged skinned mesh, as enabled by the options.
///
/// The skeleton is always built first; its bone order and name lookup seed
/// the animation and mesh steps even when skeleton output itself is toggled
/// off.
pub fn run(document: &mut Document, options: &ExportOptions) -> Result<ExportReport, ExportError> {
    let armature = document.armature.as_ref().ok_or(ExportError::NoSkeleton)?;
    if !options.out_dir.is_dir() {
        return Err(ExportError::InvalidOutputDir(options.out_dir.clone()));
    }

    let skeleton = Skeleton::build(armature);
    let scale = skeleton::scale_correction(armature, document.meshes.first());
    tracing::debug!("Mesh/skeleton extent ratio: {:.3}", scale);

    let mut report = ExportReport::default();

    if options.skeleton {
        let path = options
            .out_dir
            .join("Skeletons")
            .join(format!("{}.gskel", options.asset_name));
        let result = skeleton
            .container()
            .to_bytes()
            .and_then(|bytes| write_artifact(&path, &bytes));
        report.record(path, result);
    }

    if options.animations {
        for action in 0..document.actions.len() {
            let path = options
                .out_dir
                .join("Clips")
                .join(format!("{}.gclip", document.actions[action].name));
            let result = clip::bake(document, &skeleton, action)
                .and_then(|gclip| gclip.to_bytes())
                .and_then(|bytes| write_artifact(&path, &bytes));
            report.record(path, result);
        }
    }

    if options.mesh {
        if document.meshes.is_empty() {
            let warning = String::from("No mesh geometry found for skinned export");
            tracing::warn!("{}", warning);
            report.warnings.push(warning);
        } else {
            let path = options
                .out_dir
                .join("SkinnedModels")
                .join(format!("{}.gsmdl", options.asset_name));
            let result = mesh::weld(document, &skeleton)
                .and_then(|gsmdl| gsmdl.to_bytes())
                .and_then(|bytes| write_artifact(&path, &bytes));
            report.record(path, result);
        }
    }

    Ok(report)
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create the directory \"{}\"", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write \"{}\"", path.display()))
}
