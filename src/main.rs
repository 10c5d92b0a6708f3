use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;

use gse_export::{
    document::Document,
    export::{self, ExportOptions},
};

#[derive(Parser)]
#[command(name = "gse-export")]
#[command(about = "Exports an authored scene to GSE engine binary assets")]
#[command(version)]
struct Cli {
    /// Scene document (JSON)
    scene: PathBuf,

    /// Engine resources directory to export into
    #[arg(short, long)]
    output: PathBuf,

    /// Name for the exported asset (skeleton and mesh filenames)
    #[arg(short, long, default_value = "character")]
    name: String,

    /// Skip skeleton export
    #[arg(long)]
    skip_skeleton: bool,

    /// Skip animation clip export
    #[arg(long)]
    skip_animations: bool,

    /// Skip skinned mesh export
    #[arg(long)]
    skip_mesh: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let scene = fs::read_to_string(&cli.scene)
        .with_context(|| format!("Failed to read the scene \"{}\"", cli.scene.display()))?;
    let mut document: Document =
        serde_json::from_str(&scene).context("Failed to parse the scene document")?;

    let options = ExportOptions {
        out_dir: cli.output,
        asset_name: cli.name,
        skeleton: !cli.skip_skeleton,
        animations: !cli.skip_animations,
        mesh: !cli.skip_mesh,
    };

    let report = export::run(&mut document, &options)?;
    Ok(report.success())
}
