// SPDX-License-Identifier: MIT OR Apache-2.0
//! `framescript` - headless export driver.
//!
//! Usage: `framescript width:height:fps:totalFrames:workers:codec:preset`
//!
//! Settings are read from the RON file named by `FRAMESCRIPT_SETTINGS`, then
//! overridden from the `RENDER_*` environment variables.

use framescript_driver::{
    mount_bench, BackendClient, BenchConfig, DriverError, DriverSettings, Exporter, RenderArgs,
    Result, SETTINGS_ENV,
};
use framescript_scene::Scene;
use framescript_timeline::ProjectContext;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("framescript_driver=debug".parse().unwrap())
        .add_directive("framescript_scene=info".parse().unwrap())
        .add_directive("framescript_timeline=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FrameScript driver v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        tracing::error!("Export failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let raw = std::env::args().nth(1).ok_or_else(|| {
        DriverError::InvalidArgs("expected width:height:fps:totalFrames:workers:codec:preset".into())
    })?;
    let args: RenderArgs = raw.parse()?;

    let settings_path = std::env::var_os(SETTINGS_ENV).map(PathBuf::from);
    let mut settings = DriverSettings::load_or_default(settings_path.as_deref())?.with_env_overrides();
    settings.project.fps = args.fps;
    settings.project.width = args.width;
    settings.project.height = args.height;

    let mut scene = Scene::new(ProjectContext::new(settings.project));
    mount_bench(&mut scene, None, BenchConfig::default())?;

    let backend = BackendClient::new(&settings);
    let exporter = Exporter::new(&backend, &settings);
    let resolved = exporter.resolve_media(&mut scene).await?;

    tracing::info!(
        "Scene ready: {} nodes, {} media resolved, {} frames, writing to {:?}",
        scene.node_count(),
        resolved,
        scene.total_duration(),
        settings.output_path
    );

    let mut out = BufWriter::new(File::create(&settings.output_path)?);
    let report = exporter.run(&mut scene, &args, &mut out).await?;

    if report.canceled {
        tracing::warn!("Export canceled after {}/{} frames", report.completed, report.total);
    }
    Ok(())
}
