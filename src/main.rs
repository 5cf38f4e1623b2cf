//! Datacubes headless runner - Main Entry Point
//!
//! Loads the given datasets into a graph, lets them settle, logs the
//! resulting datacubes and optionally asks the renderer for an image.

use anyhow::Context;
use clap::Parser;
use datacubes_rs::{
    app::{AppBridge, AppMessage, DatacubesApp},
    config::AppConfig,
    data::{DefaultSourceFactory, SourceKind},
    dataset::DatasetCommand,
    graph::{GraphStore, NodeId, NodeKind},
    render::{HttpRenderBackend, RenderPhase},
    scene::{EngineHandle, HeadlessEngine, VisualizationEngine},
    types::GraphPoint,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "datacubes", version, about = "Load datasets into datacubes")]
struct Args {
    /// Config file (defaults to the platform data directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local CSV or JSON file; repeatable
    #[arg(long = "csv", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Remote CSV or JSON URL; repeatable
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Google Sheets URL; repeatable
    #[arg(long = "sheet", value_name = "URL")]
    sheets: Vec<String>,

    /// Request a high-quality render and write it here
    #[arg(long, value_name = "OUT")]
    render: Option<PathBuf>,

    /// How long to wait for ingestion and rendering
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,datacubes_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the runtime")?
        .block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> anyhow::Result<()> {
    let engine = Rc::new(RefCell::new(HeadlessEngine::default()));
    let handle: EngineHandle = engine.clone();
    let factory = Arc::new(DefaultSourceFactory::new(&config)?);
    let backend = Arc::new(HttpRenderBackend::new(&config.render)?);
    let (mut app, bridge) = DatacubesApp::new(&config, handle, factory, backend);
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);

    let mut datasets = Vec::new();
    let sources = args
        .files
        .iter()
        .map(|p| vec![DatasetCommand::BindFile(p.clone())])
        .chain(args.urls.iter().map(|url| {
            let kind = if url.to_ascii_lowercase().ends_with(".json") {
                SourceKind::Json
            } else {
                SourceKind::Csv
            };
            vec![
                DatasetCommand::SelectSource(kind),
                DatasetCommand::SetRemoteUri(url.clone()),
            ]
        }))
        .chain(args.sheets.iter().map(|url| {
            vec![
                DatasetCommand::SelectSource(SourceKind::Spreadsheet),
                DatasetCommand::SetSpreadsheetUri(url.clone()),
            ]
        }));
    for (i, commands) in sources.enumerate() {
        let position = GraphPoint::new(
            config.scene.min_x + i as f64 * config.scene.step,
            config.scene.min_y,
        );
        let node = add_dataset(&mut app, &bridge, position)?;
        for command in commands {
            bridge.dataset(node, command)?;
        }
        datasets.push(node);
    }
    app.drain_pending();
    tracing::info!("Loading {} dataset(s)", datasets.len());

    wait_until(&mut app, deadline, |app| {
        datasets.iter().all(|&n| !app.is_ingesting(n))
    })
    .await;

    engine.borrow_mut().arrange_grid();
    app.drain_pending();

    for cube in engine.borrow().datacubes() {
        tracing::info!(
            "Datacube {} ({}): height {:.3}{}{}",
            cube.id,
            cube.kind,
            cube.relative_height,
            if cube.is_pending { ", pending" } else { "" },
            if cube.is_erroneous { ", error" } else { "" },
        );
    }
    for &node in &datasets {
        let columns = app
            .graph()
            .node(node)
            .and_then(|n| n.state.as_dataset())
            .map(|state| state.columns.clone())
            .unwrap_or_default();
        for column in columns {
            tracing::info!(
                "  {} {} [{:?}] {}",
                node,
                column.name(),
                column.data_type(),
                column.summary()
            );
        }
    }

    if let Some(out) = &args.render {
        bridge.start_or_cancel_render()?;
        app.drain_pending();
        wait_until(&mut app, deadline, |app| app.render_phase() == RenderPhase::Idle).await;
        match bridge.overlay() {
            Some(image) => {
                tokio::fs::write(out, &image.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                tracing::info!("Wrote {} ({} bytes)", out.display(), image.bytes.len());
            }
            None => tracing::warn!("No image received from {}", config.render.endpoint),
        }
    }

    bridge.shutdown()?;
    app.run().await;
    Ok(())
}

fn add_dataset(
    app: &mut DatacubesApp,
    bridge: &AppBridge,
    position: GraphPoint,
) -> anyhow::Result<NodeId> {
    bridge.add_node(NodeKind::Dataset, position)?;
    app.drain_pending();
    bridge
        .drain()
        .into_iter()
        .find_map(|msg| match msg {
            AppMessage::NodeAdded { node, .. } => Some(node),
            _ => None,
        })
        .context("Dataset node was not added")
}

/// Handle events until `done` holds or the deadline passes.
async fn wait_until(
    app: &mut DatacubesApp,
    deadline: Instant,
    done: impl Fn(&DatacubesApp) -> bool,
) {
    while !done(app) {
        match tokio::time::timeout_at(deadline, app.step()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                tracing::warn!("Timed out waiting for the runtime");
                break;
            }
        }
    }
}
