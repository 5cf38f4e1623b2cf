//! # datacubes-rs: dataflow graphs as 3D datacubes
//!
//! A dataflow graph of dataset sources, filters and visual-encoding nodes
//! drives a 3D scene with one extruded cuboid ("datacube") per
//! data-producing node. The crate keeps the two representations consistent
//! in both directions and runs the asynchronous work around them: per-node
//! tabular ingestion (files, URLs, polled spreadsheets) and a single
//! cancellable request for a high-quality render of the scene.
//!
//! ## Architecture
//!
//! - **Graph**: nodes, edges and per-kind state blobs, with downstream
//!   blobs re-derived after every mutation ([`graph`])
//! - **Datasets**: one reducer per dataset node turning edits and ingestion
//!   reports into state patches ([`dataset`], sources in [`data`])
//! - **Scene**: descriptors pushed to a [`VisualizationEngine`](scene::VisualizationEngine)
//!   and layout written back with feedback suppression ([`scene`])
//! - **Render**: the at-most-one-in-flight render request ([`render`])
//! - **Runtime**: a single event queue handled one event at a time ([`app`])
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform data directory
//! under `dev.datacubes.datacubes-rs`:
//!
//! - **Linux**: `~/.local/share/dev.datacubes.datacubes-rs/`
//! - **macOS**: `~/Library/Application Support/dev.datacubes.datacubes-rs/`
//! - **Windows**: `%APPDATA%\dev.datacubes.datacubes-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use datacubes_rs::{
//!     app::DatacubesApp, config::AppConfig, data::DefaultSourceFactory,
//!     render::HttpRenderBackend, scene::HeadlessEngine,
//! };
//! use std::{cell::RefCell, rc::Rc, sync::Arc};
//!
//! let config = AppConfig::load_or_default();
//! let engine = Rc::new(RefCell::new(HeadlessEngine::default()));
//! let (mut app, bridge) = DatacubesApp::new(
//!     &config,
//!     engine,
//!     Arc::new(DefaultSourceFactory::new(&config)?),
//!     Arc::new(HttpRenderBackend::new(&config.render)?),
//! );
//! bridge.add_node(NodeKind::Dataset, GraphPoint::new(400.0, 20.0))?;
//! app.run().await;
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod events;
pub mod graph;
pub mod render;
pub mod scene;
pub mod types;

// Re-export commonly used types
pub use app::{AppBridge, AppCommand, AppMessage, DatacubesApp};
pub use config::AppConfig;
pub use error::{DatacubesError, Result};
pub use graph::{Graph, GraphStore, NodeId, NodeKind};
pub use scene::{CoordinateMapper, DatacubeIdCodec, SceneSynchronizer};
pub use types::{GraphPoint, ScenePoint};
