//! Fake collaborators: sources, render backends and a headless runtime

use async_trait::async_trait;
use datacubes_rs::app::{AppBridge, DatacubesApp};
use datacubes_rs::config::AppConfig;
use datacubes_rs::data::{
    Column, ColumnHeader, DataType, LoadConfig, LoadProgress, SourceError, SourceFactory,
    SourceResult, SourceSpec, TabularSource,
};
use datacubes_rs::error::{DatacubesError, Result};
use datacubes_rs::render::{RenderBackend, RenderRequest, RenderedImage};
use datacubes_rs::scene::HeadlessEngine;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Serves a single `value` column of a configurable length for any spec.
#[derive(Clone, Default)]
pub struct FakeSourceFactory {
    rows: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    created: Arc<Mutex<Vec<SourceSpec>>>,
}

impl FakeSourceFactory {
    pub fn new(rows: usize) -> Self {
        let factory = Self::default();
        factory.set_rows(rows);
        factory
    }

    pub fn set_rows(&self, rows: usize) {
        self.rows.store(rows, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Specs of every source created so far.
    pub fn created(&self) -> Vec<SourceSpec> {
        self.created.lock().unwrap().clone()
    }
}

impl SourceFactory for FakeSourceFactory {
    fn create(&self, spec: &SourceSpec) -> SourceResult<Box<dyn TabularSource>> {
        self.created.lock().unwrap().push(spec.clone());
        Ok(Box::new(FakeSource {
            rows: self.rows.load(Ordering::SeqCst),
            failing: self.failing.load(Ordering::SeqCst),
        }))
    }
}

struct FakeSource {
    rows: usize,
    failing: bool,
}

#[async_trait]
impl TabularSource for FakeSource {
    fn source_id(&self) -> &str {
        "fake"
    }

    async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>> {
        if self.failing {
            return Err(SourceError::Status {
                status: 503,
                url: "fake".into(),
            });
        }
        Ok(vec![ColumnHeader::new("value", DataType::Number)])
    }

    async fn load(
        &mut self,
        _config: LoadConfig,
        progress: &mut (dyn FnMut(LoadProgress) + Send),
    ) -> SourceResult<Vec<Column>> {
        progress(LoadProgress::Done);
        Ok(vec![Column::number(
            "value",
            (0..self.rows).map(|i| i as f64).collect(),
        )])
    }
}

/// Records every request; answers once released when gated.
#[derive(Clone)]
pub struct GatedRenderBackend {
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
    gate: Option<Arc<Notify>>,
    response: std::result::Result<Vec<u8>, String>,
    abandoned: Arc<AtomicUsize>,
    answered: Arc<AtomicUsize>,
}

/// Counts a render future dropped before it answered.
struct AnswerGuard {
    abandoned: Arc<AtomicUsize>,
    done: bool,
}

impl Drop for AnswerGuard {
    fn drop(&mut self) {
        if !self.done {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl GatedRenderBackend {
    pub fn answering(bytes: Vec<u8>) -> Self {
        Self {
            requests: Arc::default(),
            gate: None,
            response: Ok(bytes),
            abandoned: Arc::default(),
            answered: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            requests: Arc::default(),
            gate: None,
            response: Err(message.to_string()),
            abandoned: Arc::default(),
            answered: Arc::default(),
        }
    }

    /// Hold every response until [`release`](Self::release).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Requests whose future was dropped while still waiting.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Requests that ran to completion.
    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }

    /// Request payloads as JSON, in arrival order.
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderBackend for GatedRenderBackend {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);
        let mut guard = AnswerGuard {
            abandoned: Arc::clone(&self.abandoned),
            done: false,
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        guard.done = true;
        self.answered.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .map(|bytes| RenderedImage::new(bytes, "image/png"))
            .map_err(DatacubesError::Render)
    }
}

/// A runtime over a [`HeadlessEngine`] with default config.
pub fn headless_app(
    factory: FakeSourceFactory,
    backend: GatedRenderBackend,
) -> (DatacubesApp, AppBridge, Rc<RefCell<HeadlessEngine>>) {
    headless_app_with(&AppConfig::default(), Arc::new(factory), backend)
}

pub fn headless_app_with(
    config: &AppConfig,
    factory: Arc<dyn SourceFactory>,
    backend: GatedRenderBackend,
) -> (DatacubesApp, AppBridge, Rc<RefCell<HeadlessEngine>>) {
    let engine = Rc::new(RefCell::new(HeadlessEngine::default()));
    let (app, bridge) = DatacubesApp::new(config, engine.clone(), factory, Arc::new(backend));
    (app, bridge, engine)
}
