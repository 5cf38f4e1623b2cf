//! The runtime: one event queue, handled one event at a time.
//!
//! Every state change (commands, ingestion reports, poll ticks, engine
//! layout, render completions) goes through [`DatacubesApp::handle_event`].
//! After each event downstream blobs are re-derived and the scene is synced
//! forward, so the engine always sees the graph as the event left it.

use crate::app::bridge::{AppBridge, AppCommand, AppMessage, SceneSnapshot};
use crate::config::AppConfig;
use crate::data::SourceFactory;
use crate::dataset::{
    spawn_ingestion, DatasetCommand, DatasetEffect, DatasetPhase, DatasetReducer, IngestionEvent,
    PollTimers,
};
use crate::events::{event_channel, AppEvent, EventReceiver, EventSender};
use crate::graph::{
    propagate, ColorMappingPatch, Graph, GraphResult, GraphStore, NodeId, NodeKind, StatePatch,
};
use crate::render::{
    CieLabConverter, ColorConverter, RenderBackend, RenderPhase, RenderRequestController,
};
use crate::scene::{EngineHandle, SceneSynchronizer, VisualizationEngine};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::Arc;

pub struct DatacubesApp {
    graph: Graph,
    reducers: HashMap<NodeId, DatasetReducer>,
    timers: PollTimers,
    sync: SceneSynchronizer,
    render: RenderRequestController,
    engine: EngineHandle,
    factory: Arc<dyn SourceFactory>,
    events: EventSender,
    event_rx: EventReceiver,
    msg_tx: Sender<AppMessage>,
    strict_ordering: bool,
    running: bool,
}

impl DatacubesApp {
    /// Build the runtime and the bridge that drives it. Must be called within
    /// a tokio runtime.
    pub fn new(
        config: &AppConfig,
        engine: EngineHandle,
        factory: Arc<dyn SourceFactory>,
        backend: Arc<dyn RenderBackend>,
    ) -> (Self, AppBridge) {
        Self::with_converter(config, engine, factory, backend, Box::new(CieLabConverter))
    }

    pub fn with_converter(
        config: &AppConfig,
        engine: EngineHandle,
        factory: Arc<dyn SourceFactory>,
        backend: Arc<dyn RenderBackend>,
        colors: Box<dyn ColorConverter>,
    ) -> (Self, AppBridge) {
        let (events, event_rx) = event_channel();

        let render =
            RenderRequestController::new(engine.clone(), backend, colors, events.clone());
        let (bridge, msg_tx) = AppBridge::new(events.clone(), render.subscribe_overlay());

        let mut sync = SceneSynchronizer::new(engine.clone(), config.scene.mapper());
        let layout_tx = events.clone();
        sync.attach(move |updates| {
            if layout_tx.send(AppEvent::Layout(updates)).is_err() {
                tracing::debug!("Layout notification after shutdown");
            }
        });

        let app = Self {
            graph: Graph::new(),
            reducers: HashMap::new(),
            timers: PollTimers::new(config.ingestion.poll_interval(), events.clone()),
            sync,
            render,
            engine,
            factory,
            events,
            event_rx,
            msg_tx,
            strict_ordering: config.ingestion.strict_ordering,
            running: true,
        };
        (app, bridge)
    }

    // ── Accessors ──

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// A sender into this runtime's event queue.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn dataset_phase(&self, node: NodeId) -> Option<DatasetPhase> {
        self.reducers.get(&node).map(|r| r.phase())
    }

    /// Whether an ingestion for `node` has been started and not reported back.
    pub fn is_ingesting(&self, node: NodeId) -> bool {
        self.reducers
            .get(&node)
            .is_some_and(|r| r.in_flight().is_some())
    }

    pub fn is_polling(&self, node: NodeId) -> bool {
        self.timers.is_armed(node)
    }

    pub fn render_phase(&self) -> RenderPhase {
        self.render.phase()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── Main run loop ──

    /// Handle events until shutdown.
    pub async fn run(&mut self) {
        tracing::info!("Runtime started");
        self.sync_scene();

        while self.running {
            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }

        self.shutdown();
        tracing::info!("Runtime exiting");
    }

    /// Wait for one event and handle it. Returns false once shut down.
    pub async fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if let Some(event) = self.event_rx.recv().await {
            self.handle_event(event);
        }
        self.running
    }

    /// Handle every event already queued without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while self.running {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Command(cmd) => {
                if let Err(e) = self.handle_command(cmd) {
                    tracing::warn!("Command rejected: {}", e);
                    self.notify(AppMessage::CommandFailed(e.to_string()));
                }
            }
            AppEvent::Ingestion(event) => self.handle_ingestion(event),
            AppEvent::PollTick(node) => self.dispatch_dataset(node, DatasetCommand::PollTick),
            AppEvent::Layout(updates) => {
                let moved = self.sync.apply_layout(&mut self.graph, &updates);
                if moved > 0 {
                    tracing::debug!("Layout moved {} node(s)", moved);
                }
            }
            AppEvent::RenderFinished(completion) => {
                if self.render.on_finished(completion) {
                    self.notify(AppMessage::RenderPhase(self.render.phase()));
                }
            }
        }

        if self.running {
            self.sync_scene();
        }
    }

    fn handle_command(&mut self, cmd: AppCommand) -> GraphResult<()> {
        match cmd {
            AppCommand::AddNode { kind, position } => {
                let node = self.graph.add_node(kind, position)?;
                if kind == NodeKind::Dataset {
                    self.reducers
                        .insert(node, DatasetReducer::new(node, self.strict_ordering));
                }
                self.notify(AppMessage::NodeAdded { node, kind });
            }
            AppCommand::RemoveNode(node) => {
                self.graph.remove_node(node)?;
                if let Some(mut reducer) = self.reducers.remove(&node) {
                    let effects = reducer.on_removed();
                    self.apply_dataset_effects(node, effects);
                }
                self.notify(AppMessage::NodeRemoved(node));
            }
            AppCommand::MoveNode { node, position } => self.graph.set_position(node, position)?,
            AppCommand::Connect {
                source,
                port,
                target,
                slot,
            } => {
                let edge = self.graph.connect(source, port, target, slot)?;
                self.notify(AppMessage::Connected(edge));
            }
            AppCommand::Disconnect(edge) => {
                self.graph.disconnect(edge)?;
            }
            AppCommand::Dataset { node, command } => self.dispatch_dataset(node, command),
            AppCommand::EditDateFilter { node, patch } => {
                self.graph.apply_patch(node, patch.into())?;
            }
            AppCommand::SetPalette { node, palette } => {
                let patch = ColorMappingPatch {
                    palette: Some(palette),
                };
                self.graph.apply_patch(node, patch.into())?;
            }
            AppCommand::Select { node, additive } => self.graph.select(node, additive)?,
            AppCommand::UnselectAll => self.graph.unselect_all(),
            AppCommand::RenderStartOrCancel => {
                let phase = self.render.start_or_cancel();
                self.notify(AppMessage::RenderPhase(phase));
            }
            AppCommand::RenderClear => self.render.clear(),
            AppCommand::SetPerspective(perspective) => {
                self.engine.borrow_mut().set_perspective(perspective);
            }
            AppCommand::RequestScene => {
                let datacubes = self.engine.borrow().datacubes().to_vec();
                self.notify(AppMessage::Scene(SceneSnapshot {
                    revision: self.graph.revision(),
                    datacubes,
                }));
            }
            AppCommand::Shutdown => {
                tracing::info!("Shutdown requested");
                self.running = false;
            }
        }
        Ok(())
    }

    fn dispatch_dataset(&mut self, node: NodeId, command: DatasetCommand) {
        let Some(state) = self.graph.node(node).and_then(|n| n.state.as_dataset()) else {
            tracing::warn!("Dataset command {:?} for non-dataset node {}", command, node);
            return;
        };
        let strict = self.strict_ordering;
        let reducer = self
            .reducers
            .entry(node)
            .or_insert_with(|| DatasetReducer::new(node, strict));
        let before = reducer.phase();
        let effects = reducer.handle(command, state);
        let after = reducer.phase();

        self.apply_dataset_effects(node, effects);
        if before != after {
            self.notify(AppMessage::DatasetPhase { node, phase: after });
        }
    }

    fn handle_ingestion(&mut self, event: IngestionEvent) {
        let IngestionEvent {
            node,
            generation,
            outcome,
        } = event;
        let Some(state) = self.graph.node(node).and_then(|n| n.state.as_dataset()) else {
            tracing::debug!("Dropping ingestion result for removed node {}", node);
            return;
        };
        let Some(reducer) = self.reducers.get_mut(&node) else {
            return;
        };
        let before = reducer.phase();
        let effects = reducer.on_ingestion(generation, outcome, state);
        let after = reducer.phase();

        self.apply_dataset_effects(node, effects);
        if before != after {
            self.notify(AppMessage::DatasetPhase { node, phase: after });
        }
    }

    fn apply_dataset_effects(&mut self, node: NodeId, effects: Vec<DatasetEffect>) {
        for effect in effects {
            match effect {
                DatasetEffect::Patch(patch) => {
                    if let Err(e) = self.graph.apply_patch(node, StatePatch::Dataset(patch)) {
                        tracing::warn!("Dropping dataset patch: {}", e);
                    }
                }
                DatasetEffect::StartIngestion { generation, spec } => {
                    spawn_ingestion(
                        Arc::clone(&self.factory),
                        node,
                        generation,
                        spec,
                        self.events.clone(),
                    );
                }
                DatasetEffect::ArmPollTimer => self.timers.arm(node),
                DatasetEffect::CancelPollTimer => {
                    self.timers.cancel(node);
                }
            }
        }
    }

    /// Re-derive downstream blobs and push the result to the engine.
    fn sync_scene(&mut self) {
        propagate(&mut self.graph);
        let outcome = self.sync.sync_forward(&self.graph);
        if outcome.datacubes_pushed {
            let datacubes = self.engine.borrow().datacubes().to_vec();
            self.notify(AppMessage::Scene(SceneSnapshot {
                revision: self.graph.revision(),
                datacubes,
            }));
        }
    }

    fn notify(&self, msg: AppMessage) {
        if let Err(e) = self.msg_tx.try_send(msg) {
            tracing::trace!("Dropping message for the driver: {}", e);
        }
    }

    fn shutdown(&mut self) {
        self.timers.cancel_all();
        self.render.cancel();
        self.sync.detach();
        let _ = self.msg_tx.try_send(AppMessage::Shutdown);
    }
}
