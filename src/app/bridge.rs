//! Boundary between the runtime and whatever drives it (a UI, the headless
//! binary, tests).
//!
//! Commands enter the runtime's event queue; messages come back over a
//! bounded crossbeam channel so a UI thread can drain them once per frame.
//! The render overlay is published separately through a watch channel.

use crate::dataset::{DatasetCommand, DatasetPhase};
use crate::error::Result;
use crate::events::{AppEvent, EventSender};
use crate::graph::{
    ColorPalette, DateFilterPatch, EdgeId, NodeId, NodeKind, SourcePort, TargetSlot,
};
use crate::render::{Overlay, RenderPhase};
use crate::scene::DatacubeDescriptor;
use crate::types::GraphPoint;
use crossbeam_channel::{bounded, Receiver, Sender};
use tokio::sync::watch;

/// Commands sent into the runtime.
#[derive(Debug, Clone)]
pub enum AppCommand {
    AddNode {
        kind: NodeKind,
        position: GraphPoint,
    },
    RemoveNode(NodeId),
    /// Place a node at an absolute graph position (user drag).
    MoveNode {
        node: NodeId,
        position: GraphPoint,
    },
    Connect {
        source: NodeId,
        port: SourcePort,
        target: NodeId,
        slot: TargetSlot,
    },
    Disconnect(EdgeId),
    /// Edit of a dataset node's source configuration.
    Dataset {
        node: NodeId,
        command: DatasetCommand,
    },
    EditDateFilter {
        node: NodeId,
        patch: DateFilterPatch,
    },
    SetPalette {
        node: NodeId,
        palette: ColorPalette,
    },
    Select {
        node: NodeId,
        additive: bool,
    },
    UnselectAll,
    RenderStartOrCancel,
    RenderClear,
    SetPerspective(bool),
    /// Ask for a [`AppMessage::Scene`] even if nothing changed.
    RequestScene,
    Shutdown,
}

/// Snapshot of what the engine was last given.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    pub revision: u64,
    pub datacubes: Vec<DatacubeDescriptor>,
}

/// Messages sent from the runtime to the driver.
#[derive(Debug, Clone)]
pub enum AppMessage {
    NodeAdded { node: NodeId, kind: NodeKind },
    NodeRemoved(NodeId),
    Connected(EdgeId),
    /// A command was rejected (unknown node, invalid connection, ...).
    CommandFailed(String),
    DatasetPhase { node: NodeId, phase: DatasetPhase },
    Scene(SceneSnapshot),
    RenderPhase(RenderPhase),
    Shutdown,
}

/// Channel capacity for messages (runtime → driver).
const MSG_CHANNEL_CAPACITY: usize = 1_024;

/// Driver-side handle for communicating with the runtime.
pub struct AppBridge {
    pub cmd_tx: EventSender,
    pub msg_rx: Receiver<AppMessage>,
    pub overlay_rx: watch::Receiver<Overlay>,
}

impl AppBridge {
    /// Create a bridge feeding `events`. The runtime owns the returned sender.
    pub fn new(
        events: EventSender,
        overlay_rx: watch::Receiver<Overlay>,
    ) -> (Self, Sender<AppMessage>) {
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (
            Self {
                cmd_tx: events,
                msg_rx,
                overlay_rx,
            },
            msg_tx,
        )
    }

    // --- Drain messages ---

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<AppMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<AppMessage> {
        self.msg_rx.try_recv().ok()
    }

    /// Current overlay image, if any.
    pub fn overlay(&self) -> Overlay {
        self.overlay_rx.borrow().clone()
    }

    // --- Send commands ---

    pub fn send_command(&self, cmd: AppCommand) -> Result<()> {
        self.cmd_tx.send(AppEvent::Command(cmd))
    }

    pub fn add_node(&self, kind: NodeKind, position: GraphPoint) -> Result<()> {
        self.send_command(AppCommand::AddNode { kind, position })
    }

    pub fn remove_node(&self, node: NodeId) -> Result<()> {
        self.send_command(AppCommand::RemoveNode(node))
    }

    pub fn connect(
        &self,
        source: NodeId,
        port: SourcePort,
        target: NodeId,
        slot: TargetSlot,
    ) -> Result<()> {
        self.send_command(AppCommand::Connect {
            source,
            port,
            target,
            slot,
        })
    }

    pub fn dataset(&self, node: NodeId, command: DatasetCommand) -> Result<()> {
        self.send_command(AppCommand::Dataset { node, command })
    }

    pub fn start_or_cancel_render(&self) -> Result<()> {
        self.send_command(AppCommand::RenderStartOrCancel)
    }

    pub fn clear_render(&self) -> Result<()> {
        self.send_command(AppCommand::RenderClear)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(AppCommand::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[test]
    fn test_commands_enter_event_queue() {
        let (tx, mut rx) = event_channel();
        let (_overlay_tx, overlay_rx) = watch::channel(None);
        let (bridge, _msg_tx) = AppBridge::new(tx, overlay_rx);

        bridge.remove_node(NodeId(4)).unwrap();
        bridge.shutdown().unwrap();
        assert!(matches!(
            rx.try_recv(),
            Ok(AppEvent::Command(AppCommand::RemoveNode(NodeId(4))))
        ));
        assert!(matches!(rx.try_recv(), Ok(AppEvent::Command(AppCommand::Shutdown))));
    }

    #[test]
    fn test_drain_collects_messages() {
        let (tx, _rx) = event_channel();
        let (_overlay_tx, overlay_rx) = watch::channel(None);
        let (bridge, msg_tx) = AppBridge::new(tx, overlay_rx);

        msg_tx.send(AppMessage::NodeRemoved(NodeId(1))).unwrap();
        msg_tx.send(AppMessage::Shutdown).unwrap();
        assert_eq!(bridge.drain().len(), 2);
        assert!(bridge.try_recv().is_none());
        assert!(bridge.overlay().is_none());
    }

    #[test]
    fn test_send_fails_after_runtime_exit() {
        let (tx, rx) = event_channel();
        let (_overlay_tx, overlay_rx) = watch::channel(None);
        let (bridge, _msg_tx) = AppBridge::new(tx, overlay_rx);
        drop(rx);
        assert!(bridge.clear_render().is_err());
    }
}
