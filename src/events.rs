//! The runtime's single event queue.
//!
//! Everything that can change state (user commands, ingestion completions,
//! poll ticks, engine layout, render results) arrives here and is handled one
//! event at a time.

use crate::app::bridge::AppCommand;
use crate::dataset::ingest::IngestionEvent;
use crate::error::{DatacubesError, Result};
use crate::graph::NodeId;
use crate::render::controller::RenderCompletion;
use crate::scene::LayoutUpdate;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Command(AppCommand),
    Ingestion(IngestionEvent),
    PollTick(NodeId),
    Layout(Vec<LayoutUpdate>),
    RenderFinished(RenderCompletion),
}

/// Cloneable sending side of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSender {
    pub fn send(&self, event: AppEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| DatacubesError::Channel("event queue closed".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
