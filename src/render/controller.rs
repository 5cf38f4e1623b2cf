//! High-quality render requests.
//!
//! At most one request is outstanding. Starting while one is in flight
//! cancels it instead of starting another. The result is published as the
//! overlay: an image on success, nothing on failure or cancellation.

use crate::error::Result;
use crate::events::{AppEvent, EventSender};
use crate::render::backend::{RenderBackend, RenderedImage};
use crate::render::color::ColorConverter;
use crate::render::request::RenderRequest;
use crate::scene::EngineHandle;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Requesting,
}

/// Identifies one request so late completions can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket(pub u64);

/// Outcome of a request, delivered through the event queue.
#[derive(Debug)]
pub struct RenderCompletion {
    pub ticket: RenderTicket,
    pub result: Result<RenderedImage>,
}

/// What the overlay shows; `None` means no overlay.
pub type Overlay = Option<Arc<RenderedImage>>;

struct InFlight {
    ticket: RenderTicket,
    handle: AbortHandle,
}

pub struct RenderRequestController {
    engine: EngineHandle,
    backend: Arc<dyn RenderBackend>,
    colors: Box<dyn ColorConverter>,
    events: EventSender,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    overlay: watch::Sender<Overlay>,
}

impl RenderRequestController {
    pub fn new(
        engine: EngineHandle,
        backend: Arc<dyn RenderBackend>,
        colors: Box<dyn ColorConverter>,
        events: EventSender,
    ) -> Self {
        let (overlay, _) = watch::channel(None);
        Self {
            engine,
            backend,
            colors,
            events,
            in_flight: None,
            next_ticket: 0,
            overlay,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        if self.in_flight.is_some() {
            RenderPhase::Requesting
        } else {
            RenderPhase::Idle
        }
    }

    pub fn subscribe_overlay(&self) -> watch::Receiver<Overlay> {
        self.overlay.subscribe()
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay.borrow().clone()
    }

    /// Cancel the outstanding request, or snapshot the scene and start a new
    /// one. Must be called within a tokio runtime.
    pub fn start_or_cancel(&mut self) -> RenderPhase {
        if self.cancel() {
            return RenderPhase::Idle;
        }

        let request = {
            let engine = self.engine.borrow();
            RenderRequest::snapshot(&*engine, self.colors.as_ref())
        };
        let ticket = RenderTicket(self.next_ticket);
        self.next_ticket += 1;
        tracing::info!(
            "Requesting high-quality render {:?} ({} scene element(s))",
            ticket,
            request.scene_elements.len()
        );

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let result = backend.render(&request).await;
            if events
                .send(AppEvent::RenderFinished(RenderCompletion { ticket, result }))
                .is_err()
            {
                tracing::debug!("Render {:?} finished after shutdown", ticket);
            }
        });
        self.in_flight = Some(InFlight {
            ticket,
            handle: task.abort_handle(),
        });
        RenderPhase::Requesting
    }

    /// Abort the outstanding request, if any, and clear the overlay.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        in_flight.handle.abort();
        tracing::info!("Cancelled high-quality render {:?}", in_flight.ticket);
        self.overlay.send_replace(None);
        true
    }

    /// Dismiss the overlay.
    pub fn clear(&mut self) {
        self.overlay.send_replace(None);
    }

    /// Handle a completion. Returns false for completions of requests that
    /// were cancelled or superseded.
    pub fn on_finished(&mut self, completion: RenderCompletion) -> bool {
        match &self.in_flight {
            Some(current) if current.ticket == completion.ticket => {}
            _ => {
                tracing::debug!("Dropping stale render result {:?}", completion.ticket);
                return false;
            }
        }
        self.in_flight = None;

        match completion.result {
            Ok(image) => {
                tracing::info!(
                    "High-quality render {:?} done ({} bytes, {})",
                    completion.ticket,
                    image.bytes.len(),
                    image.content_type
                );
                self.overlay.send_replace(Some(Arc::new(image)));
            }
            Err(e) => {
                tracing::warn!("High-quality render {:?} failed: {}", completion.ticket, e);
                self.overlay.send_replace(None);
            }
        }
        true
    }
}

impl Drop for RenderRequestController {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatacubesError;
    use crate::events::event_channel;
    use crate::render::color::CieLabConverter;
    use crate::scene::HeadlessEngine;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedBackend(std::result::Result<Vec<u8>, String>);

    #[async_trait]
    impl RenderBackend for FixedBackend {
        async fn render(&self, _request: &RenderRequest) -> Result<RenderedImage> {
            self.0
                .clone()
                .map(|bytes| RenderedImage::new(bytes, "image/png"))
                .map_err(DatacubesError::Render)
        }
    }

    fn controller(
        backend: FixedBackend,
    ) -> (RenderRequestController, crate::events::EventReceiver) {
        let (tx, rx) = event_channel();
        let engine: EngineHandle = Rc::new(RefCell::new(HeadlessEngine::default()));
        (
            RenderRequestController::new(engine, Arc::new(backend), Box::new(CieLabConverter), tx),
            rx,
        )
    }

    async fn completion(rx: &mut crate::events::EventReceiver) -> RenderCompletion {
        match rx.recv().await {
            Some(AppEvent::RenderFinished(c)) => c,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_publishes_image() {
        let (mut ctl, mut rx) = controller(FixedBackend(Ok(vec![1, 2, 3])));
        assert_eq!(ctl.start_or_cancel(), RenderPhase::Requesting);

        let done = completion(&mut rx).await;
        assert!(ctl.on_finished(done));
        assert_eq!(ctl.phase(), RenderPhase::Idle);
        assert_eq!(ctl.overlay().unwrap().bytes, vec![1, 2, 3]);

        ctl.clear();
        assert!(ctl.overlay().is_none());
    }

    #[tokio::test]
    async fn test_failure_clears_overlay() {
        let (mut ctl, mut rx) = controller(FixedBackend(Err("502".into())));
        ctl.start_or_cancel();
        let done = completion(&mut rx).await;
        assert!(ctl.on_finished(done));
        assert_eq!(ctl.phase(), RenderPhase::Idle);
        assert!(ctl.overlay().is_none());
    }

    #[tokio::test]
    async fn test_second_call_cancels() {
        let (mut ctl, _rx) = controller(FixedBackend(Ok(vec![1])));
        assert_eq!(ctl.start_or_cancel(), RenderPhase::Requesting);
        assert_eq!(ctl.start_or_cancel(), RenderPhase::Idle);
        assert_eq!(ctl.phase(), RenderPhase::Idle);
        assert!(ctl.overlay().is_none());
    }

    #[tokio::test]
    async fn test_stale_completion_is_ignored() {
        let (mut ctl, _rx) = controller(FixedBackend(Ok(vec![1])));
        let stale = RenderCompletion {
            ticket: RenderTicket(41),
            result: Ok(RenderedImage::new(vec![9], "image/png")),
        };
        assert!(!ctl.on_finished(stale));
        assert!(ctl.overlay().is_none());
    }
}
