//! Spreadsheet refresh timers, at most one per node.

use crate::events::{AppEvent, EventSender};
use crate::graph::NodeId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct PollTimers {
    period: Duration,
    events: EventSender,
    timers: HashMap<NodeId, AbortHandle>,
}

impl PollTimers {
    pub fn new(period: Duration, events: EventSender) -> Self {
        Self {
            period,
            events,
            timers: HashMap::new(),
        }
    }

    /// Start posting [`AppEvent::PollTick`] for `node` every period, replacing
    /// any timer the node already has. Must be called within a tokio runtime.
    pub fn arm(&mut self, node: NodeId) {
        self.cancel(node);
        let period = self.period;
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if events.send(AppEvent::PollTick(node)).is_err() {
                    break;
                }
            }
        });
        tracing::debug!("Armed {:?} refresh timer for node {}", period, node);
        self.timers.insert(node, task.abort_handle());
    }

    pub fn cancel(&mut self, node: NodeId) -> bool {
        match self.timers.remove(&node) {
            Some(handle) => {
                handle.abort();
                tracing::debug!("Cancelled refresh timer for node {}", node);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, node: NodeId) -> bool {
        self.timers.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl Drop for PollTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_every_period() {
        let (tx, mut rx) = event_channel();
        let mut timers = PollTimers::new(Duration::from_secs(5), tx);
        timers.arm(NodeId(3));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(rx.try_recv().is_err());

        for _ in 0..2 {
            match rx.recv().await {
                Some(AppEvent::PollTick(node)) => assert_eq!(node, NodeId(3)),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_timer() {
        let (tx, mut rx) = event_channel();
        let mut timers = PollTimers::new(Duration::from_secs(5), tx);
        timers.arm(NodeId(1));
        timers.arm(NodeId(1));
        assert_eq!(timers.len(), 1);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        let mut ticks = 0;
        while let Ok(AppEvent::PollTick(_)) = rx.try_recv() {
            ticks += 1;
        }
        assert_eq!(ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = event_channel();
        let mut timers = PollTimers::new(Duration::from_secs(5), tx);
        timers.arm(NodeId(1));
        assert!(timers.cancel(NodeId(1)));
        assert!(!timers.cancel(NodeId(1)));
        assert!(!timers.is_armed(NodeId(1)));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
