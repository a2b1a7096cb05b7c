use crate::agent::{AgentId, AgentKind};
use crate::region::RegionId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    pub region_id: RegionId,
    pub points: u64,
    pub tick: u64,
}

/// Fan-out of completion notifications. Publishing never blocks the tick;
/// receivers that fall behind lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CompletionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: CompletionEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tick: u64) -> CompletionEvent {
        CompletionEvent {
            agent_id: AgentId::new(0),
            agent_kind: AgentKind::Routing,
            region_id: RegionId::new("edge-1"),
            points: 120,
            tick,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(event(1));
        bus.publish(event(2));
        assert_eq!(rx.try_recv().unwrap().tick, 1);
        assert_eq!(rx.try_recv().unwrap().tick, 2);
        assert!(rx.try_recv().is_err());
    }
}
