use crate::message::TicketEvent;
use events::TicketId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Bounded, in-memory record of recently published events. Oldest entries are
/// evicted first. Lost on restart.
pub struct EventHistory {
    capacity: usize,
    events: Mutex<VecDeque<Arc<TicketEvent>>>,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, event: Arc<TicketEvent>) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Up to `limit` most recent events, optionally for one ticket, oldest first.
    pub fn recent(&self, ticket_id: Option<TicketId>, limit: usize) -> Vec<Arc<TicketEvent>> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<Arc<TicketEvent>> = events
            .iter()
            .rev()
            .filter(|event| ticket_id.map_or(true, |id| event.ticket_id == id))
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TicketEventType;
    use serde_json::json;

    fn event(ticket_id: TicketId, seq: u64) -> Arc<TicketEvent> {
        Arc::new(TicketEvent::new(
            ticket_id,
            TicketEventType::FollowupAdded,
            json!({ "seq": seq }),
        ))
    }

    #[test]
    fn oldest_events_are_evicted_at_capacity() {
        let history = EventHistory::new(3);
        for seq in 0..5 {
            history.push(event(1, seq));
        }

        let seqs: Vec<_> = history
            .recent(None, 10)
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn recent_filters_by_ticket_and_limit() {
        let history = EventHistory::new(10);
        history.push(event(1, 0));
        history.push(event(2, 1));
        history.push(event(1, 2));
        history.push(event(1, 3));

        let seqs: Vec<_> = history
            .recent(Some(1), 2)
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let history = EventHistory::new(0);
        history.push(event(1, 0));
        assert!(history.is_empty());
    }
}
